use thiserror::Error;

/// Errors surfaced while lexing, parsing, or evaluating. All of them unwind
/// to the REPL driver, which reports and keeps going; nothing is rolled
/// back, so definitions made before the failure survive it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Parser hit end of input while a `)` was still owed.
    #[error("')' expected")]
    UnbalancedParens,

    /// `define` not followed by a name or a function declaration.
    #[error("unfamiliar form to define")]
    MalformedDefine,

    /// Fewer than two cells after `lambda`.
    #[error("malformed lambda expression")]
    MalformedLambda,

    /// `let` without a bindings list and a body.
    #[error("let expects a list of definitions and a body")]
    MalformedLet,

    /// `quote` at the end of a sequence.
    #[error("quote expects one argument")]
    MalformedQuote,

    /// `else` clause somewhere other than the last position of a `cond`.
    #[error("else clause not at end of condition")]
    ElseMisplaced,

    /// Primitive applied to an empty argument list.
    #[error("primitive '{0}' takes at least one argument")]
    PrimitiveArity(&'static str),

    /// Procedure called with the wrong number of arguments.
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// Name lookup failed all the way up to the global frame.
    #[error("unbound variable '{0}'")]
    Unbound(String),

    /// A cell's payload did not match what the operation required.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The dispatcher saw a kind it has no rule for at that position.
    #[error("unmatched cell in {0}")]
    UnmatchedCell(&'static str),

    /// An append-only pool ran out of reserved capacity.
    #[error("{0} pool exhausted")]
    PoolOverflow(&'static str),

    /// I/O failure from a character source (e.g. an include target).
    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;
