use crate::error::{Error, Result};
use crate::lexer::TokenStream;
use crate::parser;
use crate::pool::Pools;
use crate::primitives::apply_prim;
use crate::printer::print_cell;
use crate::value::{Cell, FrameId, Kind, Procedure};

/// Pool sizes for a default session. Handles are stable indices, but the
/// pools are still capped so a runaway program fails loudly instead of
/// consuming the machine.
pub const PROC_CAPACITY: usize = 10_000;
pub const FRAME_CAPACITY: usize = 40_000;

/// Where evaluated values and error reports are written. A host embedding
/// swaps in `Capture` and collects the text afterwards.
pub enum Sink {
    Stdout,
    Capture(String),
}

impl Sink {
    fn write_line(&mut self, line: &str) {
        match self {
            Sink::Stdout => println!("{}", line),
            Sink::Capture(text) => {
                text.push_str(line);
                text.push('\n');
            }
        }
    }
}

/// One interpreter session: the procedure and frame pools, the token
/// stream with its source stack, the output sink, and the global frame.
pub struct Machine {
    pub pools: Pools,
    pub stream: TokenStream,
    sink: Sink,
    globe: FrameId,
}

impl Machine {
    pub fn new() -> Self {
        Machine::with_capacity(PROC_CAPACITY, FRAME_CAPACITY)
    }

    pub fn with_capacity(proc_capacity: usize, frame_capacity: usize) -> Self {
        let pools = Pools::new(proc_capacity, frame_capacity);
        let globe = pools.global();
        Machine {
            pools,
            stream: TokenStream::new(),
            sink: Sink::Stdout,
            globe,
        }
    }

    /// A machine whose output is collected in memory instead of printed.
    pub fn capturing() -> Self {
        let mut m = Machine::new();
        m.sink = Sink::Capture(String::new());
        m
    }

    pub fn global_frame(&self) -> FrameId {
        self.globe
    }

    /// Drain the captured output. Empty for a stdout machine.
    pub fn take_output(&mut self) -> String {
        match &mut self.sink {
            Sink::Stdout => String::new(),
            Sink::Capture(text) => std::mem::take(text),
        }
    }

    // ========================================================================
    // Driver loop
    // ========================================================================

    /// Read and evaluate top-level forms until the source stack is drained.
    /// Each value is printed when `print_results` is set (the `End` and
    /// `Include` sentinels are not values and stay silent). A failing form
    /// is reported and abandoned; everything defined before the failure
    /// stays defined.
    pub fn run(&mut self, print_results: bool) {
        while !self.stream.is_done() {
            let form = match parser::parse_one(&mut self.stream, true) {
                Ok(form) => form,
                Err(e) => {
                    self.report(&e);
                    continue;
                }
            };
            match self.eval(&form, self.globe) {
                Ok(val) => {
                    if print_results && !matches!(val.kind(), Kind::End | Kind::Include) {
                        let line = print_cell(&val);
                        self.sink.write_line(&line);
                    }
                }
                Err(e) => self.report(&e),
            }
        }
    }

    fn report(&mut self, e: &Error) {
        self.sink.write_line(&format!("Bad expression: {}", e));
    }

    // ========================================================================
    // eval / evlist
    // ========================================================================

    /// Evaluate one expression (the contents of a parenthesised form) and
    /// return its single value. The empty expression evaluates to the
    /// `End` sentinel, which is how the driver notices a drained source.
    pub fn eval(&mut self, expr: &[Cell], env: FrameId) -> Result<Cell> {
        let head = match expr.first() {
            Some(cell) => cell,
            None => return Ok(Cell::tag(Kind::End)),
        };

        match head {
            Cell::Number(_) | Cell::Tag(Kind::True) | Cell::Tag(Kind::False) => {
                Ok(head.clone())
            }

            // (quote expr): the next cell, untouched
            Cell::Tag(Kind::Quote) => expr.get(1).cloned().ok_or(Error::MalformedQuote),

            // (include name): switch the token stream to the named file
            Cell::Tag(Kind::Include) => {
                let path = self.include_path(expr)?;
                self.stream.push_file(&path)?;
                Ok(Cell::tag(Kind::Include))
            }

            // (begin a b ... z): sequence, value of the last
            Cell::Tag(Kind::Begin) => {
                let rest = &expr[1..];
                if rest.is_empty() {
                    return Ok(Cell::Expr(Vec::new()));
                }
                let last = rest.len() - 1;
                self.evlist(&rest[..last], env)?;
                self.eval(&rest[last..], env)
            }

            // (lambda (params) (body))
            Cell::Tag(Kind::Lambda) => self.make_procedure(&expr[1..], env),

            // (define name expr) or (define (name params) (body))
            Cell::Tag(Kind::Define) => self.eval_define(&expr[1..], env),

            // a parenthesised sub-expression; a procedure value in head
            // position with arguments following is an application
            Cell::Expr(sub) => {
                let value = self.eval_sublist(sub, env)?;
                let rest = &expr[1..];
                if value.kind() == Kind::Proc && !rest.is_empty() {
                    let args = self.collect_args(rest, env)?;
                    return self.apply(&value, args);
                }
                Ok(value)
            }

            Cell::Tag(Kind::Cond) => {
                let matched = self.eval_cond(&expr[1..], env)?;
                Ok(matched.unwrap_or_else(|| Cell::Expr(Vec::new())))
            }

            Cell::Tag(Kind::Let) => self.eval_let(&expr[1..], env),

            Cell::Tag(k) if k.is_primitive() => {
                let prim = *k;
                let rest = &expr[1..];
                if rest.is_empty() {
                    return Err(Error::PrimitiveArity(prim.spelling()));
                }
                let args = self.evlist(rest, env)?;
                if args.is_empty() {
                    return Err(Error::PrimitiveArity(prim.spelling()));
                }
                apply_prim(prim, args)
            }

            // the lexer cannot tell a variable from a procedure name;
            // the looked-up value decides
            Cell::Name(name) => {
                let value = self.pools.lookup(env, name)?;
                if value.kind() != Kind::Proc {
                    return Ok(value);
                }
                let args = self.collect_args(&expr[1..], env)?;
                self.apply(&value, args)
            }

            _ => Err(Error::UnmatchedCell("eval")),
        }
    }

    /// Evaluate a sequence of sub-expressions and return the list of their
    /// values. This is how argument lists are built.
    pub fn evlist(&mut self, expr: &[Cell], env: FrameId) -> Result<Vec<Cell>> {
        let mut res = Vec::new();
        let mut p = 0;
        while p < expr.len() {
            match &expr[p] {
                Cell::Number(_) | Cell::Tag(Kind::True) | Cell::Tag(Kind::False) => {
                    res.push(expr[p].clone());
                    p += 1;
                }

                Cell::Tag(Kind::Quote) => {
                    let next = expr.get(p + 1).ok_or(Error::MalformedQuote)?;
                    res.push(next.clone());
                    p += 2;
                }

                Cell::Tag(Kind::Include) => {
                    let path = self.include_path(&expr[p..])?;
                    self.stream.push_file(&path)?;
                    // the stream has switched; the include adds no value
                    return Ok(res);
                }

                Cell::Tag(Kind::Begin) => {
                    let rest = &expr[p + 1..];
                    if rest.is_empty() {
                        res.push(Cell::Expr(Vec::new()));
                        return Ok(res);
                    }
                    let last = rest.len() - 1;
                    self.evlist(&rest[..last], env)?;
                    res.push(self.eval(&rest[last..], env)?);
                    return Ok(res);
                }

                Cell::Tag(Kind::Lambda) => {
                    res.push(self.make_procedure(&expr[p + 1..], env)?);
                    p += 3;
                }

                Cell::Tag(Kind::Define) => {
                    res.push(self.eval_define(&expr[p + 1..], env)?);
                    return Ok(res);
                }

                Cell::Expr(sub) => {
                    res.push(self.eval_sublist(sub, env)?);
                    p += 1;
                }

                Cell::Tag(Kind::Cond) => {
                    if let Some(val) = self.eval_cond(&expr[p + 1..], env)? {
                        res.push(val);
                    }
                    return Ok(res);
                }

                Cell::Tag(Kind::Let) => {
                    res.push(self.eval_let(&expr[p + 1..], env)?);
                    return Ok(res);
                }

                Cell::Tag(k) if k.is_primitive() => {
                    let prim = *k;
                    let rest = &expr[p + 1..];
                    if rest.is_empty() {
                        return Err(Error::PrimitiveArity(prim.spelling()));
                    }
                    let args = self.evlist(rest, env)?;
                    if args.is_empty() {
                        return Err(Error::PrimitiveArity(prim.spelling()));
                    }
                    res.push(apply_prim(prim, args)?);
                    return Ok(res);
                }

                Cell::Name(name) => {
                    let value = self.pools.lookup(env, name)?;
                    if value.kind() != Kind::Proc {
                        res.push(value);
                        p += 1;
                    } else {
                        let args = self.collect_args(&expr[p + 1..], env)?;
                        res.push(self.apply(&value, args)?);
                        return Ok(res);
                    }
                }

                _ => return Err(Error::UnmatchedCell("evlist")),
            }
        }
        Ok(res)
    }

    /// Apply a procedure value to fully-evaluated arguments: fresh frame
    /// over the captured environment, positional binding, evaluate body.
    pub fn apply(&mut self, proc_cell: &Cell, args: Vec<Cell>) -> Result<Cell> {
        let id = proc_cell.as_proc()?;
        let proc = self.pools.proc(id).clone();
        let frame = self.pools.bind(&proc.params, args, proc.env)?;
        self.eval(&proc.body, frame)
    }

    // ========================================================================
    // Special-form helpers
    // ========================================================================

    /// `rest` holds the cells after the lambda keyword: a parameter list
    /// and a body, both parenthesised.
    fn make_procedure(&mut self, rest: &[Cell], env: FrameId) -> Result<Cell> {
        if rest.len() < 2 {
            return Err(Error::MalformedLambda);
        }
        let params = rest[0].as_expr()?.to_vec();
        let body = rest[1].as_expr()?.to_vec();
        let id = self.pools.alloc_proc(Procedure { params, body, env })?;
        Ok(Cell::Proc(id))
    }

    /// `rest` holds the cells after the define keyword. Two shapes:
    /// `(define name expr...)` binds the value of the remaining cells;
    /// `(define (name params) (body))` is the function shorthand.
    fn eval_define(&mut self, rest: &[Cell], env: FrameId) -> Result<Cell> {
        if rest.len() < 2 {
            return Err(Error::MalformedDefine);
        }
        match &rest[0] {
            Cell::Name(n) => {
                let name = n.clone();
                let val = self.eval(&rest[1..], env)?;
                self.pools.assign(env, &name, val.clone());
                Ok(val)
            }
            Cell::Expr(decl) => {
                let head = decl.first().ok_or(Error::MalformedDefine)?;
                let name = match head {
                    Cell::Name(n) => n.clone(),
                    _ => return Err(Error::MalformedDefine),
                };
                let params = decl[1..].to_vec();
                let body = rest[1].as_expr()?.to_vec();
                let id = self.pools.alloc_proc(Procedure { params, body, env })?;
                let cell = Cell::Proc(id);
                self.pools.assign(env, &name, cell.clone());
                Ok(cell)
            }
            _ => Err(Error::MalformedDefine),
        }
    }

    /// `clauses` are the cells after the cond keyword, each a
    /// `(predicate body)` list. Returns the matched body's value, or None
    /// when nothing matched. An `else` clause must come last.
    fn eval_cond(&mut self, clauses: &[Cell], env: FrameId) -> Result<Option<Cell>> {
        for (i, clause) in clauses.iter().enumerate() {
            let clause = clause.as_expr()?;
            if clause.len() < 2 {
                return Err(Error::TypeMismatch(
                    "cond clause needs a predicate and a body".into(),
                ));
            }
            if clause[0].kind() == Kind::Else {
                if i + 1 != clauses.len() {
                    return Err(Error::ElseMisplaced);
                }
                return self.eval(&clause[1..], env).map(Some);
            }
            if self.eval(&clause[..1], env)?.is_truthy() {
                return self.eval(&clause[1..], env).map(Some);
            }
        }
        Ok(None)
    }

    /// `rest` holds the cells after the let keyword: a list of
    /// `(name value)` pairs and a body. Values are evaluated against the
    /// enclosing frame; the body runs in a fresh pool frame so procedures
    /// made inside it keep a live environment after the form returns.
    fn eval_let(&mut self, rest: &[Cell], env: FrameId) -> Result<Cell> {
        if rest.len() < 2 {
            return Err(Error::MalformedLet);
        }
        let bindings = rest[0].as_expr().map_err(|_| Error::MalformedLet)?;
        let local = self.pools.alloc_frame(env)?;
        for pair in bindings {
            let pair = pair.as_expr()?;
            if pair.len() < 2 {
                return Err(Error::MalformedLet);
            }
            let name = pair[0].as_name()?.to_string();
            let val = self.eval(&pair[1..], env)?;
            self.pools.assign(local, &name, val);
        }
        // a parenthesised body is evaluated directly, dispatching on the
        // inner list's own head; only a bare cell evaluates as a sequence
        match &rest[1] {
            Cell::Expr(body) => self.eval(body, local),
            _ => self.eval(&rest[1..], local),
        }
    }

    /// Evaluate a nested `Expr` cell: a singleton result collapses to the
    /// cell itself, anything else stays a list.
    fn eval_sublist(&mut self, sub: &[Cell], env: FrameId) -> Result<Cell> {
        let mut vals = self.evlist(sub, env)?;
        if vals.len() == 1 {
            Ok(vals.remove(0))
        } else {
            Ok(Cell::Expr(vals))
        }
    }

    /// Gather arguments for a procedure call. Locally resolvable cells
    /// (numbers, quoted cells, name lookups) are taken left to right; the
    /// first compound cell hands the whole remainder to `evlist`.
    fn collect_args(&mut self, rest: &[Cell], env: FrameId) -> Result<Vec<Cell>> {
        let mut args = Vec::new();
        let mut p = 0;
        while p < rest.len() {
            match &rest[p] {
                Cell::Number(_) => {
                    args.push(rest[p].clone());
                    p += 1;
                }
                Cell::Tag(Kind::Quote) => {
                    let next = rest.get(p + 1).ok_or(Error::MalformedQuote)?;
                    args.push(next.clone());
                    p += 2;
                }
                Cell::Name(n) => {
                    args.push(self.pools.lookup(env, n)?);
                    p += 1;
                }
                _ => {
                    args.extend(self.evlist(&rest[p..], env)?);
                    break;
                }
            }
        }
        Ok(args)
    }

    /// The cell after an include keyword names the file to switch to.
    fn include_path(&self, expr: &[Cell]) -> Result<String> {
        let cell = expr
            .get(1)
            .ok_or_else(|| Error::TypeMismatch("include expects a file name".into()))?;
        Ok(cell.as_name()?.to_string())
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}
