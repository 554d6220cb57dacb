pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod pool;
pub mod primitives;
pub mod printer;
pub mod stream;
pub mod value;

use eval::Machine;

/// Evaluate a whole program and return the text it produced: one line per
/// top-level value plus any error reports. This is the embedding entry
/// point; a host that wants stdout instead drives a `Machine` directly.
pub fn eval_str(input: &str) -> String {
    let mut machine = Machine::capturing();
    machine.stream.push_text(input);
    machine.run(true);
    machine.take_output()
}
