use std::io::{self, IsTerminal, Read};

use rustyline::error::ReadlineError;
use rustyline::Editor;

use celisp::eval::Machine;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut machine = Machine::new();

    match args.len() {
        1 => {
            if io::stdin().is_terminal() {
                repl(&mut machine);
            } else {
                run_piped(&mut machine);
            }
        }
        2 => {
            run_file(&mut machine, &args[1], false);
            if io::stdin().is_terminal() {
                repl(&mut machine);
            }
        }
        3 => {
            let print_results = args[2] == "-p" || args[2] == "-print";
            run_file(&mut machine, &args[1], print_results);
            if io::stdin().is_terminal() {
                repl(&mut machine);
            }
        }
        _ => {
            eprintln!("too many arguments");
            eprintln!("Usage: celisp [file] [-p | -print]");
            std::process::exit(1);
        }
    }
}

/// Evaluate a source file against the machine's global frame.
fn run_file(machine: &mut Machine, path: &str, print_results: bool) {
    if let Err(e) = machine.stream.push_file(path) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    machine.run(print_results);
}

/// Interactive REPL: accumulate lines until parens balance, then hand the
/// buffer to the machine as one source.
fn repl(machine: &mut Machine) {
    let mut rl = Editor::<()>::new();
    let mut buf = String::new();
    let mut depth: i32 = 0;

    loop {
        let prompt = if depth == 0 { "> " } else { "  " };
        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        };

        // track paren depth (naive but sufficient for well-formed input)
        for ch in line.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        }

        buf.push_str(&line);
        buf.push('\n');

        if depth <= 0 {
            depth = 0;
            let input = buf.trim().to_string();
            buf.clear();

            if input.is_empty() {
                continue;
            }

            rl.add_history_entry(input.as_str());
            machine.stream.push_text(&input);
            machine.run(true);
        }
    }
}

/// Piped mode: read everything, then evaluate and print form by form.
fn run_piped(machine: &mut Machine) {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("Read error: {}", e);
        std::process::exit(1);
    }
    machine.stream.push_text(&input);
    machine.run(true);
}
