//! End-to-end pipeline: scan → parse → resolve → interpret.

use std::io::Write;
use std::panic;
use std::thread;

use log::{debug, info, warn};

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

/// Exit status for a program rejected before execution.
pub const EXIT_STATIC_FAILURE: i32 = 65;

/// Exit status for a program aborted by a runtime error.
pub const EXIT_RUNTIME_FAILURE: i32 = 70;

/// Stack reserved for the thread a program runs on.  Deep Lox recursion
/// needs far more native stack than a default thread provides.
pub const INTERPRETER_STACK_SIZE: usize = 256 * 1024 * 1024;

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    Success,
    /// Lexical, syntax or resolution errors; nothing was executed.
    StaticFailure(Vec<LoxError>),
    /// Execution started and was aborted.  Output printed before the error stands.
    RuntimeFailure(LoxError),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::StaticFailure(_) => EXIT_STATIC_FAILURE,
            Outcome::RuntimeFailure(_) => EXIT_RUNTIME_FAILURE,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Splits the scanner output into tokens and lexical errors.
pub fn scan(source: &str) -> (Vec<Token<'_>>, Vec<LoxError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => {
                debug!("Lex error: {}", e);
                errors.push(e);
            }
        }
    }

    (tokens, errors)
}

/// Runs `source` as a program, writing `print` output to `out`.
///
/// The pipeline runs on its own thread with `INTERPRETER_STACK_SIZE` bytes
/// of stack, so [`MAX_CALL_DEPTH`] is reached before native stack runs out.
///
/// [`MAX_CALL_DEPTH`]: crate::interpreter::MAX_CALL_DEPTH
pub fn run<W: Write + Send>(source: &str, out: W) -> Outcome {
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("rox-interpreter".to_string())
            .stack_size(INTERPRETER_STACK_SIZE)
            .spawn_scoped(scope, move || run_here(source, out));

        match worker {
            Ok(handle) => match handle.join() {
                Ok(outcome) => outcome,
                Err(payload) => panic::resume_unwind(payload),
            },
            Err(e) => {
                warn!("Could not spawn interpreter thread: {}", e);
                Outcome::RuntimeFailure(LoxError::Io(e))
            }
        }
    })
}

/// The pipeline itself, on the calling thread's stack.
fn run_here<W: Write>(source: &str, out: W) -> Outcome {
    let (tokens, mut errors) = scan(source);
    info!("Scanned {} tokens", tokens.len());

    // Syntax errors are reported alongside lexical ones.
    let statements = match Parser::new(&tokens).parse() {
        Ok(statements) if errors.is_empty() => statements,
        Ok(_) => return Outcome::StaticFailure(errors),
        Err(parse_errors) => {
            errors.extend(parse_errors);
            return Outcome::StaticFailure(errors);
        }
    };

    let mut interpreter = Interpreter::with_output(out);

    if let Err(resolve_errors) = Resolver::new(&mut interpreter).resolve(&statements) {
        return Outcome::StaticFailure(resolve_errors);
    }

    match interpreter.interpret(&statements) {
        Ok(()) => Outcome::Success,
        Err(e) => Outcome::RuntimeFailure(e),
    }
}
