pub mod ast;
pub mod token;
pub mod lexer;
pub mod parser;
pub mod object;
pub mod evaluator;
pub mod env;
pub mod error;
pub mod repl;

pub use error::{Error, Result};
pub use evaluator::Evaluator;
pub use object::Object;

use crate::lexer::Lexer;

/// Lexes, parses and evaluates `source` in the evaluator's environment.
///
/// Nothing is evaluated when the source has syntax errors; they are returned
/// as [`Error::Parse`]. A runtime error is a successful result holding an
/// `Object::Error`.
pub fn interpret(source: &str, evaluator: &mut Evaluator) -> Result<Option<Object>> {
    let tokens = Lexer::new(source).lex();
    let (program, errors) = parser::parse(tokens);

    if !errors.is_empty() {
        return Err(errors.into());
    }

    Ok(evaluator.eval(&program))
}
