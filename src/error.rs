use std::fmt;
use std::io;
use std::result;

use thiserror::Error;

use crate::parser::ParseError;

pub type Result<T> = result::Result<T, Error>;

/// Failures of the host around the language. Errors raised by a running
/// program are `Object::Error` values, not this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Parse(ParseErrors),
}

/// Every syntax error found in one source text, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseErrors(pub Vec<ParseError>);

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "parser errors:")?;
        for error in &self.0 {
            writeln!(f, "\t{}", error)?;
        }
        Ok(())
    }
}

impl From<Vec<ParseError>> for Error {
    fn from(errors: Vec<ParseError>) -> Self {
        Error::Parse(ParseErrors(errors))
    }
}
