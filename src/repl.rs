use std::io::{self, BufRead, Write};

use tracing::trace;

use crate::error::Error;
use crate::evaluator::Evaluator;
use crate::interpret;

pub const PROMPT: &str = ">> ";

#[derive(Debug, Clone)]
pub struct ReplConfig {
  pub prompt: String,
}

impl Default for ReplConfig {
  fn default() -> Self {
    ReplConfig {
      prompt: PROMPT.to_owned(),
    }
  }
}

/// Reads one program per line from `input` and writes each result to
/// `output` until the input runs out. Bindings persist for the whole
/// session; syntax and runtime errors are printed and the loop goes on.
pub fn start<R: BufRead, W: Write>(input: R, mut output: W, config: &ReplConfig) -> io::Result<()> {
  let mut evaluator = Evaluator::default();
  let mut lines = input.lines();

  loop {
    write!(output, "{}", config.prompt)?;
    output.flush()?;

    let line = match lines.next() {
      Some(line) => line?,
      None => return Ok(()),
    };

    if line.trim().is_empty() {
      continue;
    }

    trace!(%line, "evaluating line");

    match interpret(&line, &mut evaluator) {
      Ok(Some(value)) => writeln!(output, "{}", value)?,
      Ok(None) => {}
      Err(Error::Parse(errors)) => write!(output, "{}", errors)?,
      Err(Error::Io(err)) => return Err(err),
    }
  }
}
