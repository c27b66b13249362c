use std::cell::RefCell;
use std::fmt;
use std::fmt::Formatter;
use std::rc::Rc;

use crate::ast::{BlockStatement, Identifier};
use crate::env::Env;

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
  Integer(i64),
  Boolean(bool),
  Null,
  /// Carries a `return` value up to the nearest function call.
  ReturnValue(Box<Object>),
  Error(String),
  Function(Function),
}

impl Object {
  pub fn type_name(&self) -> &'static str {
    match self {
      Object::Integer(_) => "INTEGER",
      Object::Boolean(_) => "BOOLEAN",
      Object::Null => "NULL",
      Object::ReturnValue(_) => "RETURN_VALUE",
      Object::Error(_) => "ERROR",
      Object::Function(_) => "FUNCTION",
    }
  }

  /// `false` and `null` are falsy, everything else (including `0`) is truthy.
  pub fn is_truthy(&self) -> bool {
    !matches!(self, Object::Boolean(false) | Object::Null)
  }
}

#[derive(Clone)]
pub struct Function {
  pub parameters: Vec<Identifier>,
  pub body: BlockStatement,
  pub env: Rc<RefCell<Env>>,
}

// The captured environment usually holds this very function, so neither
// comparison nor debug output may descend into it.
impl PartialEq for Function {
  fn eq(&self, other: &Self) -> bool {
    self.parameters == other.parameters && self.body == other.body && Rc::ptr_eq(&self.env, &other.env)
  }
}

impl fmt::Debug for Function {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.debug_struct("Function")
      .field("parameters", &self.parameters)
      .field("body", &self.body)
      .finish_non_exhaustive()
  }
}

impl fmt::Display for Object {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Object::Integer(n) => write!(f, "{}", n),
      Object::Boolean(b) => write!(f, "{}", b),
      Object::Null => f.write_str("null"),
      Object::ReturnValue(value) => write!(f, "{}", value),
      Object::Error(msg) => write!(f, "ERROR: {}", msg),
      Object::Function(function) => {
        let parameters = function.parameters.iter().map(ToString::to_string).collect::<Vec<_>>();
        write!(f, "fn({}) {{...}}", parameters.join(", "))
      }
    }
  }
}
