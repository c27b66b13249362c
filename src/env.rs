use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Object;

type Objects = HashMap<String, Object>;

/// A scope of bindings with an optional enclosing scope.
///
/// Environments are shared as `Rc<RefCell<Env>>`: a function value keeps the
/// environment it was defined in alive for as long as the function exists.
#[derive(Debug, Clone, Default)]
pub struct Env {
  objects: Objects,
  parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
  pub fn new() -> Self {
    Self {
      objects: HashMap::new(),
      parent: None,
    }
  }

  pub fn new_with_parent(parent: Rc<RefCell<Env>>) -> Self {
    Self {
      objects: HashMap::new(),
      parent: Some(parent),
    }
  }

  pub fn shared(self) -> Rc<RefCell<Env>> {
    Rc::new(RefCell::new(self))
  }

  pub fn get(&self, name: &str) -> Option<Object> {
    if let Some(object) = self.objects.get(name) {
      return Some(object.clone());
    }

    if let Some(ref parent) = self.parent {
      return parent.borrow().get(name);
    }

    None
  }

  /// Binds `name` in this scope only; outer bindings of the same name are
  /// shadowed, never overwritten.
  pub fn set(&mut self, name: String, value: Object) {
    self.objects.insert(name, value);
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::Env;
  use crate::object::Object;

  #[test]
  fn lookup_walks_outward() {
    let outer = Env::new().shared();
    outer.borrow_mut().set("x".to_owned(), Object::Integer(1));

    let inner = Env::new_with_parent(outer.clone());

    assert_eq!(inner.get("x"), Some(Object::Integer(1)));
    assert_eq!(inner.get("y"), None);
  }

  #[test]
  fn set_shadows_without_touching_the_parent() {
    let outer = Env::new().shared();
    outer.borrow_mut().set("x".to_owned(), Object::Integer(1));

    let mut inner = Env::new_with_parent(outer.clone());
    inner.set("x".to_owned(), Object::Integer(2));

    assert_eq!(inner.get("x"), Some(Object::Integer(2)));
    assert_eq!(outer.borrow().get("x"), Some(Object::Integer(1)));
  }

  #[test]
  fn parent_sees_later_bindings() {
    let outer = Env::new().shared();
    let inner = Env::new_with_parent(outer.clone());

    outer.borrow_mut().set("late".to_owned(), Object::Boolean(true));

    assert_eq!(inner.get("late"), Some(Object::Boolean(true)));
  }
}
