use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use tracing::trace;

use crate::ast::{BlockStatement, Expression, Identifier, InfixOperator, PrefixOperator, Program, Statement};
use crate::env::Env;
use crate::object::{Function, Object};

/// Tree-walking evaluator.
///
/// Runtime failures are ordinary [`Object::Error`] values and `return` is an
/// [`Object::ReturnValue`] wrapper; both stop every enclosing block until a
/// function call (or the program) absorbs them.
#[derive(Debug)]
pub struct Evaluator {
  env: Rc<RefCell<Env>>,
}

impl Default for Evaluator {
  fn default() -> Self {
    Evaluator::new(Env::new().shared())
  }
}

impl Evaluator {
  pub fn new(env: Rc<RefCell<Env>>) -> Self {
    Evaluator {
      env
    }
  }

  pub fn env(&self) -> &Rc<RefCell<Env>> {
    &self.env
  }

  fn error(msg: String) -> Object {
    Object::Error(msg)
  }

  // Errors and return signals both abort the surrounding evaluation.
  fn is_signal(obj: &Object) -> bool {
    matches!(obj, Object::Error(_) | Object::ReturnValue(_))
  }

  /// Runs a program in this evaluator's environment. `None` means the
  /// program produced no value: it was empty or ended with a `let`.
  pub fn eval(&mut self, program: &Program) -> Option<Object> {
    let mut result = None;

    for statement in &program.statements {
      match self.eval_statement(statement) {
        Some(Object::ReturnValue(value)) => return Some(*value),
        Some(Object::Error(message)) => return Some(Object::Error(message)),
        obj => result = obj,
      }
    }

    result
  }

  fn eval_block_statement(&mut self, block: &BlockStatement) -> Option<Object> {
    let mut result = None;

    for statement in &block.statements {
      match self.eval_statement(statement) {
        Some(obj) if Self::is_signal(&obj) => return Some(obj),
        obj => result = obj,
      }
    }

    result
  }

  fn eval_statement(&mut self, statement: &Statement) -> Option<Object> {
    match statement {
      Statement::Let { name, value } => {
        let value = self.eval_expression(value);

        if Self::is_signal(&value) {
          Some(value)
        } else {
          self.env.borrow_mut().set(name.0.clone(), value);
          None
        }
      }
      Statement::Return(expression) => {
        let value = self.eval_expression(expression);

        if Self::is_signal(&value) {
          Some(value)
        } else {
          Some(Object::ReturnValue(Box::new(value)))
        }
      }
      Statement::Expression(expression) => Some(self.eval_expression(expression)),
    }
  }

  fn eval_expression(&mut self, expression: &Expression) -> Object {
    match expression {
      Expression::Identifier(name) => self.eval_identifier(name),
      Expression::Integer(value) => Object::Integer(*value),
      Expression::Boolean(value) => Object::Boolean(*value),
      Expression::Prefix { operator, operand } => {
        let operand = self.eval_expression(operand);

        if Self::is_signal(&operand) {
          return operand;
        }

        Self::eval_prefix_expression(*operator, operand)
      }
      Expression::Infix { left, operator, right } => {
        let left = self.eval_expression(left);
        if Self::is_signal(&left) {
          return left;
        }

        let right = self.eval_expression(right);
        if Self::is_signal(&right) {
          return right;
        }

        Self::eval_infix_expression(left, *operator, right)
      }
      Expression::If { condition, consequence, alternative } => {
        self.eval_if_expression(condition, consequence, alternative.as_ref())
      }
      Expression::Function { parameters, body } => Object::Function(Function {
        parameters: parameters.clone(),
        body: body.clone(),
        env: Rc::clone(&self.env),
      }),
      Expression::Call { function, arguments } => self.eval_call_expression(function, arguments),
    }
  }

  fn eval_identifier(&self, name: &Identifier) -> Object {
    match self.env.borrow().get(&name.0) {
      Some(object) => object,
      None => Self::error(format!("identifier not found: {}", name)),
    }
  }

  fn eval_prefix_expression(op: PrefixOperator, operand: Object) -> Object {
    match op {
      PrefixOperator::Not => Object::Boolean(!operand.is_truthy()),
      PrefixOperator::Negate => match operand {
        Object::Integer(value) => Object::Integer(value.wrapping_neg()),
        _ => Self::error(format!("unknown operator: {}{}", op, operand.type_name())),
      },
    }
  }

  fn eval_infix_expression(left: Object, op: InfixOperator, right: Object) -> Object {
    match (&left, &right) {
      (Object::Integer(left), Object::Integer(right)) => Self::eval_integer_infix_expression(*left, op, *right),
      (Object::Boolean(left), Object::Boolean(right)) => match op {
        InfixOperator::Equal => Object::Boolean(left == right),
        InfixOperator::NotEqual => Object::Boolean(left != right),
        _ => Self::error(format!("unknown operator: BOOLEAN {} BOOLEAN", op)),
      },
      _ if left.type_name() != right.type_name() => {
        Self::error(format!("type mismatch: {} {} {}", left.type_name(), op, right.type_name()))
      }
      _ => Self::error(format!("unknown operator: {} {} {}", left.type_name(), op, right.type_name())),
    }
  }

  // Fixed-width two's complement: overflow wraps and division truncates
  // toward zero.
  fn eval_integer_infix_expression(left: i64, op: InfixOperator, right: i64) -> Object {
    match op {
      InfixOperator::Add => Object::Integer(left.wrapping_add(right)),
      InfixOperator::Subtract => Object::Integer(left.wrapping_sub(right)),
      InfixOperator::Multiply => Object::Integer(left.wrapping_mul(right)),
      InfixOperator::Divide if right == 0 => Self::error("division by zero".to_owned()),
      InfixOperator::Divide => Object::Integer(left.wrapping_div(right)),
      InfixOperator::Less => Object::Boolean(left < right),
      InfixOperator::Greater => Object::Boolean(left > right),
      InfixOperator::Equal => Object::Boolean(left == right),
      InfixOperator::NotEqual => Object::Boolean(left != right),
    }
  }

  fn eval_if_expression(
    &mut self,
    condition: &Expression,
    consequence: &BlockStatement,
    alternative: Option<&BlockStatement>,
  ) -> Object {
    let condition = self.eval_expression(condition);

    if Self::is_signal(&condition) {
      return condition;
    }

    let branch = if condition.is_truthy() {
      consequence
    } else {
      match alternative {
        Some(alternative) => alternative,
        None => return Object::Null,
      }
    };

    let scope = Env::new_with_parent(Rc::clone(&self.env)).shared();
    self.eval_block_in(branch, scope).unwrap_or(Object::Null)
  }

  fn eval_call_expression(&mut self, function: &Expression, arguments: &[Expression]) -> Object {
    let callee = self.eval_expression(function);

    if Self::is_signal(&callee) {
      return callee;
    }

    let mut args = Vec::with_capacity(arguments.len());

    for argument in arguments {
      let value = self.eval_expression(argument);

      if Self::is_signal(&value) {
        return value;
      }

      args.push(value);
    }

    self.apply_function(callee, args)
  }

  /// Calls `callee` with already-evaluated arguments. Arity is not checked:
  /// missing parameters stay unbound and extra arguments are dropped.
  pub fn apply_function(&mut self, callee: Object, args: Vec<Object>) -> Object {
    let function = match callee {
      Object::Function(function) => function,
      other => return Self::error(format!("not a function: {}", other.type_name())),
    };

    trace!(parameters = function.parameters.len(), arguments = args.len(), "calling function");

    let mut scope = Env::new_with_parent(Rc::clone(&function.env));
    for (parameter, arg) in function.parameters.iter().zip(args) {
      scope.set(parameter.0.clone(), arg);
    }

    match self.eval_block_in(&function.body, scope.shared()) {
      Some(Object::ReturnValue(value)) => *value,
      Some(obj) => obj,
      None => Object::Null,
    }
  }

  fn eval_block_in(&mut self, block: &BlockStatement, env: Rc<RefCell<Env>>) -> Option<Object> {
    let previous = mem::replace(&mut self.env, env);
    let result = self.eval_block_statement(block);
    self.env = previous;
    result
  }
}

/// Evaluates `program` against `env`; see [`Evaluator::eval`].
pub fn eval(program: &Program, env: Rc<RefCell<Env>>) -> Option<Object> {
  Evaluator::new(env).eval(program)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use proptest::prelude::*;

  use super::Evaluator;
  use crate::env::Env;
  use crate::lexer::Lexer;
  use crate::object::Object;
  use crate::parser::parse;

  fn eval(input: &str) -> Option<Object> {
    let (program, errors) = parse(Lexer::new(input).lex());
    assert!(errors.is_empty(), "unexpected parse errors for {:?}: {:?}", input, errors);

    let mut evaluator = Evaluator::new(Env::new().shared());
    evaluator.eval(&program)
  }

  fn inspect(input: &str) -> String {
    eval(input).map(|obj| obj.to_string()).unwrap_or_default()
  }

  #[test]
  fn literals() {
    assert_eq!(eval("5"), Some(Object::Integer(5)));
    assert_eq!(eval("10;"), Some(Object::Integer(10)));
    assert_eq!(eval("true"), Some(Object::Boolean(true)));
    assert_eq!(eval("false"), Some(Object::Boolean(false)));
    assert_eq!(eval(""), None);
  }

  #[test]
  fn bang_operator() {
    let cases = [
      ("!true", false),
      ("!false", true),
      ("!5", false),
      ("!!true", true),
      ("!!false", false),
      ("!!5", true),
      ("!!0", true),
      ("!fn(x) { x }", false),
      ("!if (false) { 1 }", true),
    ];

    for (input, expected) in cases {
      assert_eq!(eval(input), Some(Object::Boolean(expected)), "{}", input);
    }
  }

  #[test]
  fn integer_arithmetic() {
    let cases = [
      ("-5", -5),
      ("--5", 5),
      ("5 + 5 + 5 + 5 - 10", 10),
      ("2 * 2 * 2 * 2 * 2", 32),
      ("-50 + 100 + -50", 0),
      ("5 * 2 + 10", 20),
      ("5 + 2 * 10", 25),
      ("50 / 2 * 2 + 10", 60),
      ("2 * (5 + 10)", 30),
      ("3 * (3 * 3) + 10", 37),
      ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
      ("-7 / 2", -3),
      ("7 / -2", -3),
      ("5 / 5 / -5", 0),
      ("9223372036854775807 + 1", i64::MIN),
    ];

    for (input, expected) in cases {
      assert_eq!(eval(input), Some(Object::Integer(expected)), "{}", input);
    }
  }

  #[test]
  fn comparisons() {
    let cases = [
      ("1 < 2", true),
      ("1 > 2", false),
      ("1 == 1", true),
      ("1 != 1", false),
      ("true == true", true),
      ("false == false", true),
      ("true == false", false),
      ("true != false", true),
      ("false != true", true),
      ("(1 < 2) == true", true),
      ("(1 < 2) == false", false),
      ("(1 > 2) == true", false),
      ("(1 > 2) == false", true),
    ];

    for (input, expected) in cases {
      assert_eq!(eval(input), Some(Object::Boolean(expected)), "{}", input);
    }
  }

  #[test]
  fn if_expressions() {
    assert_eq!(eval("if (true) { 10 }"), Some(Object::Integer(10)));
    assert_eq!(eval("if (false) { 10 }"), Some(Object::Null));
    assert_eq!(eval("if (1) { 10 }"), Some(Object::Integer(10)));
    assert_eq!(eval("if (0) { 10 }"), Some(Object::Integer(10)));
    assert_eq!(eval("if (1 < 2) { 10 }"), Some(Object::Integer(10)));
    assert_eq!(eval("if (1 > 2) { 10 }"), Some(Object::Null));
    assert_eq!(eval("if (1 > 2) { 10 } else { 20 }"), Some(Object::Integer(20)));
    assert_eq!(eval("if (1 < 2) { 10 } else { 20 }"), Some(Object::Integer(10)));
    assert_eq!(eval("if (true) { }"), Some(Object::Null));
    assert_eq!(eval("if (true) { let a = 1; }"), Some(Object::Null));
  }

  #[test]
  fn if_branches_get_their_own_scope() {
    assert_eq!(inspect("let x = 1; if (true) { let x = 2; x }"), "2");
    assert_eq!(inspect("let x = 1; if (true) { let x = 2; }; x"), "1");
    assert_eq!(inspect("if (true) { let y = 2; }; y"), "ERROR: identifier not found: y");
  }

  #[test]
  fn return_statements() {
    let cases = [
      ("return 10;", 10),
      ("return 10; 9;", 10),
      ("return 2 * 5; 9;", 10),
      ("9; return 2 * 5; 9;", 10),
      ("if (10 > 1) { if (10 > 1) { return 10; } return 1; }", 10),
      ("let f = fn() { if (true) { return 1; } return 2; }; f() + 10", 11),
    ];

    for (input, expected) in cases {
      assert_eq!(eval(input), Some(Object::Integer(expected)), "{}", input);
    }
  }

  #[test]
  fn return_inside_an_operand_unwinds_the_call() {
    assert_eq!(inspect("let f = fn() { 1 + if (true) { return 5; }; 99 }; f()"), "5");
    assert_eq!(inspect("let g = fn(a) { a }; let f = fn() { g(if (true) { return 7; }) }; f()"), "7");
  }

  #[test]
  fn error_handling() {
    let cases = [
      ("5 + true;", "type mismatch: INTEGER + BOOLEAN"),
      ("5 + true; 5;", "type mismatch: INTEGER + BOOLEAN"),
      ("5 < 10 > 5", "type mismatch: BOOLEAN > INTEGER"),
      ("-true", "unknown operator: -BOOLEAN"),
      ("true + false;", "unknown operator: BOOLEAN + BOOLEAN"),
      ("true < false;", "unknown operator: BOOLEAN < BOOLEAN"),
      ("5; true + false; 5", "unknown operator: BOOLEAN + BOOLEAN"),
      ("if (10 > 1) { true + false; }", "unknown operator: BOOLEAN + BOOLEAN"),
      ("if (10 > 1) { if (10 > 1) { return true + false; } return 1; }", "unknown operator: BOOLEAN + BOOLEAN"),
      ("foobar", "identifier not found: foobar"),
      ("-fn() { 1 }", "unknown operator: -FUNCTION"),
      ("fn() { 1 } + fn() { 1 }", "unknown operator: FUNCTION + FUNCTION"),
      ("if (false) { 1 } == 1", "type mismatch: NULL == INTEGER"),
      ("5(1)", "not a function: INTEGER"),
      ("true()", "not a function: BOOLEAN"),
      ("1 / 0", "division by zero"),
      ("let x = foo; 5", "identifier not found: foo"),
    ];

    for (input, expected) in cases {
      assert_eq!(eval(input), Some(Object::Error(expected.to_owned())), "{}", input);
    }
  }

  #[test]
  fn left_error_short_circuits_the_right_operand() {
    assert_eq!(inspect("missing + undefined"), "ERROR: identifier not found: missing");
    assert_eq!(inspect("(1 + true) + missing"), "ERROR: type mismatch: INTEGER + BOOLEAN");
  }

  #[test]
  fn argument_errors_stop_evaluation() {
    assert_eq!(inspect("let f = fn(a, b) { a }; f(first, second)"), "ERROR: identifier not found: first");
    assert_eq!(inspect("nope(missing)"), "ERROR: identifier not found: nope");
  }

  #[test]
  fn let_statements() {
    assert_eq!(eval("let a = 5; a;"), Some(Object::Integer(5)));
    assert_eq!(eval("let a = 5 * 5; a;"), Some(Object::Integer(25)));
    assert_eq!(eval("let a = 5; let b = a; b;"), Some(Object::Integer(5)));
    assert_eq!(eval("let a = 5; let b = a; let c = a + b + 5; c;"), Some(Object::Integer(15)));
    assert_eq!(eval("let x = 5; let x = 10; x"), Some(Object::Integer(10)));
    assert_eq!(eval("let x = 5;"), None);
    assert_eq!(eval("let x = 5; return x + 5;"), Some(Object::Integer(10)));
  }

  #[test]
  fn function_objects() {
    let inspected = inspect("fn(x) { x + 2; };");

    assert_eq!(inspected, "fn(x) {...}");
    match eval("fn(x) { x + 2; };") {
      Some(Object::Function(function)) => {
        assert_eq!(function.parameters.len(), 1);
        assert_eq!(function.body.to_string(), "{ (x + 2) }");
      }
      other => panic!("expected a function, got {:?}", other),
    }
  }

  #[test]
  fn function_application() {
    let cases = [
      ("let identity = fn(x) { x; }; identity(5);", 5),
      ("let identity = fn(x) { return x; }; identity(5);", 5),
      ("let double = fn(x) { x * 2; }; double(5);", 10),
      ("let add = fn(x, y) { x + y; }; add(5, 5);", 10),
      ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", 20),
      ("fn(x) { x; }(5)", 5),
      ("let f = fn(x) { let x = 10; x + 2; }; f(5);", 12),
      ("let x = 1; let f = fn(x) { x + 2; }; f(5);", 7),
      ("let x = 1; let f = fn(x) { x + 2; }; f(5); x", 1),
    ];

    for (input, expected) in cases {
      assert_eq!(eval(input), Some(Object::Integer(expected)), "{}", input);
    }
  }

  #[test]
  fn empty_body_and_trailing_let_yield_null() {
    assert_eq!(eval("fn() { }()"), Some(Object::Null));
    assert_eq!(eval("fn() { let a = 1; }()"), Some(Object::Null));
  }

  #[test]
  fn arity_is_permissive() {
    assert_eq!(eval("fn(a, b) { a }(1)"), Some(Object::Integer(1)));
    assert_eq!(inspect("fn(a, b) { b }(1)"), "ERROR: identifier not found: b");
    assert_eq!(eval("fn(a) { a }(1, 2, 3)"), Some(Object::Integer(1)));
  }

  #[test]
  fn closures() {
    let input = "let newAdder = fn(x) { fn(y) { x + y }; };
      let addTwo = newAdder(2);
      addTwo(2);";

    assert_eq!(eval(input), Some(Object::Integer(4)));
  }

  #[test]
  fn closures_see_later_bindings_of_their_scope() {
    assert_eq!(inspect("let f = fn() { late }; let late = 3; f()"), "3");
    assert_eq!(inspect("let n = 1; let f = fn() { n }; let n = 2; f()"), "2");
  }

  #[test]
  fn callee_scope_is_the_definition_scope_not_the_caller() {
    let input = "let x = 10;
      let get = fn() { x };
      let call = fn(x) { get() };
      call(99)";

    assert_eq!(eval(input), Some(Object::Integer(10)));
  }

  #[test]
  fn recursive_functions() {
    let input = "let fact = fn(n) { if (n < 2) { 1 } else { n * fact(n - 1) } }; fact(10)";
    let fib = "let fib = fn(n) { if (n < 2) { return n; } fib(n - 1) + fib(n - 2) }; fib(15)";

    assert_eq!(eval(input), Some(Object::Integer(3628800)));
    assert_eq!(eval(fib), Some(Object::Integer(610)));
  }

  #[test]
  fn environment_persists_between_programs() {
    let mut evaluator = Evaluator::default();

    let (first, _) = parse(Lexer::new("let counter = fn(x) { x + 1 };").lex());
    let (second, _) = parse(Lexer::new("counter(41)").lex());

    assert_eq!(evaluator.eval(&first), None);
    assert_eq!(evaluator.eval(&second), Some(Object::Integer(42)));
    assert!(evaluator.env().borrow().get("counter").is_some());
  }

  #[test]
  fn apply_function_rejects_non_functions() {
    let mut evaluator = Evaluator::default();

    assert_eq!(
      evaluator.apply_function(Object::Null, vec![]),
      Object::Error("not a function: NULL".to_owned())
    );
  }

  proptest! {
    #[test]
    fn integer_literals_evaluate_to_themselves(n in 0..=i64::MAX) {
      prop_assert_eq!(eval(&n.to_string()), Some(Object::Integer(n)));
    }

    #[test]
    fn bang_always_yields_a_boolean(n in (i64::MIN + 1)..=i64::MAX, b in any::<bool>()) {
      for input in [format!("!({})", n), format!("!{}", b), "!fn() { 0 }".to_owned(), "!if (false) { 0 }".to_owned()] {
        prop_assert!(matches!(eval(&input), Some(Object::Boolean(_))), "{}", input);
      }
    }

    #[test]
    fn double_bang_matches_truthiness(n in (i64::MIN + 1)..=i64::MAX) {
      prop_assert_eq!(eval(&format!("!!({})", n)), Some(Object::Boolean(true)));
    }

    #[test]
    fn division_truncates_toward_zero(a in -10_000i64..10_000, b in -100i64..100) {
      prop_assume!(b != 0);
      let quotient = eval(&format!("({}) / ({})", a, b));
      prop_assert_eq!(quotient, Some(Object::Integer(a / b)));
      prop_assert_eq!(eval(&format!("({}) / ({}) * ({}) + ({})", a, b, b, a % b)), Some(Object::Integer(a)));
    }
  }
}
