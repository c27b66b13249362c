use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::ast::{BlockStatement, Expression, Identifier, InfixOperator, PrefixOperator, Program, Statement};
use crate::token::{Token, TokenKind};

/// Binding strength of an operator; higher binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

impl Precedence {
    pub fn of(kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equals,
            TokenKind::Less | TokenKind::Greater => Precedence::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Star | TokenKind::Slash => Precedence::Product,
            TokenKind::LeftParen => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected next token to be {expected}, got {found} instead")]
    UnexpectedToken { expected: TokenKind, found: Token },
    #[error("no parse rule for {0}")]
    NoPrefixRule(Token),
    #[error("could not parse {0} as integer")]
    InvalidInteger(String),
}

type PrefixParseFn = fn(&mut Parser) -> Option<Expression>;
type InfixParseFn = fn(&mut Parser, Expression) -> Option<Expression>;

fn infix_operator(kind: TokenKind) -> Option<InfixOperator> {
    match kind {
        TokenKind::Plus => Some(InfixOperator::Add),
        TokenKind::Minus => Some(InfixOperator::Subtract),
        TokenKind::Star => Some(InfixOperator::Multiply),
        TokenKind::Slash => Some(InfixOperator::Divide),
        TokenKind::Less => Some(InfixOperator::Less),
        TokenKind::Greater => Some(InfixOperator::Greater),
        TokenKind::EqualEqual => Some(InfixOperator::Equal),
        TokenKind::BangEqual => Some(InfixOperator::NotEqual),
        _ => None,
    }
}

/// Pratt parser over a token sequence terminated by `Eof`.
///
/// Syntax errors never abort parsing: they are collected and the parser
/// skips ahead to the next statement boundary. Check [`Parser::errors`]
/// before evaluating the returned program.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    errors: Vec<ParseError>,
    prefix_rules: HashMap<TokenKind, PrefixParseFn>,
    infix_rules: HashMap<TokenKind, InfixParseFn>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|token| token.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map(|token| token.span.1).unwrap_or(0);
            tokens.push(Token::eof(end));
        }

        let mut prefix_rules: HashMap<TokenKind, PrefixParseFn> = HashMap::new();
        prefix_rules.insert(TokenKind::Identifier, Parser::parse_identifier);
        prefix_rules.insert(TokenKind::Integer, Parser::parse_integer);
        prefix_rules.insert(TokenKind::True, Parser::parse_boolean);
        prefix_rules.insert(TokenKind::False, Parser::parse_boolean);
        prefix_rules.insert(TokenKind::Bang, Parser::parse_prefix_expression);
        prefix_rules.insert(TokenKind::Minus, Parser::parse_prefix_expression);
        prefix_rules.insert(TokenKind::LeftParen, Parser::parse_grouped_expression);
        prefix_rules.insert(TokenKind::If, Parser::parse_if_expression);
        prefix_rules.insert(TokenKind::Fn, Parser::parse_function_literal);

        let mut infix_rules: HashMap<TokenKind, InfixParseFn> = HashMap::new();
        for kind in [
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::EqualEqual,
            TokenKind::BangEqual,
        ] {
            infix_rules.insert(kind, Parser::parse_infix_expression);
        }
        infix_rules.insert(TokenKind::LeftParen, Parser::parse_call_expression);

        Parser {
            tokens,
            position: 0,
            errors: Vec::new(),
            prefix_rules,
            infix_rules,
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.current_is(TokenKind::Eof) {
            let start = self.position;
            match self.parse_statement() {
                Some(statement) => program.statements.push(statement),
                None => {
                    self.synchronize(start);
                }
            }
            self.next_token();
        }

        program
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + 1).min(last)]
    }

    fn next_token(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek().kind)
    }

    fn current_precedence(&self) -> Precedence {
        Precedence::of(self.current().kind)
    }

    fn error(&mut self, error: ParseError) {
        debug!(%error, "syntax error");
        self.errors.push(error);
    }

    /// Advances onto the peek token if it has the expected kind, otherwise
    /// records an error and stays put.
    fn expect_peek(&mut self, kind: TokenKind) -> Option<()> {
        if self.peek_is(kind) {
            self.next_token();
            Some(())
        } else {
            let found = self.peek().clone();
            self.error(ParseError::UnexpectedToken { expected: kind, found });
            None
        }
    }

    // Leaves the cursor on the last token of the broken statement so the
    // caller's `next_token` lands on the start of the next one. Braces opened
    // since `start` are skipped as a unit; returns `true` when the cursor
    // stopped on the `}` that closes the enclosing block.
    fn synchronize(&mut self, start: usize) -> bool {
        let mut depth = self.tokens[start..=self.position]
            .iter()
            .fold(0i32, |depth, token| match token.kind {
                TokenKind::LeftBrace => depth + 1,
                TokenKind::RightBrace => depth - 1,
                _ => depth,
            });

        loop {
            if self.current_is(TokenKind::RightBrace) && depth < 0 {
                return true;
            }
            if self.current_is(TokenKind::Eof) {
                return false;
            }
            if depth <= 0
                && (self.current_is(TokenKind::Semicolon)
                    || self.peek_is(TokenKind::RightBrace)
                    || self.peek_is(TokenKind::Eof))
            {
                return false;
            }

            self.next_token();
            match self.current().kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth -= 1,
                _ => {}
            }
        }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current().kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn skip_semicolon(&mut self) {
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
    }

    fn parse_let_statement(&mut self) -> Option<Statement> {
        self.expect_peek(TokenKind::Identifier)?;
        let name = Identifier(self.current().slice.clone());

        self.expect_peek(TokenKind::Equal)?;
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Expression(value))
    }

    fn parse_block_statement(&mut self) -> Option<BlockStatement> {
        let mut block = BlockStatement::default();
        self.next_token();

        while !self.current_is(TokenKind::RightBrace) {
            if self.current_is(TokenKind::Eof) {
                let found = self.current().clone();
                self.error(ParseError::UnexpectedToken { expected: TokenKind::RightBrace, found });
                return None;
            }

            let start = self.position;
            match self.parse_statement() {
                Some(statement) => block.statements.push(statement),
                None if self.synchronize(start) => continue,
                None => {}
            }
            self.next_token();
        }

        Some(block)
    }

    pub fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let prefix = match self.prefix_rules.get(&self.current().kind) {
            Some(rule) => *rule,
            None => {
                let token = self.current().clone();
                self.error(ParseError::NoPrefixRule(token));
                return None;
            }
        };

        let mut left = prefix(self)?;

        while !self.peek_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            let infix = match self.infix_rules.get(&self.peek().kind) {
                Some(rule) => *rule,
                None => return Some(left),
            };

            self.next_token();
            left = infix(self, left)?;
        }

        Some(left)
    }

    fn parse_identifier(&mut self) -> Option<Expression> {
        Some(Expression::Identifier(Identifier(self.current().slice.clone())))
    }

    fn parse_integer(&mut self) -> Option<Expression> {
        let literal = self.current().slice.clone();

        match literal.parse::<i64>() {
            Ok(value) => Some(Expression::Integer(value)),
            Err(_) => {
                self.error(ParseError::InvalidInteger(literal));
                None
            }
        }
    }

    fn parse_boolean(&mut self) -> Option<Expression> {
        Some(Expression::Boolean(self.current_is(TokenKind::True)))
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        let operator = match self.current().kind {
            TokenKind::Bang => PrefixOperator::Not,
            _ => PrefixOperator::Negate,
        };
        self.next_token();

        let operand = self.parse_expression(Precedence::Prefix)?;

        Some(Expression::Prefix { operator, operand: Box::new(operand) })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();

        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;

        Some(expression)
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        self.expect_peek(TokenKind::LeftParen)?;
        self.next_token();

        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;
        self.expect_peek(TokenKind::LeftBrace)?;

        let consequence = self.parse_block_statement()?;

        let alternative = if self.peek_is(TokenKind::Else) {
            self.next_token();
            self.expect_peek(TokenKind::LeftBrace)?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Some(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        self.expect_peek(TokenKind::LeftParen)?;

        let parameters = self.parse_function_parameters()?;
        self.expect_peek(TokenKind::LeftBrace)?;

        let body = self.parse_block_statement()?;

        Some(Expression::Function { parameters, body })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut parameters = Vec::new();

        if self.peek_is(TokenKind::RightParen) {
            self.next_token();
            return Some(parameters);
        }

        self.expect_peek(TokenKind::Identifier)?;
        parameters.push(Identifier(self.current().slice.clone()));

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.expect_peek(TokenKind::Identifier)?;
            parameters.push(Identifier(self.current().slice.clone()));
        }

        self.expect_peek(TokenKind::RightParen)?;

        Some(parameters)
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Option<Expression> {
        // Only registered for operator tokens, so the lookup cannot miss.
        let operator = infix_operator(self.current().kind)?;
        let precedence = self.current_precedence();
        self.next_token();

        let right = self.parse_expression(precedence)?;

        Some(Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let arguments = self.parse_expression_list(TokenKind::RightParen)?;

        Some(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut list = Vec::new();

        if self.peek_is(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;

        Some(list)
    }
}

/// Parses a whole token sequence, returning the program together with every
/// syntax error found. An empty error list means the program is safe to run.
pub fn parse(tokens: Vec<Token>) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    (program, parser.into_errors())
}
