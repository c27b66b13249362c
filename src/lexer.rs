use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::token::{Span, Token, TokenKind};

// Two-character operators come first so `==` is never split into `=` `=`.
// The trailing `.` catches anything else, which keeps the matches contiguous.
const TOKEN_PATTERN: &str = r"(?s)(?P<space>\s+)|(?P<integer>[0-9]+)|(?P<word>[A-Za-z_][A-Za-z0-9_]*)|(?P<operator>==|!=|[=+\-!*/<>,;(){}])|(?P<illegal>.)";

fn token_regex() -> &'static Regex {
  static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
  TOKEN_REGEX.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"))
}

fn operator_kind(operator: &str) -> TokenKind {
  match operator {
    "==" => TokenKind::EqualEqual,
    "!=" => TokenKind::BangEqual,
    "=" => TokenKind::Equal,
    "+" => TokenKind::Plus,
    "-" => TokenKind::Minus,
    "!" => TokenKind::Bang,
    "*" => TokenKind::Star,
    "/" => TokenKind::Slash,
    "<" => TokenKind::Less,
    ">" => TokenKind::Greater,
    "," => TokenKind::Comma,
    ";" => TokenKind::Semicolon,
    "(" => TokenKind::LeftParen,
    ")" => TokenKind::RightParen,
    "{" => TokenKind::LeftBrace,
    "}" => TokenKind::RightBrace,
    _ => TokenKind::Illegal,
  }
}

pub struct Lexer<'a> {
  source: &'a str,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Self {
    Lexer { source }
  }

  /// Splits the whole source into tokens. The result always ends with a
  /// single `Eof` token; characters the language does not know become
  /// `Illegal` tokens and are left for the parser to report.
  pub fn lex(self) -> Vec<Token> {
    let mut tokens = Vec::new();

    for captures in token_regex().captures_iter(self.source) {
      if let Some(token) = Self::token(&captures) {
        tokens.push(token);
      }
    }

    tokens.push(Token::eof(self.source.len()));
    tokens
  }

  fn token(captures: &Captures) -> Option<Token> {
    let (kind, matched) = if captures.name("space").is_some() {
      return None;
    } else if let Some(matched) = captures.name("integer") {
      (TokenKind::Integer, matched)
    } else if let Some(matched) = captures.name("word") {
      (TokenKind::keyword(matched.as_str()).unwrap_or(TokenKind::Identifier), matched)
    } else if let Some(matched) = captures.name("operator") {
      (operator_kind(matched.as_str()), matched)
    } else {
      (TokenKind::Illegal, captures.name("illegal")?)
    };

    Some(Token::new(kind, matched.as_str().to_owned(), Span(matched.start(), matched.end())))
  }
}
