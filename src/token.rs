use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  LeftParen,
  RightParen,
  LeftBrace,
  RightBrace,

  Comma,
  Semicolon,

  Equal,
  EqualEqual,
  Bang,
  BangEqual,
  Greater,
  Less,

  Plus,
  Minus,
  Star,
  Slash,

  Identifier,
  Integer,
  True,
  False,

  Let,
  Fn,
  If,
  Else,
  Return,

  Illegal,
  Eof,
}

impl TokenKind {
  pub fn keyword(ident: &str) -> Option<TokenKind> {
    match ident {
      "fn" => Some(TokenKind::Fn),
      "let" => Some(TokenKind::Let),
      "true" => Some(TokenKind::True),
      "false" => Some(TokenKind::False),
      "if" => Some(TokenKind::If),
      "else" => Some(TokenKind::Else),
      "return" => Some(TokenKind::Return),
      _ => None,
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      TokenKind::LeftParen => "(",
      TokenKind::RightParen => ")",
      TokenKind::LeftBrace => "{",
      TokenKind::RightBrace => "}",
      TokenKind::Comma => ",",
      TokenKind::Semicolon => ";",
      TokenKind::Equal => "=",
      TokenKind::EqualEqual => "==",
      TokenKind::Bang => "!",
      TokenKind::BangEqual => "!=",
      TokenKind::Greater => ">",
      TokenKind::Less => "<",
      TokenKind::Plus => "+",
      TokenKind::Minus => "-",
      TokenKind::Star => "*",
      TokenKind::Slash => "/",
      TokenKind::Identifier => "identifier",
      TokenKind::Integer => "integer",
      TokenKind::True => "true",
      TokenKind::False => "false",
      TokenKind::Let => "let",
      TokenKind::Fn => "fn",
      TokenKind::If => "if",
      TokenKind::Else => "else",
      TokenKind::Return => "return",
      TokenKind::Illegal => "illegal",
      TokenKind::Eof => "end of input",
    };

    f.write_str(text)
  }
}

/// Byte offsets of a token in its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span(pub usize, pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub slice: String,
  pub span: Span,
}

impl Token {
  pub fn new(kind: TokenKind, slice: String, span: Span) -> Token {
    Token {
      kind,
      slice,
      span,
    }
  }

  pub fn eof(at: usize) -> Token {
    Token::new(TokenKind::Eof, String::new(), Span(at, at))
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      TokenKind::Eof => write!(f, "{}", self.kind),
      _ => write!(f, "{}", self.slice),
    }
  }
}
