use std::fmt;

use super::input_source::InputPosition;

/// Represents a particular kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Variable-character tokens
    Number,         // integer or float literal
    Ident,          // regular identifier
    // Keywords
    If,
    Else,
    While,
    Continue,
    Break,
    Var,
    Func,
    Entry,
    Return,
    // Punctuation
    OpenCurly,      // {
    CloseCurly,     // }
    OpenSquare,     // [
    CloseSquare,    // ]
    OpenParen,      // (
    CloseParen,     // )
    SemiColon,      // ;
    Comma,          // ,
    // Operators
    Plus,           // +
    Minus,          // -
    Star,           // *
    Slash,          // /
    Equal,          // =
    OpenAngle,      // <
    CloseAngle,     // >
    EqualEqual,     // ==
    NotEqual,       // !=
}

impl TokenKind {
    /// Returns the characters that are represented by the token. Tokens of
    /// variable length are described by their category instead.
    pub fn token_chars(&self) -> &'static str {
        use TokenKind as TK;
        match self {
            TK::Number => "number",
            TK::Ident => "identifier",
            TK::If => "if",
            TK::Else => "else",
            TK::While => "while",
            TK::Continue => "continue",
            TK::Break => "break",
            TK::Var => "var",
            TK::Func => "func",
            TK::Entry => "entry",
            TK::Return => "return",
            TK::OpenCurly => "{",
            TK::CloseCurly => "}",
            TK::OpenSquare => "[",
            TK::CloseSquare => "]",
            TK::OpenParen => "(",
            TK::CloseParen => ")",
            TK::SemiColon => ";",
            TK::Comma => ",",
            TK::Plus => "+",
            TK::Minus => "-",
            TK::Star => "*",
            TK::Slash => "/",
            TK::Equal => "=",
            TK::OpenAngle => "<",
            TK::CloseAngle => ">",
            TK::EqualEqual => "==",
            TK::NotEqual => "!=",
        }
    }
}

/// Value of a number token.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => {
                // always keep the decimal point, so the value reads back as a float
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
        }
    }
}

/// A single token at a particular position. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub lexeme: String,
    pub kind: TokenKind,
    pub value: Option<Literal>,
    pub pos: InputPosition,
}

impl Token {
    pub fn new(lexeme: &str, kind: TokenKind, value: Option<Literal>, pos: InputPosition) -> Self {
        Self { lexeme: lexeme.to_string(), kind, value, pos }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(\"{}\", {:?}", self.lexeme, self.kind)?;
        if let Some(value) = &self.value {
            write!(f, ", {}", value)?;
        }
        write!(f, ", at {})", self.pos)
    }
}
