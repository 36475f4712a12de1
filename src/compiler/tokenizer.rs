use crate::common::*;
use super::input_source::*;
use super::tokens::*;

lazy_static::lazy_static! {
    static ref KEYWORDS: HashMap<&'static [u8], TokenKind> = hashmap! {
        &b"if"[..] => TokenKind::If,
        &b"else"[..] => TokenKind::Else,
        &b"while"[..] => TokenKind::While,
        &b"continue"[..] => TokenKind::Continue,
        &b"break"[..] => TokenKind::Break,
        &b"var"[..] => TokenKind::Var,
        &b"func"[..] => TokenKind::Func,
        &b"entry"[..] => TokenKind::Entry,
        &b"return"[..] => TokenKind::Return,
    };
}

fn is_whitespace(x: Option<u8>) -> bool {
    if let Some(c) = x {
        c == b' ' || c == b'\t' || c == b'\r' || c == b'\n'
    } else {
        false
    }
}

fn is_ident_start(x: Option<u8>) -> bool {
    if let Some(c) = x {
        c >= b'A' && c <= b'Z' || c >= b'a' && c <= b'z' || c == b'_'
    } else {
        false
    }
}

fn is_ident_rest(x: Option<u8>) -> bool {
    if let Some(c) = x {
        c >= b'A' && c <= b'Z' || c >= b'a' && c <= b'z' || c >= b'0' && c <= b'9' || c == b'_'
    } else {
        false
    }
}

fn is_digit(x: Option<u8>) -> bool {
    if let Some(c) = x {
        c >= b'0' && c <= b'9'
    } else {
        false
    }
}

/// Turns source text into the token stream consumed by the parser. Stateless
/// apart from the scanning position in the `InputSource`.
pub struct Tokenizer<'a> {
    source: &'a mut InputSource,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a mut InputSource) -> Self {
        Tokenizer { source }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ErrorReport> {
        let mut tokens = Vec::new();
        loop {
            self.consume_whitespace();
            if self.source.next().is_none() {
                break;
            }
            tokens.push(self.consume_token()?);
        }
        Ok(tokens)
    }

    fn error_at_pos(&self, pos: InputPosition, msg: &str) -> ErrorReport {
        ErrorReport::error(self.source, pos, msg)
    }

    fn consume_whitespace(&mut self) {
        while is_whitespace(self.source.next()) {
            self.source.consume();
        }
    }

    fn consume_token(&mut self) -> Result<Token, ErrorReport> {
        let next = self.source.next();
        if is_ident_start(next) {
            return Ok(self.consume_word());
        }
        if is_digit(next) {
            return self.consume_number();
        }

        let pos = self.source.pos();
        let c = match next {
            Some(c) => c,
            None => return Err(self.error_at_pos(pos, "unexpected end of input")),
        };
        let kind = match c {
            b'{' => TokenKind::OpenCurly,
            b'}' => TokenKind::CloseCurly,
            b'[' => TokenKind::OpenSquare,
            b']' => TokenKind::CloseSquare,
            b'(' => TokenKind::OpenParen,
            b')' => TokenKind::CloseParen,
            b';' => TokenKind::SemiColon,
            b',' => TokenKind::Comma,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'<' => TokenKind::OpenAngle,
            b'>' => TokenKind::CloseAngle,
            b'=' if self.source.lookahead(1) == Some(b'=') => TokenKind::EqualEqual,
            b'=' => TokenKind::Equal,
            b'!' if self.source.lookahead(1) == Some(b'=') => TokenKind::NotEqual,
            _ => return Err(self.error_at_pos(pos, &format!("unrecognized character '{}'", c as char))),
        };

        for _ in 0..kind.token_chars().len() {
            self.source.consume();
        }
        Ok(Token::new(kind.token_chars(), kind, None, pos))
    }

    fn consume_word(&mut self) -> Token {
        let pos = self.source.pos();
        while is_ident_rest(self.source.next()) {
            self.source.consume();
        }
        let end = self.source.pos();
        let word = self.source.section(pos.offset, end.offset);
        let kind = KEYWORDS.get(word).copied().unwrap_or(TokenKind::Ident);
        let lexeme = String::from_utf8_lossy(word).to_string();
        Token::new(&lexeme, kind, None, pos)
    }

    fn consume_number(&mut self) -> Result<Token, ErrorReport> {
        let pos = self.source.pos();
        while is_digit(self.source.next()) {
            self.source.consume();
        }
        let mut is_float = false;
        if self.source.next() == Some(b'.') && is_digit(self.source.lookahead(1)) {
            is_float = true;
            self.source.consume();
            while is_digit(self.source.next()) {
                self.source.consume();
            }
        }
        if is_ident_start(self.source.next()) {
            let bad = self.source.pos();
            return Err(self.error_at_pos(bad, "unexpected character in number literal"));
        }

        let end = self.source.pos();
        let lexeme = String::from_utf8_lossy(self.source.section(pos.offset, end.offset)).to_string();
        let value = if is_float {
            lexeme.parse::<f64>().map(Literal::Float).ok()
        } else {
            lexeme.parse::<i64>().map(Literal::Int).ok()
        };
        match value {
            Some(value) => Ok(Token::new(&lexeme, TokenKind::Number, Some(value), pos)),
            None => Err(self.error_at_pos(pos, "number literal is out of range")),
        }
    }
}

/// Convenience for producing the token stream of a string.
pub fn tokenize_str(text: &str) -> Result<Vec<Token>, ErrorReport> {
    let mut source = InputSource::from_string(text);
    Tokenizer::new(&mut source).tokenize()
}
