// ABOUTME: Byte-level tokenizer for littlelang source text

use crate::position::Position;
use crate::token::{Token, TokenKind};

/// Decodes the UTF-8 codepoint starting at `bytes[0]`.
///
/// Returns `Ok(None)` at end of input, `Ok(Some((ch, len)))` on a valid
/// codepoint, or `Err(leading_byte)` when the leading byte cannot start a
/// valid (and complete) UTF-8 sequence in the remaining bytes.
fn decode_char(bytes: &[u8]) -> Result<Option<(char, usize)>, u8> {
    let Some(&b0) = bytes.first() else {
        return Ok(None);
    };
    let len = if b0 < 0x80 {
        1
    } else if b0 & 0xE0 == 0xC0 {
        2
    } else if b0 & 0xF0 == 0xE0 {
        3
    } else if b0 & 0xF8 == 0xF0 {
        4
    } else {
        return Err(b0);
    };
    if bytes.len() < len {
        return Err(b0);
    }
    match std::str::from_utf8(&bytes[..len]) {
        Ok(s) => Ok(s.chars().next().map(|c| (c, len))),
        Err(_) => Err(b0),
    }
}

/// Streams source bytes into `Token`s, one codepoint of lookahead at a time.
pub struct Lexer<'a> {
    bytes: &'a [u8],
    offset: usize,
    ch: Option<char>,
    /// Position of `ch` (the current codepoint).
    pos: Position,
    /// Position the *next* codepoint will have once read.
    line: u32,
    column: u32,
    err: Option<String>,
}

impl<'a> Lexer<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        let mut lexer = Lexer {
            bytes,
            offset: 0,
            ch: None,
            pos: Position::start(),
            line: 1,
            column: 1,
            err: None,
        };
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) {
        if self.err.is_some() {
            self.ch = None;
            return;
        }
        match decode_char(&self.bytes[self.offset..]) {
            Ok(None) => self.ch = None,
            Ok(Some((c, len))) => {
                self.pos = Position {
                    line: self.line,
                    column: self.column,
                };
                self.ch = Some(c);
                self.offset += len;
                if c == '\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
            }
            Err(b0) => {
                self.pos = Position {
                    line: self.line,
                    column: self.column,
                };
                self.err = Some(format!("invalid UTF-8 byte 0x{b0:02x}"));
                self.ch = None;
            }
        }
    }

    /// Peeks the codepoint after `ch` without consuming it. Used only for
    /// the `//` comment lookahead; any decode error there is re-discovered
    /// (and latched) the next time `read_char` actually advances onto it.
    fn peek(&self) -> Option<char> {
        decode_char(&self.bytes[self.offset..]).ok().flatten().map(|(c, _)| c)
    }

    fn illegal(&self, message: impl Into<String>, position: Position) -> Token {
        Token::new(TokenKind::Illegal, message.into(), position)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.ch {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => self.read_char(),
                Some('/') if self.peek() == Some('/') => {
                    while !matches!(self.ch, None | Some('\n')) {
                        self.read_char();
                        if self.err.is_some() {
                            return;
                        }
                    }
                }
                _ => return,
            }
            if self.err.is_some() {
                return;
            }
        }
    }

    /// Returns the next token. Once an error has latched (invalid UTF-8,
    /// or a token-level error leaves `err` set) every subsequent call keeps
    /// returning `Illegal` at the same latched position.
    pub fn next_token(&mut self) -> Token {
        if let Some(err) = self.err.clone() {
            return self.illegal(err, self.pos);
        }

        self.skip_whitespace_and_comments();

        if let Some(err) = self.err.clone() {
            return self.illegal(err, self.pos);
        }

        let start_pos = self.pos;
        match self.ch {
            None => Token::new(TokenKind::Eof, "", start_pos),
            Some(c) if c == '_' || c.is_ascii_alphabetic() => self.read_identifier(start_pos),
            Some(c) if c.is_ascii_digit() => self.read_number(start_pos),
            Some('"') => self.read_string(start_pos),
            Some(c) => self.read_punct(c, start_pos),
        }
    }

    fn read_identifier(&mut self, start_pos: Position) -> Token {
        let mut s = String::new();
        while let Some(c) = self.ch {
            if c == '_' || c.is_ascii_alphanumeric() {
                s.push(c);
                self.read_char();
            } else {
                break;
            }
        }
        match TokenKind::keyword(&s) {
            Some(kind) => Token::new(kind, "", start_pos),
            None => Token::new(TokenKind::Name, s, start_pos),
        }
    }

    fn read_number(&mut self, start_pos: Position) -> Token {
        let mut s = String::new();
        while let Some(c) = self.ch {
            if c.is_ascii_digit() {
                s.push(c);
                self.read_char();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Int, s, start_pos)
    }

    fn read_string(&mut self, start_pos: Position) -> Token {
        self.read_char(); // consume opening quote
        let mut s = String::new();
        loop {
            match self.ch {
                None => {
                    if let Some(err) = self.err.clone() {
                        return self.illegal(err, self.pos);
                    }
                    return self.illegal("didn't find end quote in string", self.pos);
                }
                Some('"') => {
                    self.read_char();
                    return Token::new(TokenKind::Str, s, start_pos);
                }
                Some('\n') | Some('\r') => {
                    return self.illegal("can't have newline in string", self.pos);
                }
                Some('\\') => {
                    self.read_char();
                    match self.ch {
                        Some('"') => {
                            s.push('"');
                            self.read_char();
                        }
                        Some('\\') => {
                            s.push('\\');
                            self.read_char();
                        }
                        Some('t') => {
                            s.push('\t');
                            self.read_char();
                        }
                        Some('r') => {
                            s.push('\r');
                            self.read_char();
                        }
                        Some('n') => {
                            s.push('\n');
                            self.read_char();
                        }
                        Some(other) => {
                            return self.illegal(format!("invalid string escape \\{other}"), self.pos);
                        }
                        None => {
                            if let Some(err) = self.err.clone() {
                                return self.illegal(err, self.pos);
                            }
                            return self.illegal("didn't find end quote in string", self.pos);
                        }
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.read_char();
                }
            }
        }
    }

    fn read_punct(&mut self, c: char, start_pos: Position) -> Token {
        self.read_char(); // consume c
        match c {
            '=' => {
                if self.ch == Some('=') {
                    self.read_char();
                    Token::new(TokenKind::Eq, "", start_pos)
                } else {
                    Token::new(TokenKind::Assign, "", start_pos)
                }
            }
            '!' => {
                if self.ch == Some('=') {
                    self.read_char();
                    Token::new(TokenKind::NotEq, "", start_pos)
                } else {
                    let offending: String = self.ch.map(String::from).unwrap_or_default();
                    self.illegal(format!("expected != instead of !{offending}"), start_pos)
                }
            }
            '<' => {
                if self.ch == Some('=') {
                    self.read_char();
                    Token::new(TokenKind::Le, "", start_pos)
                } else {
                    Token::new(TokenKind::Lt, "", start_pos)
                }
            }
            '>' => {
                if self.ch == Some('=') {
                    self.read_char();
                    Token::new(TokenKind::Ge, "", start_pos)
                } else {
                    Token::new(TokenKind::Gt, "", start_pos)
                }
            }
            '.' => {
                if self.ch == Some('.') {
                    self.read_char();
                    if self.ch == Some('.') {
                        self.read_char();
                        Token::new(TokenKind::Ellipsis, "", start_pos)
                    } else {
                        self.illegal("unexpected ..", start_pos)
                    }
                } else {
                    Token::new(TokenKind::Dot, "", start_pos)
                }
            }
            ':' => Token::new(TokenKind::Colon, "", start_pos),
            ',' => Token::new(TokenKind::Comma, "", start_pos),
            '/' => Token::new(TokenKind::Slash, "", start_pos),
            '{' => Token::new(TokenKind::LBrace, "", start_pos),
            '[' => Token::new(TokenKind::LBracket, "", start_pos),
            '(' => Token::new(TokenKind::LParen, "", start_pos),
            '-' => Token::new(TokenKind::Minus, "", start_pos),
            '%' => Token::new(TokenKind::Percent, "", start_pos),
            '+' => Token::new(TokenKind::Plus, "", start_pos),
            '}' => Token::new(TokenKind::RBrace, "", start_pos),
            ']' => Token::new(TokenKind::RBracket, "", start_pos),
            ')' => Token::new(TokenKind::RParen, "", start_pos),
            '*' => Token::new(TokenKind::Star, "", start_pos),
            other => self.illegal(format!("unexpected {other}"), start_pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src.as_bytes());
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("= == >= <= != ... . , : { } [ ] ( ) < > - % + * /"),
            vec![
                TokenKind::Assign,
                TokenKind::Eq,
                TokenKind::Ge,
                TokenKind::Le,
                TokenKind::NotEq,
                TokenKind::Ellipsis,
                TokenKind::Dot,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Minus,
                TokenKind::Percent,
                TokenKind::Plus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_vs_names() {
        assert_eq!(kinds("if else nilly"), vec![TokenKind::If, TokenKind::Else, TokenKind::Name, TokenKind::Eof]);
    }

    #[test]
    fn test_int_lexeme_preserved() {
        let mut lexer = Lexer::new(b"12345");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Int);
        assert_eq!(tok.lexeme, "12345");
    }

    #[test]
    fn test_string_escapes() {
        let mut lexer = Lexer::new(b"\"a\\tb\\nc\\\"d\\\\e\"");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(tok.lexeme, "a\tb\nc\"d\\e");
    }

    #[test]
    fn test_string_bad_escape() {
        let mut lexer = Lexer::new(b"\"a\\qb\"");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert_eq!(tok.lexeme, "invalid string escape \\q");
    }

    #[test]
    fn test_string_unterminated() {
        let mut lexer = Lexer::new(b"\"abc");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert_eq!(tok.lexeme, "didn't find end quote in string");
    }

    #[test]
    fn test_string_newline_inside() {
        let mut lexer = Lexer::new(b"\"abc\ndef\"");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert_eq!(tok.lexeme, "can't have newline in string");
    }

    #[test]
    fn test_comment_skipped() {
        assert_eq!(kinds("// a comment\n42"), vec![TokenKind::Int, TokenKind::Eof]);
    }

    #[test]
    fn test_double_dot_illegal() {
        let mut lexer = Lexer::new(b"..");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert_eq!(tok.lexeme, "unexpected ..");
    }

    #[test]
    fn test_bang_without_eq() {
        let mut lexer = Lexer::new(b"!x");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert_eq!(tok.lexeme, "expected != instead of !x");
    }

    #[test]
    fn test_invalid_utf8_byte() {
        let mut lexer = Lexer::new(&[0xff, b'x']);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert_eq!(tok.lexeme, "invalid UTF-8 byte 0xff");
        // Tokenizer is terminated: subsequent calls keep returning Illegal.
        let tok2 = lexer.next_token();
        assert_eq!(tok2.kind, TokenKind::Illegal);
    }

    #[test]
    fn test_position_monotonicity() {
        let src = "x = 1\ny = 2";
        let mut lexer = Lexer::new(src.as_bytes());
        let mut last = Position::start();
        loop {
            let tok = lexer.next_token();
            assert!((tok.position.line, tok.position.column) >= (last.line, last.column));
            last = tok.position;
            if tok.kind == TokenKind::Eof {
                break;
            }
        }
    }

    #[test]
    fn test_newline_resets_column() {
        let mut lexer = Lexer::new(b"a\nb");
        let t1 = lexer.next_token();
        assert_eq!(t1.position, Position { line: 1, column: 1 });
        let t2 = lexer.next_token();
        assert_eq!(t2.position, Position { line: 2, column: 1 });
    }
}
