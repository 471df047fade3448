/*
 * lexer.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Tokenizer for the expression language inside `${...}`.
//!
//! The lexer works on the whole raw template string so token spans are byte
//! offsets into it. The parser drives it from the first byte after `${` and
//! stops at the matching `}`.

use crate::error::{TemplateError, TemplateResult};
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),

    Dot,
    Comma,
    Question,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    /// `${`, opening a nested expression
    DollarBrace,
    RBrace,

    Or,  // ||
    And, // &&
    Eq,  // ==
    Ne,  // !=
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Str(s) => write!(f, "string \"{s}\""),
            TokenKind::Ident(s) => write!(f, "identifier '{s}'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::DollarBrace => write!(f, "'${{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Or => write!(f, "'||'"),
            TokenKind::And => write!(f, "'&&'"),
            TokenKind::Eq => write!(f, "'=='"),
            TokenKind::Ne => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::Eof => write!(f, "end of template string"),
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, pos: usize) -> Self {
        Lexer { src, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos + 1).copied()
    }

    fn eat(&mut self, ch: u8) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>, span: Range<usize>) -> TemplateError {
        TemplateError::parse(message).with_span(span)
    }

    /// Read an object key after `.`. Unlike identifiers, keys may start
    /// with a digit (`var.list.0`).
    pub fn member_key(&mut self) -> TemplateResult<(String, Range<usize>)> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if is_ident_continue(b)) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("Expected a key name after '.'", start..start + 1));
        }
        Ok((self.src[start..self.pos].to_string(), start..self.pos))
    }

    pub fn next_token(&mut self) -> TemplateResult<Token> {
        self.skip_ws();
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: start..start,
            });
        };
        self.pos += 1;

        let kind = match ch {
            b'.' => TokenKind::Dot,
            b',' => TokenKind::Comma,
            b'?' => TokenKind::Question,
            b':' => TokenKind::Colon,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'}' => TokenKind::RBrace,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'$' if self.eat(b'{') => TokenKind::DollarBrace,
            b'|' if self.eat(b'|') => TokenKind::Or,
            b'&' if self.eat(b'&') => TokenKind::And,
            b'=' if self.eat(b'=') => TokenKind::Eq,
            b'!' if self.eat(b'=') => TokenKind::Ne,
            b'!' => TokenKind::Bang,
            b'<' if self.eat(b'=') => TokenKind::Le,
            b'<' => TokenKind::Lt,
            b'>' if self.eat(b'=') => TokenKind::Ge,
            b'>' => TokenKind::Gt,
            b'"' | b'\'' => self.read_string(ch, start)?,
            b'0'..=b'9' => self.read_number(start)?,
            b if is_ident_start(b) => {
                while matches!(self.peek(), Some(b) if is_ident_continue(b)) {
                    self.pos += 1;
                }
                TokenKind::Ident(self.src[start..self.pos].to_string())
            }
            _ => {
                let found = self.src[start..].chars().next().unwrap_or('?');
                return Err(self.error(
                    format!("Unexpected character '{found}'"),
                    start..start + found.len_utf8(),
                ));
            }
        };

        Ok(Token {
            kind,
            span: start..self.pos,
        })
    }

    fn read_number(&mut self, start: usize) -> TemplateResult<TokenKind> {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') && matches!(self.peek2(), Some(b'0'..=b'9')) {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let text = &self.src[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("Invalid number '{text}'"), start..self.pos))
    }

    fn read_string(&mut self, quote: u8, start: usize) -> TemplateResult<TokenKind> {
        let mut s = String::new();
        let mut chunk_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    return Err(self.error("Unterminated string literal", start..self.pos));
                }
                Some(b) if b == quote => {
                    s.push_str(&self.src[chunk_start..self.pos]);
                    self.pos += 1;
                    return Ok(TokenKind::Str(s));
                }
                Some(b'\\') => {
                    s.push_str(&self.src[chunk_start..self.pos]);
                    self.pos += 1;
                    let Some(escaped) = self.src[self.pos..].chars().next() else {
                        return Err(self.error("Unterminated string literal", start..self.pos));
                    };
                    self.pos += escaped.len_utf8();
                    s.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                    chunk_start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src, 0);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token.kind == TokenKind::Eof {
                return out;
            }
            out.push(token.kind);
        }
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a >= 1 && !b || c != 'x'"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Ge,
                TokenKind::Number(1.0),
                TokenKind::And,
                TokenKind::Bang,
                TokenKind::Ident("b".into()),
                TokenKind::Or,
                TokenKind::Ident("c".into()),
                TokenKind::Ne,
                TokenKind::Str("x".into()),
            ]
        );
    }

    #[test]
    fn test_identifiers_may_contain_dashes() {
        assert_eq!(
            kinds("my-var - 2"),
            vec![
                TokenKind::Ident("my-var".into()),
                TokenKind::Minus,
                TokenKind::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\n" 'ü\'s'"#),
            vec![TokenKind::Str("a\"b\n".into()), TokenKind::Str("ü's".into())]
        );
    }

    #[test]
    fn test_spans_are_absolute() {
        let mut lexer = Lexer::new("${foo}", 2);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.span, 2..5);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::RBrace);
    }

    #[test]
    fn test_errors() {
        let err = Lexer::new("'abc", 0).next_token().unwrap_err();
        assert_eq!(err.cause, "Unterminated string literal");

        let err = Lexer::new("a = b", 2).next_token().unwrap_err();
        assert_eq!(err.cause, "Unexpected character '='");
        assert_eq!(err.span, Some(2..3));
    }

    #[test]
    fn test_member_key_may_start_with_digit() {
        let mut lexer = Lexer::new("0-a.b", 0);
        assert_eq!(lexer.member_key().unwrap(), ("0-a".to_string(), 0..3));
    }
}
