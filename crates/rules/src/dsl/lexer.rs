//! Tokenizer for test cells and expressions.

use chrono::Duration;
use tsqc_core::parse_duration;

use crate::error::{QcError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Duration(String, Duration),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Amp,
    Pipe,
    Tilde,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub pos: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let kind = match c {
            b'(' => single(&mut i, TokenKind::LParen),
            b')' => single(&mut i, TokenKind::RParen),
            b',' => single(&mut i, TokenKind::Comma),
            b'+' => single(&mut i, TokenKind::Plus),
            b'-' => single(&mut i, TokenKind::Minus),
            b'/' => single(&mut i, TokenKind::Slash),
            b'%' => single(&mut i, TokenKind::Percent),
            b'&' => single(&mut i, TokenKind::Amp),
            b'|' => single(&mut i, TokenKind::Pipe),
            b'~' => single(&mut i, TokenKind::Tilde),
            b'*' => pair(bytes, &mut i, b'*', TokenKind::StarStar, TokenKind::Star),
            b'=' => pair(bytes, &mut i, b'=', TokenKind::EqEq, TokenKind::Assign),
            b'<' => pair(bytes, &mut i, b'=', TokenKind::Le, TokenKind::Lt),
            b'>' => pair(bytes, &mut i, b'=', TokenKind::Ge, TokenKind::Gt),
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    TokenKind::NotEq
                } else {
                    return Err(QcError::parse(input, start, "expected '!='"));
                }
            }
            b'\'' | b'"' => {
                let close = input[i + 1..]
                    .find(c as char)
                    .ok_or_else(|| QcError::parse(input, start, "unterminated string"))?;
                let text = input[i + 1..i + 1 + close].to_string();
                i += close + 2;
                TokenKind::Str(text)
            }
            b'0'..=b'9' | b'.' => number(input, &mut i)?,
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                TokenKind::Ident(input[start..i].to_string())
            }
            _ => {
                let ch = input[start..].chars().next().unwrap_or('?');
                return Err(QcError::parse(
                    input,
                    start,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };
        tokens.push(Token { kind, pos: start });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: input.len(),
    });
    Ok(tokens)
}

fn single(i: &mut usize, kind: TokenKind) -> TokenKind {
    *i += 1;
    kind
}

fn pair(bytes: &[u8], i: &mut usize, next: u8, long: TokenKind, short: TokenKind) -> TokenKind {
    if bytes.get(*i + 1) == Some(&next) {
        *i += 2;
        long
    } else {
        *i += 1;
        short
    }
}

/// Numbers (`3`, `0.5`, `1e-3`) and duration literals (`10min`, `2h30m`).
fn number(input: &str, i: &mut usize) -> Result<TokenKind> {
    let bytes = input.as_bytes();
    let start = *i;
    while *i < bytes.len() && (bytes[*i].is_ascii_digit() || bytes[*i] == b'.') {
        *i += 1;
    }

    // exponent: `e` followed by a digit or a signed digit
    if *i < bytes.len() && (bytes[*i] == b'e' || bytes[*i] == b'E') {
        let mut j = *i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            *i = j;
            while *i < bytes.len() && bytes[*i].is_ascii_digit() {
                *i += 1;
            }
        }
    }

    if *i < bytes.len() && bytes[*i].is_ascii_alphabetic() {
        while *i < bytes.len() && bytes[*i].is_ascii_alphanumeric() {
            *i += 1;
        }
        let text = &input[start..*i];
        let value = parse_duration(text).map_err(|_| {
            QcError::parse(input, start, format!("invalid duration '{}'", text))
        })?;
        return Ok(TokenKind::Duration(text.to_string(), value));
    }

    let text = &input[start..*i];
    text.parse::<f64>()
        .map(TokenKind::Number)
        .map_err(|_| QcError::parse(input, start, format!("invalid number '{}'", text)))
}
