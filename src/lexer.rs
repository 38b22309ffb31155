// src/lexer.rs
use std::fmt;

use crate::errors::{FormulaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Variable(String),
    Op(Op),
    Open,
    Close,
}

/// A token together with the character index it started at.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        };
        write!(f, "{c}")
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Variable(name) => write!(f, "[{name}]"),
            TokenKind::Op(op) => write!(f, "{op}"),
            TokenKind::Open => f.write_str("("),
            TokenKind::Close => f.write_str(")"),
        }
    }
}

/// Split an expression into tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut lx = Lexer::new(input);
    let mut out = Vec::new();
    loop {
        lx.skip_ws();
        let Some(c) = lx.peek_char() else { break };
        let pos = lx.pos;
        let kind = match c {
            '[' => {
                lx.bump();
                let name = lx
                    .capture_until(']')
                    .ok_or_else(|| {
                        FormulaError::Lex(format!("variable not closed at position {pos}"))
                    })?;
                lx.bump();
                TokenKind::Variable(name.trim().to_string())
            }
            '0'..='9' | '.' => lx.number()?,
            '+' | '-' | '*' | '/' => {
                lx.bump();
                TokenKind::Op(match c {
                    '+' => Op::Add,
                    '-' => Op::Sub,
                    '*' => Op::Mul,
                    _ => Op::Div,
                })
            }
            '(' => {
                lx.bump();
                TokenKind::Open
            }
            ')' => {
                lx.bump();
                TokenKind::Close
            }
            other => {
                return Err(FormulaError::Lex(format!(
                    "unexpected character '{other}' at position {pos}"
                )))
            }
        };
        out.push(Token { kind, pos });
    }
    Ok(out)
}

/// Char cursor over the raw input. `i` is a byte offset, `pos` counts chars.
struct Lexer<'a> {
    s: &'a str,
    i: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, i: 0, pos: 0 }
    }

    // Digits and dots are taken greedily; `str::parse::<f64>` decides the rest,
    // so "1.2.3" and a lone "." are rejected here.
    fn number(&mut self) -> Result<TokenKind> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.s[start..self.i];
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(TokenKind::Number(n)),
            _ => Err(FormulaError::Lex(format!("invalid number: {text}"))),
        }
    }

    /// Consume everything up to (not including) `end`. `None` if `end` never shows up.
    fn capture_until(&mut self, end: char) -> Option<&'a str> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == end {
                return Some(&self.s[start..self.i]);
            }
            self.bump();
        }
        None
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            self.pos += 1;
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }
}
