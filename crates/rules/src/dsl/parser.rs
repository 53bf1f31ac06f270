//! Recursive-descent parser for test cells and free-form expressions.
//!
//! Precedence, loosest first: `or`/`|`, `and`/`&`, `not`/`~`, comparisons,
//! `+ -`, `* / %`, unary `-`, `**` (right-associative), primaries.

use indexmap::IndexMap;

use super::ast::{Arg, BinaryOp, Expr, UnaryOp};
use super::lexer::{tokenize, Token, TokenKind};
use crate::error::{QcError, Result};

/// Deepest nesting of parentheses, calls and prefix operators accepted.
pub const MAX_DEPTH: usize = 128;

/// A test cell split into its function name and keyword parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCall {
    pub name: String,
    pub params: IndexMap<String, Expr>,
}

/// Parse a complete expression.
pub fn parse_expression(input: &str) -> Result<Expr> {
    let mut parser = Parser::new(input)?;
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a test cell of the form `name(key=value, ...)`. A bare name is a
/// call without parameters.
pub fn parse_test_call(input: &str) -> Result<ParsedCall> {
    let mut parser = Parser::new(input)?;
    let name = match parser.advance().kind {
        TokenKind::Ident(name) => name,
        _ => return Err(parser.error_at_previous("expected a test function name")),
    };

    let mut params = IndexMap::new();
    if parser.eat(&TokenKind::LParen) {
        for arg in parser.arguments()? {
            let key = arg
                .key
                .ok_or_else(|| parser.error_at_previous("test parameters must be passed as key=value"))?;
            if params.contains_key(&key) {
                return Err(parser.error_at_previous(format!("duplicate parameter '{}'", key)));
            }
            params.insert(key, arg.value);
        }
    }
    parser.expect_end()?;
    Ok(ParsedCall { name, params })
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self> {
        Ok(Self {
            input,
            tokens: tokenize(input)?,
            pos: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let i = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if matches!(self.peek(), TokenKind::Ident(w) if w == word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> QcError {
        QcError::parse(self.input, self.tokens[self.pos].pos, message)
    }

    fn error_at_previous(&self, message: impl Into<String>) -> QcError {
        let i = self.pos.saturating_sub(1);
        QcError::parse(self.input, self.tokens[i].pos, message)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected {}", what)))
        }
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            TokenKind::Eof => Ok(()),
            _ => Err(self.error_here("unexpected trailing input")),
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error_at_previous(format!(
                "expression nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        self.depth += 1;
        let out = parse(self);
        self.depth -= 1;
        out
    }

    /// Count one more link of a left-associative chain, which deepens the
    /// tree on its left side.
    fn chain(&self, links: &mut usize) -> Result<()> {
        *links += 1;
        if self.depth + *links > MAX_DEPTH {
            return Err(self.error_at_previous(format!(
                "expression nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        Ok(())
    }

    // ── Grammar ─────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        let mut links = 0;
        while self.eat(&TokenKind::Pipe) || self.eat_keyword("or") {
            self.chain(&mut links)?;
            let rhs = self.and_expr()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.not_expr()?;
        let mut links = 0;
        while self.eat(&TokenKind::Amp) || self.eat_keyword("and") {
            self.chain(&mut links)?;
            let rhs = self.not_expr()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr> {
        if self.eat(&TokenKind::Tilde) || self.eat_keyword("not") {
            let expr = self.nested(Self::not_expr)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.additive()?;
        if matches!(
            self.peek(),
            TokenKind::EqEq | TokenKind::NotEq | TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge
        ) {
            return Err(self.error_here("chained comparisons need parentheses"));
        }
        Ok(binary(op, lhs, rhs))
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            self.chain(&mut links)?;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            self.chain(&mut links)?;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&TokenKind::Minus) {
            let expr = self.nested(Self::unary)?;
            return Ok(match expr {
                Expr::Number(n) => Expr::Number(-n),
                expr => Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                },
            });
        }
        if self.eat(&TokenKind::Plus) {
            return self.nested(Self::unary);
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.primary()?;
        if self.eat(&TokenKind::StarStar) {
            let exponent = self.nested(Self::unary)?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Duration(text, value) => Ok(Expr::Duration { text, value }),
            TokenKind::LParen => {
                let expr = self.nested(Self::expression)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Ident(name) => {
                if matches!(name.as_str(), "True" | "true" | "False" | "false") {
                    return Ok(Expr::Bool(name.eq_ignore_ascii_case("true")));
                }
                if matches!(name.as_str(), "and" | "or" | "not") {
                    return Err(QcError::parse(
                        self.input,
                        token.pos,
                        format!("unexpected keyword '{}'", name),
                    ));
                }
                if self.eat(&TokenKind::LParen) {
                    let args = self.nested(Self::arguments)?;
                    return Ok(Expr::Call { name, args });
                }
                Ok(Expr::Ident(name))
            }
            TokenKind::Eof => Err(QcError::parse(self.input, token.pos, "unexpected end of input")),
            other => Err(QcError::parse(
                self.input,
                token.pos,
                format!("unexpected token {:?}", other),
            )),
        }
    }

    /// Arguments after an opening parenthesis, through the closing one.
    fn arguments(&mut self) -> Result<Vec<Arg>> {
        let mut args = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            let key = match (self.peek(), self.peek_at(1)) {
                (TokenKind::Ident(key), TokenKind::Assign) => {
                    let key = key.clone();
                    self.advance();
                    self.advance();
                    Some(key)
                }
                _ => None,
            };
            let value = self.expression()?;
            args.push(Arg { key, value });

            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RParen, "',' or ')'")?;
                break;
            }
        }
        Ok(args)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
