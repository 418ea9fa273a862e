//! Precedence-climbing parser for expressions.
//!
//! ```text
//! expression     = logical_or
//! logical_or     = logical_and ("||" logical_and)*
//! logical_and    = equality ("&&" equality)*
//! equality       = relational (("==" | "!=") relational)*
//! relational     = additive (("<" | "<=" | ">" | ">=") additive)*
//! additive       = multiplicative (("+" | "-") multiplicative)*
//! multiplicative = unary (("*" | "/") unary)*
//! unary          = "-" num | ("-" | "!") unary | primary
//! primary        = num | bool | ident | "(" expression ")"
//! ```

use tracing::trace;

use crate::error::{CompileError, CompileResult};
use crate::lexer::{Token, TokenKind};

use super::{
    cursor::{Cursor, MAX_NESTING},
    BinOpKind, Expr, UnaryOp,
};

/// Binding power and node kind of a binary operator. Higher binds tighter.
fn binary_op(op: &str) -> Option<(u8, BinOpKind)> {
    let entry = match op {
        "||" => (1, BinOpKind::LogicalOr),
        "&&" => (2, BinOpKind::LogicalAnd),
        "==" => (3, BinOpKind::Equal),
        "!=" => (3, BinOpKind::NotEqual),
        "<" => (4, BinOpKind::LessThan),
        "<=" => (4, BinOpKind::LessEqual),
        ">" => (4, BinOpKind::GreaterThan),
        ">=" => (4, BinOpKind::GreaterEqual),
        "+" => (5, BinOpKind::Add),
        "-" => (5, BinOpKind::Sub),
        "*" => (6, BinOpKind::Mul),
        "/" => (6, BinOpKind::Div),
        _ => return None,
    };
    Some(entry)
}

/// An expression and the height of its tree.
type Operand = (Expr, usize);

pub struct ExprParser<'a> {
    cursor: Cursor<'a>,
    depth: usize,
}

impl<'a> ExprParser<'a> {
    /// Parses one expression starting at `start` and returns it together with
    /// the index of the first token after it.
    pub fn parse(tokens: &'a [Token], start: usize) -> CompileResult<(Expr, usize)> {
        let mut parser = ExprParser {
            cursor: Cursor::new(tokens, start),
            depth: 0,
        };
        let (expr, height) = parser.parse_expr()?;
        trace!(start, end = parser.cursor.index(), height, "parsed expression");

        Ok((expr, parser.cursor.index()))
    }

    fn parse_expr(&mut self) -> CompileResult<Operand> {
        self.parse_binary(1)
    }

    fn too_deep(&self) -> CompileError {
        self.cursor.error("expression nested too deeply")
    }

    /// Left-leaning chains grow the tree without recursing here, so the height
    /// is checked whenever a node is built.
    fn node(&self, expr: Expr, height: usize) -> CompileResult<Operand> {
        if height > MAX_NESTING {
            return Err(self.too_deep());
        }
        Ok((expr, height))
    }

    fn parse_binary(&mut self, min_power: u8) -> CompileResult<Operand> {
        let (mut lhs, mut height) = self.parse_unary()?;

        while let Some((op, len)) = self.cursor.peek_operator() {
            let Some((power, kind)) = binary_op(&op) else {
                break;
            };
            if power < min_power {
                break;
            }
            for _ in 0..len {
                self.cursor.advance();
            }
            let (rhs, rhs_height) = self.parse_binary(power + 1)?;
            (lhs, height) = self.node(Expr::binary(kind, lhs, rhs), height.max(rhs_height) + 1)?;
        }

        Ok((lhs, height))
    }

    fn parse_unary(&mut self) -> CompileResult<Operand> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let operand = self.parse_prefixed();
        self.depth -= 1;
        operand
    }

    fn parse_prefixed(&mut self) -> CompileResult<Operand> {
        let op = if self.cursor.consume_operator("-") {
            UnaryOp::Neg
        } else if self.cursor.consume_operator("!") {
            UnaryOp::Not
        } else {
            return self.parse_primary();
        };

        if op == UnaryOp::Neg && self.cursor.peek().kind == TokenKind::Int {
            return self.parse_int(true);
        }
        let (operand, height) = self.parse_unary()?;
        self.node(Expr::Unary(op, Box::new(operand)), height + 1)
    }

    /// A `-` right before the digits is part of the literal, which keeps
    /// `-2147483648` in range.
    fn parse_int(&mut self, negative: bool) -> CompileResult<Operand> {
        let t = self.cursor.peek();
        let text = if negative {
            format!("-{}", t.text)
        } else {
            t.text.clone()
        };
        let value = text
            .parse()
            .map_err(|_| self.cursor.error("integer literal out of range"))?;
        self.cursor.advance();
        Ok((Expr::Num(value), 1))
    }

    fn parse_primary(&mut self) -> CompileResult<Operand> {
        let t = self.cursor.peek();
        match t.kind {
            TokenKind::Int => self.parse_int(false),
            TokenKind::Bool => {
                self.cursor.advance();
                Ok((Expr::Bool(t.text == "true"), 1))
            }
            TokenKind::Ident => {
                self.cursor.advance();
                Ok((Expr::Ident(t.text.clone()), 1))
            }
            TokenKind::Separator if t.is_separator('(') => {
                self.cursor.advance();
                let operand = self.parse_expr()?;
                self.cursor
                    .expect_separator(')', "to close the parenthesized expression")?;
                Ok(operand)
            }
            _ => Err(self.cursor.error("expected an expression")),
        }
    }
}
