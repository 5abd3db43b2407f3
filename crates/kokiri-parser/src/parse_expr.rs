//! Pratt expression parsing.
//!
//! Precedence (lowest → highest):
//! 1. `or`
//! 2. `and`
//! 3. prefix `not`
//! 4. `==`, `!=`, `<`
//! 5. call `f(...)`, subscript `a[i]`, attribute `a.b`
//!
//! `and`/`or` parse their right operand one level below their own
//! strength, so a run of the same combinator nests to the right:
//! `a or b or c` is `a or (b or c)`.

use kokiri_lexer::TokenKind;
use kokiri_types::ast::{CompareOp, Expr, ExprKind, Ident, LogicalOp};
use kokiri_types::ErrorCode;

use crate::parser::{Parser, MAX_NESTING};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Or,
    And,
    Prefix,
    Compare,
    Postfix,
}

impl Precedence {
    /// One step weaker; `Lowest` stays put.
    fn lower(self) -> Self {
        match self {
            Precedence::Lowest | Precedence::Or => Precedence::Lowest,
            Precedence::And => Precedence::Or,
            Precedence::Prefix => Precedence::And,
            Precedence::Compare => Precedence::Prefix,
            Precedence::Postfix => Precedence::Compare,
        }
    }
}

/// What to do with a token found in infix position.
#[derive(Debug, Clone, Copy)]
enum Infix {
    Logical(LogicalOp),
    Compare(CompareOp),
    Call,
    Subscript,
    Attribute,
}

/// Infix table: token kind → (binding strength, handler).
const fn infix_rule(kind: TokenKind) -> Option<(Precedence, Infix)> {
    match kind {
        TokenKind::Or => Some((Precedence::Or, Infix::Logical(LogicalOp::Or))),
        TokenKind::And => Some((Precedence::And, Infix::Logical(LogicalOp::And))),
        TokenKind::EqEq => Some((Precedence::Compare, Infix::Compare(CompareOp::Eq))),
        TokenKind::BangEq => Some((Precedence::Compare, Infix::Compare(CompareOp::NotEq))),
        TokenKind::Less => Some((Precedence::Compare, Infix::Compare(CompareOp::Less))),
        TokenKind::LParen => Some((Precedence::Postfix, Infix::Call)),
        TokenKind::LBracket => Some((Precedence::Postfix, Infix::Subscript)),
        TokenKind::Dot => Some((Precedence::Postfix, Infix::Attribute)),
        _ => None,
    }
}

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression starting at `current`, absorbing infix operators
    /// that bind tighter than `min`. Leaves `current` on the last token of
    /// the expression.
    pub(crate) fn parse_expression(&mut self, min: Precedence) -> kokiri_types::Result<Expr> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error_at(
                ErrorCode::NESTING_TOO_DEEP,
                format!("rule nests deeper than {MAX_NESTING} levels"),
                self.current.span,
            ));
        }
        let result = self.parse_expression_inner(min);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, min: Precedence) -> kokiri_types::Result<Expr> {
        let mut left = self.parse_prefix()?;
        while let Some((prec, infix)) = infix_rule(self.peek.kind) {
            if prec <= min {
                break;
            }
            self.advance();
            left = self.parse_infix(infix, prec, left)?;
        }
        Ok(left)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Prefix Handlers
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_prefix(&mut self) -> kokiri_types::Result<Expr> {
        let token = self.current.clone();
        let kind = match token.kind {
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Identifier => ExprKind::Identifier(token.text.clone()),
            TokenKind::String => ExprKind::String(token.text.clone()),
            TokenKind::Number => {
                let value = token.text.parse::<f64>().map_err(|_| {
                    self.error_at(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("invalid number literal '{}'", token.text),
                        token.span,
                    )
                })?;
                ExprKind::Number(value)
            }
            TokenKind::LParen => return self.parse_group(),
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_expression(Precedence::Prefix)?;
                let span = token.span.merge(operand.span);
                return Ok(Expr::not(operand, span));
            }
            _ => return Err(self.no_prefix(&token)),
        };
        Ok(Expr::new(kind, token.span))
    }

    /// `( expr )` unwraps to `expr`; `( expr , ... )` builds a tuple.
    fn parse_group(&mut self) -> kokiri_types::Result<Expr> {
        let open = self.current.span;
        self.advance();
        let first = self.parse_expression(Precedence::Lowest)?;
        if !self.peek_is(TokenKind::Comma) {
            self.expect_peek(TokenKind::RParen)?;
            return Ok(first);
        }

        let mut elems = vec![first];
        while self.peek_is(TokenKind::Comma) {
            self.advance();
            if self.peek_is(TokenKind::RParen) {
                break;
            }
            self.advance();
            elems.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect_peek(TokenKind::RParen)?;
        Ok(Expr::new(
            ExprKind::Tuple(elems),
            open.merge(self.current.span),
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Infix Handlers
    // ══════════════════════════════════════════════════════════════════════════

    /// `current` is the operator token when this is called.
    fn parse_infix(&mut self, infix: Infix, prec: Precedence, left: Expr) -> kokiri_types::Result<Expr> {
        match infix {
            Infix::Logical(op) => {
                self.advance();
                let right = self.parse_expression(prec.lower())?;
                Ok(Expr::logical(op, left, right))
            }
            Infix::Compare(op) => {
                self.advance();
                let right = self.parse_expression(prec)?;
                Ok(Expr::compare(op, left, right))
            }
            Infix::Call => self.parse_call(left),
            Infix::Subscript => {
                self.advance();
                let index = self.parse_expression(Precedence::Lowest)?;
                self.expect_peek(TokenKind::RBracket)?;
                let span = left.span.merge(self.current.span);
                Ok(Expr::new(
                    ExprKind::Subscript {
                        target: Box::new(left),
                        index: Box::new(index),
                    },
                    span,
                ))
            }
            Infix::Attribute => {
                self.expect_peek(TokenKind::Identifier)?;
                let attribute = Ident::new(self.current.text.clone(), self.current.span);
                let span = left.span.merge(attribute.span);
                Ok(Expr::new(
                    ExprKind::Attribute {
                        target: Box::new(left),
                        attribute,
                    },
                    span,
                ))
            }
        }
    }

    /// `callee ( args )`; a `)` straight after `(` means no arguments.
    fn parse_call(&mut self, callee: Expr) -> kokiri_types::Result<Expr> {
        let mut args = Vec::new();
        if self.peek_is(TokenKind::RParen) {
            self.advance();
        } else {
            self.advance();
            args.push(self.parse_expression(Precedence::Lowest)?);
            while self.peek_is(TokenKind::Comma) {
                self.advance();
                self.advance();
                args.push(self.parse_expression(Precedence::Lowest)?);
            }
            self.expect_peek(TokenKind::RParen)?;
        }
        let span = callee.span.merge(self.current.span);
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }
}
