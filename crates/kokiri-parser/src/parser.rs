//! Parser state: a two-token window over the lexer plus error helpers.

use kokiri_lexer::{Lexer, Token, TokenKind};
use kokiri_types::ast::Expr;
use kokiri_types::{ErrorCode, RuleError, Span};

use crate::parse_expr::Precedence;

/// Deepest nesting accepted before the parser gives up on a rule.
pub(crate) const MAX_NESTING: u32 = 256;

/// Pratt parser over a single rule.
///
/// `current` is the token the active handler is looking at; `peek` is the
/// one after it. Parsing fails on the first error and never resumes.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    pub(crate) current: Token,
    pub(crate) peek: Token,
    pub(crate) depth: u32,
}

impl<'src> Parser<'src> {
    pub fn new(mut lexer: Lexer<'src>) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            current,
            peek,
            depth: 0,
        }
    }

    /// Parse the whole rule as one expression.
    pub fn parse(mut self) -> kokiri_types::Result<Expr> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        match self.peek.kind {
            TokenKind::Eof => Ok(expr),
            TokenKind::Error => Err(self.lexical_error(&self.peek)),
            _ => Err(self.error_at(
                ErrorCode::TRAILING_INPUT,
                format!("unexpected {} after complete expression", self.peek),
                self.peek.span,
            )),
        }
    }

    // ── Token window ─────────────────────────────────────────────

    /// Shift the window by one token.
    pub(crate) fn advance(&mut self) {
        let next = self.lexer.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    pub(crate) fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.kind == kind
    }

    /// Advance onto `kind` if it is next, otherwise fail.
    pub(crate) fn expect_peek(&mut self, kind: TokenKind) -> kokiri_types::Result<()> {
        if self.peek_is(kind) {
            self.advance();
            return Ok(());
        }
        if self.peek.kind == TokenKind::Error {
            return Err(self.lexical_error(&self.peek));
        }
        Err(self.error_at(
            ErrorCode::EXPECTED_TOKEN,
            format!("expected {kind}, found {}", self.peek),
            self.peek.span,
        ))
    }

    // ── Errors ───────────────────────────────────────────────────

    pub(crate) fn error_at(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
    ) -> RuleError {
        RuleError::at(self.lexer.source(), code, message, span)
    }

    /// The lexer's structured error behind an error token.
    pub(crate) fn lexical_error(&self, token: &Token) -> RuleError {
        match self.lexer.error() {
            Some(err) => err.clone(),
            None => self.error_at(ErrorCode::UNEXPECTED_CHARACTER, token.text.clone(), token.span),
        }
    }

    /// No expression can start with `token`.
    pub(crate) fn no_prefix(&self, token: &Token) -> RuleError {
        if token.kind == TokenKind::Error {
            return self.lexical_error(token);
        }
        self.error_at(
            ErrorCode::UNEXPECTED_TOKEN,
            format!("expected an expression, found {token}"),
            token.span,
        )
    }
}
