//! Lazy lexer for rule text.
//!
//! Tokens are produced on demand by [`Lexer::next_token`]. The first error
//! ends the stream: the lexer hands out a single [`TokenKind::Error`] token
//! and only [`TokenKind::Eof`] after that. The structured error stays
//! available through [`Lexer::error`].

use kokiri_types::{ErrorCode, RuleError, RuleSource, Span};

use crate::token::{keyword, Token, TokenKind};

pub struct Lexer<'src> {
    source: &'src RuleSource,
    text: &'src str,
    /// Current byte offset into `text`.
    pos: usize,
    line: u32,
    col: u32,
    paren_depth: u32,
    bracket_depth: u32,
    error: Option<RuleError>,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src RuleSource) -> Self {
        Self {
            source,
            text: &source.text,
            pos: 0,
            line: 1,
            col: 1,
            paren_depth: 0,
            bracket_depth: 0,
            error: None,
            finished: false,
        }
    }

    pub fn source(&self) -> &'src RuleSource {
        self.source
    }

    /// The error that stopped the stream, if any.
    pub fn error(&self) -> Option<&RuleError> {
        self.error.as_ref()
    }

    /// Drain the whole stream. The returned tokens always end with `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, RuleError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            match token.kind {
                TokenKind::Error => {
                    return Err(self
                        .error
                        .take()
                        .unwrap_or_else(|| self.error_for(&token)));
                }
                TokenKind::Eof => {
                    tokens.push(token);
                    return Ok(tokens);
                }
                _ => tokens.push(token),
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        if self.finished {
            return Token::eof(self.here());
        }
        self.skip_whitespace();

        let (line, col) = (self.line, self.col);
        let start = self.pos;
        let Some(ch) = self.advance() else {
            return self.end_of_input();
        };

        let kind = match ch {
            '(' => {
                self.paren_depth += 1;
                TokenKind::LParen
            }
            ')' => {
                if self.paren_depth == 0 {
                    return self.fail(ErrorCode::UNBALANCED_CLOSE, "unmatched ')'", line, col);
                }
                self.paren_depth -= 1;
                TokenKind::RParen
            }
            '[' => {
                self.bracket_depth += 1;
                TokenKind::LBracket
            }
            ']' => {
                if self.bracket_depth == 0 {
                    return self.fail(ErrorCode::UNBALANCED_CLOSE, "unmatched ']'", line, col);
                }
                self.bracket_depth -= 1;
                TokenKind::RBracket
            }
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '<' => TokenKind::Less,
            '=' | '!' => {
                if self.peek() != Some('=') {
                    return self.fail(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        format!("expected '=' after '{ch}'"),
                        line,
                        col,
                    );
                }
                self.advance();
                if ch == '=' {
                    TokenKind::EqEq
                } else {
                    TokenKind::BangEq
                }
            }
            '\'' => return self.scan_string(line, col),
            c if c.is_ascii_digit() => return self.scan_number(start, line, col),
            c if c.is_ascii_alphabetic() || c == '_' => return self.scan_word(start, line, col),
            other => {
                return self.fail(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    format!("unexpected character '{other}'"),
                    line,
                    col,
                );
            }
        };

        Token::new(kind, self.span_from(line, col), &self.text[start..self.pos])
    }

    // ── Scanners ─────────────────────────────────────────────────

    fn scan_number(&mut self, start: usize, line: u32, col: u32) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        self.finish_word(TokenKind::Number, start, line, col)
    }

    fn scan_word(&mut self, start: usize, line: u32, col: u32) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let kind = keyword(&self.text[start..self.pos]).unwrap_or(TokenKind::Identifier);
        self.finish_word(kind, start, line, col)
    }

    /// Words and numbers must be followed by a separator.
    fn finish_word(&mut self, kind: TokenKind, start: usize, line: u32, col: u32) -> Token {
        match self.peek() {
            None => {}
            Some(c) if is_separator(c) => {}
            Some(c) => {
                let (line, col) = (self.line, self.col);
                return self.fail(
                    ErrorCode::MISSING_SEPARATOR,
                    format!(
                        "expected a separator after '{}', found '{c}'",
                        &self.text[start..self.pos]
                    ),
                    line,
                    col,
                );
            }
        }
        Token::new(kind, self.span_from(line, col), &self.text[start..self.pos])
    }

    fn scan_string(&mut self, line: u32, col: u32) -> Token {
        let content_start = self.pos;
        loop {
            match self.advance() {
                Some('\'') => break,
                Some(_) => {}
                None => {
                    return self.fail(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated string literal",
                        line,
                        col,
                    );
                }
            }
        }
        let content = &self.text[content_start..self.pos - 1];
        Token::new(TokenKind::String, self.span_from(line, col), content)
    }

    fn end_of_input(&mut self) -> Token {
        let (line, col) = (self.line, self.col);
        if self.paren_depth > 0 {
            return self.fail(ErrorCode::UNCLOSED_GROUP, "unclosed '('", line, col);
        }
        if self.bracket_depth > 0 {
            return self.fail(ErrorCode::UNCLOSED_GROUP, "unclosed '['", line, col);
        }
        self.finished = true;
        Token::eof(Span::point(line, col))
    }

    // ── Character helpers ────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.advance();
        }
    }

    fn here(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    // ── Errors ───────────────────────────────────────────────────

    fn fail(&mut self, code: ErrorCode, message: impl Into<String>, line: u32, col: u32) -> Token {
        let message = message.into();
        let span = Span::point(line, col);
        self.error = Some(RuleError::at(self.source, code, message.clone(), span));
        self.finished = true;
        Token::new(TokenKind::Error, span, message)
    }

    fn error_for(&self, token: &Token) -> RuleError {
        RuleError::at(
            self.source,
            ErrorCode::UNEXPECTED_CHARACTER,
            token.text.clone(),
            token.span,
        )
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_separator(c: char) -> bool {
    is_whitespace(c) || matches!(c, '.' | '(' | ')' | '[' | ']' | ',')
}
