//! Token types for rule text.

use kokiri_types::Span;
use std::fmt;

/// Reserved words. An identifier that matches one of these exactly becomes
/// the keyword token instead.
pub const KEYWORDS: &[&str] = &["and", "or", "not", "True", "False"];

/// A single lexeme together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Literal text. For strings this is the content between the quotes;
    /// for [`TokenKind::Error`] it is the error message.
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }

    pub fn eof(span: Span) -> Self {
        Self::new(TokenKind::Eof, span, "")
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier | TokenKind::Number => write!(f, "'{}'", self.text),
            TokenKind::String => write!(f, "string '{}'", self.text),
            _ => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    Identifier,
    /// Decimal integer literal.
    Number,
    /// Single-quoted string, no escapes.
    String,
    True,
    False,

    // ── Keywords ──────────────────────────────────────────────
    And,
    Or,
    Not,

    // ── Punctuation ───────────────────────────────────────────
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,

    // ── Operators ─────────────────────────────────────────────
    EqEq,
    BangEq,
    Less,

    // ── Stream control ────────────────────────────────────────
    Error,
    Eof,
}

/// Map a scanned word onto its keyword kind, if it is one.
pub fn keyword(word: &str) -> Option<TokenKind> {
    match word {
        "and" => Some(TokenKind::And),
        "or" => Some(TokenKind::Or),
        "not" => Some(TokenKind::Not),
        "True" => Some(TokenKind::True),
        "False" => Some(TokenKind::False),
        _ => None,
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::True => "'True'",
            TokenKind::False => "'False'",
            TokenKind::And => "'and'",
            TokenKind::Or => "'or'",
            TokenKind::Not => "'not'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::EqEq => "'=='",
            TokenKind::BangEq => "'!='",
            TokenKind::Less => "'<'",
            TokenKind::Error => "error",
            TokenKind::Eof => "end of rule",
        };
        f.write_str(text)
    }
}
