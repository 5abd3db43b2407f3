use crate::{RuleSource, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of rule errors kept in a [`Diagnostics`] report.
pub const MAX_ERRORS: usize = 20;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Lexical,
    Syntax,
    Compile,
}

/// Numeric error code (E100–E399).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Lexical errors (E100–E199) ──
    pub const UNEXPECTED_CHARACTER: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const MISSING_SEPARATOR: Self = Self(102);
    pub const UNBALANCED_CLOSE: Self = Self(103);
    pub const UNCLOSED_GROUP: Self = Self(104);

    // ── Syntax errors (E200–E299) ──
    pub const UNEXPECTED_TOKEN: Self = Self(200);
    pub const EXPECTED_TOKEN: Self = Self(201);
    pub const TRAILING_INPUT: Self = Self(202);
    pub const NESTING_TOO_DEEP: Self = Self(203);

    // ── Compile errors (E300–E399) ──
    pub const INTRINSIC_REJECTED: Self = Self(300);
    pub const UNDEFINED_INTRINSIC: Self = Self(301);
    pub const UNSUPPORTED_EXPRESSION: Self = Self(302);
    pub const UNSUPPORTED_CALLEE: Self = Self(303);
    pub const LIMIT_EXCEEDED: Self = Self(304);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Lexical,
            200..=299 => ErrorCategory::Syntax,
            _ => ErrorCategory::Compile,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Syntax => write!(f, "syntax"),
            Self::Compile => write!(f, "compile"),
        }
    }
}

/// A structured error attached to one rule.
///
/// Every front-end failure (lexing, parsing, compiling) ends up as one of
/// these so that batch tooling can report per rule and keep going.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleError {
    /// Name of the rule that failed.
    pub rule: String,
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The offending source line, for context.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggestion: Option<String>,
}

impl RuleError {
    pub fn new(
        rule: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    /// Build an error whose context line is taken from `source`.
    pub fn at(source: &RuleSource, code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        let line = source.line(span.start_line).unwrap_or_default();
        Self::new(source.name.clone(), code, message, span, line)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}: {} [{}] {}",
            self.rule, self.span, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for RuleError {}

/// Errors collected while compiling a whole rule set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<RuleError>,
    pub total_errors: usize,
}

impl Diagnostics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Record an error. Only the first [`MAX_ERRORS`] are kept; all are counted.
    pub fn push_error(&mut self, error: RuleError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }
}
