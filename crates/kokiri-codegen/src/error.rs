//! Code generation errors.

use kokiri_types::{ErrorCode, RuleError, RuleSource, Span, StringsError};
use thiserror::Error;

/// Errors raised while lowering one rule to bytecode.
///
/// A name the compiler does not know is never an error here: plain calls
/// and identifiers are resolved by the VM at run time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// An intrinsic's rewrite refused its arguments.
    #[error("intrinsic `{name}` rejected its arguments: {message}")]
    IntrinsicRejected {
        name: String,
        message: String,
        span: Span,
    },

    /// The name is reserved as an intrinsic but has no rewrite yet.
    #[error("intrinsic `{name}` is declared but not defined")]
    UndefinedIntrinsic { name: String, span: Span },

    /// Subscripts, attributes and tuples only make sense as intrinsic
    /// arguments; any that survive rewriting cannot be lowered.
    #[error("{what} cannot be compiled outside an intrinsic call")]
    UnsupportedExpression { what: &'static str, span: Span },

    #[error("only named functions can be called")]
    UnsupportedCallee { span: Span },

    #[error("call passes {count} arguments, at most 255 are supported")]
    TooManyArguments { count: usize, span: Span },

    #[error("chunk `{chunk}` needs more than 65536 {pool} entries")]
    PoolOverflow {
        chunk: String,
        pool: &'static str,
        span: Span,
    },

    #[error("chunk `{chunk}` exceeds the 65535-byte jump range")]
    ChunkTooLarge { chunk: String, span: Span },

    #[error("string literal cannot be stored: {source}")]
    StringLiteral {
        #[source]
        source: StringsError,
        span: Span,
    },
}

/// Codegen result type alias.
pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::IntrinsicRejected { span, .. }
            | CompileError::UndefinedIntrinsic { span, .. }
            | CompileError::UnsupportedExpression { span, .. }
            | CompileError::UnsupportedCallee { span }
            | CompileError::TooManyArguments { span, .. }
            | CompileError::PoolOverflow { span, .. }
            | CompileError::ChunkTooLarge { span, .. }
            | CompileError::StringLiteral { span, .. } => *span,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::IntrinsicRejected { .. } => ErrorCode::INTRINSIC_REJECTED,
            CompileError::UndefinedIntrinsic { .. } => ErrorCode::UNDEFINED_INTRINSIC,
            CompileError::UnsupportedExpression { .. } => ErrorCode::UNSUPPORTED_EXPRESSION,
            CompileError::UnsupportedCallee { .. } => ErrorCode::UNSUPPORTED_CALLEE,
            CompileError::TooManyArguments { .. }
            | CompileError::PoolOverflow { .. }
            | CompileError::ChunkTooLarge { .. }
            | CompileError::StringLiteral { .. } => ErrorCode::LIMIT_EXCEEDED,
        }
    }

    /// Attach rule context for reporting.
    pub fn to_rule_error(&self, source: &RuleSource) -> RuleError {
        RuleError::at(source, self.code(), self.to_string(), self.span())
    }
}
