//! Shared types for the Kokiri rule compiler.
//!
//! This crate defines the rule expression tree, source spans, the packed
//! 64-bit value representation, the string heap backing string values,
//! and the structured diagnostics shared by every pipeline stage.

mod error;
mod span;
mod strings;
pub mod ast;
pub mod packed;

pub use error::{Diagnostics, ErrorCategory, ErrorCode, RuleError, MAX_ERRORS};
pub use packed::{Packed, StrDesc, Tag};
pub use span::{RuleSource, Span};
pub use strings::{Strings, StringsError};

/// Result type used by the front-end stages.
pub type Result<T> = std::result::Result<T, RuleError>;
