//! Runtime errors for the Kokiri VM.

use kokiri_types::Tag;
use thiserror::Error;

/// Failure of one chunk evaluation.
///
/// An error ends the evaluation it occurred in and nothing else; callers
/// decide whether it aborts anything wider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error("unbound identifier `{name}`")]
    UnboundName { name: String },

    /// The namespace reserves the name but holds no function for it.
    #[error("function `{name}` is declared but not defined")]
    UndefinedFunction { name: String },

    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },

    #[error("`{name}` takes {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },

    #[error("operand stack exceeded {limit} values")]
    StackOverflow { limit: usize },

    /// `None` marks a boxed bit pattern with no assigned tag.
    #[error("`{op}` cannot be applied to {}", describe(.found))]
    TypeMismatch {
        op: &'static str,
        found: Vec<Option<Tag>>,
    },

    #[error("call depth exceeded {limit}")]
    CallDepthExceeded { limit: usize },

    #[error("invalid opcode 0x{byte:02x} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },

    #[error("malformed chunk `{chunk}` at offset {offset}: {reason}")]
    MalformedChunk {
        chunk: String,
        offset: usize,
        reason: &'static str,
    },

    /// A host function reported failure.
    #[error("native function `{name}` failed: {message}")]
    Native { name: String, message: String },
}

/// VM result type alias.
pub type VmResult<T> = Result<T, VmError>;

fn describe(tags: &[Option<Tag>]) -> String {
    let names: Vec<String> = tags
        .iter()
        .map(|tag| match tag {
            Some(tag) => tag.to_string(),
            None => "unknown".to_string(),
        })
        .collect();
    names.join(" and ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_names_operands() {
        let err = VmError::TypeMismatch {
            op: "<",
            found: vec![Some(Tag::Str32), Some(Tag::F64)],
        };
        let text = err.to_string();
        assert!(text.starts_with("`<` cannot be applied to"));
        assert!(text.contains(" and "));
    }

    #[test]
    fn arity_message() {
        let err = VmError::ArityMismatch {
            name: "can_play".into(),
            expected: 1,
            found: 2,
        };
        assert_eq!(err.to_string(), "`can_play` takes 1 argument(s), got 2");
    }
}
