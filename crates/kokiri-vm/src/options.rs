use serde::{Deserialize, Serialize};

/// Resource limits for one [`Vm`](crate::Vm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmOptions {
    /// Operand stack capacity, shared by all nested calls.
    pub max_stack_depth: usize,
    /// Maximum nesting of compiled-function calls.
    pub max_call_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_stack_depth: 256,
            max_call_depth: 64,
        }
    }
}

impl VmOptions {
    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}
