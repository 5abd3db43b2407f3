use kokiri_vm::VmOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Keep an [`EdgeFailure`](crate::EdgeFailure) for every rule that
    /// errors. Failures are logged either way.
    pub record_failures: bool,
    /// Limits for the VM evaluating edge rules.
    pub vm: VmOptions,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            record_failures: true,
            vm: VmOptions::default(),
        }
    }
}

impl SearchOptions {
    pub fn with_record_failures(mut self, record: bool) -> Self {
        self.record_failures = record;
        self
    }

    pub fn with_vm(mut self, vm: VmOptions) -> Self {
        self.vm = vm;
        self
    }
}
