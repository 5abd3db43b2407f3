use std::sync::Arc;

use indexmap::IndexMap;
use kokiri_codegen::Chunk;
use kokiri_types::Diagnostics;
use serde::Serialize;

/// Output of [`RuleCompiler::compile_batch`](crate::RuleCompiler::compile_batch).
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    /// Successfully compiled rules, in input order.
    pub rules: IndexMap<String, Arc<Chunk>>,
    pub diagnostics: Diagnostics,
    /// Rules that reused a chunk compiled earlier.
    pub shared: usize,
}

/// Per-rule line of a batch report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSummary {
    pub name: String,
    pub bytes: usize,
    pub constants: usize,
    pub names: usize,
    /// Set when the rule folded to a boolean constant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<bool>,
}

#[derive(Serialize)]
struct Report<'a> {
    rules: Vec<RuleSummary>,
    shared: usize,
    diagnostics: &'a Diagnostics,
}

impl CompiledRules {
    pub fn get(&self, name: &str) -> Option<&Arc<Chunk>> {
        self.rules.get(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn summaries(&self) -> Vec<RuleSummary> {
        self.rules
            .iter()
            .map(|(name, chunk)| RuleSummary {
                name: name.clone(),
                bytes: chunk.code.len(),
                constants: chunk.constants.len(),
                names: chunk.names.len(),
                constant: chunk.constant_result().and_then(|v| v.unpack_bool()),
            })
            .collect()
    }

    /// Batch report as pretty-printed JSON.
    pub fn report_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Report {
            rules: self.summaries(),
            shared: self.shared,
            diagnostics: &self.diagnostics,
        })
    }
}
