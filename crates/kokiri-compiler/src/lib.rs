//! Kokiri compiler: orchestrates the rule compilation pipeline.
//!
//! ```text
//! rule text → Lexer → Parser → intrinsic rewrite → fold → Codegen → Chunk
//! ```
//!
//! [`RuleCompiler`] owns the symbol table and the string heap for a rule
//! set. Hosts bind string values through [`RuleCompiler::strings_mut`] so
//! that literals in rules and values in the world compare by identity.

mod report;
mod rules;

pub use report::{CompiledRules, RuleSummary};
pub use rules::RuleCompiler;

pub use kokiri_codegen::{Chunk, CompileOptions, SymbolKind, SymbolTable};
pub use kokiri_types::{Diagnostics, RuleError};

use kokiri_types::{ast::Expr, RuleSource};

/// Parse one rule without compiling it.
pub fn parse_rule(name: &str, text: &str) -> Result<Expr, RuleError> {
    kokiri_parser::parse(&RuleSource::new(name, text))
}
