use std::collections::HashMap;
use std::sync::Arc;

use kokiri_codegen::{
    define_macro, fingerprint, Chunk, CompileOptions, Compiler, Fingerprint, SymbolTable,
};
use kokiri_types::{RuleError, RuleSource, Strings};

use crate::report::CompiledRules;

/// Compiles the rules of one rule set against a shared symbol table and
/// string heap.
///
/// Rules whose trees are structurally identical compile once and share a
/// chunk; the shared chunk carries the name of the first such rule.
pub struct RuleCompiler {
    symbols: SymbolTable,
    strings: Strings,
    options: CompileOptions,
    chunks: HashMap<Fingerprint, Arc<Chunk>>,
}

impl RuleCompiler {
    pub fn new(symbols: SymbolTable, options: CompileOptions) -> Self {
        Self {
            symbols,
            strings: Strings::new(),
            options,
            chunks: HashMap::new(),
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Mutable access to the table. Drops every cached chunk, since any
    /// change may alter how rules lower.
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        self.chunks.clear();
        &mut self.symbols
    }

    pub fn strings(&self) -> &Strings {
        &self.strings
    }

    pub fn strings_mut(&mut self) -> &mut Strings {
        &mut self.strings
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Parse `body` and register it as a macro taking `params`.
    pub fn define_macro(&mut self, name: &str, params: &[&str], body: &str) -> Result<(), RuleError> {
        let body = crate::parse_rule(name, body)?;
        let params = params.iter().map(|p| p.to_string()).collect();
        define_macro(self.symbols_mut(), name, params, body);
        Ok(())
    }

    pub fn compile_rule(&mut self, name: &str, text: &str) -> Result<Arc<Chunk>, RuleError> {
        let source = RuleSource::new(name, text);
        let expr = kokiri_parser::parse(&source)?;

        let key = fingerprint(&expr);
        if let Some(chunk) = self.chunks.get(&key) {
            tracing::trace!(rule = name, fingerprint = %key, "reusing compiled chunk");
            return Ok(Arc::clone(chunk));
        }

        let chunk = Compiler::new(&self.symbols, &mut self.strings)
            .with_options(self.options)
            .compile(name, &expr)
            .map_err(|err| err.to_rule_error(&source))?;
        let chunk = Arc::new(chunk);
        self.chunks.insert(key, Arc::clone(&chunk));
        Ok(chunk)
    }

    /// Compile a function body for `Function::compiled`. Function chunks
    /// are never shared.
    pub fn compile_function(
        &mut self,
        name: &str,
        params: &[&str],
        text: &str,
    ) -> Result<Chunk, RuleError> {
        let source = RuleSource::new(name, text);
        let expr = kokiri_parser::parse(&source)?;
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        Compiler::new(&self.symbols, &mut self.strings)
            .with_options(self.options)
            .compile_function(name, &params, &expr)
            .map_err(|err| err.to_rule_error(&source))
    }

    /// Compile `(name, text)` pairs. A rule that fails is reported in the
    /// diagnostics and the rest still compile. A later rule with the same
    /// name replaces an earlier one.
    pub fn compile_batch<I, N, T>(&mut self, rules: I) -> CompiledRules
    where
        I: IntoIterator<Item = (N, T)>,
        N: AsRef<str>,
        T: AsRef<str>,
    {
        let mut out = CompiledRules::default();
        for (name, text) in rules {
            let name = name.as_ref();
            let cached = self.chunks.len();
            match self.compile_rule(name, text.as_ref()) {
                Ok(chunk) => {
                    if self.chunks.len() == cached {
                        out.shared += 1;
                    }
                    out.rules.insert(name.to_owned(), chunk);
                }
                Err(err) => {
                    tracing::debug!(rule = name, code = %err.code, error = %err.message, "rule failed to compile");
                    out.diagnostics.push_error(err);
                }
            }
        }

        tracing::info!(
            compiled = out.rules.len(),
            failed = out.diagnostics.total_errors,
            shared = out.shared,
            "compiled rule batch"
        );
        out
    }
}
