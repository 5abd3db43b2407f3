//! Expression tree → bytecode.

use kokiri_types::ast::{CompareOp, Expr, ExprKind, LogicalOp, UnaryOp};
use kokiri_types::{Packed, Strings};
use serde::{Deserialize, Serialize};

use crate::chunk::{Chunk, ChunkBuilder};
use crate::error::{CompileError, CompileResult};
use crate::fold::fold_constants;
use crate::opcode::Opcode;
use crate::symbols::{SymbolKind, SymbolTable};

/// Intrinsics may expand into further intrinsic calls; this bounds the
/// chain so a self-referencing macro fails instead of looping.
const MAX_EXPANSION_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Fold literal sub-expressions after intrinsic expansion.
    pub fold_constants: bool,
    /// Lower a bare reference to a [`SymbolKind::Function`] as a
    /// zero-argument call.
    pub promote_bare_functions: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fold_constants: true,
            promote_bare_functions: true,
        }
    }
}

impl CompileOptions {
    pub fn with_fold_constants(mut self, fold: bool) -> Self {
        self.fold_constants = fold;
        self
    }

    pub fn with_promote_bare_functions(mut self, promote: bool) -> Self {
        self.promote_bare_functions = promote;
        self
    }
}

/// Lowers rule trees to chunks against a symbol table.
///
/// String literals are interned into `strings`, which must be the same
/// heap the runtime environment uses for its string values.
pub struct Compiler<'a> {
    symbols: &'a SymbolTable,
    strings: &'a mut Strings,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(symbols: &'a SymbolTable, strings: &'a mut Strings) -> Self {
        Self {
            symbols,
            strings,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile a rule. The chunk leaves the rule's value on the stack and
    /// returns it.
    pub fn compile(&mut self, name: &str, expr: &Expr) -> CompileResult<Chunk> {
        self.compile_body(name, &[], expr, false)
    }

    /// Compile a function body. Parameters shadow symbols of the same
    /// name and are read with `LOAD_IDENT`; the result goes through the
    /// return slot.
    pub fn compile_function(
        &mut self,
        name: &str,
        params: &[String],
        body: &Expr,
    ) -> CompileResult<Chunk> {
        self.compile_body(name, params, body, true)
    }

    fn compile_body(
        &mut self,
        name: &str,
        locals: &[String],
        expr: &Expr,
        set_return: bool,
    ) -> CompileResult<Chunk> {
        let mut tree = self.expand(expr.clone(), locals, 0)?;
        if self.options.fold_constants {
            tree = fold_constants(tree);
        }

        let mut builder = ChunkBuilder::new(name);
        self.emit(&mut builder, &tree, locals)?;
        if set_return {
            builder.emit(Opcode::SetReturn);
        }
        builder.emit(Opcode::Return);
        let chunk = builder.finish();

        tracing::debug!(
            chunk = %chunk.name,
            bytes = chunk.code.len(),
            constants = chunk.constants.len(),
            names = chunk.names.len(),
            "compiled rule"
        );
        Ok(chunk)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Intrinsic expansion
    // ══════════════════════════════════════════════════════════════════════════

    fn expand(&self, expr: Expr, locals: &[String], depth: usize) -> CompileResult<Expr> {
        expr.rewrite(&mut |node| self.expand_call(node, locals, depth))
    }

    fn expand_call(&self, node: Expr, locals: &[String], depth: usize) -> CompileResult<Expr> {
        let Some(name) = node.call_name().map(str::to_owned) else {
            return Ok(node);
        };
        if locals.contains(&name) {
            return Ok(node);
        }
        let Some(symbol) = self.symbols.lookup(&name) else {
            return Ok(node);
        };
        if symbol.kind != SymbolKind::CompilerIntrinsic {
            return Ok(node);
        }

        let span = node.span;
        let Some(rewrite) = symbol.intrinsic() else {
            return Err(CompileError::UndefinedIntrinsic { name, span });
        };
        if depth >= MAX_EXPANSION_DEPTH {
            return Err(CompileError::IntrinsicRejected {
                name,
                message: format!("expansion nested deeper than {MAX_EXPANSION_DEPTH} levels"),
                span,
            });
        }
        let args = match node.kind {
            ExprKind::Call { args, .. } => args,
            other => return Ok(Expr::new(other, span)),
        };

        let replacement = rewrite(args, span).map_err(|message| CompileError::IntrinsicRejected {
            name: name.clone(),
            message,
            span,
        })?;
        tracing::trace!(intrinsic = %name, depth, "expanded intrinsic call");
        self.expand(replacement, locals, depth + 1)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Emission
    // ══════════════════════════════════════════════════════════════════════════

    fn emit(&mut self, b: &mut ChunkBuilder, expr: &Expr, locals: &[String]) -> CompileResult<()> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Identifier(name) => {
                if self.is_bare_function(name, locals) {
                    b.call(name, 0, span)
                } else {
                    b.load_ident(name, span)
                }
            }
            ExprKind::Number(n) => b.load_const(Packed::pack_f64(*n), span),
            ExprKind::String(s) => {
                let value = self
                    .strings
                    .pack(s)
                    .map_err(|source| CompileError::StringLiteral { source, span })?;
                b.load_const(value, span)
            }
            ExprKind::Bool(v) => b.load_const(Packed::pack_bool(*v), span),

            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                self.emit(b, operand, locals)?;
                b.emit(Opcode::Not);
                Ok(())
            }
            ExprKind::Compare { op, left, right } => {
                self.emit(b, left, locals)?;
                self.emit(b, right, locals)?;
                b.emit(match op {
                    CompareOp::Eq => Opcode::Eq,
                    CompareOp::NotEq => Opcode::NotEq,
                    CompareOp::Less => Opcode::Less,
                });
                Ok(())
            }
            // left; JUMP_FALSE short; right; JUMP end; short: LOAD_CONST False; end:
            // `or` mirrors this with JUMP_TRUE and True.
            ExprKind::Logical { op, left, right } => {
                let (test, short) = match op {
                    LogicalOp::And => (Opcode::JumpFalse, Packed::FALSE),
                    LogicalOp::Or => (Opcode::JumpTrue, Packed::TRUE),
                };
                self.emit(b, left, locals)?;
                let to_short = b.emit_jump(test);
                self.emit(b, right, locals)?;
                let to_end = b.emit_jump(Opcode::Jump);
                b.patch_jump(to_short, span)?;
                b.load_const(short, span)?;
                b.patch_jump(to_end, span)
            }

            ExprKind::Call { callee, args } => {
                let ExprKind::Identifier(name) = &callee.kind else {
                    return Err(CompileError::UnsupportedCallee { span: callee.span });
                };
                for arg in args {
                    self.emit(b, arg, locals)?;
                }
                b.call(name, args.len(), span)
            }

            ExprKind::Subscript { .. } => Err(CompileError::UnsupportedExpression {
                what: "subscript",
                span,
            }),
            ExprKind::Attribute { .. } => Err(CompileError::UnsupportedExpression {
                what: "attribute access",
                span,
            }),
            ExprKind::Tuple(_) => Err(CompileError::UnsupportedExpression { what: "tuple", span }),
        }
    }

    fn is_bare_function(&self, name: &str, locals: &[String]) -> bool {
        self.options.promote_bare_functions
            && !locals.iter().any(|local| local == name)
            && self
                .symbols
                .lookup(name)
                .is_some_and(|symbol| symbol.kind == SymbolKind::Function)
    }
}
