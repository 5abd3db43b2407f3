//! Ready-made intrinsics.
//!
//! None of these are required by the compiler; hosts register what their
//! rule set needs. `all_of`/`any_of` collapse argument lists into
//! combinator chains, and [`define_macro`] turns a parameterized rule body
//! into an intrinsic that inlines it at every call site.

use std::collections::HashMap;
use std::convert::Infallible;

use kokiri_types::ast::{Expr, ExprKind, LogicalOp};
use kokiri_types::Span;

use crate::symbols::SymbolTable;

/// Register `all_of` and `any_of`.
pub fn register_standard_intrinsics(symbols: &mut SymbolTable) {
    symbols.define_intrinsic("all_of", |args, span| Ok(chain(LogicalOp::And, args, span)));
    symbols.define_intrinsic("any_of", |args, span| Ok(chain(LogicalOp::Or, args, span)));
}

/// `a, b, c` → `a op (b op c)`. An empty list becomes the identity of `op`.
fn chain(op: LogicalOp, args: Vec<Expr>, span: Span) -> Expr {
    let identity = op == LogicalOp::And;
    args.into_iter()
        .rev()
        .reduce(|right, left| Expr::logical(op, left, right))
        .unwrap_or_else(|| Expr::boolean(identity, span))
}

/// Register `name(params...)` as a macro that expands to `body` with each
/// parameter replaced by the matching argument.
pub fn define_macro(symbols: &mut SymbolTable, name: &str, params: Vec<String>, body: Expr) {
    let macro_name = name.to_owned();
    symbols.define_intrinsic(name, move |args, span| {
        if args.len() != params.len() {
            return Err(format!(
                "`{macro_name}` takes {} argument(s), got {}",
                params.len(),
                args.len()
            ));
        }
        let bindings: HashMap<&str, Expr> = params.iter().map(String::as_str).zip(args).collect();
        let expanded = substitute(body.clone(), &bindings);
        Ok(Expr::new(expanded.kind, span))
    });
}

fn substitute(body: Expr, bindings: &HashMap<&str, Expr>) -> Expr {
    let result: Result<Expr, Infallible> = body.rewrite(&mut |node| {
        if let ExprKind::Identifier(name) = &node.kind {
            if let Some(arg) = bindings.get(name.as_str()) {
                return Ok(arg.clone());
            }
        }
        Ok(node)
    });
    match result {
        Ok(expr) => expr,
        Err(never) => match never {},
    }
}
