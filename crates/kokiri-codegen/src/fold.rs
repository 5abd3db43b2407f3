//! Constant folding.
//!
//! Only rewrites whose result is identical to what the VM would compute
//! are applied. Comparisons that would raise a type error at run time
//! are left in place so the error still surfaces.

use std::convert::Infallible;

use kokiri_types::ast::{CompareOp, Expr, ExprKind, LogicalOp, UnaryOp};

pub fn fold_constants(expr: Expr) -> Expr {
    let folded: Result<Expr, Infallible> = expr.rewrite(&mut |node| Ok(fold_node(node)));
    match folded {
        Ok(expr) => expr,
        Err(never) => match never {},
    }
}

fn fold_node(node: Expr) -> Expr {
    let span = node.span;
    match node.kind {
        ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } => match operand.as_bool() {
            Some(b) => Expr::boolean(!b, span),
            None => Expr::not(*operand, span),
        },
        ExprKind::Compare { op, left, right } => match compare_literals(op, &left.kind, &right.kind) {
            Some(b) => Expr::boolean(b, span),
            None => Expr::new(ExprKind::Compare { op, left, right }, span),
        },
        // Only a literal on the left can decide the result: the right
        // operand may fail at run time and must still be evaluated.
        ExprKind::Logical { op, left, right } => match (op, left.as_bool()) {
            (LogicalOp::And, Some(false)) => Expr::boolean(false, span),
            (LogicalOp::Or, Some(true)) => Expr::boolean(true, span),
            (_, Some(_)) => *right,
            (_, None) => Expr::new(ExprKind::Logical { op, left, right }, span),
        },
        kind => Expr::new(kind, span),
    }
}

fn compare_literals(op: CompareOp, left: &ExprKind, right: &ExprKind) -> Option<bool> {
    match (left, right) {
        (ExprKind::Number(a), ExprKind::Number(b)) => Some(match op {
            CompareOp::Eq => a == b,
            CompareOp::NotEq => a != b,
            CompareOp::Less => a < b,
        }),
        (ExprKind::String(a), ExprKind::String(b)) => match op {
            CompareOp::Eq => Some(a == b),
            CompareOp::NotEq => Some(a != b),
            CompareOp::Less => None,
        },
        (ExprKind::Bool(a), ExprKind::Bool(b)) => match op {
            CompareOp::Eq => Some(a == b),
            CompareOp::NotEq => Some(a != b),
            CompareOp::Less => None,
        },
        _ => None,
    }
}
