//! Structural fingerprints of expression trees.
//!
//! Two trees have the same fingerprint when they have the same shape and
//! the same names and literals, regardless of where they were written.
//! Every variable-length field is length-prefixed so distinct trees cannot
//! serialize to the same byte stream.

use std::fmt;

use kokiri_types::ast::{CompareOp, Expr, ExprKind, LogicalOp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub [u8; 32]);

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

pub fn fingerprint(expr: &Expr) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(b"kokiri:expr:v1");
    expr.walk(&mut |node| feed(&mut hasher, node));
    Fingerprint(hasher.finalize().into())
}

fn feed_text(hasher: &mut Sha256, text: &str) {
    hasher.update((text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}

fn feed(hasher: &mut Sha256, node: &Expr) {
    match &node.kind {
        ExprKind::Identifier(name) => {
            hasher.update([0u8]);
            feed_text(hasher, name);
        }
        ExprKind::Number(n) => {
            hasher.update([1u8]);
            hasher.update(n.to_bits().to_le_bytes());
        }
        ExprKind::String(s) => {
            hasher.update([2u8]);
            feed_text(hasher, s);
        }
        ExprKind::Bool(b) => hasher.update([3u8, *b as u8]),
        ExprKind::Unary { .. } => hasher.update([4u8]),
        ExprKind::Compare { op, .. } => {
            let op: u8 = match op {
                CompareOp::Eq => 0,
                CompareOp::NotEq => 1,
                CompareOp::Less => 2,
            };
            hasher.update([5u8, op]);
        }
        ExprKind::Logical { op, .. } => {
            let op: u8 = match op {
                LogicalOp::And => 0,
                LogicalOp::Or => 1,
            };
            hasher.update([6u8, op]);
        }
        ExprKind::Call { args, .. } => {
            hasher.update([7u8]);
            hasher.update((args.len() as u64).to_le_bytes());
        }
        ExprKind::Subscript { .. } => hasher.update([8u8]),
        ExprKind::Attribute { attribute, .. } => {
            hasher.update([9u8]);
            feed_text(hasher, &attribute.name);
        }
        ExprKind::Tuple(elems) => {
            hasher.update([10u8]);
            hasher.update((elems.len() as u64).to_le_bytes());
        }
    }
}
