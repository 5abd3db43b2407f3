//! Expression tree for rule text.
//!
//! Every node carries a [`Span`]. Children are exclusively owned, so a tree
//! is immutable once the parser hands it out; passes that change the tree
//! consume it and build a new one through [`Expr::rewrite`].

use crate::Span;
use std::fmt;

/// A spanned name, used for attribute access.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    Number(f64),
    String(String),
    Bool(bool),

    /// `not operand`
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `left == right`, `left != right`, `left < right`
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `left and right`, `left or right`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `callee(args...)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `target[index]`
    Subscript {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    /// `target.attribute`
    Attribute {
        target: Box<Expr>,
        attribute: Ident,
    },
    /// `(a, b, ...)`
    Tuple(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    NotEq,
    Less,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Less => "<",
        }
    }
}

impl LogicalOp {
    pub fn keyword(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn boolean(value: bool, span: Span) -> Self {
        Self::new(ExprKind::Bool(value), span)
    }

    pub fn identifier(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Identifier(name.into()), span)
    }

    pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Self {
        let span = left.span.merge(right.span);
        Self::new(
            ExprKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        let span = left.span.merge(right.span);
        Self::new(
            ExprKind::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn not(operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
            span,
        )
    }

    /// Whether this node is a literal (number, string or boolean).
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Bool(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ExprKind::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// The callee name when this is a call through a plain identifier.
    pub fn call_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Call { callee, .. } => match &callee.kind {
                ExprKind::Identifier(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Identifier(_)
            | ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Bool(_) => Vec::new(),
            ExprKind::Unary { operand, .. } => vec![operand],
            ExprKind::Compare { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                vec![left, right]
            }
            ExprKind::Call { callee, args } => {
                std::iter::once(callee.as_ref()).chain(args.iter()).collect()
            }
            ExprKind::Subscript { target, index } => vec![target, index],
            ExprKind::Attribute { target, .. } => vec![target],
            ExprKind::Tuple(elems) => elems.iter().collect(),
        }
    }

    /// Visit every node in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Rebuild the tree bottom-up.
    ///
    /// Children are rewritten before their parent, so `f` always sees a node
    /// whose subtrees have already been through it. The first error aborts
    /// the rewrite.
    pub fn rewrite<E>(self, f: &mut impl FnMut(Expr) -> Result<Expr, E>) -> Result<Expr, E> {
        let Expr { kind, span } = self;
        let kind = match kind {
            leaf @ (ExprKind::Identifier(_)
            | ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Bool(_)) => leaf,
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: Box::new(operand.rewrite(f)?),
            },
            ExprKind::Compare { op, left, right } => ExprKind::Compare {
                op,
                left: Box::new(left.rewrite(f)?),
                right: Box::new(right.rewrite(f)?),
            },
            ExprKind::Logical { op, left, right } => ExprKind::Logical {
                op,
                left: Box::new(left.rewrite(f)?),
                right: Box::new(right.rewrite(f)?),
            },
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: Box::new(callee.rewrite(f)?),
                args: args
                    .into_iter()
                    .map(|arg| arg.rewrite(f))
                    .collect::<Result<_, _>>()?,
            },
            ExprKind::Subscript { target, index } => ExprKind::Subscript {
                target: Box::new(target.rewrite(f)?),
                index: Box::new(index.rewrite(f)?),
            },
            ExprKind::Attribute { target, attribute } => ExprKind::Attribute {
                target: Box::new(target.rewrite(f)?),
                attribute,
            },
            ExprKind::Tuple(elems) => ExprKind::Tuple(
                elems
                    .into_iter()
                    .map(|e| e.rewrite(f))
                    .collect::<Result<_, _>>()?,
            ),
        };
        f(Expr { kind, span })
    }

    /// Binding strength used when rendering; higher binds tighter.
    fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Logical {
                op: LogicalOp::Or, ..
            } => 1,
            ExprKind::Logical {
                op: LogicalOp::And, ..
            } => 2,
            ExprKind::Unary { .. } => 3,
            ExprKind::Compare { .. } => 4,
            _ => 5,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Renders canonical rule text that parses back to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = self.precedence();
        match &self.kind {
            ExprKind::Identifier(name) => f.write_str(name),
            ExprKind::Number(n) => write!(f, "{n}"),
            ExprKind::String(s) => write!(f, "'{s}'"),
            ExprKind::Bool(true) => f.write_str("True"),
            ExprKind::Bool(false) => f.write_str("False"),
            ExprKind::Unary { operand, .. } => {
                f.write_str("not ")?;
                write_operand(f, operand, operand.precedence() < prec)
            }
            ExprKind::Compare { op, left, right } => {
                write_operand(f, left, left.precedence() <= prec)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, right.precedence() <= prec)
            }
            // Combinator chains nest to the right, so a left operand of the
            // same strength needs parentheses and a right one does not.
            ExprKind::Logical { op, left, right } => {
                write_operand(f, left, left.precedence() <= prec)?;
                write!(f, " {} ", op.keyword())?;
                write_operand(f, right, right.precedence() < prec)
            }
            ExprKind::Call { callee, args } => {
                write_operand(f, callee, callee.precedence() < 5)?;
                f.write_str("(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            ExprKind::Subscript { target, index } => {
                write_operand(f, target, target.precedence() < 5)?;
                write!(f, "[{index}]")
            }
            ExprKind::Attribute { target, attribute } => {
                write_operand(f, target, target.precedence() < 5)?;
                write!(f, ".{}", attribute.name)
            }
            ExprKind::Tuple(elems) => {
                f.write_str("(")?;
                write_list(f, elems)?;
                if elems.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}
