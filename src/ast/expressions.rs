use std::sync::Arc;

use crate::ast::operators::{BinaryOp, UnaryOp};
use crate::value::{Value, ValueKind};

/// A node in the immutable query expression tree.
///
/// Trees are built bottom-up by the parser (or by consumers through the
/// constructor helpers below) and never mutated; transformation produces new
/// nodes. Children are `Arc`-shared so an unchanged subtree can be reused
/// as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A typed literal value.
    Constant(Value),

    /// `-expr` or `not expr`.
    Unary { op: UnaryOp, operand: Arc<Expr> },

    /// A logical, comparison, or arithmetic operation.
    Binary {
        op: BinaryOp,
        left: Arc<Expr>,
        right: Arc<Expr>,
    },

    /// A field access. `instance` is `None` for a top-level field of the
    /// implicit query row; `a/b` nests as member `b` on instance `a`.
    MemberAccess {
        instance: Option<Arc<Expr>>,
        member: String,
    },

    /// A built-in or server-defined function invocation.
    FunctionCall {
        name: String,
        arguments: Vec<Arc<Expr>>,
    },

    /// A bound query-root reference (`$it`), kept distinct from member
    /// access so the spelling survives a round trip.
    Parameter(String),

    /// An explicit type coercion. Constructed by consumers, never by the
    /// parser; invisible in the canonical rendering.
    Convert {
        source: Arc<Expr>,
        target: ValueKind,
    },
}

impl Expr {
    pub fn constant(value: Value) -> Arc<Expr> {
        Arc::new(Expr::Constant(value))
    }

    pub fn unary(op: UnaryOp, operand: Arc<Expr>) -> Arc<Expr> {
        Arc::new(Expr::Unary { op, operand })
    }

    pub fn negate(operand: Arc<Expr>) -> Arc<Expr> {
        Expr::unary(UnaryOp::Negate, operand)
    }

    pub fn not(operand: Arc<Expr>) -> Arc<Expr> {
        Expr::unary(UnaryOp::Not, operand)
    }

    pub fn binary(op: BinaryOp, left: Arc<Expr>, right: Arc<Expr>) -> Arc<Expr> {
        Arc::new(Expr::Binary { op, left, right })
    }

    pub fn and(left: Arc<Expr>, right: Arc<Expr>) -> Arc<Expr> {
        Expr::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: Arc<Expr>, right: Arc<Expr>) -> Arc<Expr> {
        Expr::binary(BinaryOp::Or, left, right)
    }

    pub fn equal(left: Arc<Expr>, right: Arc<Expr>) -> Arc<Expr> {
        Expr::binary(BinaryOp::Equal, left, right)
    }

    pub fn member(instance: Option<Arc<Expr>>, name: impl Into<String>) -> Arc<Expr> {
        Arc::new(Expr::MemberAccess {
            instance,
            member: name.into(),
        })
    }

    /// A top-level field of the implicit query row.
    pub fn field(name: impl Into<String>) -> Arc<Expr> {
        Expr::member(None, name)
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Arc<Expr>>) -> Arc<Expr> {
        Arc::new(Expr::FunctionCall {
            name: name.into(),
            arguments,
        })
    }

    pub fn parameter(name: impl Into<String>) -> Arc<Expr> {
        Arc::new(Expr::Parameter(name.into()))
    }

    pub fn convert(source: Arc<Expr>, target: ValueKind) -> Arc<Expr> {
        Arc::new(Expr::Convert { source, target })
    }
}
