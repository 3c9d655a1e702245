//! Tree traversal and transformation.
//!
//! [`Visitor`] is the read-only traversal surface: one method per node kind
//! with no defaults, so adding a node variant breaks every visitor at
//! compile time instead of at runtime. [`Expr::accept`] performs the
//! dispatch, keeping callers free of type switches.
//!
//! [`Rewriter`] is the transformation surface: its defaults rebuild each
//! node bottom-up and return the original `Arc` whenever no child changed,
//! so a no-op transform is detectable with `Arc::ptr_eq` and allocates
//! nothing.

use std::sync::Arc;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::value::{Value, ValueKind};

/// Read-only visitor over expression trees.
pub trait Visitor {
    type Output;

    fn visit_constant(&mut self, value: &Value) -> Self::Output;
    fn visit_unary(&mut self, op: UnaryOp, operand: &Arc<Expr>) -> Self::Output;
    fn visit_binary(&mut self, op: BinaryOp, left: &Arc<Expr>, right: &Arc<Expr>) -> Self::Output;
    fn visit_member_access(&mut self, instance: Option<&Arc<Expr>>, member: &str) -> Self::Output;
    fn visit_function_call(&mut self, name: &str, arguments: &[Arc<Expr>]) -> Self::Output;
    fn visit_parameter(&mut self, name: &str) -> Self::Output;
    fn visit_convert(&mut self, source: &Arc<Expr>, target: ValueKind) -> Self::Output;
}

impl Expr {
    /// Dispatches to the visitor method matching this node's kind.
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Expr::Constant(value) => visitor.visit_constant(value),
            Expr::Unary { op, operand } => visitor.visit_unary(*op, operand),
            Expr::Binary { op, left, right } => visitor.visit_binary(*op, left, right),
            Expr::MemberAccess { instance, member } => {
                visitor.visit_member_access(instance.as_ref(), member)
            }
            Expr::FunctionCall { name, arguments } => {
                visitor.visit_function_call(name, arguments)
            }
            Expr::Parameter(name) => visitor.visit_parameter(name),
            Expr::Convert { source, target } => visitor.visit_convert(source, *target),
        }
    }
}

/// Transforming visitor with identity-preserving defaults.
///
/// Override the methods for the node kinds a transformation cares about;
/// everything else rebuilds only when a child actually changed.
pub trait Rewriter {
    fn rewrite(&mut self, expr: &Arc<Expr>) -> Arc<Expr> {
        match expr.as_ref() {
            Expr::Constant(value) => self.rewrite_constant(expr, value),
            Expr::Unary { op, operand } => self.rewrite_unary(expr, *op, operand),
            Expr::Binary { op, left, right } => self.rewrite_binary(expr, *op, left, right),
            Expr::MemberAccess { instance, member } => {
                self.rewrite_member_access(expr, instance.as_ref(), member)
            }
            Expr::FunctionCall { name, arguments } => {
                self.rewrite_function_call(expr, name, arguments)
            }
            Expr::Parameter(name) => self.rewrite_parameter(expr, name),
            Expr::Convert { source, target } => self.rewrite_convert(expr, source, *target),
        }
    }

    fn rewrite_constant(&mut self, expr: &Arc<Expr>, _value: &Value) -> Arc<Expr> {
        Arc::clone(expr)
    }

    fn rewrite_parameter(&mut self, expr: &Arc<Expr>, _name: &str) -> Arc<Expr> {
        Arc::clone(expr)
    }

    fn rewrite_unary(&mut self, expr: &Arc<Expr>, op: UnaryOp, operand: &Arc<Expr>) -> Arc<Expr> {
        let rewritten = self.rewrite(operand);
        if Arc::ptr_eq(&rewritten, operand) {
            Arc::clone(expr)
        } else {
            Expr::unary(op, rewritten)
        }
    }

    fn rewrite_binary(
        &mut self,
        expr: &Arc<Expr>,
        op: BinaryOp,
        left: &Arc<Expr>,
        right: &Arc<Expr>,
    ) -> Arc<Expr> {
        let new_left = self.rewrite(left);
        let new_right = self.rewrite(right);
        if Arc::ptr_eq(&new_left, left) && Arc::ptr_eq(&new_right, right) {
            Arc::clone(expr)
        } else {
            Expr::binary(op, new_left, new_right)
        }
    }

    fn rewrite_member_access(
        &mut self,
        expr: &Arc<Expr>,
        instance: Option<&Arc<Expr>>,
        member: &str,
    ) -> Arc<Expr> {
        match instance {
            Some(inst) => {
                let rewritten = self.rewrite(inst);
                if Arc::ptr_eq(&rewritten, inst) {
                    Arc::clone(expr)
                } else {
                    Expr::member(Some(rewritten), member)
                }
            }
            None => Arc::clone(expr),
        }
    }

    fn rewrite_function_call(
        &mut self,
        expr: &Arc<Expr>,
        name: &str,
        arguments: &[Arc<Expr>],
    ) -> Arc<Expr> {
        let rewritten: Vec<Arc<Expr>> = arguments.iter().map(|a| self.rewrite(a)).collect();
        let unchanged = rewritten
            .iter()
            .zip(arguments)
            .all(|(new, old)| Arc::ptr_eq(new, old));
        if unchanged {
            Arc::clone(expr)
        } else {
            Expr::call(name, rewritten)
        }
    }

    fn rewrite_convert(
        &mut self,
        expr: &Arc<Expr>,
        source: &Arc<Expr>,
        target: ValueKind,
    ) -> Arc<Expr> {
        let rewritten = self.rewrite(source);
        if Arc::ptr_eq(&rewritten, source) {
            Arc::clone(expr)
        } else {
            Expr::convert(rewritten, target)
        }
    }
}
