//! Canonical query-string rendering.
//!
//! [`ODataWriter`] serializes an expression tree back into the exact wire
//! form. Every binary node is fully parenthesized, so the output re-parses
//! to a structurally identical tree regardless of operator precedence.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::ast::{BinaryOp, Expr, OrderByClause, OrderDirection, UnaryOp};
use crate::value::{Value, ValueKind};
use crate::visitor::Visitor;

/// Characters left unescaped in literal bodies: RFC 3986 unreserved, the
/// marks the backend tolerates, and `:` so date/time literals stay readable
/// on the wire.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b':');

/// Renders a filter tree into its canonical query string.
pub fn render(expr: &Expr) -> String {
    tracing::trace!("rendering expression tree");
    let mut writer = ODataWriter::new();
    expr.accept(&mut writer);
    writer.into_string()
}

/// Renders order-by clauses into the canonical `$orderby` value:
/// comma-joined expressions, descending ones suffixed with ` desc`.
pub fn render_order_by(clauses: &[OrderByClause]) -> String {
    let parts: Vec<String> = clauses
        .iter()
        .map(|clause| match clause.direction {
            OrderDirection::Ascending => render(&clause.expression),
            OrderDirection::Descending => format!("{} desc", render(&clause.expression)),
        })
        .collect();
    parts.join(",")
}

/// Visitor that appends the wire form of each node into a string buffer.
#[derive(Default)]
pub struct ODataWriter {
    buffer: String,
}

impl ODataWriter {
    pub fn new() -> Self {
        ODataWriter::default()
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl Visitor for ODataWriter {
    type Output = ();

    fn visit_constant(&mut self, value: &Value) {
        self.buffer.push_str(&to_odata_literal(value));
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: &Arc<Expr>) {
        match op {
            UnaryOp::Not => {
                self.buffer.push_str("not(");
                operand.accept(self);
                self.buffer.push(')');
            }
            UnaryOp::Negate => {
                self.buffer.push('-');
                operand.accept(self);
            }
        }
    }

    fn visit_binary(&mut self, op: BinaryOp, left: &Arc<Expr>, right: &Arc<Expr>) {
        self.buffer.push('(');
        left.accept(self);
        self.buffer.push(' ');
        self.buffer.push_str(op.odata_keyword());
        self.buffer.push(' ');
        right.accept(self);
        self.buffer.push(')');
    }

    fn visit_member_access(&mut self, instance: Option<&Arc<Expr>>, member: &str) {
        if let Some(instance) = instance {
            instance.accept(self);
            self.buffer.push('/');
        }
        self.buffer.push_str(member);
    }

    fn visit_function_call(&mut self, name: &str, arguments: &[Arc<Expr>]) {
        self.buffer.push_str(name);
        self.buffer.push('(');
        let mut separator = "";
        for argument in arguments {
            self.buffer.push_str(separator);
            argument.accept(self);
            separator = ",";
        }
        self.buffer.push(')');
    }

    fn visit_parameter(&mut self, name: &str) {
        self.buffer.push_str(name);
    }

    fn visit_convert(&mut self, source: &Arc<Expr>, _target: ValueKind) {
        // coercions are not part of the wire grammar
        source.accept(self);
    }
}

/// Converts a constant value into its canonical literal text.
pub fn to_odata_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Byte(b) => format!("{b:02X}"),
        Value::SByte(v) => v.to_string(),
        Value::Int16(v) => v.to_string(),
        Value::UInt16(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        // values wider than i32 travel with the 64-bit suffix
        Value::UInt32(v) => format!("{v}L"),
        Value::Int64(v) => format!("{v}L"),
        Value::UInt64(v) => format!("{v}L"),
        Value::Single(v) => format_single(*v),
        Value::Double(v) => format_double(*v),
        Value::Decimal(d) => format!("{d}M"),
        Value::Char(c) => {
            let doubled = if *c == '\'' {
                "''".to_string()
            } else {
                c.to_string()
            };
            format!("'{}'", escape(&doubled))
        }
        Value::String(s) => format!("'{}'", escape(&s.replace('\'', "''"))),
        Value::Binary(bytes) => format!("binary'{}'", hex::encode_upper(bytes)),
        Value::Guid(g) => format!("guid'{g}'"),
        Value::DateTime(dt) => {
            let text = format!("{}Z", dt.format("%Y-%m-%dT%H:%M:%S%.3f"));
            format!("datetime'{}'", escape(&text))
        }
        Value::DateTimeOffset(dt) => {
            format!("datetimeoffset'{}'", escape(&format_round_trip(dt)))
        }
        Value::Time(t) => format!("time'{}'", format_time(t)),
    }
}

fn escape(text: &str) -> String {
    utf8_percent_encode(text, QUERY_ESCAPE).to_string()
}

fn format_double(v: f64) -> String {
    if v.is_infinite() {
        return if v > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if v.is_nan() {
        return "NaN".to_string();
    }
    let text = v.to_string();
    if text.contains('.') || text.contains('e') || text.contains('E') {
        text
    } else {
        format!("{text}.0")
    }
}

fn format_single(v: f32) -> String {
    if v.is_infinite() {
        return if v > 0.0 { "INFf" } else { "-INFf" }.to_string();
    }
    if v.is_nan() {
        return "NaNf".to_string();
    }
    format!("{v}f")
}

/// ISO-8601 round-trip form: seven fractional digits and an explicit
/// `±hh:mm` offset.
fn format_round_trip(dt: &DateTime<FixedOffset>) -> String {
    let ticks = dt.time().nanosecond() % 1_000_000_000 / 100;
    format!(
        "{}.{ticks:07}{}",
        dt.format("%Y-%m-%dT%H:%M:%S"),
        dt.format("%:z")
    )
}

fn format_time(t: &NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.f").to_string()
    }
}
