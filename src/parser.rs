use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ast::{BinaryOp, Expr, OrderByClause, OrderDirection, Token, TokenKind, UnaryOp};
use crate::error::{QueryError, QueryResult};
use crate::lexer::Lexer;
use crate::value::Value;

/// The bound parameter names a query may reference.
const PARAMETERS: [&str; 1] = ["$it"];

// The boolean/null keywords resolve to shared singleton nodes, built once
// and never mutated.
static TRUE_LITERAL: Lazy<Arc<Expr>> = Lazy::new(|| Expr::constant(Value::Bool(true)));
static FALSE_LITERAL: Lazy<Arc<Expr>> = Lazy::new(|| Expr::constant(Value::Bool(false)));
static NULL_LITERAL: Lazy<Arc<Expr>> = Lazy::new(|| Expr::constant(Value::Null));

/// Parses a `$filter`-style expression into a tree.
pub fn parse_filter(text: &str) -> QueryResult<Arc<Expr>> {
    tracing::trace!(filter = text, "parsing filter expression");
    Parser::new(text)?.parse_filter()
}

/// Parses a `$orderby`-style comma list into ordered clauses.
pub fn parse_order_by(text: &str) -> QueryResult<Vec<OrderByClause>> {
    tracing::trace!(order_by = text, "parsing order-by clauses");
    Parser::new(text)?.parse_order_by()
}

/// Recursive-descent parser over a [`Lexer`] token stream.
///
/// Each call to [`Parser::parse_filter`] or [`Parser::parse_order_by`] must
/// consume the whole input; trailing tokens are a syntax error.
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new(text: &str) -> QueryResult<Self> {
        Ok(Parser {
            lexer: Lexer::new(text)?,
        })
    }

    pub fn parse_filter(&mut self) -> QueryResult<Arc<Expr>> {
        let expr = self.parse_expression()?;
        self.expect_end()?;
        Ok(expr)
    }

    pub fn parse_order_by(&mut self) -> QueryResult<Vec<OrderByClause>> {
        let mut clauses = Vec::new();
        loop {
            let expression = self.parse_expression()?;
            let mut direction = OrderDirection::Ascending;
            if self.token_identifier_is("asc") {
                self.lexer.next_token()?;
            } else if self.token_identifier_is("desc") {
                self.lexer.next_token()?;
                direction = OrderDirection::Descending;
            }
            clauses.push(OrderByClause::new(expression, direction));
            if self.lexer.token().kind != TokenKind::Comma {
                break;
            }
            self.lexer.next_token()?;
        }
        self.expect_end()?;
        Ok(clauses)
    }

    fn parse_expression(&mut self) -> QueryResult<Arc<Expr>> {
        self.parse_logical_or()
    }

    // 'or' operator
    fn parse_logical_or(&mut self) -> QueryResult<Arc<Expr>> {
        let mut left = self.parse_logical_and()?;
        while self.lexer.token().kind == TokenKind::Or {
            self.lexer.next_token()?;
            let right = self.parse_logical_and()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    // 'and' operator
    fn parse_logical_and(&mut self) -> QueryResult<Arc<Expr>> {
        let mut left = self.parse_comparison()?;
        while self.lexer.token().kind == TokenKind::And {
            self.lexer.next_token()?;
            let right = self.parse_comparison()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    // 'eq', 'ne', 'gt', 'ge', 'lt', 'le' operators
    fn parse_comparison(&mut self) -> QueryResult<Arc<Expr>> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.lexer.token().kind {
                TokenKind::Equal => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                TokenKind::GreaterThan => BinaryOp::GreaterThan,
                TokenKind::GreaterThanOrEqual => BinaryOp::GreaterThanOrEqual,
                TokenKind::LessThan => BinaryOp::LessThan,
                TokenKind::LessThanOrEqual => BinaryOp::LessThanOrEqual,
                _ => break,
            };
            self.lexer.next_token()?;
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    // 'add', 'sub' operators
    fn parse_additive(&mut self) -> QueryResult<Arc<Expr>> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.lexer.token().kind {
                TokenKind::Add => BinaryOp::Add,
                TokenKind::Sub => BinaryOp::Subtract,
                _ => break,
            };
            self.lexer.next_token()?;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    // 'mul', 'div', 'mod' operators
    fn parse_multiplicative(&mut self) -> QueryResult<Arc<Expr>> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.lexer.token().kind {
                TokenKind::Multiply => BinaryOp::Multiply,
                TokenKind::Divide => BinaryOp::Divide,
                TokenKind::Modulo => BinaryOp::Modulo,
                _ => break,
            };
            self.lexer.next_token()?;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    // '-', 'not' unary operators
    fn parse_unary(&mut self) -> QueryResult<Arc<Expr>> {
        let kind = self.lexer.token().kind;
        if kind == TokenKind::Minus || kind == TokenKind::Not {
            let op_position = self.lexer.token().position;
            self.lexer.next_token()?;
            if kind == TokenKind::Minus && self.lexer.token().kind.is_numeric_literal() {
                // '-5' is the single constant -5, not Negate(5); some
                // literals (i32::MIN and friends) have no positive form
                self.lexer.prefix_minus(op_position);
                return self.parse_primary();
            }
            let operand = self.parse_unary()?;
            let op = if kind == TokenKind::Minus {
                UnaryOp::Negate
            } else {
                UnaryOp::Not
            };
            return Ok(Expr::unary(op, operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> QueryResult<Arc<Expr>> {
        let mut expr = self.parse_primary_start()?;
        loop {
            let kind = self.lexer.token().kind;
            if kind != TokenKind::Dot && kind != TokenKind::Slash {
                break;
            }
            self.lexer.next_token()?;
            match self.lexer.token().kind {
                TokenKind::Any => {
                    return Err(self.not_supported("'any' expressions"));
                }
                TokenKind::All => {
                    return Err(self.not_supported("'all' expressions"));
                }
                TokenKind::Star => {
                    return Err(self.not_supported("'*' member access"));
                }
                TokenKind::Identifier => {
                    if self.lexer.peek_token()?.kind == TokenKind::OpenParen {
                        let token = self.lexer.token().clone();
                        self.lexer.next_token()?;
                        expr = self.parse_function(token.text, token.position)?;
                    } else {
                        expr = self.parse_member_access(Some(expr))?;
                    }
                }
                _ => {
                    expr = self.parse_member_access(Some(expr))?;
                }
            }
        }
        Ok(expr)
    }

    fn parse_primary_start(&mut self) -> QueryResult<Arc<Expr>> {
        match self.lexer.token().kind {
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::OpenParen => self.parse_paren_expression(),
            TokenKind::StringLiteral => self.parse_string_literal(),
            TokenKind::BooleanLiteral => self.parse_boolean_literal(),
            TokenKind::NullLiteral => {
                self.lexer.next_token()?;
                Ok(Arc::clone(&NULL_LITERAL))
            }
            TokenKind::IntegerLiteral
            | TokenKind::Int64Literal
            | TokenKind::SingleLiteral
            | TokenKind::DoubleLiteral
            | TokenKind::DecimalLiteral => self.parse_numeric_literal(),
            TokenKind::DateTimeLiteral
            | TokenKind::DateTimeOffsetLiteral
            | TokenKind::TimeLiteral
            | TokenKind::GuidLiteral
            | TokenKind::BinaryLiteral => self.parse_type_literal(),
            TokenKind::GeographyLiteral | TokenKind::GeometryLiteral => {
                Err(self.not_supported("geospatial literals"))
            }
            TokenKind::Any => Err(self.not_supported("'any' expressions")),
            TokenKind::All => Err(self.not_supported("'all' expressions")),
            TokenKind::Star => Err(self.not_supported("'*' member access")),
            _ => Err(QueryError::syntax(
                "expression expected",
                self.lexer.token().position,
            )),
        }
    }

    fn parse_paren_expression(&mut self) -> QueryResult<Arc<Expr>> {
        self.validate_token(TokenKind::OpenParen, "'(' expected")?;
        self.lexer.next_token()?;
        let expr = self.parse_expression()?;
        self.validate_token(TokenKind::CloseParen, "')' or operator expected")?;
        self.lexer.next_token()?;
        Ok(expr)
    }

    fn parse_identifier(&mut self) -> QueryResult<Arc<Expr>> {
        // the function-call form is decided one token ahead of the name
        if self.lexer.peek_token()?.kind == TokenKind::OpenParen {
            let token = self.lexer.token().clone();
            self.lexer.next_token()?;
            return self.parse_function(token.text, token.position);
        }
        self.parse_member_access(None)
    }

    fn parse_member_access(&mut self, instance: Option<Arc<Expr>>) -> QueryResult<Arc<Expr>> {
        let token = self.lexer.token().clone();
        if token.kind != TokenKind::Identifier {
            return Err(QueryError::syntax("identifier expected", token.position));
        }
        self.lexer.next_token()?;
        if instance.is_none() && PARAMETERS.contains(&token.text.as_str()) {
            return Ok(Expr::parameter(token.text));
        }
        Ok(Expr::member(instance, token.text))
    }

    fn parse_function(&mut self, name: String, position: usize) -> QueryResult<Arc<Expr>> {
        let arguments = self.parse_argument_list()?;
        validate_function(&name, arguments.len(), position)?;
        Ok(Expr::call(name, arguments))
    }

    fn parse_argument_list(&mut self) -> QueryResult<Vec<Arc<Expr>>> {
        self.validate_token(TokenKind::OpenParen, "'(' expected")?;
        self.lexer.next_token()?;
        let arguments = if self.lexer.token().kind != TokenKind::CloseParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        self.validate_token(TokenKind::CloseParen, "')' or ',' expected")?;
        self.lexer.next_token()?;
        Ok(arguments)
    }

    fn parse_arguments(&mut self) -> QueryResult<Vec<Arc<Expr>>> {
        let mut arguments = Vec::new();
        loop {
            arguments.push(self.parse_expression()?);
            if self.lexer.token().kind != TokenKind::Comma {
                break;
            }
            self.lexer.next_token()?;
        }
        Ok(arguments)
    }

    fn parse_boolean_literal(&mut self) -> QueryResult<Arc<Expr>> {
        let node = if self.lexer.token().text == "true" {
            Arc::clone(&TRUE_LITERAL)
        } else {
            Arc::clone(&FALSE_LITERAL)
        };
        self.lexer.next_token()?;
        Ok(node)
    }

    fn parse_string_literal(&mut self) -> QueryResult<Arc<Expr>> {
        let token = self.lexer.token().clone();
        let inner = strip_quotes(&token.text)
            .ok_or_else(|| QueryError::syntax("string literal expected", token.position))?;
        let value = decode_literal_text(&inner.replace("''", "'"));
        self.lexer.next_token()?;
        Ok(Expr::constant(Value::String(value)))
    }

    fn parse_numeric_literal(&mut self) -> QueryResult<Arc<Expr>> {
        let token = self.lexer.token().clone();
        let value = numeric_value(&token)?;
        self.lexer.next_token()?;
        Ok(Expr::constant(value))
    }

    fn parse_type_literal(&mut self) -> QueryResult<Arc<Expr>> {
        let token = self.lexer.token().clone();
        let value = match token.kind {
            TokenKind::DateTimeLiteral => {
                let body = literal_body(&token, "datetime")?;
                Value::DateTime(
                    parse_date_time(&body)
                        .map_err(|cause| literal_error("datetime", cause, token.position))?,
                )
            }
            TokenKind::DateTimeOffsetLiteral => {
                let body = literal_body(&token, "datetimeoffset")?;
                Value::DateTimeOffset(
                    DateTime::parse_from_rfc3339(&body).map_err(|e| {
                        literal_error("datetimeoffset", e.to_string(), token.position)
                    })?,
                )
            }
            TokenKind::TimeLiteral => {
                let body = literal_body(&token, "time")?;
                Value::Time(
                    parse_time(&body)
                        .map_err(|cause| literal_error("time", cause, token.position))?,
                )
            }
            TokenKind::GuidLiteral => {
                let body = literal_body(&token, "guid")?;
                Value::Guid(
                    Uuid::parse_str(&body)
                        .map_err(|e| literal_error("guid", e.to_string(), token.position))?,
                )
            }
            TokenKind::BinaryLiteral => Value::Binary(binary_value(&token)?),
            _ => {
                return Err(QueryError::syntax(
                    "literal expected",
                    token.position,
                ));
            }
        };
        self.lexer.next_token()?;
        Ok(Expr::constant(value))
    }

    fn token_identifier_is(&self, text: &str) -> bool {
        let token = self.lexer.token();
        token.kind == TokenKind::Identifier && token.text == text
    }

    fn validate_token(&self, kind: TokenKind, message: &str) -> QueryResult<()> {
        if self.lexer.token().kind != kind {
            return Err(QueryError::syntax(message, self.lexer.token().position));
        }
        Ok(())
    }

    fn expect_end(&self) -> QueryResult<()> {
        self.validate_token(TokenKind::End, "expected end of query expression")
    }

    fn not_supported(&self, feature: &str) -> QueryError {
        QueryError::NotSupported {
            feature: feature.to_string(),
            position: self.lexer.token().position,
        }
    }
}

/// Checks a known built-in's argument count; unknown names pass through so
/// server-defined functions keep working.
fn validate_function(name: &str, argc: usize, position: usize) -> QueryResult<()> {
    let required = match name {
        "day" | "month" | "year" | "hour" | "minute" | "second" | "floor" | "ceiling"
        | "round" | "tolower" | "toupper" | "length" | "trim" => 1,
        "substringof" | "startswith" | "endswith" | "concat" | "indexof" => 2,
        "replace" => 3,
        "substring" => {
            if argc != 2 && argc != 3 {
                return Err(QueryError::FunctionArity {
                    function: name.to_string(),
                    expected: "2 or 3".to_string(),
                    position,
                });
            }
            return Ok(());
        }
        _ => return Ok(()),
    };
    if argc != required {
        return Err(QueryError::FunctionArity {
            function: name.to_string(),
            expected: required.to_string(),
            position,
        });
    }
    Ok(())
}

fn numeric_value(token: &Token) -> QueryResult<Value> {
    let text = token.text.as_str();
    match token.kind {
        TokenKind::IntegerLiteral => text
            .parse::<i32>()
            .map(Value::Int32)
            .map_err(|e| literal_error("integer", e.to_string(), token.position)),
        TokenKind::Int64Literal => strip_numeric_suffix(text, 'l')
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| literal_error("int64", e.to_string(), token.position)),
        TokenKind::SingleLiteral => strip_numeric_suffix(text, 'f')
            .parse::<f32>()
            .map(Value::Single)
            .map_err(|e| literal_error("single", e.to_string(), token.position)),
        TokenKind::DoubleLiteral => strip_numeric_suffix(text, 'd')
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|e| literal_error("double", e.to_string(), token.position)),
        TokenKind::DecimalLiteral => {
            let trimmed = strip_numeric_suffix(text, 'm');
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map(Value::Decimal)
                .map_err(|e| literal_error("decimal", e.to_string(), token.position))
        }
        _ => Err(QueryError::syntax("numeric literal expected", token.position)),
    }
}

fn binary_value(token: &Token) -> QueryResult<Vec<u8>> {
    let text = token.text.as_str();
    let digits = if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        rest.to_string()
    } else {
        let body = text
            .strip_prefix("binary")
            .or_else(|| text.strip_prefix('X'))
            .and_then(strip_quotes)
            .ok_or_else(|| QueryError::syntax("malformed binary literal", token.position))?;
        body.to_string()
    };
    hex::decode(&digits).map_err(|e| literal_error("binary", e.to_string(), token.position))
}

/// Strips the `type` prefix and surrounding quotes from a
/// type-constructed literal token.
fn literal_body(token: &Token, prefix: &str) -> QueryResult<String> {
    token
        .text
        .strip_prefix(prefix)
        .and_then(strip_quotes)
        .map(str::to_string)
        .ok_or_else(|| {
            QueryError::syntax(format!("malformed {prefix} literal"), token.position)
        })
}

fn literal_error(literal: &str, cause: impl Into<String>, position: usize) -> QueryError {
    QueryError::LiteralFormat {
        literal: literal.to_string(),
        cause: cause.into(),
        position,
    }
}

fn strip_quotes(text: &str) -> Option<&str> {
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

/// Case-insensitive single-character suffix strip for numeric literals.
fn strip_numeric_suffix(text: &str, suffix: char) -> &str {
    text.strip_suffix(suffix)
        .or_else(|| text.strip_suffix(suffix.to_ascii_uppercase()))
        .unwrap_or(text)
}

/// Undoes the canonicalizer's percent-escaping; invalid sequences are
/// passed through untouched.
fn decode_literal_text(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

/// `datetime'...'` accepts RFC 3339 forms and naive date/time forms;
/// naive values are taken as UTC.
fn parse_date_time(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(format!("unrecognized date/time text '{text}'"))
}

fn parse_time(text: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|e| e.to_string())
}
