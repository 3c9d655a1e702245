//! Error types for the query-expression engine.
//!
//! Every error carries the character offset in the source text where it was
//! detected. Errors are fail-fast: the lexer and parser never recover or
//! return partial trees.

use thiserror::Error;

/// Errors raised while lexing, parsing, or converting query literals.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Invalid character, unterminated string, or missing required digit.
    #[error("{message} (at position {position})")]
    Lexical { message: String, position: usize },

    /// Unexpected token, unbalanced parenthesis, or trailing input.
    #[error("{message} (at position {position})")]
    Syntax { message: String, position: usize },

    /// A known built-in function invoked with the wrong argument count.
    #[error("function '{function}' requires {expected} argument(s) (at position {position})")]
    FunctionArity {
        function: String,
        expected: String,
        position: usize,
    },

    /// A literal whose text cannot be converted to its declared type.
    #[error("invalid {literal} literal: {cause} (at position {position})")]
    LiteralFormat {
        literal: String,
        cause: String,
        position: usize,
    },

    /// A construct the grammar recognizes but this engine does not implement.
    #[error("{feature} is not supported (at position {position})")]
    NotSupported { feature: String, position: usize },
}

impl QueryError {
    /// Character offset in the source text where the error was detected.
    pub fn position(&self) -> usize {
        match self {
            QueryError::Lexical { position, .. }
            | QueryError::Syntax { position, .. }
            | QueryError::FunctionArity { position, .. }
            | QueryError::LiteralFormat { position, .. }
            | QueryError::NotSupported { position, .. } => *position,
        }
    }

    pub(crate) fn lexical(message: impl Into<String>, position: usize) -> Self {
        QueryError::Lexical {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        QueryError::Syntax {
            message: message.into(),
            position,
        }
    }
}

/// Result type used throughout the engine.
pub type QueryResult<T> = Result<T, QueryError>;
