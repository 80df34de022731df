// ABOUTME: Error types for parse and evaluation failures, each keyed to a source position

use crate::position::Position;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("parse error at {position}: {message}")]
pub struct ParseError {
    pub position: Position,
    pub message: String,
}

impl ParseError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        ParseError {
            position,
            message: message.into(),
        }
    }
}

/// The taxonomy from spec.md §7: every non-parse failure is one of these
/// four kinds, each carrying the position it should be reported at.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("name error at {position}: {message}")]
    Name { position: Position, message: String },

    #[error("type error at {position}: {message}")]
    Type { position: Position, message: String },

    #[error("value error at {position}: {message}")]
    Value { position: Position, message: String },

    #[error("runtime error at {position}: {message}")]
    Runtime { position: Position, message: String },

    /// Not a user-visible diagnostic: unwinds evaluation back to the CLI
    /// driver (or an embedder's top-level call) when `exit()` is invoked.
    #[error("exit({0})")]
    Exit(i32),
}

impl EvalError {
    pub fn name(position: Position, message: impl Into<String>) -> Self {
        EvalError::Name {
            position,
            message: message.into(),
        }
    }

    pub fn type_error(position: Position, message: impl Into<String>) -> Self {
        EvalError::Type {
            position,
            message: message.into(),
        }
    }

    pub fn value(position: Position, message: impl Into<String>) -> Self {
        EvalError::Value {
            position,
            message: message.into(),
        }
    }

    pub fn runtime(position: Position, message: impl Into<String>) -> Self {
        EvalError::Runtime {
            position,
            message: message.into(),
        }
    }

    /// The position to anchor a source-line diagnostic at; `None` for
    /// `Exit`, which is never printed as a diagnostic.
    pub fn position(&self) -> Option<Position> {
        match self {
            EvalError::Name { position, .. }
            | EvalError::Type { position, .. }
            | EvalError::Value { position, .. }
            | EvalError::Runtime { position, .. } => Some(*position),
            EvalError::Exit(_) => None,
        }
    }

    /// The diagnostic label used in `<kind> error at <line>:<col>: <message>`.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Name { .. } => "name",
            EvalError::Type { .. } => "type",
            EvalError::Value { .. } => "value",
            EvalError::Runtime { .. } => "runtime",
            EvalError::Exit(_) => "exit",
        }
    }

    /// The message text alone, without the `<kind> error at <pos>:` prefix.
    pub fn message(&self) -> &str {
        match self {
            EvalError::Name { message, .. }
            | EvalError::Type { message, .. }
            | EvalError::Value { message, .. }
            | EvalError::Runtime { message, .. } => message,
            EvalError::Exit(_) => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let e = ParseError::new(Position { line: 2, column: 5 }, "unexpected token");
        assert_eq!(format!("{e}"), "parse error at 2:5: unexpected token");
    }

    #[test]
    fn test_eval_error_display_and_kind() {
        let e = EvalError::value(Position { line: 1, column: 16 }, "subscript -1 out of range");
        assert_eq!(format!("{e}"), "value error at 1:16: subscript -1 out of range");
        assert_eq!(e.kind(), "value");
        assert_eq!(e.position(), Some(Position { line: 1, column: 16 }));
    }

    #[test]
    fn test_exit_has_no_position() {
        let e = EvalError::Exit(2);
        assert_eq!(e.position(), None);
    }
}
