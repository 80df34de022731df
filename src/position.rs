// ABOUTME: Source position tracking shared by the tokenizer, parser, and evaluator

use std::fmt;

/// A 1-based line and column within the source text.
///
/// `column` counts codepoints within the line, not bytes, so multi-byte
/// UTF-8 sequences don't inflate the reported column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn start() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let p = Position { line: 3, column: 7 };
        assert_eq!(format!("{}", p), "3:7");
    }

    #[test]
    fn test_start() {
        assert_eq!(Position::start(), Position { line: 1, column: 1 });
    }
}
