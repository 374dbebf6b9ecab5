use std::{fmt, io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranslateError>;

/// 1-based location of a token in a source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Position {
        Position { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("{pos}: unexpected character '{ch}'")]
    UnexpectedChar { pos: Position, ch: char },

    #[error("{pos}: invalid number literal '{text}'")]
    InvalidNumber { pos: Position, text: String },

    #[error("{pos}: '{command}' is missing operands")]
    UnexpectedEof { pos: Position, command: String },

    #[error("{pos}: '{command}' expects a number, found '{found}'")]
    ExpectedNumber {
        pos: Position,
        command: String,
        found: String,
    },

    #[error("{pos}: unknown segment '{name}'")]
    UnknownSegment { pos: Position, name: String },

    #[error("{pos}: cannot pop into the constant segment")]
    PopConstant { pos: Position },

    #[error("{pos}: index {index} out of range for {segment} (max {max})")]
    IndexOutOfRange {
        pos: Position,
        segment: String,
        index: u16,
        max: u16,
    },

    #[error("{pos}: '{name}' is not a valid symbol")]
    InvalidSymbol { pos: Position, name: String },

    #[error("{pos}: undefined command '{token}'")]
    UndefinedCommand { pos: Position, token: String },

    #[error("no commands left to read")]
    Exhausted,

    #[error("static segment used before a module name was set")]
    NoModule,

    #[error("cannot generate '{command}': {reason}")]
    Unencodable { command: String, reason: String },

    #[error("in {module}: {source}")]
    InUnit {
        module: String,
        #[source]
        source: Box<TranslateError>,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TranslateError {
    /// Source position of the offending token, if the error has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            TranslateError::UnexpectedChar { pos, .. }
            | TranslateError::InvalidNumber { pos, .. }
            | TranslateError::UnexpectedEof { pos, .. }
            | TranslateError::ExpectedNumber { pos, .. }
            | TranslateError::UnknownSegment { pos, .. }
            | TranslateError::PopConstant { pos }
            | TranslateError::IndexOutOfRange { pos, .. }
            | TranslateError::InvalidSymbol { pos, .. }
            | TranslateError::UndefinedCommand { pos, .. } => Some(*pos),
            TranslateError::InUnit { source, .. } => source.position(),
            TranslateError::Exhausted
            | TranslateError::NoModule
            | TranslateError::Unencodable { .. }
            | TranslateError::Io { .. } => None,
        }
    }

    pub(crate) fn in_unit(self, module: &str) -> TranslateError {
        TranslateError::InUnit {
            module: module.to_string(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_leads_with_position() {
        let err = TranslateError::PopConstant {
            pos: Position::new(3, 1),
        };
        assert_eq!(err.to_string(), "3:1: cannot pop into the constant segment");
    }

    #[test]
    fn unit_wrapper_keeps_position() {
        let err = TranslateError::UnexpectedChar {
            pos: Position::new(2, 7),
            ch: '#',
        }
        .in_unit("Main");
        assert_eq!(err.position(), Some(Position::new(2, 7)));
        assert_eq!(err.to_string(), "in Main: 2:7: unexpected character '#'");
    }
}
