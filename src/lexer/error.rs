use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("Invalid integer literal '{literal}' at line {line}, column {column}")]
    InvalidIntegerLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("Tabs are not supported for indentation at line {line}")]
    TabIndentation { line: usize },
    #[error("Unclassifiable statement at line {line}: '{text}'")]
    UnclassifiableLine { line: usize, text: String },
}

pub type LexResult<T> = Result<T, LexError>;
