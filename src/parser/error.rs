use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected}, got {found} at line {line}, column {column}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Unexpected indentation at line {line}")]
    UnexpectedIndent { line: usize },
    #[error("'else' without a matching 'if' at line {line}")]
    DanglingElse { line: usize },
    #[error("Duplicate function definition '{name}' at line {line}")]
    DuplicateFunction { name: String, line: usize },
    #[error("Nested function definition '{name}' at line {line}")]
    NestedFunctionDefinition { name: String, line: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;
