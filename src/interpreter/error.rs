use thiserror::Error;

/// Typed errors produced while executing a parsed program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow while evaluating expression")]
    IntegerOverflow,
    #[error("Return outside of function")]
    ReturnOutsideFunction,
    #[error("Failed to write program output")]
    Output(#[from] std::io::Error),
}
