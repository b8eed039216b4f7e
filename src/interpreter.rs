use std::collections::HashMap;
use std::io::Write;

use crate::ast::Program;

mod error;
mod runtime;

pub use error::RuntimeError;
use runtime::{ExecResult, Runtime, ScopeStack};

/// Tree-walking evaluator that executes parsed programs directly.
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    /// Executes the top-level statements against a fresh program-level scope,
    /// writing print output to `out` as it happens. On success the final
    /// program-level scope is handed back for inspection.
    pub fn run(
        &self,
        program: &Program,
        out: &mut dyn Write,
    ) -> Result<HashMap<String, i64>, RuntimeError> {
        let mut scopes = ScopeStack::new();
        let mut runtime = Runtime {
            functions: &program.functions,
            out,
        };
        match runtime.exec_block(&program.statements, &mut scopes)? {
            ExecResult::Continue => {}
            ExecResult::Return(_) => return Err(RuntimeError::ReturnOutsideFunction),
        }
        Ok(scopes.into_globals())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
