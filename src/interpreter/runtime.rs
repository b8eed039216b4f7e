use std::collections::HashMap;
use std::io::Write;

use crate::ast::{BinaryOperator, Expression, PrintPart, Statement};

use super::RuntimeError;

/// Control-flow marker for statement execution.
pub(super) enum ExecResult {
    Continue,
    Return(i64),
}

/// Stack of variable scopes, one per active frame. Lookups and stores target
/// the top frame only; there is no fallback to an enclosing scope.
pub(super) struct ScopeStack {
    frames: Vec<HashMap<String, i64>>,
}

impl ScopeStack {
    pub(super) fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub(super) fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub(super) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn top(&self) -> &HashMap<String, i64> {
        self.frames.last().expect("scope stack is never empty")
    }

    fn top_mut(&mut self) -> &mut HashMap<String, i64> {
        self.frames.last_mut().expect("scope stack is never empty")
    }

    fn load(&self, name: &str) -> Option<i64> {
        self.top().get(name).copied()
    }

    fn store(&mut self, name: &str, value: i64) {
        self.top_mut().insert(name.to_string(), value);
    }

    /// Consumes the stack, yielding the program-level scope.
    pub(super) fn into_globals(mut self) -> HashMap<String, i64> {
        self.frames.swap_remove(0)
    }
}

/// Walks statements and expressions against the scope stack, writing print
/// output to the sink as soon as each print statement executes.
pub(super) struct Runtime<'a> {
    pub(super) functions: &'a HashMap<String, Vec<Statement>>,
    pub(super) out: &'a mut dyn Write,
}

impl<'a> Runtime<'a> {
    pub(super) fn exec_block(
        &mut self,
        body: &[Statement],
        scopes: &mut ScopeStack,
    ) -> Result<ExecResult, RuntimeError> {
        // Execute statements in order until one returns, then bubble that up.
        for statement in body {
            match self.exec_statement(statement, scopes)? {
                ExecResult::Continue => {}
                ExecResult::Return(value) => return Ok(ExecResult::Return(value)),
            }
        }
        Ok(ExecResult::Continue)
    }

    fn exec_statement(
        &mut self,
        statement: &Statement,
        scopes: &mut ScopeStack,
    ) -> Result<ExecResult, RuntimeError> {
        match statement {
            Statement::FunctionDef { .. } => {
                // Already registered by the parser; nothing happens at run time.
                Ok(ExecResult::Continue)
            }
            Statement::Assign { name, value } => {
                let value = self.eval_expression(value, scopes)?;
                scopes.store(name, value);
                Ok(ExecResult::Continue)
            }
            Statement::Print { parts } => {
                let mut rendered = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        PrintPart::Literal(text) => rendered.push(text.clone()),
                        PrintPart::Expr(expr) => {
                            rendered.push(self.eval_expression(expr, scopes)?.to_string());
                        }
                    }
                }
                writeln!(self.out, "{}", rendered.join(" "))?;
                Ok(ExecResult::Continue)
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.eval_expression(condition, scopes)?;
                let body = if condition != 0 { then_body } else { else_body };
                // Branches run in the current frame; conditionals get no scope.
                self.exec_block(body, scopes)
            }
            Statement::Return(value) => {
                let value = self.eval_expression(value, scopes)?;
                Ok(ExecResult::Return(value))
            }
            Statement::Expr(expr) => {
                self.eval_expression(expr, scopes)?;
                Ok(ExecResult::Continue)
            }
        }
    }

    fn eval_expression(
        &mut self,
        expr: &Expression,
        scopes: &mut ScopeStack,
    ) -> Result<i64, RuntimeError> {
        match expr {
            Expression::Integer(value) => Ok(*value),
            Expression::Identifier(name) => {
                scopes
                    .load(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable {
                        name: name.to_string(),
                    })
            }
            Expression::BinaryOp { left, op, right } => {
                let lhs = self.eval_expression(left, scopes)?;
                let rhs = self.eval_expression(right, scopes)?;
                apply_binary_op(*op, lhs, rhs)
            }
            Expression::Call { name, args } => self.eval_call(name, args, scopes),
        }
    }

    fn eval_call(
        &mut self,
        name: &str,
        args: &[Expression],
        scopes: &mut ScopeStack,
    ) -> Result<i64, RuntimeError> {
        let functions = self.functions;
        let body = functions
            .get(name)
            .ok_or_else(|| RuntimeError::UndefinedFunction {
                name: name.to_string(),
            })?;

        // Arguments are evaluated in the caller's frame and discarded;
        // definitions declare no parameters.
        for arg in args {
            self.eval_expression(arg, scopes)?;
        }

        scopes.push_frame();
        let result = self.exec_block(body, scopes);
        scopes.pop_frame();

        match result? {
            ExecResult::Return(value) => Ok(value),
            ExecResult::Continue => Ok(0),
        }
    }
}

fn apply_binary_op(op: BinaryOperator, lhs: i64, rhs: i64) -> Result<i64, RuntimeError> {
    let value = match op {
        BinaryOperator::Add => lhs.checked_add(rhs),
        BinaryOperator::Sub => lhs.checked_sub(rhs),
        BinaryOperator::Mul => lhs.checked_mul(rhs),
        BinaryOperator::Div => {
            if rhs == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            // i64 division truncates toward zero.
            lhs.checked_div(rhs)
        }
        BinaryOperator::Less => Some((lhs < rhs) as i64),
        BinaryOperator::Greater => Some((lhs > rhs) as i64),
        BinaryOperator::LessEqual => Some((lhs <= rhs) as i64),
        BinaryOperator::GreaterEqual => Some((lhs >= rhs) as i64),
        BinaryOperator::Equal => Some((lhs == rhs) as i64),
        BinaryOperator::NotEqual => Some((lhs != rhs) as i64),
    };
    value.ok_or(RuntimeError::IntegerOverflow)
}
