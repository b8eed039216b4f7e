use std::collections::HashMap;

use crate::ast::{BinaryOperator, Expression, PrintPart, Program, Statement};
use crate::token::{Token, TokenKind};

mod error;

pub use error::{ParseError, ParseResult};

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
    functions: HashMap<String, Vec<Statement>>,
    in_function: bool,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            position: 0,
            functions: HashMap::new(),
            in_function: false,
        }
    }

    fn parse_program(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        loop {
            self.consume_newlines();
            if matches!(self.current_kind(), TokenKind::EOF) {
                break;
            }
            if self.current_indent() != 0 {
                return Err(ParseError::UnexpectedIndent {
                    line: self.current_line(),
                });
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program {
            statements,
            functions: self.functions,
        })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current_kind() {
            TokenKind::Def => self.parse_function_def(),
            TokenKind::Print => self.parse_print(),
            TokenKind::If => self.parse_if(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Else => Err(ParseError::DanglingElse {
                line: self.current_line(),
            }),
            TokenKind::Identifier(_) => match self.peek_kind() {
                Some(TokenKind::Assign) => self.parse_assignment(),
                Some(TokenKind::LParen) => {
                    let call = self.parse_call()?;
                    self.expect_statement_end()?;
                    Ok(Statement::Expr(call))
                }
                _ => {
                    self.advance();
                    Err(self.error("'=' or '('"))
                }
            },
            _ => Err(self.error("statement")),
        }
    }

    fn parse_function_def(&mut self) -> ParseResult<Statement> {
        let def_indent = self.current_indent();
        let def_line = self.current_line();
        self.advance();
        let name = self.expect_identifier()?;
        self.expect_statement_end()?;

        if self.in_function {
            return Err(ParseError::NestedFunctionDefinition {
                name,
                line: def_line,
            });
        }
        if self.functions.contains_key(&name) {
            return Err(ParseError::DuplicateFunction {
                name,
                line: def_line,
            });
        }

        self.in_function = true;
        let body = self.parse_block(def_indent)?;
        self.in_function = false;

        self.functions.insert(name.clone(), body.clone());
        Ok(Statement::FunctionDef { name, body })
    }

    fn parse_assignment(&mut self) -> ParseResult<Statement> {
        let name = self.expect_identifier()?;
        self.expect_kind(TokenKind::Assign, "'='")?;
        let value = if matches!(self.current_kind(), TokenKind::Identifier(_))
            && matches!(self.peek_kind(), Some(TokenKind::LParen))
        {
            self.parse_call()?
        } else {
            self.parse_expression()?
        };
        self.expect_statement_end()?;
        Ok(Statement::Assign { name, value })
    }

    fn parse_print(&mut self) -> ParseResult<Statement> {
        self.advance();
        self.expect_kind(TokenKind::LParen, "'('")?;
        let mut parts = vec![self.parse_print_part()?];
        while matches!(self.current_kind(), TokenKind::Comma) {
            self.advance();
            parts.push(self.parse_print_part()?);
        }
        self.expect_kind(TokenKind::RParen, "')'")?;
        self.expect_statement_end()?;
        Ok(Statement::Print { parts })
    }

    fn parse_print_part(&mut self) -> ParseResult<PrintPart> {
        if let TokenKind::String(text) = self.current_kind() {
            self.advance();
            return Ok(PrintPart::Literal(text.to_string()));
        }
        Ok(PrintPart::Expr(self.parse_expression()?))
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        let if_indent = self.current_indent();
        self.advance();
        let condition = self.parse_expression()?;
        self.expect_statement_end()?;
        let then_body = self.parse_block(if_indent)?;

        // An else line attaches to the if at its own indent level; anything at a
        // lower level belongs to an enclosing block.
        let else_body = if matches!(self.current_kind(), TokenKind::Else)
            && self.current_indent() == if_indent
        {
            self.advance();
            self.expect_statement_end()?;
            self.parse_block(if_indent)?
        } else {
            Vec::new()
        };

        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        self.advance();
        let value = self.parse_expression()?;
        self.expect_statement_end()?;
        Ok(Statement::Return(value))
    }

    /// Parses the contiguous run of statements one level deeper than the owning
    /// `if`/`else`/`def` line.
    fn parse_block(&mut self, parent_indent: usize) -> ParseResult<Vec<Statement>> {
        let body_indent = parent_indent + 1;
        let mut body = Vec::new();
        loop {
            self.consume_newlines();
            if matches!(self.current_kind(), TokenKind::EOF) {
                break;
            }
            let indent = self.current_indent();
            if indent < body_indent {
                break;
            }
            if indent > body_indent {
                return Err(ParseError::UnexpectedIndent {
                    line: self.current_line(),
                });
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let left = self.parse_additive()?;
        let op = match self.current_kind() {
            TokenKind::Less => BinaryOperator::Less,
            TokenKind::Greater => BinaryOperator::Greater,
            TokenKind::LessEqual => BinaryOperator::LessEqual,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
            TokenKind::EqualEqual => BinaryOperator::Equal,
            TokenKind::NotEqual => BinaryOperator::NotEqual,
            _ => return Ok(left),
        };
        self.advance();
        // At most one comparison operator per expression; a second one is left
        // for the caller to reject.
        let right = self.parse_additive()?;
        Ok(Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> ParseResult<Expression> {
        match self.current_kind() {
            TokenKind::Integer(value) => {
                self.advance();
                Ok(Expression::Integer(value))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expression::Identifier(name.to_string()))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_kind(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.error("expression")),
        }
    }

    fn parse_call(&mut self) -> ParseResult<Expression> {
        let name = self.expect_identifier()?;
        self.expect_kind(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !matches!(self.current_kind(), TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if matches!(self.current_kind(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_kind(TokenKind::RParen, "')'")?;
        Ok(Expression::Call { name, args })
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = self.current_kind() {
            self.advance();
            Ok(name.to_string())
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect_kind(&mut self, kind: TokenKind<'static>, expected: &'static str) -> ParseResult<()> {
        if self.current_kind() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_statement_end(&mut self) -> ParseResult<()> {
        if matches!(self.current_kind(), TokenKind::Semicolon) {
            self.advance();
        }
        match self.current_kind() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::EOF => Ok(()),
            _ => Err(self.error("newline")),
        }
    }

    fn consume_newlines(&mut self) {
        while matches!(self.current_kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn current(&self) -> &Token<'a> {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> TokenKind<'a> {
        self.current().kind
    }

    fn current_indent(&self) -> usize {
        self.current().indent
    }

    fn current_line(&self) -> usize {
        self.current().span.line
    }

    fn peek_kind(&self) -> Option<TokenKind<'a>> {
        self.tokens.get(self.position + 1).map(|token| token.kind)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn error(&self, expected: &'static str) -> ParseError {
        let token = self.current();
        ParseError::UnexpectedToken {
            expected,
            found: format!("{:?}", token.kind),
            line: token.span.line,
            column: token.span.column,
        }
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> ParseResult<Program> {
    if tokens.is_empty() {
        return Ok(Program::default());
    }
    Parser::new(tokens).parse_program()
}
