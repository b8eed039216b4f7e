use std::collections::HashSet;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::token::{Span, Token, TokenKind};

mod error;

pub use error::{LexError, LexResult};

/// Statement shape of one source line, decided before parsing. First match wins:
/// keyword-led lines, then call-and-assign, assignment, return, and finally a call
/// to a function name seen earlier in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    FunctionDef,
    Print,
    Conditional,
    ElseBranch,
    CallAssign,
    Assignment,
    Return,
    Call,
}

fn classify_line(tokens: &[Token<'_>], known_functions: &HashSet<&str>) -> Option<LineKind> {
    let first = tokens.first()?;
    match first.kind {
        TokenKind::Def => return Some(LineKind::FunctionDef),
        TokenKind::Print => return Some(LineKind::Print),
        TokenKind::If => return Some(LineKind::Conditional),
        TokenKind::Else => return Some(LineKind::ElseBranch),
        _ => {}
    }

    let has_assign = tokens
        .iter()
        .any(|token| matches!(token.kind, TokenKind::Assign));
    let has_call_shape = tokens
        .iter()
        .any(|token| matches!(token.kind, TokenKind::LParen))
        && tokens
            .iter()
            .any(|token| matches!(token.kind, TokenKind::RParen));

    if has_call_shape && has_assign {
        return Some(LineKind::CallAssign);
    }
    if has_assign {
        return Some(LineKind::Assignment);
    }
    if tokens
        .iter()
        .any(|token| matches!(token.kind, TokenKind::Return))
    {
        return Some(LineKind::Return);
    }
    if let TokenKind::Identifier(name) = first.kind
        && known_functions.contains(name)
    {
        return Some(LineKind::Call);
    }
    None
}

pub struct Lexer<'a> {
    input: &'a str,
    indent_unit: Option<usize>,
    known_functions: HashSet<&'a str>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            indent_unit: None,
            known_functions: HashSet::new(),
        }
    }

    pub fn tokenize(mut self) -> LexResult<Vec<Token<'a>>> {
        let input = self.input;
        let mut tokens = Vec::new();
        let mut line_count = 0;
        for (index, line) in input.lines().enumerate() {
            line_count = index + 1;
            self.lex_line(line_count, line, &mut tokens)?;
        }
        tokens.push(Token::new(
            TokenKind::EOF,
            Span {
                line: line_count + 1,
                column: 1,
            },
            0,
        ));
        Ok(tokens)
    }

    fn lex_line(
        &mut self,
        number: usize,
        line: &'a str,
        tokens: &mut Vec<Token<'a>>,
    ) -> LexResult<()> {
        let mut leading = 0;
        for ch in line.chars() {
            match ch {
                ' ' => leading += 1,
                '\t' => return Err(LexError::TabIndentation { line: number }),
                _ => break,
            }
        }

        let rest = &line[leading..];
        if rest.is_empty() || rest.starts_with('#') {
            return Ok(());
        }

        // The first indented line in the file fixes the indent unit; every later
        // line's level is its leading-space count divided by that unit, rounded down.
        let indent = if leading == 0 {
            0
        } else {
            let unit = *self.indent_unit.get_or_insert(leading);
            leading / unit
        };

        let mut scanner = LineLexer {
            rest,
            chars: rest.char_indices().peekable(),
            line: number,
            column: leading + 1,
            indent,
        };
        let mut line_tokens = Vec::new();
        while let Some(token) = scanner.next_token()? {
            line_tokens.push(token);
        }
        if line_tokens.is_empty() {
            return Ok(());
        }

        match classify_line(&line_tokens, &self.known_functions) {
            Some(LineKind::FunctionDef) => {
                if let Some(token) = line_tokens.get(1)
                    && let TokenKind::Identifier(name) = token.kind
                {
                    self.known_functions.insert(name);
                }
            }
            Some(_) => {}
            None => {
                return Err(LexError::UnclassifiableLine {
                    line: number,
                    text: rest.trim_end().to_string(),
                });
            }
        }

        let end_column = leading + rest.chars().count() + 1;
        tokens.append(&mut line_tokens);
        tokens.push(Token::new(
            TokenKind::Newline,
            Span {
                line: number,
                column: end_column,
            },
            indent,
        ));
        Ok(())
    }
}

/// Scanner over the content of a single physical line.
struct LineLexer<'a> {
    rest: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    indent: usize,
}

impl<'a> LineLexer<'a> {
    fn next_token(&mut self) -> LexResult<Option<Token<'a>>> {
        self.skip_spaces();

        let (start_idx, ch) = match self.chars.peek() {
            Some(&(idx, c)) => (idx, c),
            None => return Ok(None),
        };
        let span = Span {
            line: self.line,
            column: self.column,
        };

        let kind = match ch {
            '#' => return Ok(None),
            '(' => {
                self.advance_char();
                TokenKind::LParen
            }
            ')' => {
                self.advance_char();
                TokenKind::RParen
            }
            ',' => {
                self.advance_char();
                TokenKind::Comma
            }
            ';' => {
                self.advance_char();
                TokenKind::Semicolon
            }
            '+' => {
                self.advance_char();
                TokenKind::Plus
            }
            '-' => {
                self.advance_char();
                TokenKind::Minus
            }
            '*' => {
                self.advance_char();
                TokenKind::Star
            }
            '/' => {
                self.advance_char();
                TokenKind::Slash
            }
            '=' => {
                self.advance_char();
                if self.consume_if('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                self.advance_char();
                if self.consume_if('=') {
                    TokenKind::NotEqual
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        character: '!',
                        line: self.line,
                        column: span.column,
                    });
                }
            }
            '<' => {
                self.advance_char();
                if self.consume_if('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                self.advance_char();
                if self.consume_if('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '"' => return self.read_string(start_idx, span).map(Some),
            c if c.is_ascii_digit() => return self.read_integer(start_idx, span).map(Some),
            c if c.is_alphabetic() || c == '_' => {
                return Ok(Some(self.read_identifier(start_idx, span)));
            }
            other => {
                return Err(LexError::UnexpectedCharacter {
                    character: other,
                    line: self.line,
                    column: span.column,
                });
            }
        };

        Ok(Some(Token::new(kind, span, self.indent)))
    }

    fn skip_spaces(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == ' ' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, start: usize, span: Span) -> Token<'a> {
        self.advance_char();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let ident = &self.rest[start..self.current_index()];
        let kind = match ident {
            "print" => TokenKind::Print,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(kind, span, self.indent)
    }

    fn read_integer(&mut self, start: usize, span: Span) -> LexResult<Token<'a>> {
        self.advance_char();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }

        let literal = &self.rest[start..self.current_index()];
        let value = literal
            .parse::<i64>()
            .map_err(|_| LexError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                line: span.line,
                column: span.column,
            })?;
        Ok(Token::new(TokenKind::Integer(value), span, self.indent))
    }

    fn read_string(&mut self, start: usize, span: Span) -> LexResult<Token<'a>> {
        self.advance_char();
        while let Some(&(idx, c)) = self.chars.peek() {
            if c == '"' {
                self.advance_char();
                let content = &self.rest[start + 1..idx];
                return Ok(Token::new(TokenKind::String(content), span, self.indent));
            }
            self.advance_char();
        }
        Err(LexError::UnterminatedString {
            line: span.line,
            column: span.column,
        })
    }

    fn consume_if(&mut self, expected: char) -> bool {
        if let Some(&(_, c)) = self.chars.peek()
            && c == expected
        {
            self.advance_char();
            return true;
        }
        false
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if next.is_some() {
            self.column += 1;
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(idx, _)| idx)
            .unwrap_or(self.rest.len())
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds<'a>(tokens: &[Token<'a>]) -> Vec<TokenKind<'a>> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn test_simple_program() {
        let input = indoc! {r#"
            def f
              n = 4 + 4
              print("n:", n)
            f()
        "#};
        let tokens = tokenize(input).expect("tokenize should succeed");
        let expected = vec![
            TokenKind::Def,
            TokenKind::Identifier("f"),
            TokenKind::Newline,
            TokenKind::Identifier("n"),
            TokenKind::Assign,
            TokenKind::Integer(4),
            TokenKind::Plus,
            TokenKind::Integer(4),
            TokenKind::Newline,
            TokenKind::Print,
            TokenKind::LParen,
            TokenKind::String("n:"),
            TokenKind::Comma,
            TokenKind::Identifier("n"),
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::Identifier("f"),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::EOF,
        ];
        assert_eq!(kinds(&tokens), expected);

        // Body tokens sit one level in, the trailing call back at the top level.
        assert_eq!(tokens[3].indent, 1);
        assert_eq!(tokens[9].indent, 1);
        assert_eq!(tokens[16].indent, 0);
    }

    #[test]
    fn indent_level_is_floor_of_leading_spaces_over_unit() {
        let input = "if 1 > 0\n    a = 1\n      b = 2\n";
        let tokens = tokenize(input).expect("tokenize should succeed");

        let a = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Identifier("a"))
            .expect("token for a");
        let b = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Identifier("b"))
            .expect("token for b");
        // Unit is 4 (first indented line); 6 leading spaces still floor to level 1.
        assert_eq!(a.indent, 1);
        assert_eq!(b.indent, 1);
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let input = indoc! {"
            # leading comment

            a = 1  # trailing comment
        "};
        let tokens = tokenize(input).expect("tokenize should succeed");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Identifier("a"),
                TokenKind::Assign,
                TokenKind::Integer(1),
                TokenKind::Newline,
                TokenKind::EOF,
            ]
        );
        assert_eq!(tokens[0].span.line, 3);
    }

    #[test]
    fn reads_two_character_operators() {
        let input = indoc! {"
            a = 1 >= 0
            b = 1 <= 0
            c = 1 == 1
            d = 1 != 1
        "};
        let tokens = tokenize(input).expect("tokenize should succeed");
        let kinds = kinds(&tokens);
        for expected in [
            TokenKind::GreaterEqual,
            TokenKind::LessEqual,
            TokenKind::EqualEqual,
            TokenKind::NotEqual,
        ] {
            assert!(kinds.contains(&expected), "missing {expected:?}");
        }
    }

    #[test]
    fn tolerates_trailing_semicolon() {
        let tokens = tokenize("a = 1;\n").expect("tokenize should succeed");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Identifier("a"),
                TokenKind::Assign,
                TokenKind::Integer(1),
                TokenKind::Semicolon,
                TokenKind::Newline,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("print(\"oops)\n").expect_err("expected lexing failure");
        assert_eq!(err, LexError::UnterminatedString { line: 1, column: 7 });
    }

    #[test]
    fn errors_on_unclassifiable_line() {
        let err = tokenize("a + 1\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnclassifiableLine {
                line: 1,
                text: "a + 1".to_string(),
            }
        );
    }

    #[test]
    fn call_line_requires_previously_defined_name() {
        let err = tokenize("f()\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnclassifiableLine {
                line: 1,
                text: "f()".to_string(),
            }
        );
    }

    #[test]
    fn errors_on_tab_indentation() {
        let err = tokenize("\tx = 1\n").expect_err("expected lexing failure");
        assert_eq!(err, LexError::TabIndentation { line: 1 });
    }

    #[test]
    fn errors_on_integer_overflow() {
        let err = tokenize("n = 99999999999999999999999999\n").expect_err("expected overflow");
        assert_eq!(
            err,
            LexError::InvalidIntegerLiteral {
                literal: "99999999999999999999999999".to_string(),
                line: 1,
                column: 5,
            }
        );
    }

    #[test]
    fn errors_on_invalid_character() {
        let err = tokenize("x = 1 @ 2\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '@',
                line: 1,
                column: 7,
            }
        );
    }
}
