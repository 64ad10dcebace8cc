//! FILENAME: template/src/parser.rs
//! PURPOSE: Converts the template token stream into literal and expression segments.
//! CONTEXT: This is the second stage of the template pipeline. It takes tokens
//! from the Lexer and builds the `Segment` list the evaluator walks.
//!
//! GRAMMAR:
//!   cell   --> ( TEXT | token )*
//!   token  --> "{" WORD ( ":" WORD )? "}"
//!
//! A token that does not match the grammar (unclosed brace, empty body, a
//! second colon) is not an error for the cell: its source text is kept as a
//! literal, exactly as written.

use crate::ast::{Expression, Segment};
use crate::lexer::Lexer;
use crate::token::Token;

/// Parser errors with descriptive messages.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// The Parser struct holds the lexer and current token state.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from an input string.
    /// Automatically advances to the first token.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    /// Parses the whole cell. Never fails: malformed tokens become literals.
    pub fn parse_segments(&mut self) -> Vec<Segment> {
        let mut segments = Vec::new();

        loop {
            match self.current_token.clone() {
                Token::EOF => break,
                Token::LBrace => {
                    let mut source = String::from("{");
                    self.advance();
                    match self.parse_token_body(&mut source) {
                        Ok(expr) => segments.push(Segment::Expr { expr, source }),
                        Err(_) => push_literal(&mut segments, &source),
                    }
                }
                other => {
                    push_literal(&mut segments, &other.to_string());
                    self.advance();
                }
            }
        }

        segments
    }

    /// Parses input that must be exactly one token, e.g. "{sum:Amount}".
    pub fn parse_single(&mut self) -> ParseResult<Expression> {
        if self.current_token != Token::LBrace {
            return Err(ParseError::new(format!(
                "Expected '{{', found {:?}",
                self.current_token
            )));
        }
        let mut source = String::from("{");
        self.advance();
        let expr = self.parse_token_body(&mut source)?;

        if self.current_token != Token::EOF {
            return Err(ParseError::new(format!(
                "Unexpected token after expression: {:?}",
                self.current_token
            )));
        }
        Ok(expr)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    /// Parses what follows an opening '{'. Every consumed token is appended to
    /// `source` so a failed token can be written back unchanged.
    fn parse_token_body(&mut self, source: &mut String) -> ParseResult<Expression> {
        let head = match self.current_token.clone() {
            Token::Word(word) => {
                source.push_str(&word);
                self.advance();
                word
            }
            _ => return Err(self.recover(source, "Expected identifier after '{'")),
        };

        match self.current_token {
            Token::RBrace => {
                source.push('}');
                self.advance();
                Ok(Expression::Name(head))
            }
            Token::Colon => {
                source.push(':');
                self.advance();

                let tail = match self.current_token.clone() {
                    Token::Word(word) => {
                        source.push_str(&word);
                        self.advance();
                        word
                    }
                    _ => {
                        return Err(
                            self.recover(source, "Expected identifier or integer after ':'")
                        )
                    }
                };

                if self.current_token != Token::RBrace {
                    return Err(self.recover(source, "Expected '}'"));
                }
                source.push('}');
                self.advance();

                Ok(Expression::from_pair(head, tail))
            }
            _ => Err(self.recover(source, "Expected ':' or '}'")),
        }
    }

    /// Skips the rest of a malformed token body. A closing '}' is consumed as
    /// part of it; a new '{' or the end of input is left for the caller.
    fn recover(&mut self, source: &mut String, message: &str) -> ParseError {
        loop {
            match &self.current_token {
                Token::EOF | Token::LBrace => break,
                Token::RBrace => {
                    source.push('}');
                    self.advance();
                    break;
                }
                token => {
                    source.push_str(&token.to_string());
                    self.advance();
                }
            }
        }
        ParseError::new(message)
    }
}

/// Appends literal text, merging with a preceding literal.
fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Literal(prev)) = segments.last_mut() {
        prev.push_str(text);
    } else {
        segments.push(Segment::Literal(text.to_string()));
    }
}

/// Convenience function to parse a template cell directly.
pub fn parse_cell(input: &str) -> Vec<Segment> {
    Parser::new(input).parse_segments()
}

/// Convenience function to parse a single "{...}" token.
pub fn parse_token(input: &str) -> ParseResult<Expression> {
    Parser::new(input).parse_single()
}
