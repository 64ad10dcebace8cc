//! FILENAME: template/src/lexer.rs
//! PURPOSE: Scans a raw template cell string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the template pipeline. The lexer is
//! modal: plain text is emitted as one `Text` token until a '{' opens a token
//! body; inside a body it splits on ':' and stops at '}'.
//!
//! Identifiers are column names, so they are kept verbatim: spaces, accents
//! and punctuation other than the three delimiters are all part of a `Word`.

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    inside_braces: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
            inside_braces: false,
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        let Some(&ch) = self.input.peek() else {
            return Token::EOF;
        };

        match ch {
            '{' => {
                self.input.next();
                // A second '{' restarts the token body.
                self.inside_braces = true;
                Token::LBrace
            }
            '}' if self.inside_braces => {
                self.input.next();
                self.inside_braces = false;
                Token::RBrace
            }
            ':' if self.inside_braces => {
                self.input.next();
                Token::Colon
            }
            _ if self.inside_braces => self.read_word(),
            _ => self.read_text(),
        }
    }

    /// Reads literal text up to the next '{' or end of input.
    fn read_text(&mut self) -> Token {
        let mut text = String::new();
        while let Some(&ch) = self.input.peek() {
            if ch == '{' {
                break;
            }
            text.push(ch);
            self.input.next();
        }
        Token::Text(text)
    }

    /// Reads a token-body word up to the next delimiter.
    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(&ch) = self.input.peek() {
            if matches!(ch, '{' | '}' | ':') {
                break;
            }
            word.push(ch);
            self.input.next();
        }
        Token::Word(word)
    }
}
