//! FILENAME: template/src/token.rs
//! PURPOSE: Token definitions for the template lexer.
//! CONTEXT: Tokens are the atomic units produced by the lexer and consumed by the parser.
//! Outside braces the lexer only produces `Text`; inside braces it produces
//! `Word`, `Colon` and the closing `RBrace`.

/// Tokens recognized by the template lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// Literal cell text outside any braces.
    Text(String),
    /// Text inside braces, up to the next '{', '}' or ':'. Kept verbatim.
    Word(String),

    // Delimiters
    LBrace,
    RBrace,
    Colon,

    // Special
    EOF,
}

impl std::fmt::Display for Token {
    /// Writes the token back as source text, so malformed tokens can be
    /// rendered verbatim.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Text(s) => write!(f, "{}", s),
            Token::Word(s) => write!(f, "{}", s),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Colon => write!(f, ":"),
            Token::EOF => Ok(()),
        }
    }
}
