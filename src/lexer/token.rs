//! # Token Types
//!
//! Defines the token stream produced by the shell lexer.
//!
//! Reserved words (`if`, `while`, `done`, …) are NOT distinguished here:
//! POSIX only gives them meaning in command position, so they are lexed as
//! ordinary words and the parser decides by context. A word token keeps its
//! raw `lexeme` so the parser can tell a bare `if` from a quoted `"if"`.

use crate::error::Span;
use crate::parser::ast::{RedirOp, Word};

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The original source text of the token.
    pub lexeme: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A word after quote removal, with its expansion flags.
    Word(Word),

    // === Operators ===
    Semi,   // ;
    Amp,    // &
    Pipe,   // |
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // ! (standalone)
    LParen,
    RParen,

    /// `<`, `>` or `>>`, optionally with an explicit descriptor (`2>`).
    Redirect { fd: Option<u32>, op: RedirOp },

    Newline,
    Comment(String),

    Eof,
}

impl Token {
    /// The word text, if this token is a plain unquoted literal word.
    ///
    /// Used by the parser for reserved-word recognition: a quoted or
    /// expansion-carrying word never acts as a keyword.
    pub fn plain_word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) if w.flags.is_empty() && self.lexeme == w.text => Some(&w.text),
            _ => None,
        }
    }
}
