//! # Shell Lexer
//!
//! Tokenizes the supported shell subset into a stream of tokens.
//!
//! ## Features
//!
//! - **Words**: single- and double-quoted strings with quote removal,
//!   backslash escapes, and line continuations (`\` + newline)
//! - **Operators**: `;`, `&`, `|`, `&&`, `||`, `!`, `(`, `)`
//! - **Redirections**: `<`, `>`, `>>`, with optional descriptor prefix (`2>`)
//! - **Comments**: `#` to end of line (only at the start of a word)
//!
//! ## Expansion flagging
//!
//! The translator compiles literal words only. Rather than rejecting input
//! at lex time, a word containing `$`/backquote substitution, an unquoted
//! glob metacharacter, or a leading tilde is tagged with the matching
//! [`WordFlags`] bit; the code generator reports such words as not yet
//! implemented. Quote removal is still performed here, which is sound
//! precisely because no expansion runs later.
//!
//! [`WordFlags`]: crate::parser::ast::WordFlags

pub mod cursor;
pub mod token;


use crate::error::{ErrorKind, SourceError};
use crate::parser::ast::{RedirOp, Word, WordFlags};
use cursor::Cursor;
use token::{Token, TokenKind};

pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<SourceError>,
}

#[must_use]
pub fn tokenize(source: &str) -> LexResult {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    while !cursor.is_at_end() {
        match lex_token(&mut cursor) {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => {}
            Err(err) => errors.push(err),
        }
    }

    let (pos, line, col) = cursor.current_pos();
    tokens.push(Token {
        kind: TokenKind::Eof,
        lexeme: String::new(),
        span: cursor.make_span(pos, line, col),
    });

    LexResult { tokens, errors }
}

fn lex_token(cursor: &mut Cursor) -> Result<Option<Token>, SourceError> {
    // Skip blanks and line continuations.
    loop {
        match cursor.peek() {
            Some(b' ' | b'\t') => {
                cursor.advance();
            }
            Some(b'\\') if cursor.peek_second() == Some(b'\n') => {
                cursor.advance();
                cursor.advance();
            }
            _ => break,
        }
    }

    let (start, line, col) = cursor.current_pos();
    let Some(b) = cursor.peek() else {
        return Ok(None);
    };

    match b {
        b'\n' => {
            cursor.advance();
            Ok(Some(make_token(cursor, TokenKind::Newline, start, line, col)))
        }
        b'\r' => {
            cursor.advance();
            if cursor.peek() == Some(b'\n') {
                cursor.advance();
            }
            Ok(Some(make_token(cursor, TokenKind::Newline, start, line, col)))
        }
        b'#' => {
            let mut text = String::new();
            cursor.advance();
            while let Some(b) = cursor.peek() {
                if b == b'\n' {
                    break;
                }
                cursor.advance();
                text.push(b as char);
            }
            Ok(Some(make_token(
                cursor,
                TokenKind::Comment(text),
                start,
                line,
                col,
            )))
        }
        b';' => {
            cursor.advance();
            if cursor.peek() == Some(b';') {
                cursor.advance();
                return Err(SourceError {
                    kind: ErrorKind::UnsupportedOperator,
                    message: "';;' is only valid in case commands".into(),
                    span: cursor.make_span(start, line, col),
                });
            }
            Ok(Some(make_token(cursor, TokenKind::Semi, start, line, col)))
        }
        b'&' => {
            cursor.advance();
            match cursor.peek() {
                Some(b'&') => {
                    cursor.advance();
                    Ok(Some(make_token(cursor, TokenKind::AndAnd, start, line, col)))
                }
                Some(b'>') => {
                    cursor.advance();
                    Err(unsupported_op(cursor, "&>", start, line, col))
                }
                _ => Ok(Some(make_token(cursor, TokenKind::Amp, start, line, col))),
            }
        }
        b'|' => {
            cursor.advance();
            match cursor.peek() {
                Some(b'|') => {
                    cursor.advance();
                    Ok(Some(make_token(cursor, TokenKind::OrOr, start, line, col)))
                }
                Some(b'&') => {
                    cursor.advance();
                    Err(unsupported_op(cursor, "|&", start, line, col))
                }
                _ => Ok(Some(make_token(cursor, TokenKind::Pipe, start, line, col))),
            }
        }
        b'(' => {
            cursor.advance();
            Ok(Some(make_token(cursor, TokenKind::LParen, start, line, col)))
        }
        b')' => {
            cursor.advance();
            Ok(Some(make_token(cursor, TokenKind::RParen, start, line, col)))
        }
        b'<' | b'>' => lex_redirect(cursor, None, start, line, col).map(Some),
        b'!' if is_word_end(cursor.peek_second()) => {
            cursor.advance();
            Ok(Some(make_token(cursor, TokenKind::Bang, start, line, col)))
        }
        _ => lex_word(cursor, start, line, col).map(Some),
    }
}

fn unsupported_op(cursor: &Cursor, op: &str, start: usize, line: usize, col: usize) -> SourceError {
    SourceError {
        kind: ErrorKind::UnsupportedOperator,
        message: format!("the '{op}' operator is not supported"),
        span: cursor.make_span(start, line, col),
    }
}

/// True when a byte (or end of input) terminates a word.
fn is_word_end(b: Option<u8>) -> bool {
    matches!(
        b,
        None | Some(b' ' | b'\t' | b'\n' | b'\r' | b';' | b'&' | b'|' | b'(' | b')' | b'<' | b'>')
    )
}

/// Lex a redirection operator. The leading `<`/`>` has not been consumed;
/// `fd` carries an explicit descriptor number seen immediately before it.
fn lex_redirect(
    cursor: &mut Cursor,
    fd: Option<u32>,
    start: usize,
    line: usize,
    col: usize,
) -> Result<Token, SourceError> {
    let b = cursor.advance().unwrap_or(b'<');
    let op = if b == b'<' {
        match cursor.peek() {
            Some(b'<') => {
                cursor.advance();
                return Err(SourceError {
                    kind: ErrorKind::UnsupportedOperator,
                    message: "here-documents are not supported".into(),
                    span: cursor.make_span(start, line, col),
                });
            }
            Some(b'&') => {
                cursor.advance();
                return Err(unsupported_op(cursor, "<&", start, line, col));
            }
            _ => RedirOp::Input,
        }
    } else {
        match cursor.peek() {
            Some(b'>') => {
                cursor.advance();
                RedirOp::Append
            }
            Some(b'&') => {
                cursor.advance();
                return Err(unsupported_op(cursor, ">&", start, line, col));
            }
            Some(b'|') => {
                cursor.advance();
                return Err(unsupported_op(cursor, ">|", start, line, col));
            }
            _ => RedirOp::Output,
        }
    };
    Ok(make_token(
        cursor,
        TokenKind::Redirect { fd, op },
        start,
        line,
        col,
    ))
}

fn lex_word(
    cursor: &mut Cursor,
    start: usize,
    line: usize,
    col: usize,
) -> Result<Token, SourceError> {
    let mut text: Vec<u8> = Vec::new();
    let mut flags = WordFlags::empty();
    let mut quoted = false;

    loop {
        let Some(b) = cursor.peek() else { break };
        match b {
            _ if is_word_end(Some(b)) => break,
            b'\'' => {
                quoted = true;
                cursor.advance();
                loop {
                    match cursor.advance() {
                        Some(b'\'') => break,
                        Some(c) => text.push(c),
                        None => {
                            return Err(SourceError {
                                kind: ErrorKind::UnterminatedString,
                                message: "unterminated single-quoted string".into(),
                                span: cursor.make_span(start, line, col),
                            });
                        }
                    }
                }
            }
            b'"' => {
                quoted = true;
                cursor.advance();
                loop {
                    match cursor.advance() {
                        Some(b'"') => break,
                        Some(b'\\') => match cursor.advance() {
                            // Inside double quotes, backslash only escapes
                            // these; otherwise it is literal.
                            Some(c @ (b'\\' | b'$' | b'`' | b'"')) => text.push(c),
                            Some(b'\n') => {}
                            Some(c) => {
                                text.push(b'\\');
                                text.push(c);
                            }
                            None => {
                                return Err(unterminated_double(cursor, start, line, col));
                            }
                        },
                        Some(c @ (b'$' | b'`')) => {
                            flags |= WordFlags::EXPANSION;
                            text.push(c);
                        }
                        Some(c) => text.push(c),
                        None => {
                            return Err(unterminated_double(cursor, start, line, col));
                        }
                    }
                }
            }
            b'\\' => {
                cursor.advance();
                match cursor.advance() {
                    Some(b'\n') => {}
                    Some(c) => text.push(c),
                    None => text.push(b'\\'),
                }
            }
            b'$' | b'`' => {
                flags |= WordFlags::EXPANSION;
                text.push(b);
                cursor.advance();
            }
            b'*' | b'?' | b'[' => {
                flags |= WordFlags::GLOB;
                text.push(b);
                cursor.advance();
            }
            b'~' if text.is_empty() && !quoted => {
                flags |= WordFlags::TILDE;
                text.push(b);
                cursor.advance();
            }
            _ => {
                text.push(b);
                cursor.advance();
            }
        }
    }

    // A bare digit run directly against `<` or `>` is a descriptor prefix,
    // not a word: `2>err`.
    if !quoted
        && !text.is_empty()
        && text.iter().all(u8::is_ascii_digit)
        && matches!(cursor.peek(), Some(b'<' | b'>'))
    {
        if let Ok(fd) = String::from_utf8_lossy(&text).parse::<u32>() {
            return lex_redirect(cursor, Some(fd), start, line, col);
        }
    }

    let word = Word {
        text: String::from_utf8_lossy(&text).into_owned(),
        flags,
    };
    Ok(make_token(cursor, TokenKind::Word(word), start, line, col))
}

fn unterminated_double(cursor: &Cursor, start: usize, line: usize, col: usize) -> SourceError {
    SourceError {
        kind: ErrorKind::UnterminatedString,
        message: "unterminated double-quoted string".into(),
        span: cursor.make_span(start, line, col),
    }
}

fn make_token(cursor: &Cursor, kind: TokenKind, start: usize, line: usize, col: usize) -> Token {
    let span = cursor.make_span(start, line, col);
    Token {
        kind,
        lexeme: cursor.slice(span.start, span.end),
        span,
    }
}
