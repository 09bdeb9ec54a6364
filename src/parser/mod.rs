//! # Shell Parser
//!
//! Parses the token stream into command trees (one per top-level command).
//!
//! ## Grammar
//!
//! ```text
//! program   := linebreak (list linebreak)*
//! list      := and_or ((';' | '&') and_or?)*
//! and_or    := pipeline (('&&' | '||') linebreak pipeline)*
//! pipeline  := ['!'] command ('|' linebreak command)*
//! command   := simple | if | while | until | for | group | subshell
//! ```
//!
//! Reserved words are recognised by position: `if` at the start of a command
//! opens a conditional, `echo if` passes `if` through as an argument. Inside
//! compound commands newlines act as list separators; at top level each
//! newline-terminated list becomes its own tree, matching the one-command-
//! at-a-time shape the code generator consumes.
//!
//! ## Error recovery
//!
//! Errors are collected, not thrown: on a parse error the parser skips to
//! the next top-level command terminator and resumes, so one broken command
//! does not stop translation of the rest of the script.

pub mod ast;


use crate::error::{ErrorKind, SourceError};
use crate::lexer::token::{Token, TokenKind};
use ast::{
    CmdFlags, Command, Connection, Connector, ForCommand, IfCommand, Redirect, SimpleCommand,
    WhileCommand, Word,
};

pub struct ParseResult {
    pub commands: Vec<Command>,
    pub errors: Vec<SourceError>,
}

#[must_use]
pub fn parse(tokens: &[Token]) -> ParseResult {
    let mut parser = Parser {
        tokens,
        pos: 0,
        errors: Vec::new(),
    };
    let mut commands = Vec::new();

    loop {
        parser.skip_linebreaks();
        if parser.at_eof() {
            break;
        }
        match parser.parse_list() {
            Ok(cmd) => {
                commands.push(cmd);
                parser.skip_comments();
                if !parser.at_eof() && !matches!(parser.peek().kind, TokenKind::Newline) {
                    let tok = parser.peek();
                    parser.errors.push(SourceError {
                        kind: ErrorKind::UnexpectedToken,
                        message: format!("unexpected '{}' after command", tok.lexeme),
                        span: tok.span,
                    });
                    parser.recover();
                }
            }
            Err(err) => {
                parser.errors.push(err);
                parser.recover();
            }
        }
    }

    ParseResult {
        commands,
        errors: parser.errors,
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<SourceError>,
}

fn connect(connector: Connector, left: Command, right: Option<Command>) -> Command {
    Command::Connection(Connection {
        connector,
        left: Box::new(left),
        right: right.map(Box::new),
    })
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &'a Token {
        // tokenize() always appends Eof, so the index is in range.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &'a Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn check_word(&self, text: &str) -> bool {
        self.peek().plain_word() == Some(text)
    }

    fn eat_word(&mut self, text: &str) -> bool {
        if self.check_word(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_reserved(&mut self, text: &str) -> Result<(), SourceError> {
        if self.eat_word(text) {
            Ok(())
        } else {
            let tok = self.peek();
            Err(SourceError {
                kind: ErrorKind::MissingKeyword,
                message: format!("expected '{}', found '{}'", text, describe(tok)),
                span: tok.span,
            })
        }
    }

    fn skip_comments(&mut self) {
        while matches!(self.peek().kind, TokenKind::Comment(_)) {
            self.advance();
        }
    }

    /// Skip newlines and comments. Returns true if any newline was consumed.
    fn skip_linebreaks(&mut self) -> bool {
        let mut saw = false;
        loop {
            match self.peek().kind {
                TokenKind::Newline => {
                    saw = true;
                    self.advance();
                }
                TokenKind::Comment(_) => {
                    self.advance();
                }
                _ => break,
            }
        }
        saw
    }

    /// Skip forward past the next top-level command terminator.
    fn recover(&mut self) {
        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Could the current token begin a command?
    fn starts_command(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Word(_) | TokenKind::Bang | TokenKind::LParen
        )
    }

    /// Is the current token one of the reserved terminators for the
    /// enclosing compound command? `")"` matches the RParen token.
    fn at_terminator(&self, terminators: &[&str]) -> bool {
        if terminators.contains(&")") && matches!(self.peek().kind, TokenKind::RParen) {
            return true;
        }
        match self.peek().plain_word() {
            Some(word) => terminators.contains(&word),
            None => false,
        }
    }

    /// A top-level list: `and_or ((';' | '&') and_or?)*`. Newlines end it.
    fn parse_list(&mut self) -> Result<Command, SourceError> {
        let mut cmd = self.parse_and_or()?;
        loop {
            match self.peek().kind {
                TokenKind::Semi => {
                    self.advance();
                    self.skip_comments();
                    if !self.starts_command() {
                        break;
                    }
                    let right = self.parse_and_or()?;
                    cmd = connect(Connector::Seq, cmd, Some(right));
                }
                TokenKind::Amp => {
                    self.advance();
                    self.skip_comments();
                    if !self.starts_command() {
                        cmd = connect(Connector::Background, cmd, None);
                        break;
                    }
                    let right = self.parse_and_or()?;
                    cmd = connect(Connector::Background, cmd, Some(right));
                }
                _ => break,
            }
        }
        Ok(cmd)
    }

    /// A list inside a compound command, where newlines also separate and
    /// the list runs until one of `terminators` appears in command position.
    fn parse_compound_list(&mut self, terminators: &[&str]) -> Result<Command, SourceError> {
        self.skip_linebreaks();
        let mut cmd = self.parse_and_or()?;
        loop {
            let mut background = false;
            let mut separated = false;
            match self.peek().kind {
                TokenKind::Semi => {
                    self.advance();
                    separated = true;
                }
                TokenKind::Amp => {
                    self.advance();
                    separated = true;
                    background = true;
                }
                _ => {}
            }
            separated |= self.skip_linebreaks();

            if !separated {
                break;
            }
            if self.at_terminator(terminators) || !self.starts_command() {
                if background {
                    cmd = connect(Connector::Background, cmd, None);
                }
                break;
            }
            let right = self.parse_and_or()?;
            let connector = if background {
                Connector::Background
            } else {
                Connector::Seq
            };
            cmd = connect(connector, cmd, Some(right));
        }
        Ok(cmd)
    }

    fn parse_and_or(&mut self) -> Result<Command, SourceError> {
        let mut cmd = self.parse_pipeline()?;
        loop {
            let connector = match self.peek().kind {
                TokenKind::AndAnd => Connector::AndAnd,
                TokenKind::OrOr => Connector::OrOr,
                _ => break,
            };
            self.advance();
            self.skip_linebreaks();
            let right = self.parse_pipeline()?;
            cmd = connect(connector, cmd, Some(right));
        }
        Ok(cmd)
    }

    fn parse_pipeline(&mut self) -> Result<Command, SourceError> {
        let bang = if matches!(self.peek().kind, TokenKind::Bang) {
            Some(self.advance().span)
        } else {
            None
        };

        let mut cmd = self.parse_command()?;
        while matches!(self.peek().kind, TokenKind::Pipe) {
            self.advance();
            self.skip_linebreaks();
            let right = self.parse_command()?;
            cmd = connect(Connector::Pipe, cmd, Some(right));
        }

        if let Some(span) = bang {
            match &mut cmd {
                Command::Simple(sc) => sc.flags.toggle(CmdFlags::INVERT_RETURN),
                _ => self.errors.push(SourceError {
                    kind: ErrorKind::UnsupportedSyntax,
                    message: "'!' is only supported on simple commands".into(),
                    span,
                }),
            }
        }
        Ok(cmd)
    }

    fn parse_command(&mut self) -> Result<Command, SourceError> {
        if matches!(self.peek().kind, TokenKind::LParen) {
            return self.parse_subshell();
        }

        if let Some(word) = self.peek().plain_word() {
            return match word {
                "if" => self.parse_if(),
                "while" => self.parse_while(false),
                "until" => self.parse_while(true),
                "for" => self.parse_for(),
                "{" => self.parse_group(),
                "case" | "select" | "function" | "coproc" => {
                    let tok = self.peek();
                    Err(SourceError {
                        kind: ErrorKind::UnsupportedSyntax,
                        message: format!("'{word}' commands are not supported"),
                        span: tok.span,
                    })
                }
                "then" | "elif" | "else" | "fi" | "do" | "done" | "esac" | "}" | "in" => {
                    let tok = self.peek();
                    Err(SourceError {
                        kind: ErrorKind::UnexpectedToken,
                        message: format!("unexpected '{word}'"),
                        span: tok.span,
                    })
                }
                _ => self.parse_simple(),
            };
        }

        match &self.peek().kind {
            TokenKind::Word(_) => self.parse_simple(),
            TokenKind::Eof => Err(SourceError {
                kind: ErrorKind::UnexpectedEof,
                message: "expected a command".into(),
                span: self.peek().span,
            }),
            _ => {
                let tok = self.peek();
                Err(SourceError {
                    kind: ErrorKind::UnexpectedToken,
                    message: format!("expected a command, found '{}'", describe(tok)),
                    span: tok.span,
                })
            }
        }
    }

    fn parse_simple(&mut self) -> Result<Command, SourceError> {
        let mut words = Vec::new();
        let mut redirects = Vec::new();
        loop {
            match &self.peek().kind {
                TokenKind::Word(word) => {
                    words.push(word.clone());
                    self.advance();
                }
                // A bang past the command name is an ordinary argument.
                TokenKind::Bang if !words.is_empty() => {
                    words.push(Word::literal("!"));
                    self.advance();
                }
                TokenKind::Redirect { fd, op } => {
                    let (fd, op) = (*fd, *op);
                    let span = self.peek().span;
                    self.advance();
                    match &self.peek().kind {
                        TokenKind::Word(target) => {
                            redirects.push(Redirect {
                                fd,
                                op,
                                target: target.clone(),
                            });
                            self.advance();
                        }
                        _ => {
                            return Err(SourceError {
                                kind: ErrorKind::ExpectedWord,
                                message: "redirection requires a target word".into(),
                                span,
                            });
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(Command::Simple(SimpleCommand {
            words,
            redirects,
            flags: CmdFlags::empty(),
        }))
    }

    /// `if … fi`, with any `elif` chain nested into the false branch.
    fn parse_if(&mut self) -> Result<Command, SourceError> {
        let cmd = self.parse_if_clause()?;
        self.expect_reserved("fi")?;
        Ok(cmd)
    }

    /// One `if`/`elif` clause up to (but not including) the closing `fi`.
    fn parse_if_clause(&mut self) -> Result<Command, SourceError> {
        self.advance(); // 'if' or 'elif'
        let test = self.parse_compound_list(&["then"])?;
        self.expect_reserved("then")?;
        let true_branch = self.parse_compound_list(&["elif", "else", "fi"])?;
        let false_branch = if self.check_word("elif") {
            Some(Box::new(self.parse_if_clause()?))
        } else if self.eat_word("else") {
            Some(Box::new(self.parse_compound_list(&["fi"])?))
        } else {
            None
        };
        Ok(Command::If(IfCommand {
            test: Box::new(test),
            true_branch: Box::new(true_branch),
            false_branch,
        }))
    }

    fn parse_while(&mut self, until: bool) -> Result<Command, SourceError> {
        self.advance(); // 'while' or 'until'
        let test = self.parse_compound_list(&["do"])?;
        self.expect_reserved("do")?;
        let body = self.parse_compound_list(&["done"])?;
        self.expect_reserved("done")?;
        let wc = WhileCommand {
            test: Box::new(test),
            body: Box::new(body),
        };
        Ok(if until {
            Command::Until(wc)
        } else {
            Command::While(wc)
        })
    }

    fn parse_for(&mut self) -> Result<Command, SourceError> {
        self.advance(); // 'for'
        let variable = match &self.peek().kind {
            TokenKind::Word(w) if w.flags.is_empty() => {
                let w = w.clone();
                self.advance();
                w
            }
            _ => {
                let tok = self.peek();
                return Err(SourceError {
                    kind: ErrorKind::ExpectedWord,
                    message: "'for' requires a variable name".into(),
                    span: tok.span,
                });
            }
        };
        self.skip_linebreaks();

        let words = if self.eat_word("in") {
            let mut ws = Vec::new();
            while let TokenKind::Word(w) = &self.peek().kind {
                ws.push(w.clone());
                self.advance();
            }
            Some(ws)
        } else {
            None
        };

        if matches!(self.peek().kind, TokenKind::Semi) {
            self.advance();
        }
        self.skip_linebreaks();
        self.expect_reserved("do")?;
        let body = self.parse_compound_list(&["done"])?;
        self.expect_reserved("done")?;
        Ok(Command::For(ForCommand {
            variable,
            words,
            body: Box::new(body),
        }))
    }

    fn parse_group(&mut self) -> Result<Command, SourceError> {
        self.advance(); // '{'
        let body = self.parse_compound_list(&["}"])?;
        self.expect_reserved("}")?;
        Ok(Command::Group(Box::new(body)))
    }

    fn parse_subshell(&mut self) -> Result<Command, SourceError> {
        self.advance(); // '('
        let body = self.parse_compound_list(&[")"])?;
        if !matches!(self.peek().kind, TokenKind::RParen) {
            let tok = self.peek();
            return Err(SourceError {
                kind: ErrorKind::MissingKeyword,
                message: format!("expected ')', found '{}'", describe(tok)),
                span: tok.span,
            });
        }
        self.advance();
        Ok(Command::Subshell(Box::new(body)))
    }
}

/// A short printable description of a token for error messages.
fn describe(tok: &Token) -> String {
    match &tok.kind {
        TokenKind::Eof => "end of input".into(),
        TokenKind::Newline => "newline".into(),
        _ => tok.lexeme.clone(),
    }
}
