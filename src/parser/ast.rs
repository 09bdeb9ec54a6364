//! # Command Tree
//!
//! Defines the data structures representing a parsed shell program.
//!
//! ## Structure
//!
//! A program is a sequence of [`Command`] trees, one per top-level command.
//! Commands own their children by value; the code generator borrows the tree
//! read-only.
//!
//! ## Design Philosophy
//!
//! The tree deliberately mirrors the command forms of a POSIX shell rather
//! than the surface syntax: `elif` chains are desugared into nested [`If`]
//! nodes, and every binary construct (`;`, `|`, `&`, `&&`, `||`) is a
//! [`Connection`] discriminated by its [`Connector`]. Command variants the
//! translator cannot yet compile still have tree representations so that a
//! front-end can hand them over and get a well-defined "not yet implemented"
//! notice back instead of a hard failure.
//!
//! [`If`]: Command::If

use bitflags::bitflags;

bitflags! {
    /// Properties of a word that would require runtime processing.
    ///
    /// Any non-empty flag set means the word is not a plain literal and the
    /// code generator must refuse to embed it in the output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WordFlags: u32 {
        /// Contains `$…` or backquote substitution.
        const EXPANSION = 1 << 0;
        /// Contains an unquoted glob metacharacter (`*`, `?`, `[`).
        const GLOB = 1 << 1;
        /// Starts with an unquoted tilde.
        const TILDE = 1 << 2;
    }
}

bitflags! {
    /// Per-command modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CmdFlags: u32 {
        /// The command's exit status is logically negated (`!` prefix).
        const INVERT_RETURN = 1 << 0;
    }
}

/// A single shell word after quote removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub flags: WordFlags,
}

impl Word {
    /// A plain literal word with no expansion requirements.
    pub fn literal(text: impl Into<String>) -> Self {
        Word {
            text: text.into(),
            flags: WordFlags::empty(),
        }
    }
}

/// A file-descriptor redirection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirOp {
    /// `< target`
    Input,
    /// `> target`
    Output,
    /// `>> target`
    Append,
}

/// One redirection attached to a simple command.
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    /// Explicit descriptor (`2>err`), or the operator's default.
    pub fd: Option<u32>,
    pub op: RedirOp,
    pub target: Word,
}

/// An external or built-in invocation: one or more words plus redirections.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCommand {
    /// Command name and arguments. Never empty.
    pub words: Vec<Word>,
    pub redirects: Vec<Redirect>,
    pub flags: CmdFlags,
}

impl SimpleCommand {
    /// A simple command built from literal words, no redirections.
    pub fn from_literals<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SimpleCommand {
            words: words.into_iter().map(Word::literal).collect(),
            redirects: Vec::new(),
            flags: CmdFlags::empty(),
        }
    }
}

/// The operator joining the two sides of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// `left ; right`
    Seq,
    /// `left | right`
    Pipe,
    /// `left & right`; left runs without being waited on.
    Background,
    /// `left && right`
    AndAnd,
    /// `left || right`
    OrOr,
}

/// Two commands joined by a [`Connector`].
///
/// `right` is absent for a trailing `&` (`sleep 1 &` backgrounds `sleep`
/// with nothing after it); the code generator treats an absent command as a
/// no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub connector: Connector,
    pub left: Box<Command>,
    pub right: Option<Box<Command>>,
}

/// `if test; then …; [else …;] fi`. `elif` chains nest in `false_branch`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfCommand {
    pub test: Box<Command>,
    pub true_branch: Box<Command>,
    pub false_branch: Option<Box<Command>>,
}

/// `while test; do body; done`, shared with `until` (inverted test).
#[derive(Debug, Clone, PartialEq)]
pub struct WhileCommand {
    pub test: Box<Command>,
    pub body: Box<Command>,
}

/// `for variable [in words]; do body; done`, shared with `select`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForCommand {
    pub variable: Word,
    /// Absent means "in `"$@"`".
    pub words: Option<Vec<Word>>,
    pub body: Box<Command>,
}

/// `case subject in pattern) body ;; … esac`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseCommand {
    pub subject: Word,
    pub clauses: Vec<CaseClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    pub patterns: Vec<Word>,
    pub body: Option<Box<Command>>,
}

/// `name() body` or `function name body`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Word,
    pub body: Box<Command>,
}

/// `(( init ; test ; step )) do body done`
#[derive(Debug, Clone, PartialEq)]
pub struct ArithForCommand {
    pub init: Vec<Word>,
    pub test: Vec<Word>,
    pub step: Vec<Word>,
    pub body: Box<Command>,
}

/// `coproc [name] command`
#[derive(Debug, Clone, PartialEq)]
pub struct CoprocCommand {
    pub name: Option<Word>,
    pub command: Box<Command>,
}

/// A node of the command tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Simple(SimpleCommand),
    Connection(Connection),
    If(IfCommand),
    While(WhileCommand),
    Until(WhileCommand),
    // Accepted in the tree, reported NYI by the code generator.
    For(ForCommand),
    Case(CaseCommand),
    Select(ForCommand),
    FunctionDef(FunctionDef),
    Group(Box<Command>),
    Arith(Vec<Word>),
    Cond(Vec<Word>),
    ArithFor(ArithForCommand),
    Subshell(Box<Command>),
    Coproc(CoprocCommand),
}

impl Command {
    /// Human-readable name of the command form, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Command::Simple(_) => "simple command",
            Command::Connection(_) => "connection",
            Command::If(_) => "if command",
            Command::While(_) => "while command",
            Command::Until(_) => "until command",
            Command::For(_) => "for command",
            Command::Case(_) => "case command",
            Command::Select(_) => "select command",
            Command::FunctionDef(_) => "function definition",
            Command::Group(_) => "group command",
            Command::Arith(_) => "arithmetic command",
            Command::Cond(_) => "conditional command",
            Command::ArithFor(_) => "arithmetic for command",
            Command::Subshell(_) => "subshell",
            Command::Coproc(_) => "coprocess",
        }
    }
}
