//! # Code Generator
//!
//! Walks a parsed command tree and emits an equivalent C program.
//!
//! ## Architecture
//!
//! The generator is a single linear pass over the tree. Shell control flow
//! is flattened onto C control flow around one mutable variable,
//! `G_status`, which tracks `$?`:
//!
//! - `&&` / `||` / `if` become C `if` statements testing `G_status`
//! - `while` / `until` become a label pair with explicit `goto`s, so that
//!   `break N` / `continue N` can jump out of any enclosing level
//! - simple commands become a `fork`/`exec` call into the `libbashc`
//!   runtime, or inline C for the handful of supported built-ins
//! - pipes thread descriptor wiring to both sides through a compile-time
//!   I/O context, backgrounding the writer and waiting on it after the
//!   reader finishes
//!
//! Unsupported constructs produce a diagnostic and no code; the emitted
//! program is well-formed regardless.

mod builtins;
mod cwriter;
mod ioctx;

#[cfg(test)]
mod tests;

use bitflags::bitflags;
use tracing::trace;

use crate::error::{Diagnostic, GenError};
use crate::parser::ast::{
    CmdFlags, Command, Connection, Connector, IfCommand, SimpleCommand, WhileCommand, Word,
};
use cwriter::{encode_string, CWriter};
use ioctx::{IoContext, IO_CLOSE_FD};

const C_PROLOGUE: &str = "\
/* This file generated by bashc */
#define _GNU_SOURCE 1
#include <stdlib.h>
#include <stdio.h>
#include <unistd.h>
#include <sys/types.h>
#include <sys/wait.h>

#include \"libbashc/libbashc.h\"

int main(int argc, char** argv)
{
\tint G_status;

\t(void)argc;
\t(void)argv;
\tG_status = 0;

";

const C_EPILOGUE: &str = "\treturn G_status;\n}\n";

bitflags! {
    /// Flags threaded through the recursive emitters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CompileFlags: u32 {
        /// Emit the command with `FE_BACKGROUND`: the generated program
        /// will not wait for it and reports status 0.
        const BACKGROUND = 1;
    }
}

/// The generated translation unit plus everything worth telling the user.
pub struct GenResult {
    pub c_source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Translate a sequence of top-level commands into a complete C program.
///
/// Diagnostics (unsupported constructs, bad `break` arguments, …) are
/// collected in the result; only a violated generator invariant aborts.
pub fn generate(commands: &[Command]) -> Result<GenResult, GenError> {
    let mut generator = Generator::new();
    generator.out.write(C_PROLOGUE);
    generator.out.set_indent(1);

    let mut ioc = IoContext::empty();
    for cmd in commands {
        ioc = generator.emit_command(Some(cmd), ioc, CompileFlags::empty())?;
    }

    generator.out.set_indent(0);
    generator.out.write(C_EPILOGUE);
    Ok(GenResult {
        c_source: generator.out.into_string(),
        diagnostics: generator.diagnostics,
    })
}

/// Mints process-unique identifiers for the emitted program.
#[derive(Debug, Default)]
struct IdentFactory {
    next: u32,
}

impl IdentFactory {
    /// Return `<base><n>` for the next counter value. No name is ever
    /// issued twice; an empty base falls back to `"var"`.
    fn fresh(&mut self, base: &str) -> String {
        let base = if base.is_empty() { "var" } else { base };
        let n = self.next;
        self.next += 1;
        format!("{base}{n}")
    }
}

/// Which label of a loop frame a `break`/`continue` jumps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopTarget {
    Entry,
    Exit,
}

#[derive(Debug)]
struct LoopLabels {
    entry: String,
    exit: String,
}

/// Lexical stack of the labels of enclosing loops.
#[derive(Debug, Default)]
struct LoopStack {
    frames: Vec<LoopLabels>,
}

impl LoopStack {
    fn push(&mut self, entry: String, exit: String) {
        self.frames.push(LoopLabels { entry, exit });
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The label `level` frames out from the innermost loop (level 1 is
    /// the innermost). Out-of-range levels return `None`.
    fn resolve(&self, level: usize, target: LoopTarget) -> Option<&str> {
        if level == 0 {
            return None;
        }
        self.frames.iter().rev().nth(level - 1).map(|f| match target {
            LoopTarget::Entry => f.entry.as_str(),
            LoopTarget::Exit => f.exit.as_str(),
        })
    }
}

struct Generator {
    out: CWriter,
    idents: IdentFactory,
    loops: LoopStack,
    /// Name of the `pid_t` a backgrounded `forkexec_argv` call should
    /// assign to, set by the pipe emitter around its write side.
    bg_pid: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Generator {
    fn new() -> Self {
        Generator {
            out: CWriter::new(),
            idents: IdentFactory::default(),
            loops: LoopStack::default(),
            bg_pid: None,
            diagnostics: Vec::new(),
        }
    }

    fn nyi(&mut self, construct: &str) {
        self.diagnostics.push(Diagnostic::nyi(construct));
    }

    fn report(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(message));
    }

    fn emit_failure(&mut self) {
        self.out.stmt("G_status = 1");
    }

    fn emit_success(&mut self) {
        self.out.stmt("G_status = 0");
    }

    /// Dispatch one command. An absent command is a no-op that returns the
    /// context unchanged.
    fn emit_command(
        &mut self,
        cmd: Option<&Command>,
        ioc: IoContext,
        flags: CompileFlags,
    ) -> Result<IoContext, GenError> {
        let Some(cmd) = cmd else { return Ok(ioc) };
        trace!(kind = cmd.kind_name(), "emitting command");

        match cmd {
            Command::Simple(sc) => self.emit_simple(sc, false, ioc, flags),
            Command::Connection(conn) => self.emit_connection(conn, ioc, flags),
            Command::If(ifc) => self.emit_if(ifc, ioc, flags),
            Command::While(wc) => self.emit_while(wc, ioc, flags, false),
            Command::Until(wc) => self.emit_while(wc, ioc, flags, true),
            Command::For(_)
            | Command::Case(_)
            | Command::Select(_)
            | Command::FunctionDef(_)
            | Command::Group(_)
            | Command::Arith(_)
            | Command::Cond(_)
            | Command::ArithFor(_)
            | Command::Subshell(_)
            | Command::Coproc(_) => {
                self.nyi(cmd.kind_name());
                Ok(ioc)
            }
        }
    }

    /// Emit the `argv` array for an external invocation; returns its name.
    fn emit_argv(&mut self, words: &[Word]) -> String {
        let name = self.idents.fresh("argv");
        self.out
            .iwrite(&format!("static char* const {name}[] = "));
        self.out.write("{ ");
        for word in words {
            self.out
                .write(&format!("\"{}\", ", encode_string(&word.text)));
        }
        self.out.write("NULL, };\n");
        name
    }

    /// Emit a simple command: a built-in inline, or a fork/exec of the
    /// system binary with the current I/O context materialised for it.
    fn emit_simple(
        &mut self,
        cmd: &SimpleCommand,
        override_builtin: bool,
        ioc: IoContext,
        flags: CompileFlags,
    ) -> Result<IoContext, GenError> {
        if !override_builtin {
            if !cmd.redirects.is_empty() {
                self.nyi("redirects");
                return Ok(ioc);
            }
            if cmd.words.iter().any(|w| !w.flags.is_empty()) {
                self.nyi("non-literal words (expansion, etc)");
                return Ok(ioc);
            }
            if let Some(builtin) = builtins::find_builtin(&cmd.words[0].text) {
                return self.emit_builtin(builtin, cmd, ioc, flags);
            }
        }

        let rtioc = self.idents.fresh("rtioc");
        let background = flags.contains(CompileFlags::BACKGROUND);
        let retstatus = if background {
            None
        } else {
            Some(self.idents.fresh("retstatus"))
        };

        self.out.start_block();
        if let Some(ret) = &retstatus {
            self.out.stmt(&format!("pid_t {ret}"));
        }
        let argv = self.emit_argv(&cmd.words);
        ioc.materialize(&mut self.out, &rtioc);

        let invert = if cmd.flags.contains(CmdFlags::INVERT_RETURN) {
            "!"
        } else {
            ""
        };
        let assign = match (&retstatus, &self.bg_pid) {
            (Some(ret), _) => format!("{ret} = "),
            (None, Some(pid)) => format!("{pid} = "),
            (None, None) => String::new(),
        };
        let feflags = if background { "0|FE_BACKGROUND" } else { "0" };
        self.out
            .stmt(&format!("{assign}{invert}forkexec_argv({argv},{rtioc},{feflags})"));
        if !ioc.is_empty() {
            // fork copied the record into the child, the parent is done
            // with it either way.
            self.out.stmt(&format!("free({rtioc})"));
        }

        if background {
            self.emit_success();
        } else if let Some(ret) = &retstatus {
            self.out.stmt(&format!("G_status = {ret}"));
        }

        self.out.end_block();
        self.out.blank();
        Ok(ioc)
    }

    fn emit_connection(
        &mut self,
        conn: &Connection,
        mut ioc: IoContext,
        flags: CompileFlags,
    ) -> Result<IoContext, GenError> {
        match conn.connector {
            Connector::Seq => {
                ioc = self.emit_command(Some(&*conn.left), ioc, flags)?;
                ioc = self.emit_command(conn.right.as_deref(), ioc, flags)?;
            }
            Connector::Pipe => {
                ioc = self.emit_pipe(&conn.left, conn.right.as_deref(), ioc, flags)?;
            }
            Connector::Background => {
                ioc =
                    self.emit_command(Some(&*conn.left), ioc, flags | CompileFlags::BACKGROUND)?;
                ioc = self.emit_command(conn.right.as_deref(), ioc, flags)?;
            }
            Connector::AndAnd => {
                ioc = self.emit_command(Some(&*conn.left), ioc, flags)?;
                self.out.cif("!G_status");
                ioc = self.emit_command(conn.right.as_deref(), ioc, flags)?;
                self.out.cendif();
            }
            Connector::OrOr => {
                ioc = self.emit_command(Some(&*conn.left), ioc, flags)?;
                self.out.cif("G_status");
                ioc = self.emit_command(conn.right.as_deref(), ioc, flags)?;
                self.out.cendif();
            }
        }
        Ok(ioc)
    }

    /// Emit `first | second`.
    ///
    /// The write side runs backgrounded with its stdout on the pipe; the
    /// read side runs in the foreground with its stdin on the pipe and must
    /// also close the stray read end it inherits. The writer's pid lands in
    /// a local so it can be reaped after the reader finishes; the
    /// pipeline's status is the reader's, as in a shell without `pipefail`.
    fn emit_pipe(
        &mut self,
        first: &Command,
        second: Option<&Command>,
        mut ioc: IoContext,
        flags: CompileFlags,
    ) -> Result<IoContext, GenError> {
        let pipeends = self.idents.fresh("pipe");
        let pidname = self.idents.fresh("bgpid");

        self.out.start_block();
        self.out.stmt(&format!("int {pipeends}[2]"));
        self.out.stmt(&format!("pid_t {pidname}"));
        self.out.cif(&format!("!pipe({pipeends})"));

        ioc.push(format!("{pipeends}[1]"), "1".to_string());
        ioc.push(format!("{pipeends}[0]"), IO_CLOSE_FD.to_string());
        let saved = std::mem::replace(&mut self.bg_pid, Some(pidname.clone()));
        ioc = self.emit_command(Some(first), ioc, flags | CompileFlags::BACKGROUND)?;
        self.bg_pid = saved;
        ioc = ioc.shrink(2)?;

        self.out.stmt(&format!("close({pipeends}[1])"));

        ioc.push(format!("{pipeends}[0]"), "0".to_string());
        ioc = self.emit_command(second, ioc, flags)?;
        ioc = ioc.shrink(1)?;

        self.out.stmt(&format!("close({pipeends}[0])"));
        self.out.stmt(&format!("waitpid({pidname},NULL,0)"));

        self.out.celse();
        self.out.stmt("perror(\"pipe\")");
        self.out.cendif();

        self.out.end_block();
        self.out.blank();
        Ok(ioc)
    }

    fn emit_if(
        &mut self,
        cmd: &IfCommand,
        mut ioc: IoContext,
        flags: CompileFlags,
    ) -> Result<IoContext, GenError> {
        self.out.comment("if");
        ioc = self.emit_command(Some(&*cmd.test), ioc, flags)?;

        self.out.cif("!G_status");
        self.out.comment("then");
        ioc = self.emit_command(Some(&*cmd.true_branch), ioc, flags)?;

        if cmd.false_branch.is_some() {
            self.out.celse();
            self.out.comment("else");
            ioc = self.emit_command(cmd.false_branch.as_deref(), ioc, flags)?;
        }

        self.out.cendif();
        self.out.comment("fi");
        Ok(ioc)
    }

    /// Emit `while`/`until` as a label pair with explicit gotos.
    ///
    /// `whilestatus` holds the status of the last completed body run so the
    /// loop exits with it (or 0 if the body never ran), per shell rules.
    fn emit_while(
        &mut self,
        cmd: &WhileCommand,
        mut ioc: IoContext,
        flags: CompileFlags,
        invert: bool,
    ) -> Result<IoContext, GenError> {
        let entry = self.idents.fresh("whileentry");
        let exit = self.idents.fresh("whileexit");
        let loopstatus = self.idents.fresh("whilestatus");

        self.out.stmt(&format!("int {loopstatus} = 0"));
        self.out.label(&entry);

        self.loops.push(entry.clone(), exit.clone());
        self.out.start_block();
        ioc = self.emit_command(Some(&*cmd.test), ioc, flags)?;

        let guard = if invert { "!G_status" } else { "G_status" };
        self.out.cif(guard);
        self.out.stmt(&format!("G_status = {loopstatus}"));
        self.out.stmt(&format!("goto {exit}"));
        self.out.cendif();

        ioc = self.emit_command(Some(&*cmd.body), ioc, flags)?;
        self.out.stmt(&format!("{loopstatus} = G_status"));
        self.out.stmt(&format!("goto {entry}"));
        self.out.end_block();

        self.loops.pop();
        self.out.sealed_label(&exit);
        Ok(ioc)
    }
}
