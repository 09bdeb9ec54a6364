//! # Built-in Commands
//!
//! Emission of inline C for the shell built-ins the translator supports.
//!
//! Recognition is by name against a fixed table of common built-ins. A few
//! (`echo`, `test`, `kill`) are deliberately handed back to the simple-
//! command emitter so the generated program runs the system binaries
//! instead; the rest of the table produces a "not yet implemented" notice.
//! Every inline emission is wrapped in its own naked block so minted
//! locals cannot collide.

use crate::error::GenError;
use crate::parser::ast::{SimpleCommand, Word};

use super::cwriter::encode_string;
use super::{CompileFlags, Generator, IoContext, LoopTarget};

/// Built-in names the generator recognises. Anything not matched here is
/// treated as an external command.
const SHELL_BUILTINS: &[&str] = &[
    ":", "[", "alias", "bg", "bind", "break", "builtin", "cd", "command", "continue", "declare",
    "echo", "eval", "exec", "exit", "export", "false", "fg", "getopts", "hash", "jobs", "kill",
    "local", "printf", "pwd", "read", "return", "set", "shift", "source", "test", "times", "trap",
    "true", "type", "ulimit", "umask", "unalias", "unset", "wait",
];

pub(super) fn find_builtin(name: &str) -> Option<&'static str> {
    SHELL_BUILTINS.iter().find(|&&b| b == name).copied()
}

impl Generator {
    pub(super) fn emit_builtin(
        &mut self,
        builtin: &'static str,
        cmd: &SimpleCommand,
        ioc: IoContext,
        flags: CompileFlags,
    ) -> Result<IoContext, GenError> {
        // Cheat and use the system binaries for these.
        if matches!(builtin, "echo" | "test" | "[" | "kill") {
            return self.emit_simple(cmd, true, ioc, flags);
        }

        self.out.start_block();
        match builtin {
            "cd" => self.emit_cd(cmd),
            "pwd" => self.emit_pwd(),
            "false" => self.emit_failure(),
            ":" => self.emit_success(),
            "break" => self.emit_breakcont(true, &cmd.words),
            "continue" => self.emit_breakcont(false, &cmd.words),
            other => self.nyi(&format!("{other} builtin")),
        }
        self.out.end_block();

        Ok(ioc)
    }

    fn emit_cd(&mut self, cmd: &SimpleCommand) {
        if cmd.words.len() > 2 {
            self.report("cd: too many arguments");
            return;
        }
        let Some(dir) = cmd.words.get(1) else {
            // A bare `cd` needs $HOME.
            self.nyi("cd with no directory argument");
            return;
        };
        let dir = encode_string(&dir.text);
        self.out.cif(&format!("chdir(\"{dir}\")"));
        self.out.stmt(&format!("perror(\"chdir: {dir}\")"));
        self.emit_failure();
        self.out.celse();
        self.emit_success();
        self.out.cendif();
        self.out.blank();
    }

    fn emit_pwd(&mut self) {
        let cwd = self.idents.fresh("cwd");
        self.out.stmt(&format!("char* {cwd}"));
        self.out.cif(&format!("!({cwd} = get_current_dir_name())"));
        self.out.stmt("perror(\"get_current_dir_name\")");
        self.emit_failure();
        self.out.celse();
        self.out.stmt(&format!("printf(\"%s\\n\",{cwd})"));
        self.out.stmt(&format!("free({cwd})"));
        self.emit_success();
        self.out.cendif();
    }

    /// `break [N]` / `continue [N]`: resolve the N-th enclosing loop's
    /// label and emit a goto to it. Bad arguments and out-of-range levels
    /// produce a diagnostic and no code.
    fn emit_breakcont(&mut self, is_break: bool, words: &[Word]) {
        let cmdname = if is_break { "break" } else { "continue" };

        if words.len() > 2 {
            self.report(format!("{cmdname}: too many arguments"));
            return;
        }

        // str::parse is slightly more restrictive than an interpreted
        // shell, which tolerates trailing whitespace.
        let level: i64 = match words.get(1) {
            Some(arg) => match arg.text.parse() {
                Ok(level) => level,
                Err(_) => {
                    self.report(format!(
                        "{cmdname}: {}: numeric argument required",
                        arg.text
                    ));
                    return;
                }
            },
            None => 1,
        };

        if self.loops.depth() == 0 {
            self.report(format!("'{cmdname}' only meaningful inside a loop"));
            return;
        }
        if level < 1 || level as usize > self.loops.depth() {
            self.report(format!("{cmdname}: {level}: loop count out of range"));
            return;
        }

        let target = if is_break {
            LoopTarget::Exit
        } else {
            LoopTarget::Entry
        };
        if let Some(label) = self.loops.resolve(level as usize, target) {
            let stmt = format!("goto {label}");
            self.out.stmt(&stmt);
        }
    }
}
