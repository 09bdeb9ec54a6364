//! # Compile-Time I/O Context
//!
//! The ordered list of pending descriptor redirections accumulated by
//! enclosing pipes while the generator walks the command tree. Each leaf
//! command materialises the current context into a runtime `struct rtioctx`
//! so the spawned process sees exactly the descriptor table it would have
//! under a real shell.
//!
//! The context is a value: emitters take one and hand one back, growing it
//! around a child emission and shrinking it afterwards. Order is
//! significant, since later entries shadow or close earlier ones when the
//! runtime applies them in sequence. An empty context materialises as a
//! NULL record.

use crate::error::GenError;

use super::cwriter::CWriter;

/// Target text meaning "close this descriptor instead of duplicating".
pub(crate) const IO_CLOSE_FD: &str = "IO_CLOSE_FD";

/// One pending redirection: C expressions for the descriptor to duplicate
/// from and the descriptor to duplicate onto (or [`IO_CLOSE_FD`]).
#[derive(Debug, Clone, PartialEq, Eq)]
struct IoEntry {
    source: String,
    target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IoContext {
    entries: Vec<IoEntry>,
}

impl IoContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append one redirection, taking ownership of both expressions.
    pub fn push(&mut self, source: String, target: String) {
        self.entries.push(IoEntry { source, target });
    }

    /// Drop the last `by` entries, releasing them. Shrinking past empty is
    /// a fatal generator error; shrinking to exactly zero yields the empty
    /// context.
    pub fn shrink(mut self, by: usize) -> Result<Self, GenError> {
        let size = self.entries.len();
        if by > size {
            return Err(GenError::IoContextUnderflow { size, by });
        }
        self.entries.truncate(size - by);
        Ok(self)
    }

    /// Concatenate two contexts. Reserved for explicit redirection support.
    #[allow(dead_code)]
    pub fn merge(mut self, other: Self) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Emit the declaration of a runtime I/O context named `name` holding
    /// this context's entries, or a NULL record when empty.
    pub fn materialize(&self, out: &mut CWriter, name: &str) {
        let num = self.entries.len();
        if num == 0 {
            out.stmt(&format!("struct rtioctx* {name} = NULL"));
            return;
        }
        out.stmt(&format!(
            "struct rtioctx* {name} = malloc(sizeof(struct rtioctx) + {num}*sizeof({name}->fds[0]))"
        ));
        out.stmt(&format!("{name}->numfds = {num}"));
        for (i, entry) in self.entries.iter().enumerate() {
            out.stmt(&format!("{name}->fds[{i}][0] = {}", entry.source));
            out.stmt(&format!("{name}->fds[{i}][1] = {}", entry.target));
        }
    }
}
