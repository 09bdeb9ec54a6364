//! # Driver
//!
//! Runs the translation pipeline over a script file and writes the
//! generated C next to it. Kept out of `main` so the exit-code contract is
//! testable: diagnostics alone never fail a run, unreadable input is a
//! plain failure, and an uncreatable output file gets its own code so
//! callers can tell the two apart.
//!
//! I/O failures are wrapped with `anyhow` context; [`DriverError`] only
//! classifies which stage failed, which is all the exit-code mapping
//! needs.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use thiserror::Error;
use tracing::debug;

use crate::codegen;
use crate::error::{Diagnostic, GenError, SourceError};
use crate::lexer;
use crate::parser;

/// Exit code when the output file cannot be created.
pub const EX_NOTFOUND: i32 = 127;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    ReadInput(anyhow::Error),
    #[error(transparent)]
    CreateOutput(anyhow::Error),
    #[error(transparent)]
    WriteOutput(anyhow::Error),
    #[error(transparent)]
    Generator(#[from] GenError),
}

impl DriverError {
    /// The process exit code this failure maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::CreateOutput(_) => EX_NOTFOUND,
            _ => 1,
        }
    }
}

/// Everything a successful run wants to tell the user.
#[derive(Debug, Default)]
pub struct TranslateReport {
    pub source_errors: Vec<SourceError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TranslateReport {
    pub fn is_clean(&self) -> bool {
        self.source_errors.is_empty() && self.diagnostics.is_empty()
    }
}

/// Translate `input` to C at `output`.
///
/// Front-end errors and generator diagnostics are returned in the report;
/// only I/O failures and fatal generator errors fail the run, so a script
/// with unsupported constructs still produces a compilable file.
pub fn translate_file(input: &Path, output: &Path) -> Result<TranslateReport, DriverError> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))
        .map_err(DriverError::ReadInput)?;

    let lexed = lexer::tokenize(&source);
    let parsed = parser::parse(&lexed.tokens);
    debug!(commands = parsed.commands.len(), "parsed input script");

    let generated = codegen::generate(&parsed.commands)?;
    debug!(bytes = generated.c_source.len(), "generated C source");

    let mut file = fs::File::create(output)
        .with_context(|| format!("failed to open {} for writing", output.display()))
        .map_err(DriverError::CreateOutput)?;
    // sync before the implicit close: ENOSPC-style write-back errors only
    // surface here, and File's drop discards them.
    file.write_all(generated.c_source.as_bytes())
        .and_then(|()| file.sync_all())
        .with_context(|| format!("failed to write {}", output.display()))
        .map_err(DriverError::WriteOutput)?;

    let mut report = TranslateReport::default();
    report.source_errors.extend(lexed.errors);
    report.source_errors.extend(parsed.errors);
    report.diagnostics = generated.diagnostics;
    Ok(report)
}
