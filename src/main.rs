use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bashc::driver;

/// Compile a POSIX shell subset to C.
#[derive(Parser, Debug)]
#[command(name = "bashc", version, about)]
struct Args {
    /// Shell script to translate
    script: PathBuf,

    /// Path of the generated C file (defaults to the script with a .c
    /// extension)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let output = args
        .output
        .unwrap_or_else(|| args.script.with_extension("c"));
    if output == args.script {
        eprintln!(
            "bashc: output {} would overwrite the input script",
            output.display()
        );
        return ExitCode::FAILURE;
    }

    match driver::translate_file(&args.script, &output) {
        Ok(report) => {
            for err in &report.source_errors {
                eprintln!("{err}");
            }
            for diag in &report.diagnostics {
                eprintln!("{diag}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("bashc: {err:#}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
