//! Zumbra CLI: run, repl, disasm.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input, usage or parse error
//! - 2: Compile error
//! - 3: Runtime error

use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use zumbra_cli::commands::{self, Cli, Command};
use zumbra_cli::repl;

fn main() {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            // Nothing left to report to if the terminal is gone.
            let _ = e.print();
            process::exit(code);
        }
    };
    let config = cli.limits.config();

    let result = match &cli.command {
        Command::Run { file } => commands::run(file, config),
        Command::Disasm { file } => commands::disasm(file),
        Command::Repl => repl::start(config).map_err(|e| {
            eprintln!("error: {e:#}");
            1
        }),
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

/// `RUST_LOG` overrides the default `warn` filter. Logs go to stderr so
/// program output stays clean.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
