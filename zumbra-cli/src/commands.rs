//! CLI command implementations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use zumbra_compiler::Compiler;
use zumbra_vm::machine::{DEFAULT_GLOBALS_SIZE, DEFAULT_MAX_FRAMES, DEFAULT_STACK_SIZE};
use zumbra_vm::VmConfig;

use crate::session::Session;

#[derive(Debug, Parser)]
#[command(name = "zumbra", version, about = "Compile and run Zumbra programs")]
pub struct Cli {
    #[command(flatten)]
    pub limits: Limits,

    #[command(subcommand)]
    pub command: Command,
}

/// VM resource limits.
#[derive(Debug, Clone, Args)]
pub struct Limits {
    /// Operand stack slots, locals included.
    #[arg(long, global = true, default_value_t = DEFAULT_STACK_SIZE)]
    pub stack_size: usize,

    /// Maximum call depth.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_FRAMES)]
    pub max_frames: usize,

    /// Number of global variable slots.
    #[arg(long, global = true, default_value_t = DEFAULT_GLOBALS_SIZE)]
    pub globals_size: usize,
}

impl Limits {
    pub fn config(&self) -> VmConfig {
        VmConfig {
            stack_size: self.stack_size,
            max_frames: self.max_frames,
            globals_size: self.globals_size,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile and execute a source file.
    Run { file: PathBuf },
    /// Start an interactive session.
    Repl,
    /// Print the bytecode a source file compiles to.
    Disasm { file: PathBuf },
}

/// Compile and execute a source file. Only builtin output is printed.
pub fn run(file: &Path, config: VmConfig) -> Result<(), i32> {
    let source = read_source(file)?;
    let mut session = Session::new(config).with_base_dir(base_dir(file));
    session.eval(&source).map(|_| ()).map_err(|e| {
        eprintln!("error: {e}");
        e.exit_code()
    })
}

/// Print the top-level listing and every compiled function constant.
pub fn disasm(file: &Path) -> Result<(), i32> {
    let source = read_source(file)?;
    let program = zumbra_syntax::parse(&source).map_err(|errors| {
        for e in &errors {
            eprintln!("error: parse error: {e}");
        }
        1
    })?;

    let mut compiler = Compiler::new().with_base_dir(base_dir(file));
    compiler.compile(&program).map_err(|e| {
        eprintln!("error: compile error: {e}");
        2
    })?;
    print!("{}", compiler.bytecode());
    Ok(())
}

fn read_source(file: &Path) -> Result<String, i32> {
    fs::read_to_string(file)
        .with_context(|| format!("cannot read '{}'", file.display()))
        .map_err(|e| {
            eprintln!("error: {e:#}");
            1
        })
}

fn base_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
