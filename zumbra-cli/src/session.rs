//! Compile-and-run state that persists across inputs.

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;
use zumbra_common::{Host, StdHost, Value};
use zumbra_compiler::{CompileError, Compiler, SymbolTable};
use zumbra_syntax::SyntaxError;
use zumbra_vm::{RuntimeError, Vm, VmConfig};

/// Anything that can stop one evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{}", join_lines(.0))]
    Parse(Vec<SyntaxError>),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl From<Vec<SyntaxError>> for EvalError {
    fn from(errors: Vec<SyntaxError>) -> Self {
        EvalError::Parse(errors)
    }
}

impl EvalError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            EvalError::Parse(_) => 1,
            EvalError::Compile(_) => 2,
            EvalError::Runtime(_) => 3,
        }
    }
}

fn join_lines(errors: &[SyntaxError]) -> String {
    errors
        .iter()
        .map(|e| format!("parse error: {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One interactive or batch session.
///
/// Symbols, constants, globals and the set of imported files carry over
/// from one [`Session::eval`] to the next. A source that fails to parse or
/// compile leaves the session as it was; a runtime error keeps whatever
/// globals were assigned before it.
pub struct Session {
    symbols: SymbolTable,
    constants: Vec<Value>,
    globals: Vec<Value>,
    imported: HashSet<PathBuf>,
    base_dir: PathBuf,
    config: VmConfig,
    host: Box<dyn Host>,
}

impl Session {
    pub fn new(config: VmConfig) -> Self {
        let (symbols, constants) = Compiler::new().into_state();
        Self {
            symbols,
            constants,
            globals: Vec::new(),
            imported: HashSet::new(),
            base_dir: PathBuf::from("."),
            config,
            host: Box::new(StdHost),
        }
    }

    /// Directory that `import` paths are resolved against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn with_host(mut self, host: Box<dyn Host>) -> Self {
        self.host = host;
        self
    }

    /// Parse, compile and run `source`, returning the last popped value.
    pub fn eval(&mut self, source: &str) -> Result<Value, EvalError> {
        let program = zumbra_syntax::parse(source)?;

        let mut compiler = Compiler::with_state(self.symbols.clone(), self.constants.clone())
            .with_base_dir(self.base_dir.clone())
            .with_imported(self.imported.clone());
        compiler.compile(&program)?;
        let bytecode = compiler.bytecode();
        self.imported = compiler.imported().clone();
        (self.symbols, self.constants) = compiler.into_state();
        debug!(constants = self.constants.len(), "session compiled input");

        let globals = std::mem::take(&mut self.globals);
        let host = std::mem::replace(&mut self.host, Box::new(StdHost));
        let mut vm = Vm::from_parts(bytecode, globals, self.config).with_host(host);
        let outcome = vm.run();
        let value = vm.last_popped().clone();
        (self.globals, self.host) = vm.into_parts();

        outcome?;
        Ok(value)
    }
}
