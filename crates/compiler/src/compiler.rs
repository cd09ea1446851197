//! Single-pass AST to bytecode compiler.
//!
//! Each function body gets its own compilation scope holding the
//! instruction bytes emitted so far plus the last two emitted instructions.
//! Those two drive the only peephole fixups: dropping the trailing `POP` of
//! an `if` branch, and turning a function body's trailing `POP` into
//! `RETURN_VALUE`.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, instrument, trace};
use zumbra_common::builtins::BUILTINS;
use zumbra_common::instruction::make;
use zumbra_common::{Bytecode, CompiledFunction, Instructions, Opcode, Value};
use zumbra_syntax::{Block, Expression, InfixOp, PrefixOp, Program, Statement};

use crate::error::CompileError;
use crate::symbol_table::{Symbol, SymbolScope, SymbolTable};

/// Placeholder jump target, patched once the real target is known.
const PLACEHOLDER: usize = 9999;

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last: Option<EmittedInstruction>,
    previous: Option<EmittedInstruction>,
}

/// Literal constants that share a pool slot when repeated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LiteralKey {
    Integer(i64),
    Float(u64),
    String(Rc<str>),
}

impl LiteralKey {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(LiteralKey::Integer(*i)),
            Value::Float(x) => Some(LiteralKey::Float(x.to_bits())),
            Value::String(s) => Some(LiteralKey::String(Rc::clone(s))),
            _ => None,
        }
    }
}

pub struct Compiler {
    constants: Vec<Value>,
    literals: HashMap<LiteralKey, usize>,
    symbols: SymbolTable,
    scopes: Vec<CompilationScope>,
    imported: HashSet<PathBuf>,
    base_dir: PathBuf,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A fresh compiler with the builtin registry bound in global scope.
    /// Imports resolve against the process's working directory.
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbols.define_builtin(index, builtin.name);
        }
        Self::with_state(symbols, Vec::new())
    }

    /// Continue from a previous compilation's symbol table and constant
    /// pool, as a REPL does between inputs.
    pub fn with_state(symbols: SymbolTable, constants: Vec<Value>) -> Self {
        let literals = constants
            .iter()
            .enumerate()
            .filter_map(|(i, c)| LiteralKey::of(c).map(|key| (key, i)))
            .collect();
        Self {
            constants,
            literals,
            symbols,
            scopes: vec![CompilationScope::default()],
            imported: HashSet::new(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Resolve relative imports against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Treat `paths` as already imported.
    pub fn with_imported(mut self, paths: HashSet<PathBuf>) -> Self {
        self.imported = paths;
        self
    }

    /// Absolute paths of every file imported so far.
    pub fn imported(&self) -> &HashSet<PathBuf> {
        &self.imported
    }

    /// Compile a program onto the current top-level instruction stream.
    #[instrument(skip_all)]
    pub fn compile(&mut self, program: &Program) -> Result<(), CompileError> {
        self.compile_statements(&program.statements)?;
        debug!(
            bytes = self.current_instructions().len(),
            constants = self.constants.len(),
            "compiled program"
        );
        Ok(())
    }

    /// The compiled top-level stream and the constant pool.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode::new(self.current_instructions().clone(), self.constants.clone())
    }

    /// Hand back the symbol table and constant pool for reuse.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbols, self.constants)
    }

    // ---- statements ----

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        self.compile_statements(&block.statements)
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(Opcode::Pop, &[])?;
            }
            Statement::Var { name, value } => {
                let symbol = self.symbols.define(name)?;
                self.compile_expression(value)?;
                self.store_symbol(&symbol)?;
            }
            Statement::Assign { name, value } => {
                self.compile_expression(value)?;
                let symbol = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::Undefined { name: name.clone() })?;
                match symbol.scope {
                    SymbolScope::Global | SymbolScope::Local => self.store_symbol(&symbol)?,
                    scope => {
                        return Err(CompileError::InvalidAssignTarget {
                            name: name.clone(),
                            scope,
                        })
                    }
                }
            }
            Statement::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[])?;
            }
            Statement::While { condition, body } => {
                let loop_start = self.current_instructions().len();
                self.compile_expression(condition)?;
                let exit_jump = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER])?;
                self.compile_block(body)?;
                self.emit(Opcode::Jump, &[loop_start])?;
                let after_loop = self.current_instructions().len();
                self.change_operand(exit_jump, after_loop)?;
            }
            Statement::Import { path } => self.compile_import(path)?,
        }
        Ok(())
    }

    fn compile_import(&mut self, path: &str) -> Result<(), CompileError> {
        let joined = self.base_dir.join(path);
        let full = fs::canonicalize(&joined).map_err(|e| CompileError::ImportRead {
            path: joined.clone(),
            message: e.to_string(),
        })?;

        if !self.imported.insert(full.clone()) {
            debug!(path = %full.display(), "import already compiled, skipping");
            return Ok(());
        }

        let source = fs::read_to_string(&full).map_err(|e| CompileError::ImportRead {
            path: full.clone(),
            message: e.to_string(),
        })?;
        let program = zumbra_syntax::parse(&source).map_err(|errors| CompileError::ImportParse {
            path: full.clone(),
            errors,
        })?;
        debug!(path = %full.display(), statements = program.statements.len(), "compiling import");

        let import_dir = full.parent().map(Path::to_path_buf).unwrap_or_default();
        let saved_dir = std::mem::replace(&mut self.base_dir, import_dir);
        let result = self.compile_statements(&program.statements);
        self.base_dir = saved_dir;
        result
    }

    // ---- expressions ----

    fn compile_expression(&mut self, expr: &Expression) -> Result<(), CompileError> {
        match expr {
            Expression::Integer(i) => self.emit_constant(Value::Integer(*i))?,
            Expression::Float(x) => self.emit_constant(Value::Float(*x))?,
            Expression::String(s) => self.emit_constant(Value::string(s.as_str()))?,
            Expression::Boolean(true) => {
                self.emit(Opcode::True, &[])?;
            }
            Expression::Boolean(false) => {
                self.emit(Opcode::False, &[])?;
            }
            Expression::Identifier(name) => {
                let symbol = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::Undefined { name: name.clone() })?;
                self.load_symbol(&symbol)?;
            }
            Expression::Prefix { operator, right } => {
                self.compile_expression(right)?;
                let op = match operator {
                    PrefixOp::Bang => Opcode::Bang,
                    PrefixOp::Minus => Opcode::Minus,
                };
                self.emit(op, &[])?;
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                let op = infix_opcode(*operator)?;
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                self.emit(op, &[])?;
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref())?,
            Expression::Function {
                name,
                parameters,
                body,
            } => self.compile_function(name.as_deref(), parameters, body)?,
            Expression::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Opcode::Call, &[arguments.len()])?;
            }
            Expression::Array(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()])?;
            }
            Expression::Dict(pairs) => {
                let mut sorted: Vec<(String, &Expression, &Expression)> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), k, v))
                    .collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                for (_, key, value) in sorted {
                    check_key_literal(key)?;
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Opcode::Dict, &[pairs.len() * 2])?;
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::Index, &[])?;
            }
            Expression::Attribute { object, property } => {
                self.compile_expression(object)?;
                self.emit_constant(Value::string(property.as_str()))?;
                self.emit(Opcode::GetAttr, &[])?;
            }
        }
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        consequence: &Block,
        alternative: Option<&Block>,
    ) -> Result<(), CompileError> {
        self.compile_expression(condition)?;
        let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER])?;

        self.compile_block(consequence)?;
        self.finish_branch()?;

        let jump = self.emit(Opcode::Jump, &[PLACEHOLDER])?;
        let after_consequence = self.current_instructions().len();
        self.change_operand(jump_not_truthy, after_consequence)?;

        match alternative {
            None => {
                self.emit(Opcode::Null, &[])?;
            }
            Some(alternative) => {
                self.compile_block(alternative)?;
                self.finish_branch()?;
            }
        }

        let after_alternative = self.current_instructions().len();
        self.change_operand(jump, after_alternative)
    }

    /// Leave exactly one value on the stack at the end of an `if` branch.
    /// A trailing expression keeps its value; a branch that ends in a
    /// statement, or is empty, yields `null`.
    fn finish_branch(&mut self) -> Result<(), CompileError> {
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        } else if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Null, &[])?;
        }
        Ok(())
    }

    fn compile_function(
        &mut self,
        name: Option<&str>,
        parameters: &[String],
        body: &Block,
    ) -> Result<(), CompileError> {
        self.enter_scope();

        if let Some(name) = name {
            self.symbols.define_function_name(name);
        }
        for parameter in parameters {
            self.symbols.define(parameter)?;
        }

        self.compile_block(body)?;

        if self.last_instruction_is(Opcode::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[])?;
        }

        let free_symbols = self.symbols.free_symbols().to_vec();
        let num_locals = self.symbols.num_definitions();
        let instructions = self.leave_scope();

        for symbol in &free_symbols {
            self.load_symbol(symbol)?;
        }

        let function = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: parameters.len(),
            name: name.map(str::to_string),
        };
        let index = self.add_constant(Value::CompiledFunction(Rc::new(function)));
        self.emit(Opcode::Closure, &[index, free_symbols.len()])?;
        Ok(())
    }

    // ---- symbols ----

    fn load_symbol(&mut self, symbol: &Symbol) -> Result<(), CompileError> {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index])?,
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index])?,
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index])?,
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index])?,
            SymbolScope::Function => self.emit(Opcode::CurrentClosure, &[])?,
        };
        Ok(())
    }

    fn store_symbol(&mut self, symbol: &Symbol) -> Result<(), CompileError> {
        let op = if symbol.scope == SymbolScope::Global {
            Opcode::SetGlobal
        } else {
            Opcode::SetLocal
        };
        self.emit(op, &[symbol.index])?;
        Ok(())
    }

    // ---- constants ----

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Push a literal, reusing its pool slot if it was seen before.
    fn emit_constant(&mut self, value: Value) -> Result<(), CompileError> {
        let index = match LiteralKey::of(&value) {
            Some(key) => match self.literals.get(&key) {
                Some(&index) => index,
                None => {
                    let index = self.add_constant(value);
                    self.literals.insert(key, index);
                    index
                }
            },
            None => self.add_constant(value),
        };
        self.emit(Opcode::Constant, &[index])?;
        Ok(())
    }

    // ---- emission ----

    fn current_scope(&self) -> &CompilationScope {
        // The top-level scope is never popped.
        &self.scopes[self.scopes.len() - 1]
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn current_instructions(&self) -> &Instructions {
        &self.current_scope().instructions
    }

    /// Append one instruction, returning its offset.
    fn emit(&mut self, op: Opcode, operands: &[usize]) -> Result<usize, CompileError> {
        check_operands(op, operands)?;
        let scope = self.current_scope_mut();
        let position = scope.instructions.push(&make(op, operands));
        scope.previous = scope.last;
        scope.last = Some(EmittedInstruction {
            opcode: op,
            position,
        });
        Ok(position)
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        let scope = self.current_scope();
        !scope.instructions.is_empty() && scope.last.is_some_and(|last| last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last {
            scope.instructions.truncate(last.position);
            scope.last = scope.previous;
        }
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last.as_mut() {
            scope
                .instructions
                .replace(last.position, &make(Opcode::ReturnValue, &[]));
            last.opcode = Opcode::ReturnValue;
        }
    }

    /// Re-encode the instruction at `position` with a new operand.
    fn change_operand(&mut self, position: usize, operand: usize) -> Result<(), CompileError> {
        let scope = self.current_scope_mut();
        let byte = scope.instructions.as_bytes()[position];
        // Only ever called on offsets returned by `emit`.
        let Ok(op) = Opcode::try_from(byte) else {
            return Ok(());
        };
        check_operands(op, &[operand])?;
        scope.instructions.replace(position, &make(op, &[operand]));
        Ok(())
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbols.enter_scope();
        trace!(depth = self.symbols.depth(), "entered function scope");
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().unwrap_or_default();
        self.symbols.leave_scope();
        trace!(depth = self.symbols.depth(), "left function scope");
        scope.instructions
    }
}

fn infix_opcode(operator: InfixOp) -> Result<Opcode, CompileError> {
    let op = match operator {
        InfixOp::Add => Opcode::Add,
        InfixOp::Sub => Opcode::Sub,
        InfixOp::Mul => Opcode::Mul,
        InfixOp::Div => Opcode::Div,
        InfixOp::Mod => Opcode::Mod,
        InfixOp::Eq => Opcode::Equal,
        InfixOp::NotEq => Opcode::NotEqual,
        InfixOp::Gt => Opcode::GreaterThan,
        InfixOp::Lt => Opcode::LessThan,
        InfixOp::Ge => Opcode::GreaterOrEqual,
        InfixOp::Le => Opcode::LessOrEqual,
        InfixOp::And => Opcode::And,
        InfixOp::Or => Opcode::Or,
        InfixOp::Pow => {
            return Err(CompileError::UnknownOperator {
                operator: operator.as_str(),
            })
        }
    };
    Ok(op)
}

/// Reject operands that would be truncated by their encoded width.
fn check_operands(op: Opcode, operands: &[usize]) -> Result<(), CompileError> {
    for (&operand, &width) in operands.iter().zip(op.operand_widths()) {
        let max = if width == 2 {
            u16::MAX as usize
        } else {
            u8::MAX as usize
        };
        if operand > max {
            return Err(CompileError::OperandOverflow {
                mnemonic: op.mnemonic(),
                operand,
                max,
            });
        }
    }
    Ok(())
}

/// Dict keys written as literals of an unhashable kind can never work.
fn check_key_literal(key: &Expression) -> Result<(), CompileError> {
    let kind = match key {
        Expression::Float(_) => "FLOAT",
        Expression::Array(_) => "ARRAY",
        Expression::Dict(_) => "DICT",
        Expression::Function { .. } => "CLOSURE",
        _ => return Ok(()),
    };
    Err(CompileError::UnhashableKey { kind })
}

/// Compile a standalone program with a fresh compiler.
pub fn compile(program: &Program) -> Result<Bytecode, CompileError> {
    let mut compiler = Compiler::new();
    compiler.compile(program)?;
    Ok(compiler.bytecode())
}
