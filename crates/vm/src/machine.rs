//! VM state management: operand stack, globals, call frames, host.

use std::rc::Rc;

use zumbra_common::instruction::read_u16;
use zumbra_common::{
    Bytecode, Closure, CompiledFunction, DecodeError, Host, Opcode, StdHost, Value,
};

use crate::error::RuntimeError;

pub const DEFAULT_STACK_SIZE: usize = 2048;
pub const DEFAULT_MAX_FRAMES: usize = 1024;
pub const DEFAULT_GLOBALS_SIZE: usize = 65536;

/// Resource limits for one VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Operand stack capacity, locals included.
    pub stack_size: usize,
    /// Call depth limit, the top-level frame included.
    pub max_frames: usize,
    /// Number of global slots.
    pub globals_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            max_frames: DEFAULT_MAX_FRAMES,
            globals_size: DEFAULT_GLOBALS_SIZE,
        }
    }
}

/// One activation: the closure being executed, its instruction pointer and
/// the stack slot where its locals start.
#[derive(Debug, Clone)]
pub struct Frame {
    pub closure: Rc<Closure>,
    pub ip: usize,
    pub base_pointer: usize,
}

impl Frame {
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base_pointer,
        }
    }

    pub fn instructions(&self) -> &[u8] {
        self.closure.func.instructions.as_bytes()
    }
}

/// The Zumbra virtual machine.
pub struct Vm {
    pub(crate) constants: Vec<Value>,
    /// Operand stack. Frame locals live in it, starting at each frame's
    /// base pointer.
    pub(crate) stack: Vec<Value>,
    pub(crate) globals: Vec<Value>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) last_popped: Value,
    pub(crate) config: VmConfig,
    pub(crate) host: Box<dyn Host>,
    /// Offset of the instruction being executed, for error reports.
    pub(crate) at: usize,
}

impl Vm {
    /// A VM with default limits, fresh globals and stdio as host.
    pub fn new(bytecode: Bytecode) -> Self {
        Self::with_config(bytecode, VmConfig::default())
    }

    pub fn with_config(bytecode: Bytecode, config: VmConfig) -> Self {
        Self::from_parts(bytecode, Vec::new(), config)
    }

    /// A VM that starts from an earlier run's globals, for interactive
    /// sessions. A short vector is padded with `Null` up to the default
    /// globals size.
    pub fn with_globals(bytecode: Bytecode, globals: Vec<Value>) -> Self {
        Self::from_parts(bytecode, globals, VmConfig::default())
    }

    /// Replace the host builtins talk to.
    pub fn with_host(mut self, host: Box<dyn Host>) -> Self {
        self.host = host;
        self
    }

    /// A VM with explicit limits that starts from existing globals, padded
    /// with `Null` up to `config.globals_size`.
    pub fn from_parts(bytecode: Bytecode, mut globals: Vec<Value>, config: VmConfig) -> Self {
        if globals.len() < config.globals_size {
            globals.resize(config.globals_size, Value::Null);
        }
        let main = Rc::new(Closure {
            func: Rc::new(CompiledFunction {
                instructions: bytecode.instructions,
                num_locals: 0,
                num_parameters: 0,
                name: None,
            }),
            free: Vec::new(),
        });
        let mut frames = Vec::with_capacity(config.max_frames.min(64));
        frames.push(Frame::new(main, 0));

        Self {
            constants: bytecode.constants,
            stack: Vec::with_capacity(config.stack_size.min(DEFAULT_STACK_SIZE)),
            globals,
            frames,
            last_popped: Value::Null,
            config,
            host: Box::new(StdHost),
            at: 0,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// The value removed by the most recent `Pop`. `Null` before any.
    pub fn last_popped(&self) -> &Value {
        &self.last_popped
    }

    /// The value on top of the operand stack, if any.
    pub fn stack_top(&self) -> Option<&Value> {
        self.stack.last()
    }

    pub fn globals(&self) -> &[Value] {
        &self.globals
    }

    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// Take back the globals and the host once the run is over.
    pub fn into_parts(self) -> (Vec<Value>, Box<dyn Host>) {
        (self.globals, self.host)
    }

    /// Push a value onto the stack, checking for overflow.
    pub(crate) fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.stack_size {
            return Err(RuntimeError::StackOverflow { at: self.at });
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    pub(crate) fn pop(&mut self) -> Result<Value, RuntimeError> {
        if self.stack.len() <= self.stack_floor() {
            return Err(RuntimeError::StackUnderflow { at: self.at });
        }
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { at: self.at })
    }

    /// Remove the top `count` values, oldest first.
    pub(crate) fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        let floor = self.stack_floor();
        let start = self
            .stack
            .len()
            .checked_sub(count)
            .filter(|&start| start >= floor)
            .ok_or(RuntimeError::StackUnderflow { at: self.at })?;
        Ok(self.stack.split_off(start))
    }

    /// Lowest stack slot the current frame may pop: everything below is
    /// its locals or a caller's.
    pub(crate) fn stack_floor(&self) -> usize {
        self.frames
            .last()
            .map_or(0, |f| f.base_pointer + f.closure.func.num_locals)
    }

    pub(crate) fn current_frame(&self) -> Result<&Frame, RuntimeError> {
        self.frames
            .last()
            .ok_or(RuntimeError::FrameUnderflow { at: self.at })
    }

    pub(crate) fn current_frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        let at = self.at;
        self.frames
            .last_mut()
            .ok_or(RuntimeError::FrameUnderflow { at })
    }

    /// Decode the instruction at the current frame's ip without advancing.
    ///
    /// Returns the opcode, up to two operands and the encoded length.
    /// `None` when the frame has run off the end of its instructions.
    pub(crate) fn fetch(&self) -> Result<Option<(Opcode, [usize; 2], usize)>, RuntimeError> {
        let frame = self.current_frame()?;
        let bytes = frame.instructions();
        let ip = frame.ip;
        let Some(&byte) = bytes.get(ip) else {
            return Ok(None);
        };
        let op = Opcode::lookup(byte, ip)?;

        let mut operands = [0usize; 2];
        let mut offset = ip + 1;
        for (slot, &width) in operands.iter_mut().zip(op.operand_widths()) {
            let available = bytes.len().saturating_sub(offset);
            if available < width {
                return Err(DecodeError::TruncatedOperand {
                    at: ip,
                    mnemonic: op.mnemonic(),
                    needed: width,
                    available,
                }
                .into());
            }
            *slot = match width {
                2 => read_u16(&bytes[offset..]) as usize,
                _ => bytes[offset] as usize,
            };
            offset += width;
        }
        Ok(Some((op, operands, offset - ip)))
    }
}
