//! Main execution loop and opcode dispatch for the Zumbra VM.

use std::rc::Rc;

use tracing::{debug, instrument, trace};
use zumbra_common::{Closure, DecodeError, Dict, Opcode, Value, BUILTINS};

use crate::error::RuntimeError;
use crate::machine::{Frame, Vm};

impl Vm {
    /// Execute until the top-level instruction stream ends or an error
    /// halts the run.
    #[instrument(skip_all)]
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        debug!(constants = self.constants.len(), "vm start");

        loop {
            let Some((op, operands, len)) = self.fetch()? else {
                if self.frames.len() == 1 {
                    break;
                }
                let frame = self.current_frame()?;
                let (ip, len) = (frame.ip, frame.instructions().len());
                return Err(DecodeError::OutOfBounds { at: ip, len }.into());
            };
            let frame = self.current_frame_mut()?;
            let at = frame.ip;
            frame.ip += len;
            self.at = at;

            match op {
                Opcode::Constant => self.exec_constant(operands[0])?,
                Opcode::Pop => self.last_popped = self.pop()?,
                Opcode::True => self.push(Value::Boolean(true))?,
                Opcode::False => self.push(Value::Boolean(false))?,
                Opcode::Null => self.push(Value::Null)?,

                // Arithmetic
                Opcode::Add => self.exec_binary_arith(
                    "+",
                    |a, b| Some(a.wrapping_add(b)),
                    |a, b| a + b,
                )?,
                Opcode::Sub => self.exec_binary_arith(
                    "-",
                    |a, b| Some(a.wrapping_sub(b)),
                    |a, b| a - b,
                )?,
                Opcode::Mul => self.exec_binary_arith(
                    "*",
                    |a, b| Some(a.wrapping_mul(b)),
                    |a, b| a * b,
                )?,
                Opcode::Div => self.exec_binary_arith(
                    "/",
                    |a, b| (b != 0).then(|| a.wrapping_div(b)),
                    |a, b| a / b,
                )?,
                Opcode::Mod => self.exec_binary_arith(
                    "%",
                    |a, b| (b != 0).then(|| a.wrapping_rem(b)),
                    |a, b| a % b,
                )?,
                Opcode::Minus => self.exec_minus()?,

                // Comparison
                Opcode::Equal => self.exec_equality(false)?,
                Opcode::NotEqual => self.exec_equality(true)?,
                Opcode::GreaterThan => self.exec_comparison(">", |a, b| a > b, |a, b| a > b)?,
                Opcode::LessThan => self.exec_comparison("<", |a, b| a < b, |a, b| a < b)?,
                Opcode::GreaterOrEqual => {
                    self.exec_comparison(">=", |a, b| a >= b, |a, b| a >= b)?
                }
                Opcode::LessOrEqual => self.exec_comparison("<=", |a, b| a <= b, |a, b| a <= b)?,

                // Logic
                Opcode::Bang => {
                    let operand = self.pop()?;
                    self.push(Value::Boolean(!operand.is_truthy()))?
                }
                Opcode::And => self.exec_logic(|l, r| l && r)?,
                Opcode::Or => self.exec_logic(|l, r| l || r)?,

                // Control flow
                Opcode::Jump => self.current_frame_mut()?.ip = operands[0],
                Opcode::JumpNotTruthy => {
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut()?.ip = operands[0];
                    }
                }

                // Bindings
                Opcode::SetGlobal => self.exec_set_global(operands[0])?,
                Opcode::GetGlobal => self.exec_get_global(operands[0])?,
                Opcode::SetLocal => self.exec_set_local(operands[0])?,
                Opcode::GetLocal => self.exec_get_local(operands[0])?,
                Opcode::GetBuiltin => self.exec_get_builtin(operands[0])?,
                Opcode::GetFree => self.exec_get_free(operands[0])?,
                Opcode::CurrentClosure => {
                    let closure = Rc::clone(&self.current_frame()?.closure);
                    self.push(Value::Closure(closure))?
                }

                // Collections
                Opcode::Array => {
                    let elements = self.pop_n(operands[0])?;
                    self.push(Value::array(elements))?
                }
                Opcode::Dict => self.exec_dict(operands[0])?,
                Opcode::Index => self.exec_index()?,
                Opcode::GetAttr => self.exec_get_attr()?,

                // Functions
                Opcode::Call => self.exec_call(operands[0])?,
                Opcode::ReturnValue => {
                    let value = self.pop()?;
                    self.exec_return(value)?
                }
                Opcode::Return => self.exec_return(Value::Null)?,
                Opcode::Closure => self.exec_closure(operands[0], operands[1])?,
            }
        }

        debug!(stack = self.stack.len(), "vm finish");
        Ok(())
    }

    fn exec_constant(&mut self, index: usize) -> Result<(), RuntimeError> {
        let value = self
            .constants
            .get(index)
            .cloned()
            .ok_or(RuntimeError::MalformedConstant { at: self.at, index })?;
        self.push(value)
    }

    /// Integer pairs use `int_op`, which returns `None` on a zero divisor.
    /// Mixed or float pairs are promoted to `f64`. Strings only concatenate.
    fn exec_binary_arith(
        &mut self,
        operator: &'static str,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => match int_op(*a, *b) {
                Some(n) => Value::Integer(n),
                None => return Err(RuntimeError::DivisionByZero { at: self.at }),
            },
            (Value::String(a), Value::String(b)) if operator == "+" => {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                Value::string(joined)
            }
            _ => match (as_float(&left), as_float(&right)) {
                (Some(a), Some(b)) => Value::Float(float_op(a, b)),
                _ => return Err(self.unsupported(operator, &left, &right)),
            },
        };
        self.push(result)
    }

    fn exec_minus(&mut self) -> Result<(), RuntimeError> {
        let operand = self.pop()?;
        let result = match operand {
            Value::Integer(n) => Value::Integer(n.wrapping_neg()),
            Value::Float(x) => Value::Float(-x),
            other => {
                return Err(RuntimeError::UnsupportedNegation {
                    at: self.at,
                    operand: other.type_tag(),
                })
            }
        };
        self.push(result)
    }

    fn exec_equality(&mut self, negate: bool) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.push(Value::Boolean(values_equal(&left, &right) != negate))
    }

    /// Ordering is defined for numbers only.
    fn exec_comparison(
        &mut self,
        operator: &'static str,
        int_cmp: fn(&i64, &i64) -> bool,
        float_cmp: fn(&f64, &f64) -> bool,
    ) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => int_cmp(a, b),
            _ => match (as_float(&left), as_float(&right)) {
                (Some(a), Some(b)) => float_cmp(&a, &b),
                _ => return Err(self.unsupported(operator, &left, &right)),
            },
        };
        self.push(Value::Boolean(result))
    }

    /// Both operands are already evaluated; `and`/`or` do not short-circuit.
    fn exec_logic(&mut self, combine: fn(bool, bool) -> bool) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.push(Value::Boolean(combine(left.is_truthy(), right.is_truthy())))
    }

    fn exec_set_global(&mut self, index: usize) -> Result<(), RuntimeError> {
        let value = self.pop()?;
        let slot = self
            .globals
            .get_mut(index)
            .ok_or(RuntimeError::SlotOutOfRange {
                at: self.at,
                kind: "global",
                index,
            })?;
        *slot = value;
        Ok(())
    }

    fn exec_get_global(&mut self, index: usize) -> Result<(), RuntimeError> {
        let value = self
            .globals
            .get(index)
            .cloned()
            .ok_or(RuntimeError::SlotOutOfRange {
                at: self.at,
                kind: "global",
                index,
            })?;
        self.push(value)
    }

    fn local_slot(&self, index: usize) -> Result<usize, RuntimeError> {
        let frame = self.current_frame()?;
        let slot = frame.base_pointer + index;
        if index >= frame.closure.func.num_locals || slot >= self.stack.len() {
            return Err(RuntimeError::SlotOutOfRange {
                at: self.at,
                kind: "local",
                index,
            });
        }
        Ok(slot)
    }

    fn exec_set_local(&mut self, index: usize) -> Result<(), RuntimeError> {
        let value = self.pop()?;
        let slot = self.local_slot(index)?;
        self.stack[slot] = value;
        Ok(())
    }

    fn exec_get_local(&mut self, index: usize) -> Result<(), RuntimeError> {
        let slot = self.local_slot(index)?;
        let value = self.stack[slot].clone();
        self.push(value)
    }

    fn exec_get_builtin(&mut self, index: usize) -> Result<(), RuntimeError> {
        let builtin = BUILTINS.get(index).ok_or(RuntimeError::SlotOutOfRange {
            at: self.at,
            kind: "builtin",
            index,
        })?;
        self.push(Value::Builtin(*builtin))
    }

    fn exec_get_free(&mut self, index: usize) -> Result<(), RuntimeError> {
        let value = self
            .current_frame()?
            .closure
            .free
            .get(index)
            .cloned()
            .ok_or(RuntimeError::SlotOutOfRange {
                at: self.at,
                kind: "free",
                index,
            })?;
        self.push(value)
    }

    /// Operands are key, value, key, value... oldest first.
    fn exec_dict(&mut self, count: usize) -> Result<(), RuntimeError> {
        let items = self.pop_n(count)?;
        let mut dict = Dict::new();
        let mut items = items.into_iter();
        while let (Some(key), Some(value)) = (items.next(), items.next()) {
            dict.insert(key, value)
                .map_err(|kind| RuntimeError::UnhashableKey { at: self.at, kind })?;
        }
        self.push(Value::Dict(Rc::new(dict)))
    }

    fn exec_index(&mut self) -> Result<(), RuntimeError> {
        let index = self.pop()?;
        let left = self.pop()?;
        let result = match (&left, &index) {
            (Value::Array(elements), Value::Integer(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| elements.get(i))
                .cloned()
                .unwrap_or(Value::Null),
            (Value::Dict(dict), key) => dict
                .get(key)
                .map_err(|kind| RuntimeError::UnhashableKey { at: self.at, kind })?
                .cloned()
                .unwrap_or(Value::Null),
            _ => {
                return Err(RuntimeError::IndexNotSupported {
                    at: self.at,
                    left: left.type_tag(),
                    index: index.type_tag(),
                })
            }
        };
        self.push(result)
    }

    fn exec_get_attr(&mut self) -> Result<(), RuntimeError> {
        let property = self.pop()?;
        let receiver = self.pop()?;
        let result = match &receiver {
            Value::Dict(dict) => dict
                .get(&property)
                .map_err(|kind| RuntimeError::UnhashableKey { at: self.at, kind })?
                .cloned()
                .unwrap_or(Value::Null),
            _ => {
                return Err(RuntimeError::AttributeNotSupported {
                    at: self.at,
                    receiver: receiver.type_tag(),
                    property: property.to_string(),
                })
            }
        };
        self.push(result)
    }

    /// The callee sits below its `argc` arguments.
    fn exec_call(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let callee_slot = self
            .stack
            .len()
            .checked_sub(argc + 1)
            .filter(|&slot| slot >= self.stack_floor())
            .ok_or(RuntimeError::StackUnderflow { at: self.at })?;

        match self.stack[callee_slot].clone() {
            Value::Closure(closure) => self.call_closure(closure, argc),
            Value::Builtin(builtin) => {
                trace!(name = builtin.name, argc, "call builtin");
                let args = self.stack.split_off(callee_slot + 1);
                self.stack.truncate(callee_slot);
                let result = builtin.call(self.host.as_mut(), &args);
                self.push(result)
            }
            _ => Err(RuntimeError::NotCallable { at: self.at }),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, argc: usize) -> Result<(), RuntimeError> {
        let func = &closure.func;
        if argc != func.num_parameters {
            return Err(RuntimeError::WrongArity {
                at: self.at,
                want: func.num_parameters,
                got: argc,
            });
        }
        if self.frames.len() >= self.config.max_frames {
            return Err(RuntimeError::FrameOverflow {
                at: self.at,
                max: self.config.max_frames,
            });
        }

        let base_pointer = self.stack.len() - argc;
        let top = base_pointer + func.num_locals.max(argc);
        if top > self.config.stack_size {
            return Err(RuntimeError::StackOverflow { at: self.at });
        }
        trace!(
            name = func.name.as_deref().unwrap_or("anonymous"),
            argc,
            depth = self.frames.len(),
            "call closure"
        );
        self.stack.resize(top, Value::Null);
        self.frames.push(Frame::new(closure, base_pointer));
        Ok(())
    }

    /// Pop the current frame, drop its locals and callee, push `value`.
    fn exec_return(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.frames.len() <= 1 {
            return Err(RuntimeError::FrameUnderflow { at: self.at });
        }
        let frame = self
            .frames
            .pop()
            .ok_or(RuntimeError::FrameUnderflow { at: self.at })?;
        trace!(depth = self.frames.len(), "return");
        self.stack.truncate(frame.base_pointer.saturating_sub(1));
        self.push(value)
    }

    fn exec_closure(&mut self, index: usize, num_free: usize) -> Result<(), RuntimeError> {
        let func = match self.constants.get(index) {
            Some(Value::CompiledFunction(func)) => Rc::clone(func),
            _ => return Err(RuntimeError::MalformedConstant { at: self.at, index }),
        };
        let free = self.pop_n(num_free)?;
        self.push(Value::Closure(Rc::new(Closure { func, free })))
    }

    fn unsupported(&self, operator: &'static str, left: &Value, right: &Value) -> RuntimeError {
        RuntimeError::UnsupportedOperands {
            at: self.at,
            operator,
            left: left.type_tag(),
            right: right.type_tag(),
        }
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

/// Language-level `==`. Numbers compare numerically across Int and Float;
/// collections and closures compare by identity.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            as_float(left) == as_float(right)
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Null, Value::Null) => true,
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
        (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
        (Value::CompiledFunction(a), Value::CompiledFunction(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        (Value::Error(a), Value::Error(b)) => a == b,
        _ => false,
    }
}
