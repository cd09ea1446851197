//! Compiled program representation.
//!
//! A [`Bytecode`] is the compiler's output and the VM's input: the main
//! instruction stream plus the constant pool it indexes into.

use std::fmt;

use crate::instruction::Instructions;
use crate::value::Value;

/// A compiled program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    /// Top-level instruction stream.
    pub instructions: Instructions,
    /// Constant pool. `CONSTANT i` and `CLOSURE i n` index into it.
    pub constants: Vec<Value>,
}

impl Bytecode {
    pub fn new(instructions: Instructions, constants: Vec<Value>) -> Self {
        Self {
            instructions,
            constants,
        }
    }
}

/// Full listing: the main stream, then every constant, with compiled
/// function bodies disassembled under their pool index.
impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== main ==")?;
        write!(f, "{}", self.instructions)?;
        if self.constants.is_empty() {
            return Ok(());
        }
        writeln!(f, "== constants ==")?;
        for (i, constant) in self.constants.iter().enumerate() {
            match constant {
                Value::CompiledFunction(func) => {
                    writeln!(
                        f,
                        "{i:04} {constant} locals={} params={}",
                        func.num_locals, func.num_parameters
                    )?;
                    for line in func.instructions.to_string().lines() {
                        writeln!(f, "     {line}")?;
                    }
                }
                Value::String(s) => writeln!(f, "{i:04} {:?}", &**s)?,
                _ => writeln!(f, "{i:04} {constant}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::instruction::make;
    use crate::opcode::Opcode;
    use crate::value::CompiledFunction;

    #[test]
    fn empty_bytecode() {
        let bytecode = Bytecode::default();
        assert!(bytecode.instructions.is_empty());
        assert!(bytecode.constants.is_empty());
        assert_eq!(bytecode.to_string(), "== main ==\n");
    }

    #[test]
    fn listing_includes_function_bodies() {
        let func = CompiledFunction {
            instructions: Instructions::concat([
                make(Opcode::Constant, &[0]),
                make(Opcode::ReturnValue, &[]),
            ]),
            num_locals: 0,
            num_parameters: 0,
            name: Some("five".into()),
        };
        let bytecode = Bytecode::new(
            Instructions::concat([make(Opcode::Closure, &[1, 0]), make(Opcode::Pop, &[])]),
            vec![
                Value::Integer(5),
                Value::CompiledFunction(Rc::new(func)),
                Value::from("key"),
            ],
        );
        let expected = "\
== main ==
0000 CLOSURE 1 0
0004 POP
== constants ==
0000 5
0001 CompiledFunction[five] locals=0 params=0
     0000 CONSTANT 0
     0003 RETURN_VALUE
0002 \"key\"
";
        assert_eq!(bytecode.to_string(), expected);
    }
}
