//! Runtime value representation for the Zumbra VM.
//!
//! Values are what live on the operand stack, in globals, in closures'
//! captured slots and in the constant pool.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::builtins::Builtin;
use crate::instruction::Instructions;
use crate::type_tag::TypeTag;

/// Runtime value representation.
///
/// Collections, functions and closures are reference-counted: cloning a
/// value never deep-copies them, and the VM compares them by identity.
#[derive(Debug, Clone)]
pub enum Value {
    /// Signed 64-bit integer.
    Integer(i64),
    /// IEEE 754 64-bit float.
    Float(f64),
    /// Immutable string.
    String(Rc<str>),
    /// Boolean value.
    Boolean(bool),
    /// The absence of a value.
    Null,
    /// Ordered sequence of values.
    Array(Rc<Vec<Value>>),
    /// Mapping from hash key to (original key, value).
    Dict(Rc<Dict>),
    /// A compiled function body, as stored in the constant pool.
    CompiledFunction(Rc<CompiledFunction>),
    /// A function together with its captured free values.
    Closure(Rc<Closure>),
    /// A host callable from the builtin registry.
    Builtin(Builtin),
    /// An error value, produced by builtins.
    Error(Rc<str>),
    /// A wrapped control value. The bytecode VM never produces one; it
    /// exists for execution strategies that unwind returns through values.
    ReturnValue(Box<Value>),
}

/// A compiled function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    /// Local slots to reserve, parameters included.
    pub num_locals: usize,
    pub num_parameters: usize,
    /// Name the function was bound to, if any. Used only for display.
    pub name: Option<String>,
}

/// A function plus the free values it captured when it was created.
#[derive(Debug, Clone)]
pub struct Closure {
    pub func: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}

/// Key under which a dict stores an entry.
///
/// Integer keys hash to their bit pattern, booleans to 0/1 and strings to
/// the first 8 bytes of their blake3 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey {
    pub tag: TypeTag,
    pub value: u64,
}

/// One dict entry: the key as written plus its value.
#[derive(Debug, Clone, PartialEq)]
pub struct DictPair {
    pub key: Value,
    pub value: Value,
}

/// Hash-keyed mapping. Iteration follows hash-key order, which is stable
/// for a given set of keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    pairs: BTreeMap<HashKey, DictPair>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. Fails with the key's type tag if the key
    /// is not hashable.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), TypeTag> {
        let hash = key.hash_key().ok_or_else(|| key.type_tag())?;
        self.pairs.insert(hash, DictPair { key, value });
        Ok(())
    }

    /// Look up a key. Fails with the key's type tag if it is not hashable.
    pub fn get(&self, key: &Value) -> Result<Option<&Value>, TypeTag> {
        let hash = key.hash_key().ok_or_else(|| key.type_tag())?;
        Ok(self.pairs.get(&hash).map(|pair| &pair.value))
    }

    /// Remove a key, returning its value if it was present.
    pub fn remove(&mut self, key: &Value) -> Result<Option<Value>, TypeTag> {
        let hash = key.hash_key().ok_or_else(|| key.type_tag())?;
        Ok(self.pairs.remove(&hash).map(|pair| pair.value))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &DictPair> {
        self.pairs.values()
    }
}

impl Value {
    /// Returns the type tag for this value.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Integer(_) => TypeTag::Integer,
            Value::Float(_) => TypeTag::Float,
            Value::String(_) => TypeTag::String,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Null => TypeTag::Null,
            Value::Array(_) => TypeTag::Array,
            Value::Dict(_) => TypeTag::Dict,
            Value::CompiledFunction(_) => TypeTag::CompiledFunction,
            Value::Closure(_) => TypeTag::Closure,
            Value::Builtin(_) => TypeTag::Builtin,
            Value::Error(_) => TypeTag::Error,
            Value::ReturnValue(_) => TypeTag::ReturnValue,
        }
    }

    /// Dict key for this value, or `None` if the type is not hashable.
    pub fn hash_key(&self) -> Option<HashKey> {
        let value = match self {
            Value::Integer(i) => *i as u64,
            Value::Boolean(b) => u64::from(*b),
            Value::String(s) => string_hash(s),
            Value::Float(_)
            | Value::Null
            | Value::Array(_)
            | Value::Dict(_)
            | Value::CompiledFunction(_)
            | Value::Closure(_)
            | Value::Builtin(_)
            | Value::Error(_)
            | Value::ReturnValue(_) => return None,
        };
        Some(HashKey {
            tag: self.type_tag(),
            value,
        })
    }

    /// Only `null` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Boolean(false))
    }

    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(elements))
    }

    pub fn error(message: impl Into<Rc<str>>) -> Self {
        Value::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

fn string_hash(s: &str) -> u64 {
    let digest = blake3::hash(s.as_bytes());
    let bytes = digest.as_bytes();
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

// Structural equality, used by tests and the constant pool's literal
// interning. Float compares by bit pattern so Value stays reflexive.
// Language-level `==` lives in the VM, which compares collections and
// closures by identity instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::CompiledFunction(a), Value::CompiledFunction(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::ReturnValue(a), Value::ReturnValue(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
            Value::Array(elements) => {
                f.write_str("[")?;
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{el}")?;
                }
                f.write_str("]")
            }
            Value::Dict(dict) => {
                f.write_str("{")?;
                for (i, pair) in dict.pairs().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                f.write_str("}")
            }
            Value::CompiledFunction(func) => match &func.name {
                Some(name) => write!(f, "CompiledFunction[{name}]"),
                None => f.write_str("CompiledFunction[anonymous]"),
            },
            Value::Closure(closure) => match &closure.func.name {
                Some(name) => write!(f, "Closure[{name}]"),
                None => f.write_str("Closure[anonymous]"),
            },
            Value::Builtin(builtin) => write!(f, "builtin function {}", builtin.name),
            Value::Error(message) => write!(f, "ERROR: {message}"),
            Value::ReturnValue(inner) => write!(f, "{inner}"),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags() {
        assert_eq!(Value::Integer(42).type_tag(), TypeTag::Integer);
        assert_eq!(Value::Float(3.5).type_tag(), TypeTag::Float);
        assert_eq!(Value::from("x").type_tag(), TypeTag::String);
        assert_eq!(Value::Boolean(true).type_tag(), TypeTag::Boolean);
        assert_eq!(Value::Null.type_tag(), TypeTag::Null);
        assert_eq!(Value::array(vec![]).type_tag(), TypeTag::Array);
        assert_eq!(Value::Dict(Rc::default()).type_tag(), TypeTag::Dict);
        assert_eq!(Value::error("boom").type_tag(), TypeTag::Error);
    }

    #[test]
    fn string_keys_hash_by_content() {
        let hello1 = Value::from("Hello World");
        let hello2 = Value::from("Hello World");
        let diff = Value::from("My name is johnny");
        assert_eq!(hello1.hash_key(), hello2.hash_key());
        assert_ne!(hello1.hash_key(), diff.hash_key());
    }

    #[test]
    fn integer_and_boolean_keys() {
        assert_eq!(
            Value::Integer(-1).hash_key(),
            Some(HashKey {
                tag: TypeTag::Integer,
                value: u64::MAX
            })
        );
        assert_eq!(Value::Boolean(true).hash_key().map(|k| k.value), Some(1));
        assert_eq!(Value::Boolean(false).hash_key().map(|k| k.value), Some(0));
    }

    #[test]
    fn same_bits_different_types_are_distinct_keys() {
        assert_ne!(Value::Integer(1).hash_key(), Value::Boolean(true).hash_key());
    }

    #[test]
    fn unhashable_keys() {
        assert_eq!(Value::Float(1.0).hash_key(), None);
        assert_eq!(Value::array(vec![]).hash_key(), None);
        assert_eq!(Value::Null.hash_key(), None);
    }

    #[test]
    fn dict_insert_get_remove() {
        let mut dict = Dict::new();
        dict.insert(Value::from("a"), Value::Integer(1)).unwrap();
        dict.insert(Value::Integer(2), Value::Integer(2)).unwrap();
        dict.insert(Value::from("a"), Value::Integer(3)).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(&Value::from("a")), Ok(Some(&Value::Integer(3))));
        assert_eq!(dict.get(&Value::from("b")), Ok(None));
        assert_eq!(dict.remove(&Value::Integer(2)), Ok(Some(Value::Integer(2))));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn dict_rejects_unhashable_key() {
        let mut dict = Dict::new();
        assert_eq!(
            dict.insert(Value::array(vec![]), Value::Null),
            Err(TypeTag::Array)
        );
        assert_eq!(dict.get(&Value::Float(1.5)), Err(TypeTag::Float));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
        assert!(Value::Dict(Rc::default()).is_truthy());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Integer(-7).to_string(), "-7");
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
        assert_eq!(Value::Float(2.0).to_string(), "2");
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::array(vec![Value::Integer(1), Value::from("a")]).to_string(),
            "[1, a]"
        );
        assert_eq!(Value::error("bad").to_string(), "ERROR: bad");
        assert_eq!(
            Value::ReturnValue(Box::new(Value::Integer(5))).to_string(),
            "5"
        );
    }

    #[test]
    fn closures_compare_by_identity() {
        let func = Rc::new(CompiledFunction {
            instructions: Instructions::new(),
            num_locals: 0,
            num_parameters: 0,
            name: None,
        });
        let a = Rc::new(Closure {
            func: Rc::clone(&func),
            free: vec![],
        });
        let b = Rc::new(Closure { func, free: vec![] });
        assert_eq!(Value::Closure(Rc::clone(&a)), Value::Closure(Rc::clone(&a)));
        assert_ne!(Value::Closure(a), Value::Closure(b));
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
    }
}
