//! Builtin function registry and the host capability builtins run against.
//!
//! The registry is ordered: a builtin's position in [`BUILTINS`] is the
//! operand of `GET_BUILTIN` and the index the compiler seeds its global
//! scope with. Reordering entries changes compiled bytecode.
//!
//! Builtins never halt the VM. Bad arguments produce a [`Value::Error`],
//! which the VM pushes like any other result.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::value::{Dict, Value};

/// I/O capabilities available to builtins.
pub trait Host {
    /// Write one line of program output.
    fn write_line(&mut self, line: &str);

    /// Read one line of input without its trailing newline. `None` at end
    /// of input.
    fn read_line(&mut self) -> Option<String>;
}

/// Host backed by the process's stdin and stdout.
#[derive(Debug, Default)]
pub struct StdHost;

impl Host for StdHost {
    fn write_line(&mut self, line: &str) {
        let mut out = io::stdout().lock();
        // A closed stdout has nowhere to report to.
        let _ = writeln!(out, "{line}");
    }

    fn read_line(&mut self) -> Option<String> {
        let mut buf = String::new();
        match io::stdin().lock().read_line(&mut buf) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let trimmed = buf.trim_end_matches(['\n', '\r']).len();
                buf.truncate(trimmed);
                Some(buf)
            }
        }
    }
}

/// In-memory host: input comes from a queue, output is captured.
#[derive(Debug, Default, Clone)]
pub struct BufferHost {
    pub input: VecDeque<String>,
    pub output: Vec<String>,
}

impl BufferHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            output: Vec::new(),
        }
    }
}

impl Host for BufferHost {
    fn write_line(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }
}

/// Signature every builtin implements.
pub type BuiltinFn = fn(&mut dyn Host, &[Value]) -> Value;

/// A named host callable.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl Builtin {
    pub fn call(&self, host: &mut dyn Host, args: &[Value]) -> Value {
        (self.func)(host, args)
    }
}

// Builtins are identified by registry name.
impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

/// The ordered builtin registry.
pub const BUILTINS: &[Builtin] = &[
    Builtin { name: "sizeOf", func: size_of },
    Builtin { name: "show", func: show },
    Builtin { name: "input", func: input },
    Builtin { name: "first", func: first },
    Builtin { name: "last", func: last },
    Builtin { name: "allButFirst", func: all_but_first },
    Builtin { name: "addToArray", func: add_to_array },
    Builtin { name: "removeFromArray", func: remove_from_array },
    Builtin { name: "max", func: max },
    Builtin { name: "min", func: min },
    Builtin { name: "indexOf", func: index_of },
    Builtin { name: "addToDict", func: add_to_dict },
    Builtin { name: "deleteFromDict", func: delete_from_dict },
    Builtin { name: "toString", func: to_string },
    Builtin { name: "toInt", func: to_int },
    Builtin { name: "toFloat", func: to_float },
    Builtin { name: "toBool", func: to_bool },
    Builtin { name: "addToArrayStart", func: add_to_array_start },
    Builtin { name: "addToArrayEnd", func: add_to_array_end },
    Builtin { name: "bhaskara", func: bhaskara },
    Builtin { name: "capitalize", func: capitalize },
    Builtin { name: "dictKeys", func: dict_keys },
    Builtin { name: "dictValues", func: dict_values },
    Builtin { name: "getFromDict", func: get_from_dict },
    Builtin { name: "hashCode", func: hash_code },
    Builtin { name: "organize", func: organize },
    Builtin { name: "removeWhiteSpaces", func: remove_white_spaces },
    Builtin { name: "replace", func: replace },
    Builtin { name: "sum", func: sum },
    Builtin { name: "toLowercase", func: to_lowercase },
    Builtin { name: "toUppercase", func: to_uppercase },
];

/// Find a builtin and its registry index by name.
pub fn lookup(name: &str) -> Option<(usize, &'static Builtin)> {
    BUILTINS.iter().enumerate().find(|(_, b)| b.name == name)
}

fn wrong_arity(got: usize, want: usize) -> Value {
    Value::error(format!("wrong number of arguments. got={got}, want={want}"))
}

fn wrong_type(builtin: &str, want: &str, got: &Value) -> Value {
    Value::error(format!(
        "argument to `{builtin}` must be {want}, got {}",
        got.type_tag()
    ))
}

fn check_arity(args: &[Value], want: usize) -> Result<(), Value> {
    if args.len() == want {
        Ok(())
    } else {
        Err(wrong_arity(args.len(), want))
    }
}

fn array_arg<'a>(builtin: &str, arg: &'a Value) -> Result<&'a Rc<Vec<Value>>, Value> {
    match arg {
        Value::Array(elements) => Ok(elements),
        other => Err(wrong_type(builtin, "ARRAY", other)),
    }
}

fn dict_arg<'a>(builtin: &str, arg: &'a Value) -> Result<&'a Rc<Dict>, Value> {
    match arg {
        Value::Dict(dict) => Ok(dict),
        other => Err(wrong_type(builtin, "DICT", other)),
    }
}

fn string_arg<'a>(builtin: &str, arg: &'a Value) -> Result<&'a str, Value> {
    match arg {
        Value::String(s) => Ok(&**s),
        other => Err(wrong_type(builtin, "STRING", other)),
    }
}

fn unhashable(key: &Value) -> Value {
    Value::error(format!(
        "key must be hashable (STRING, INTEGER, BOOLEAN), got {}",
        key.type_tag()
    ))
}

fn size_of(_: &mut dyn Host, args: &[Value]) -> Value {
    if let Err(e) = check_arity(args, 1) {
        return e;
    }
    match &args[0] {
        Value::Array(elements) => Value::Integer(elements.len() as i64),
        Value::String(s) => Value::Integer(s.len() as i64),
        other => Value::error(format!(
            "argument to `sizeOf` not supported, got {}",
            other.type_tag()
        )),
    }
}

fn show(host: &mut dyn Host, args: &[Value]) -> Value {
    for arg in args {
        host.write_line(&arg.to_string());
    }
    Value::Null
}

fn input(host: &mut dyn Host, args: &[Value]) -> Value {
    if let Some(prompt) = args.first() {
        host.write_line(&prompt.to_string());
    }
    match host.read_line() {
        Some(line) => Value::string(line),
        None => Value::Null,
    }
}

fn first(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements = match check_arity(args, 1).and_then(|()| array_arg("first", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    elements.first().cloned().unwrap_or(Value::Null)
}

fn last(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements = match check_arity(args, 1).and_then(|()| array_arg("last", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    elements.last().cloned().unwrap_or(Value::Null)
}

fn all_but_first(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements = match check_arity(args, 1).and_then(|()| array_arg("allButFirst", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    if elements.is_empty() {
        return Value::Null;
    }
    Value::array(elements[1..].to_vec())
}

fn add_to_array(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements = match check_arity(args, 2).and_then(|()| array_arg("addToArray", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    let mut extended = Vec::with_capacity(elements.len() + 1);
    extended.extend(elements.iter().cloned());
    extended.push(args[1].clone());
    Value::array(extended)
}

fn remove_from_array(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements =
        match check_arity(args, 2).and_then(|()| array_arg("removeFromArray", &args[0])) {
            Ok(elements) => elements,
            Err(e) => return e,
        };
    let index = match &args[1] {
        Value::Integer(i) => *i,
        other => {
            return Value::error(format!(
                "index argument to `removeFromArray` must be INTEGER, got {}",
                other.type_tag()
            ))
        }
    };
    let Some(pos) = usize::try_from(index).ok().filter(|&p| p < elements.len()) else {
        return Value::error(format!("index out of bounds: {index}"));
    };
    let mut remaining = elements.as_ref().clone();
    remaining.remove(pos);
    Value::array(remaining)
}

/// Shared by `max` and `min`: keep the element `prefer` picks over the
/// current best. Integers and floats may be mixed.
fn extremum(name: &str, args: &[Value], prefer: fn(f64, f64) -> bool) -> Value {
    let elements = match check_arity(args, 1).and_then(|()| array_arg(name, &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    let mut best: Option<(&Value, f64)> = None;
    for el in elements.iter() {
        let n = match el {
            Value::Integer(i) => *i as f64,
            Value::Float(x) => *x,
            other => {
                return Value::error(format!(
                    "elements of `{name}` must be INTEGER or FLOAT, got {}",
                    other.type_tag()
                ))
            }
        };
        match best {
            Some((_, current)) if !prefer(n, current) => {}
            _ => best = Some((el, n)),
        }
    }
    best.map(|(el, _)| el.clone()).unwrap_or(Value::Null)
}

fn max(_: &mut dyn Host, args: &[Value]) -> Value {
    extremum("max", args, |candidate, current| candidate > current)
}

fn min(_: &mut dyn Host, args: &[Value]) -> Value {
    extremum("min", args, |candidate, current| candidate < current)
}

fn index_of(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements = match check_arity(args, 2).and_then(|()| array_arg("indexOf", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    let needle = &args[1];
    if !matches!(needle, Value::Integer(_) | Value::String(_)) {
        return Value::error(format!(
            "search argument to `indexOf` must be INTEGER or STRING, got {}",
            needle.type_tag()
        ));
    }
    let found = elements.iter().position(|el| el == needle);
    Value::Integer(found.map_or(-1, |i| i as i64))
}

fn add_to_dict(_: &mut dyn Host, args: &[Value]) -> Value {
    let dict = match check_arity(args, 3).and_then(|()| dict_arg("addToDict", &args[0])) {
        Ok(dict) => dict,
        Err(e) => return e,
    };
    let mut updated = dict.as_ref().clone();
    match updated.insert(args[1].clone(), args[2].clone()) {
        Ok(()) => Value::Dict(Rc::new(updated)),
        Err(_) => unhashable(&args[1]),
    }
}

fn delete_from_dict(_: &mut dyn Host, args: &[Value]) -> Value {
    let dict = match check_arity(args, 2).and_then(|()| dict_arg("deleteFromDict", &args[0])) {
        Ok(dict) => dict,
        Err(e) => return e,
    };
    let mut updated = dict.as_ref().clone();
    match updated.remove(&args[1]) {
        Ok(_) => Value::Dict(Rc::new(updated)),
        Err(_) => unhashable(&args[1]),
    }
}

fn to_string(_: &mut dyn Host, args: &[Value]) -> Value {
    if let Err(e) = check_arity(args, 1) {
        return e;
    }
    match &args[0] {
        v @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_)) => {
            Value::string(v.to_string())
        }
        other => Value::error(format!(
            "argument to `toString` not supported, got={}",
            other.type_tag()
        )),
    }
}

fn to_int(_: &mut dyn Host, args: &[Value]) -> Value {
    if let Err(e) = check_arity(args, 1) {
        return e;
    }
    match &args[0] {
        Value::Integer(i) => Value::Integer(*i),
        Value::Float(x) => Value::Integer(x.floor() as i64),
        Value::Boolean(b) => Value::Integer(i64::from(*b)),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(e) => Value::error(format!("could not parse {:?} as INTEGER: {e}", &**s)),
        },
        other => Value::error(format!(
            "argument to `toInt` not supported, got={}",
            other.type_tag()
        )),
    }
}

fn to_float(_: &mut dyn Host, args: &[Value]) -> Value {
    if let Err(e) = check_arity(args, 1) {
        return e;
    }
    match &args[0] {
        Value::Integer(i) => Value::Float(*i as f64),
        Value::Float(x) => Value::Float(*x),
        Value::Boolean(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(x) => Value::Float(x),
            Err(e) => Value::error(format!("could not parse {:?} as FLOAT: {e}", &**s)),
        },
        other => Value::error(format!(
            "argument to `toFloat` not supported, got={}",
            other.type_tag()
        )),
    }
}

fn to_bool(_: &mut dyn Host, args: &[Value]) -> Value {
    if let Err(e) = check_arity(args, 1) {
        return e;
    }
    match &args[0] {
        Value::Integer(i) => Value::Boolean(*i != 0),
        Value::Float(x) => Value::Boolean(*x != 0.0),
        Value::Boolean(b) => Value::Boolean(*b),
        Value::String(s) => Value::Boolean(!s.is_empty()),
        other => Value::error(format!(
            "argument to `toBool` not supported, got={}",
            other.type_tag()
        )),
    }
}

fn add_to_array_start(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements =
        match check_arity(args, 2).and_then(|()| array_arg("addToArrayStart", &args[0])) {
            Ok(elements) => elements,
            Err(e) => return e,
        };
    let mut extended = Vec::with_capacity(elements.len() + 1);
    extended.push(args[1].clone());
    extended.extend(elements.iter().cloned());
    Value::array(extended)
}

fn add_to_array_end(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements = match check_arity(args, 2).and_then(|()| array_arg("addToArrayEnd", &args[0]))
    {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    let mut extended = Vec::with_capacity(elements.len() + 1);
    extended.extend(elements.iter().cloned());
    extended.push(args[1].clone());
    Value::array(extended)
}

/// Real roots of `a*x^2 + b*x + c`: two floats, one float when the
/// discriminant is zero, `null` when it is negative.
fn bhaskara(_: &mut dyn Host, args: &[Value]) -> Value {
    if let Err(e) = check_arity(args, 3) {
        return e;
    }
    let [Value::Integer(a), Value::Integer(b), Value::Integer(c)] = args else {
        return Value::error("All arguments to `bhaskara` must be INT");
    };
    let (a, b, c) = (*a as f64, *b as f64, *c as f64);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Value::Null;
    }
    if discriminant == 0.0 {
        return Value::Float(-b / (2.0 * a));
    }
    let root = discriminant.sqrt();
    Value::array(vec![
        Value::Float((-b + root) / (2.0 * a)),
        Value::Float((-b - root) / (2.0 * a)),
    ])
}

/// Upper-case the first letter of every word. Anything other than a
/// letter, digit or underscore starts a new word.
fn capitalize(_: &mut dyn Host, args: &[Value]) -> Value {
    let s = match check_arity(args, 1).and_then(|()| string_arg("capitalize", &args[0])) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    Value::string(out)
}

fn dict_keys(_: &mut dyn Host, args: &[Value]) -> Value {
    let dict = match check_arity(args, 1).and_then(|()| dict_arg("dictKeys", &args[0])) {
        Ok(dict) => dict,
        Err(e) => return e,
    };
    Value::array(dict.pairs().map(|pair| pair.key.clone()).collect())
}

fn dict_values(_: &mut dyn Host, args: &[Value]) -> Value {
    let dict = match check_arity(args, 1).and_then(|()| dict_arg("dictValues", &args[0])) {
        Ok(dict) => dict,
        Err(e) => return e,
    };
    Value::array(dict.pairs().map(|pair| pair.value.clone()).collect())
}

fn get_from_dict(_: &mut dyn Host, args: &[Value]) -> Value {
    let dict = match check_arity(args, 2).and_then(|()| dict_arg("getFromDict", &args[0])) {
        Ok(dict) => dict,
        Err(e) => return e,
    };
    match dict.get(&args[1]) {
        Ok(found) => found.cloned().unwrap_or(Value::Null),
        Err(_) => unhashable(&args[1]),
    }
}

/// Hex-encoded blake3 digest of a string.
fn hash_code(_: &mut dyn Host, args: &[Value]) -> Value {
    let s = match check_arity(args, 1).and_then(|()| string_arg("hashCode", &args[0])) {
        Ok(s) => s,
        Err(e) => return e,
    };
    Value::string(blake3::hash(s.as_bytes()).to_hex().as_str())
}

/// Sort an array ascending. Elements must be all numbers or all strings.
fn organize(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements = match check_arity(args, 1).and_then(|()| array_arg("organize", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    let mut sorted = elements.as_ref().clone();
    if sorted.iter().all(|el| matches!(el, Value::String(_))) {
        sorted.sort_by(|a, b| match (a, b) {
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        });
        return Value::array(sorted);
    }
    if let Some(bad) = sorted
        .iter()
        .find(|el| !matches!(el, Value::Integer(_) | Value::Float(_)))
    {
        return Value::error(format!(
            "elements of `organize` must be all numbers or all strings, got {}",
            bad.type_tag()
        ));
    }
    sorted.sort_by(|a, b| as_f64(a).total_cmp(&as_f64(b)));
    Value::array(sorted)
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Integer(i) => *i as f64,
        Value::Float(x) => *x,
        _ => f64::NAN,
    }
}

fn remove_white_spaces(_: &mut dyn Host, args: &[Value]) -> Value {
    match check_arity(args, 1).and_then(|()| string_arg("removeWhiteSpaces", &args[0])) {
        Ok(s) => Value::string(s.replace(' ', "")),
        Err(e) => e,
    }
}

fn replace(_: &mut dyn Host, args: &[Value]) -> Value {
    if let Err(e) = check_arity(args, 3) {
        return e;
    }
    let parts: Result<Vec<&str>, Value> =
        args.iter().map(|arg| string_arg("replace", arg)).collect();
    match parts.as_deref() {
        Ok([haystack, from, to]) => Value::string(haystack.replace(from, to)),
        Ok(_) => wrong_arity(args.len(), 3),
        Err(e) => e.clone(),
    }
}

/// Integer total for all-integer arrays (wrapping on overflow), float
/// total as soon as one element is a float. An empty array sums to 0.
fn sum(_: &mut dyn Host, args: &[Value]) -> Value {
    let elements = match check_arity(args, 1).and_then(|()| array_arg("sum", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    let mut total = Value::Integer(0);
    for el in elements.iter() {
        total = match (&total, el) {
            (Value::Integer(t), Value::Integer(i)) => Value::Integer(t.wrapping_add(*i)),
            (Value::Integer(t), Value::Float(x)) => Value::Float(*t as f64 + x),
            (Value::Float(t), Value::Integer(i)) => Value::Float(t + *i as f64),
            (Value::Float(t), Value::Float(x)) => Value::Float(t + x),
            (_, other) => {
                return Value::error(format!(
                    "elements of `sum` must be INTEGER or FLOAT, got {}",
                    other.type_tag()
                ))
            }
        };
    }
    total
}

fn to_lowercase(_: &mut dyn Host, args: &[Value]) -> Value {
    match check_arity(args, 1).and_then(|()| string_arg("toLowercase", &args[0])) {
        Ok(s) => Value::string(s.to_lowercase()),
        Err(e) => e,
    }
}

fn to_uppercase(_: &mut dyn Host, args: &[Value]) -> Value {
    match check_arity(args, 1).and_then(|()| string_arg("toUppercase", &args[0])) {
        Ok(s) => Value::string(s.to_uppercase()),
        Err(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Value {
        let mut host = BufferHost::new();
        call_with(&mut host, name, args)
    }

    fn call_with(host: &mut BufferHost, name: &str, args: &[Value]) -> Value {
        let (_, builtin) = lookup(name).unwrap();
        builtin.call(host, args)
    }

    fn ints(values: &[i64]) -> Value {
        Value::array(values.iter().map(|&i| Value::Integer(i)).collect())
    }

    #[test]
    fn registry_names_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for b in BUILTINS {
            assert!(seen.insert(b.name), "duplicate builtin {}", b.name);
        }
    }

    #[test]
    fn lookup_returns_registry_index() {
        assert_eq!(lookup("sizeOf").map(|(i, _)| i), Some(0));
        assert_eq!(lookup("show").map(|(i, _)| i), Some(1));
        assert_eq!(lookup("addToArrayStart").map(|(i, _)| i), Some(17));
        assert_eq!(lookup("toUppercase").map(|(i, _)| i), Some(BUILTINS.len() - 1));
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn size_of_strings_and_arrays() {
        assert_eq!(call("sizeOf", &[Value::from("")]), Value::Integer(0));
        assert_eq!(call("sizeOf", &[Value::from("four")]), Value::Integer(4));
        assert_eq!(call("sizeOf", &[ints(&[1, 2, 3])]), Value::Integer(3));
        assert_eq!(
            call("sizeOf", &[Value::Integer(1)]),
            Value::error("argument to `sizeOf` not supported, got INTEGER")
        );
        assert_eq!(
            call("sizeOf", &[Value::from("one"), Value::from("two")]),
            Value::error("wrong number of arguments. got=2, want=1")
        );
    }

    #[test]
    fn show_writes_each_argument() {
        let mut host = BufferHost::new();
        let result = call_with(&mut host, "show", &[Value::Integer(1), Value::from("two")]);
        assert_eq!(result, Value::Null);
        assert_eq!(host.output, vec!["1".to_string(), "two".to_string()]);
    }

    #[test]
    fn input_reads_a_line() {
        let mut host = BufferHost::with_input(["alice"]);
        let result = call_with(&mut host, "input", &[Value::from("name?")]);
        assert_eq!(result, Value::from("alice"));
        assert_eq!(host.output, vec!["name?".to_string()]);
        assert_eq!(call_with(&mut host, "input", &[]), Value::Null);
    }

    #[test]
    fn first_last_all_but_first() {
        assert_eq!(call("first", &[ints(&[1, 2, 3])]), Value::Integer(1));
        assert_eq!(call("last", &[ints(&[1, 2, 3])]), Value::Integer(3));
        assert_eq!(call("allButFirst", &[ints(&[1, 2, 3])]), ints(&[2, 3]));
        assert_eq!(call("first", &[ints(&[])]), Value::Null);
        assert_eq!(call("last", &[ints(&[])]), Value::Null);
        assert_eq!(call("allButFirst", &[ints(&[])]), Value::Null);
        assert_eq!(
            call("first", &[Value::Integer(1)]),
            Value::error("argument to `first` must be ARRAY, got INTEGER")
        );
    }

    #[test]
    fn add_to_array_leaves_original_untouched() {
        let original = ints(&[1]);
        assert_eq!(call("addToArray", &[original.clone(), Value::Integer(2)]), ints(&[1, 2]));
        assert_eq!(original, ints(&[1]));
    }

    #[test]
    fn remove_from_array_bounds() {
        assert_eq!(
            call("removeFromArray", &[ints(&[1, 2, 3]), Value::Integer(1)]),
            ints(&[1, 3])
        );
        assert_eq!(
            call("removeFromArray", &[ints(&[1]), Value::Integer(5)]),
            Value::error("index out of bounds: 5")
        );
        assert_eq!(
            call("removeFromArray", &[ints(&[1]), Value::Integer(-1)]),
            Value::error("index out of bounds: -1")
        );
    }

    #[test]
    fn max_and_min() {
        assert_eq!(call("max", &[ints(&[3, 9, 2])]), Value::Integer(9));
        assert_eq!(call("min", &[ints(&[3, 9, 2])]), Value::Integer(2));
        assert_eq!(
            call("max", &[Value::array(vec![Value::Integer(1), Value::Float(1.5)])]),
            Value::Float(1.5)
        );
        assert_eq!(call("max", &[ints(&[])]), Value::Null);
        assert!(call("min", &[Value::array(vec![Value::from("a")])]).is_error());
    }

    #[test]
    fn index_of_finds_position() {
        assert_eq!(call("indexOf", &[ints(&[4, 5, 6]), Value::Integer(6)]), Value::Integer(2));
        assert_eq!(call("indexOf", &[ints(&[4, 5, 6]), Value::Integer(7)]), Value::Integer(-1));
        let words = Value::array(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(call("indexOf", &[words, Value::from("b")]), Value::Integer(1));
    }

    #[test]
    fn dict_builtins_return_new_dicts() {
        let empty = Value::Dict(Rc::default());
        let one = call("addToDict", &[empty.clone(), Value::from("k"), Value::Integer(1)]);
        let Value::Dict(dict) = &one else {
            panic!("expected dict, got {one:?}");
        };
        assert_eq!(dict.get(&Value::from("k")), Ok(Some(&Value::Integer(1))));
        assert_eq!(empty, Value::Dict(Rc::default()));

        let removed = call("deleteFromDict", &[one.clone(), Value::from("k")]);
        assert_eq!(removed, Value::Dict(Rc::default()));

        assert_eq!(
            call("addToDict", &[empty, Value::Float(1.0), Value::Null]),
            Value::error("key must be hashable (STRING, INTEGER, BOOLEAN), got FLOAT")
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(call("toString", &[Value::Integer(12)]), Value::from("12"));
        assert_eq!(call("toString", &[Value::Boolean(true)]), Value::from("true"));
        assert_eq!(call("toInt", &[Value::from("42")]), Value::Integer(42));
        assert_eq!(call("toInt", &[Value::Float(2.7)]), Value::Integer(2));
        assert_eq!(call("toInt", &[Value::Float(-2.5)]), Value::Integer(-3));
        assert!(call("toInt", &[Value::from("abc")]).is_error());
        assert_eq!(call("toFloat", &[Value::Integer(2)]), Value::Float(2.0));
        assert_eq!(call("toFloat", &[Value::from("2.5")]), Value::Float(2.5));
        assert_eq!(call("toBool", &[Value::Integer(0)]), Value::Boolean(false));
        assert_eq!(call("toBool", &[Value::from("x")]), Value::Boolean(true));
        assert_eq!(
            call("toBool", &[Value::Null]),
            Value::error("argument to `toBool` not supported, got=NULL")
        );
    }

    #[test]
    fn string_utilities() {
        assert_eq!(call("toUppercase", &[Value::from("zumbra")]), Value::from("ZUMBRA"));
        assert_eq!(call("toLowercase", &[Value::from("ZumBra")]), Value::from("zumbra"));
        assert_eq!(
            call("capitalize", &[Value::from("hello big-world x_y")]),
            Value::from("Hello Big-World X_y")
        );
        assert_eq!(call("removeWhiteSpaces", &[Value::from(" a b  c ")]), Value::from("abc"));
        assert_eq!(
            call("replace", &[Value::from("a-b-c"), Value::from("-"), Value::from("+")]),
            Value::from("a+b+c")
        );
        assert_eq!(
            call("toUppercase", &[Value::Integer(1)]),
            Value::error("argument to `toUppercase` must be STRING, got INTEGER")
        );
        assert_eq!(
            call("replace", &[Value::from("a"), Value::Null, Value::from("b")]),
            Value::error("argument to `replace` must be STRING, got NULL")
        );
        assert_eq!(
            call("replace", &[Value::from("a"), Value::from("b")]),
            Value::error("wrong number of arguments. got=2, want=3")
        );
    }

    #[test]
    fn add_to_array_start_and_end() {
        let original = ints(&[2]);
        assert_eq!(
            call("addToArrayStart", &[original.clone(), Value::Integer(1)]),
            ints(&[1, 2])
        );
        assert_eq!(call("addToArrayEnd", &[original.clone(), Value::Integer(3)]), ints(&[2, 3]));
        assert_eq!(original, ints(&[2]));
        assert_eq!(
            call("addToArrayEnd", &[Value::Null, Value::Integer(3)]),
            Value::error("argument to `addToArrayEnd` must be ARRAY, got NULL")
        );
    }

    #[test]
    fn dict_accessors() {
        let mut dict = Dict::new();
        dict.insert(Value::from("a"), Value::Integer(1)).unwrap();
        let dict = Value::Dict(Rc::new(dict));
        assert_eq!(call("dictKeys", &[dict.clone()]), Value::array(vec![Value::from("a")]));
        assert_eq!(call("dictValues", &[dict.clone()]), ints(&[1]));
        assert_eq!(call("getFromDict", &[dict.clone(), Value::from("a")]), Value::Integer(1));
        assert_eq!(call("getFromDict", &[dict.clone(), Value::from("b")]), Value::Null);
        assert_eq!(
            call("getFromDict", &[dict, ints(&[])]),
            Value::error("key must be hashable (STRING, INTEGER, BOOLEAN), got ARRAY")
        );
        assert_eq!(
            call("dictKeys", &[ints(&[])]),
            Value::error("argument to `dictKeys` must be DICT, got ARRAY")
        );
    }

    #[test]
    fn sum_and_organize() {
        assert_eq!(call("sum", &[ints(&[1, 2, 3])]), Value::Integer(6));
        assert_eq!(call("sum", &[ints(&[])]), Value::Integer(0));
        assert_eq!(
            call("sum", &[Value::array(vec![Value::Integer(1), Value::Float(0.5)])]),
            Value::Float(1.5)
        );
        assert!(call("sum", &[Value::array(vec![Value::from("a")])]).is_error());

        assert_eq!(call("organize", &[ints(&[3, 1, 2])]), ints(&[1, 2, 3]));
        let words = Value::array(vec![Value::from("b"), Value::from("a")]);
        assert_eq!(
            call("organize", &[words]),
            Value::array(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(
            call("organize", &[Value::array(vec![Value::Integer(1), Value::from("a")])]),
            Value::error("elements of `organize` must be all numbers or all strings, got STRING")
        );
    }

    #[test]
    fn bhaskara_roots() {
        let args = |a, b, c| [Value::Integer(a), Value::Integer(b), Value::Integer(c)];
        assert_eq!(
            call("bhaskara", &args(1, -3, 2)),
            Value::array(vec![Value::Float(2.0), Value::Float(1.0)])
        );
        assert_eq!(call("bhaskara", &args(1, 2, 1)), Value::Float(-1.0));
        assert_eq!(call("bhaskara", &args(1, 0, 1)), Value::Null);
        assert_eq!(
            call("bhaskara", &[Value::Float(1.0), Value::Integer(0), Value::Integer(0)]),
            Value::error("All arguments to `bhaskara` must be INT")
        );
    }

    #[test]
    fn hash_code_is_stable_hex() {
        let Value::String(first) = call("hashCode", &[Value::from("zumbra")]) else {
            panic!("expected string");
        };
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(call("hashCode", &[Value::from("zumbra")]), Value::String(first));
        assert_ne!(
            call("hashCode", &[Value::from("a")]),
            call("hashCode", &[Value::from("b")])
        );
    }
}
