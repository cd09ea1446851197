//! Type tags for Zumbra runtime values.
//!
//! Tags name a value's kind in error messages and form the first half of a
//! dict [`HashKey`](crate::value::HashKey).

/// Identifies the kind of a runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeTag {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Array,
    Dict,
    CompiledFunction,
    Closure,
    Builtin,
    Error,
    ReturnValue,
}

/// All type tags, in definition order.
pub const ALL_TYPE_TAGS: [TypeTag; 12] = [
    TypeTag::Integer,
    TypeTag::Float,
    TypeTag::String,
    TypeTag::Boolean,
    TypeTag::Null,
    TypeTag::Array,
    TypeTag::Dict,
    TypeTag::CompiledFunction,
    TypeTag::Closure,
    TypeTag::Builtin,
    TypeTag::Error,
    TypeTag::ReturnValue,
];

impl TypeTag {
    /// Returns the name used in runtime error messages.
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Integer => "INTEGER",
            TypeTag::Float => "FLOAT",
            TypeTag::String => "STRING",
            TypeTag::Boolean => "BOOLEAN",
            TypeTag::Null => "NULL",
            TypeTag::Array => "ARRAY",
            TypeTag::Dict => "DICT",
            TypeTag::CompiledFunction => "COMPILED_FUNCTION",
            TypeTag::Closure => "CLOSURE",
            TypeTag::Builtin => "BUILTIN",
            TypeTag::Error => "ERROR",
            TypeTag::ReturnValue => "RETURN_VALUE",
        }
    }

    /// Returns true if values of this kind can be dict keys.
    pub fn is_hashable(&self) -> bool {
        matches!(self, TypeTag::Integer | TypeTag::Boolean | TypeTag::String)
    }

    /// Returns true for Integer and Float.
    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeTag::Integer | TypeTag::Float)
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
