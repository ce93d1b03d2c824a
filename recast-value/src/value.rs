//! Core `Value` type.
//!
//! A `Value` is a plain tree: scalars at the leaves, arrays and objects as
//! branches. It deliberately knows nothing about records, dates or any other
//! typed concept; the engine's procedures map typed data onto this
//! vocabulary and back.

use core::fmt::{self, Debug, Display, Formatter};

use crate::{VNumber, VObject};

/// Enum distinguishing the value types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueType {
    /// Null value
    Null,
    /// Boolean value
    Bool,
    /// Number (integers and floats)
    Number,
    /// String (UTF-8)
    String,
    /// Binary data (useful for binary formats)
    Bytes,
    /// Array
    Array,
    /// Object (key-value map)
    Object,
}

impl ValueType {
    /// Lowercase name, as used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Bytes => "bytes",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamic value that can represent null, booleans, numbers, strings,
/// bytes, arrays, or objects.
#[derive(Clone, PartialEq, Default)]
pub enum Value {
    /// `null`
    #[default]
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer or float
    Number(VNumber),
    /// UTF-8 text
    String(String),
    /// Binary blob
    Bytes(Vec<u8>),
    /// Ordered sequence
    Array(Vec<Value>),
    /// Ordered string-keyed mapping
    Object(VObject),
}

impl Value {
    /// JSON `null` value.
    pub const NULL: Self = Value::Null;

    /// JSON `true` value.
    pub const TRUE: Self = Value::Bool(true);

    /// JSON `false` value.
    pub const FALSE: Self = Value::Bool(false);

    /// Returns the type of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    /// Returns true if this is `null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this is a boolean.
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns true if this is a number.
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Returns true if this is a string.
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Returns true if this is an array.
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns true if this is an object.
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Gets the boolean, if this is one.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Gets the number, if this is one.
    pub const fn as_number(&self) -> Option<&VNumber> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Gets the number as an exact i64.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(VNumber::to_i64)
    }

    /// Gets the number as an f64, rounding if necessary.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(VNumber::to_f64_lossy)
    }

    /// Gets the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Gets the bytes, if this is a blob.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Gets the elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Gets the object, if this is one.
    pub const fn as_object(&self) -> Option<&VObject> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Gets the object mutably, if this is one.
    pub const fn as_object_mut(&mut self) -> Option<&mut VObject> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Looks up a key, if this is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Takes the value out, leaving `null` in its place.
    pub fn take(&mut self) -> Value {
        core::mem::take(self)
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Bytes(b) => write!(f, "Bytes({b:?})"),
            Value::Array(a) => f.debug_list().entries(a).finish(),
            Value::Object(o) => Debug::fmt(o, f),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format_value(self))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Number(VNumber::from(v))
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl From<f64> for Value {
    /// Non-finite floats become `null`.
    fn from(v: f64) -> Self {
        VNumber::from_f64(v).map_or(Value::Null, Value::Number)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::from(f64::from(v))
    }
}

impl From<VNumber> for Value {
    fn from(n: VNumber) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::Array(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_and_accessors() {
        assert_eq!(Value::NULL.value_type(), ValueType::Null);
        assert_eq!(Value::from(3i64).as_i64(), Some(3));
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert_eq!(Value::from(f64::INFINITY), Value::Null);
        assert_eq!(Value::from(Some(1u8)), Value::from(1i64));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn numbers_compare_across_representations() {
        assert_eq!(Value::from(2u64), Value::from(2i32));
        assert_ne!(Value::from(2i32), Value::from("2"));
    }
}
