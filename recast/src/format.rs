//! Injected format functions.
//!
//! The engine converts between records and [`Value`]s only. A [`Format`]
//! pairs the two functions that turn bytes into a `Value` and back, plus an
//! optional dialect merged underneath the caller's.

use core::fmt;

use recast_core::Dialect;
use recast_value::Value;

use crate::error::FormatError;

/// Parses raw input into a representation.
pub type ParseFn = fn(&[u8]) -> Result<Value, FormatError>;
/// Renders a representation.
pub type RenderFn = fn(&Value) -> Result<Vec<u8>, FormatError>;

/// A byte-level format.
#[derive(Clone)]
pub struct Format {
    /// Name used in errors.
    pub name: &'static str,
    /// Bytes to representation.
    pub parse: ParseFn,
    /// Representation to bytes.
    pub render: RenderFn,
    /// Dialect applied under any per-call dialect.
    pub dialect: Option<Dialect>,
}

impl Format {
    /// A format without a dialect.
    pub fn new(name: &'static str, parse: ParseFn, render: RenderFn) -> Self {
        Self {
            name,
            parse,
            render,
            dialect: None,
        }
    }

    /// Attaches a dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// JSON through `serde_json`. Binary values render as arrays of bytes.
    #[cfg(feature = "json")]
    pub fn json() -> Self {
        Self::new("json", json::parse, json::render)
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Format")
            .field("name", &self.name)
            .field("dialect", &self.dialect.as_ref().map(Dialect::name))
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "json")]
mod json {
    use recast_value::{VNumber, VObject, Value};
    use serde_json::{Map, Number};

    use crate::error::FormatError;

    fn error(e: impl core::fmt::Display) -> FormatError {
        FormatError {
            format: "json".to_owned(),
            message: e.to_string(),
        }
    }

    pub(super) fn parse(input: &[u8]) -> Result<Value, FormatError> {
        let json: serde_json::Value = serde_json::from_slice(input).map_err(error)?;
        Ok(from_json(json))
    }

    pub(super) fn render(value: &Value) -> Result<Vec<u8>, FormatError> {
        serde_json::to_vec(&to_json(value)?).map_err(error)
    }

    fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::from(i)
                } else if let Some(u) = n.as_u64() {
                    Value::from(u)
                } else {
                    n.as_f64().map_or(Value::Null, Value::from)
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, from_json(v)))
                    .collect::<VObject>(),
            ),
        }
    }

    fn number(n: &VNumber) -> Result<Number, FormatError> {
        if !n.is_float() {
            if let Some(i) = n.to_i64() {
                return Ok(Number::from(i));
            }
            if let Some(u) = n.to_u64() {
                return Ok(Number::from(u));
            }
        }
        Number::from_f64(n.to_f64_lossy()).ok_or_else(|| error(format!("{n} is not representable")))
    }

    fn to_json(value: &Value) -> Result<serde_json::Value, FormatError> {
        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(number(n)?),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::Array(b.iter().map(|&x| serde_json::Value::from(x)).collect()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?),
            Value::Object(obj) => {
                let mut map = Map::with_capacity(obj.len());
                for (k, v) in obj.iter() {
                    map.insert(k.to_owned(), to_json(v)?);
                }
                serde_json::Value::Object(map)
            }
        })
    }
}
