//! Conversion without a declared type.
//!
//! Used for `Any`, unbound type variables, pass-through strategies and
//! pass-through containers.

use recast_core::{Data, Dialect, Record, ScalarType};
use recast_value::{VObject, Value};

use crate::catalog::Entry;
use crate::error::{ConvertError, PathSegment};
use crate::procedure::{ProcedureKind, Runtime};
use crate::registry::scalar;

/// What an opaque encoder takes from the procedure it is part of.
#[derive(Clone)]
pub(crate) struct Inherited {
    pub(crate) native_bytes: bool,
    pub(crate) dialect: Option<Dialect>,
}

/// Representation of `data` judged by its runtime kind alone.
///
/// Records are encoded with their own model's encoder under the inherited
/// dialect; enum members become their value when the enum is declared.
pub(crate) fn encode(data: &Data, inherited: &Inherited, rt: &Runtime<'_>) -> Result<Value, ConvertError> {
    if let Data::Bytes(_) = data {
        return scalar::encode(ScalarType::Bytes, data, inherited.native_bytes);
    }
    if let Some(v) = scalar::to_value(data) {
        return Ok(v);
    }
    Ok(match data {
        Data::Enum(member) => match rt.engine.catalog.get(&member.enum_name) {
            Some(Entry::Enum(decl)) => decl
                .value_of(&member.member)
                .cloned()
                .ok_or_else(|| ConvertError::invalid(&member.enum_name, format!("no member `{}`", member.member)))?,
            _ => Value::String(member.member.clone()),
        },
        Data::List(items) | Data::Tuple(items) | Data::Set(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| encode(item, inherited, rt).map_err(|e| e.with_path(PathSegment::Index(i))))
                .collect::<Result<_, _>>()?,
        ),
        Data::Map(entries) => {
            let mut obj = VObject::with_capacity(entries.len());
            for (k, v) in entries {
                let at_key = |e: ConvertError| e.with_path(PathSegment::Key(key_label(k)));
                let key = key_string(&encode(k, inherited, rt).map_err(at_key)?).map_err(at_key)?;
                let value = encode(v, inherited, rt).map_err(|e| e.with_path(PathSegment::Key(key.clone())))?;
                obj.insert(key, value);
            }
            Value::Object(obj)
        }
        Data::Record(record) => encode_record(record, inherited, rt)?,
        _ => return Err(ConvertError::mismatch_data("value", data)),
    })
}

fn encode_record(record: &Record, inherited: &Inherited, rt: &Runtime<'_>) -> Result<Value, ConvertError> {
    let procedure = rt
        .engine
        .procedure(record.model(), &[], inherited.dialect.as_ref(), ProcedureKind::Encode)?;
    procedure.run_encode(&Data::Record(record.clone()), rt)
}

/// Mapping keys are strings in the representation: text stays text, and
/// numbers and booleans are written out.
pub(crate) fn key_string(key: &Value) -> Result<String, ConvertError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_owned()),
        other => Err(ConvertError::mismatch("mapping key", other)),
    }
}

/// How a mapping key that failed to encode is named in an error path.
pub(crate) fn key_label(key: &Data) -> String {
    match key {
        Data::Str(s) => s.clone(),
        other => format!("{other:?}"),
    }
}

/// In-memory form of a representation value judged by its type alone.
pub(crate) fn decode(value: &Value) -> Data {
    match value {
        Value::Null => Data::None,
        Value::Bool(b) => Data::Bool(*b),
        Value::Number(n) => match n.to_i64() {
            Some(i) => Data::Int(i),
            None => Data::Float(n.to_f64_lossy()),
        },
        Value::String(s) => Data::Str(s.clone()),
        Value::Bytes(b) => Data::Bytes(b.clone()),
        Value::Array(items) => Data::List(items.iter().map(decode).collect()),
        Value::Object(obj) => Data::Map(
            obj.iter()
                .map(|(k, v)| (Data::Str(k.to_owned()), decode(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use recast_value::value;

    use super::*;

    #[test]
    fn decode_keeps_structure() {
        let v = value!({"a": [1, 2.5, "x", null], "b": true});
        assert_eq!(
            decode(&v),
            Data::map([
                ("a", Data::list([Data::Int(1), Data::Float(2.5), Data::from("x"), Data::None])),
                ("b", Data::Bool(true)),
            ])
        );
    }

    #[test]
    fn keys_are_stringified() {
        assert_eq!(key_string(&Value::from(3)).unwrap(), "3");
        assert_eq!(key_string(&Value::Bool(false)).unwrap(), "false");
        assert!(key_string(&Value::Array(vec![])).is_err());
    }
}
