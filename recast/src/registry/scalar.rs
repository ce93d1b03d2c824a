//! Scalar conversions.

use core::str::FromStr;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use camino::Utf8PathBuf;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use recast_core::{Data, Fraction, ScalarType};
use recast_value::{VNumber, Value};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::ConvertError;

const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Returns true if `data` is an in-memory value of `ty`.
pub(crate) fn matches(ty: ScalarType, data: &Data) -> bool {
    match (ty, data) {
        (ScalarType::Int, Data::Int(_))
        | (ScalarType::Float, Data::Float(_) | Data::Int(_))
        | (ScalarType::Bool, Data::Bool(_))
        | (ScalarType::Str, Data::Str(_))
        | (ScalarType::Bytes, Data::Bytes(_))
        | (ScalarType::NoneType, Data::None)
        | (ScalarType::Decimal, Data::Decimal(_))
        | (ScalarType::Fraction, Data::Fraction(_))
        | (ScalarType::Date, Data::Date(_))
        | (ScalarType::Time, Data::Time(_))
        | (ScalarType::DateTime, Data::DateTime(_))
        | (ScalarType::NaiveDateTime, Data::NaiveDateTime(_))
        | (ScalarType::Duration, Data::Duration(_))
        | (ScalarType::Uuid, Data::Uuid(_))
        | (ScalarType::IpAddr, Data::Ip(_))
        | (ScalarType::Ipv4Addr, Data::Ip(IpAddr::V4(_)))
        | (ScalarType::Ipv6Addr, Data::Ip(IpAddr::V6(_)))
        | (ScalarType::Path, Data::Path(_)) => true,
        _ => false,
    }
}

/// Converts an in-memory scalar of type `ty`.
pub(crate) fn encode(ty: ScalarType, data: &Data, native_bytes: bool) -> Result<Value, ConvertError> {
    if !matches(ty, data) {
        return Err(ConvertError::mismatch_data(ty.name(), data));
    }
    if let Data::Bytes(b) = data
        && !native_bytes
    {
        return Ok(Value::String(STANDARD.encode(b)));
    }
    to_value(data).ok_or_else(|| ConvertError::mismatch_data(ty.name(), data))
}

/// Representation of any scalar-like value, independent of declared type.
/// Binary stays binary. Returns `None` for containers, enums and records.
pub(crate) fn to_value(data: &Data) -> Option<Value> {
    Some(match data {
        Data::None => Value::Null,
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Str(s) => Value::String(s.clone()),
        Data::Bytes(b) => Value::Bytes(b.clone()),
        Data::Decimal(d) => Value::String(d.to_string()),
        Data::Fraction(f) => Value::String(f.to_string()),
        Data::Date(d) => Value::String(d.to_string()),
        Data::Time(t) => Value::String(t.to_string()),
        Data::DateTime(dt) => Value::String(dt.to_rfc3339()),
        Data::NaiveDateTime(dt) => Value::String(dt.format(NAIVE_DATETIME_FORMAT).to_string()),
        Data::Duration(d) => Value::from(duration_seconds(d)),
        Data::Uuid(u) => Value::String(u.to_string()),
        Data::Ip(ip) => Value::String(ip.to_string()),
        Data::Path(p) => Value::String(p.as_str().to_owned()),
        Data::Enum(_)
        | Data::List(_)
        | Data::Tuple(_)
        | Data::Set(_)
        | Data::Map(_)
        | Data::Record(_) => return None,
    })
}

fn duration_seconds(d: &TimeDelta) -> f64 {
    d.num_seconds() as f64 + f64::from(d.subsec_nanos()) / 1e9
}

fn seconds_duration(secs: f64) -> Option<TimeDelta> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.trunc();
    if whole.abs() >= i64::MAX as f64 {
        return None;
    }
    let nanos = ((secs - whole) * 1e9).round() as i64;
    TimeDelta::try_seconds(whole as i64)?.checked_add(&TimeDelta::nanoseconds(nanos))
}

fn number_to_int(n: &VNumber) -> Option<i64> {
    n.to_i64().or_else(|| {
        let f = n.to_f64_lossy();
        (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f.trunc() as i64)
    })
}

fn parse<T>(ty: ScalarType, s: &str) -> Result<T, ConvertError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    s.trim()
        .parse::<T>()
        .map_err(|e| ConvertError::invalid(ty.name(), format!("{s:?}: {e}")))
}

/// Builds an in-memory scalar of type `ty` from its representation.
pub(crate) fn decode(ty: ScalarType, value: &Value) -> Result<Data, ConvertError> {
    let mismatch = || ConvertError::mismatch(ty.name(), value);
    let invalid = |msg: &str| ConvertError::invalid(ty.name(), format!("{value}: {msg}"));
    Ok(match ty {
        ScalarType::Int => match value {
            Value::Number(n) => Data::Int(number_to_int(n).ok_or_else(|| invalid("out of range"))?),
            Value::String(s) => Data::Int(parse(ty, s)?),
            _ => return Err(mismatch()),
        },
        ScalarType::Float => match value {
            Value::Number(n) => Data::Float(n.to_f64_lossy()),
            Value::String(s) => Data::Float(parse(ty, s)?),
            _ => return Err(mismatch()),
        },
        ScalarType::Bool => match value {
            Value::Bool(b) => Data::Bool(*b),
            Value::Number(n) => match n.to_i64() {
                Some(0) => Data::Bool(false),
                Some(1) => Data::Bool(true),
                _ => return Err(invalid("expected 0 or 1")),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Data::Bool(true),
                "false" | "0" => Data::Bool(false),
                _ => return Err(invalid("expected true or false")),
            },
            _ => return Err(mismatch()),
        },
        ScalarType::Str => match value {
            Value::String(s) => Data::Str(s.clone()),
            Value::Number(n) => Data::Str(n.to_string()),
            Value::Bool(b) => Data::Str(b.to_string()),
            _ => return Err(mismatch()),
        },
        ScalarType::Bytes => match value {
            Value::Bytes(b) => Data::Bytes(b.clone()),
            Value::String(s) => Data::Bytes(
                STANDARD
                    .decode(s.trim())
                    .map_err(|e| invalid(&e.to_string()))?,
            ),
            _ => return Err(mismatch()),
        },
        ScalarType::NoneType => match value {
            Value::Null => Data::None,
            _ => return Err(mismatch()),
        },
        ScalarType::Decimal => match value {
            Value::String(s) => Data::Decimal(
                Decimal::from_str(s.trim())
                    .or_else(|_| Decimal::from_scientific(s.trim()))
                    .map_err(|e| invalid(&e.to_string()))?,
            ),
            Value::Number(n) => match n.to_i64() {
                Some(i) => Data::Decimal(Decimal::from(i)),
                None => Data::Decimal(
                    Decimal::try_from(n.to_f64_lossy()).map_err(|e| invalid(&e.to_string()))?,
                ),
            },
            _ => return Err(mismatch()),
        },
        ScalarType::Fraction => match value {
            Value::String(s) => Data::Fraction(parse(ty, s)?),
            Value::Number(n) => match n.to_i64() {
                Some(i) => Data::Fraction(Fraction::new(i128::from(i), 1).ok_or_else(|| invalid("bad fraction"))?),
                None => Data::Fraction(parse(ty, &n.to_string())?),
            },
            _ => return Err(mismatch()),
        },
        ScalarType::Date => match value {
            Value::String(s) => Data::Date(parse::<NaiveDate>(ty, s)?),
            _ => return Err(mismatch()),
        },
        ScalarType::Time => match value {
            Value::String(s) => Data::Time(parse::<NaiveTime>(ty, s)?),
            _ => return Err(mismatch()),
        },
        ScalarType::DateTime => match value {
            Value::String(s) => Data::DateTime(
                DateTime::parse_from_rfc3339(s.trim()).map_err(|e| invalid(&e.to_string()))?,
            ),
            Value::Number(n) => {
                let secs = n.to_f64_lossy();
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9).round() as u32;
                let dt = DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
                    .ok_or_else(|| invalid("timestamp out of range"))?;
                Data::DateTime(dt.fixed_offset())
            }
            _ => return Err(mismatch()),
        },
        ScalarType::NaiveDateTime => match value {
            Value::String(s) => Data::NaiveDateTime(
                NaiveDateTime::parse_from_str(s.trim(), NAIVE_DATETIME_FORMAT)
                    .or_else(|_| s.trim().parse::<NaiveDateTime>())
                    .map_err(|e| invalid(&e.to_string()))?,
            ),
            _ => return Err(mismatch()),
        },
        ScalarType::Duration => {
            let secs = match value {
                Value::Number(n) => n.to_f64_lossy(),
                Value::String(s) => parse::<f64>(ty, s)?,
                _ => return Err(mismatch()),
            };
            Data::Duration(seconds_duration(secs).ok_or_else(|| invalid("out of range"))?)
        }
        ScalarType::Uuid => match value {
            Value::String(s) => Data::Uuid(parse::<Uuid>(ty, s)?),
            _ => return Err(mismatch()),
        },
        ScalarType::IpAddr => match value {
            Value::String(s) => Data::Ip(parse::<IpAddr>(ty, s)?),
            _ => return Err(mismatch()),
        },
        ScalarType::Ipv4Addr => match value {
            Value::String(s) => Data::Ip(IpAddr::V4(parse::<Ipv4Addr>(ty, s)?)),
            _ => return Err(mismatch()),
        },
        ScalarType::Ipv6Addr => match value {
            Value::String(s) => Data::Ip(IpAddr::V6(parse::<Ipv6Addr>(ty, s)?)),
            _ => return Err(mismatch()),
        },
        ScalarType::Path => match value {
            Value::String(s) => Data::Path(Utf8PathBuf::from(s.as_str())),
            _ => return Err(mismatch()),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertErrorKind;

    fn roundtrip(ty: ScalarType, data: Data) {
        let value = encode(ty, &data, false).unwrap();
        assert_eq!(decode(ty, &value).unwrap(), data, "through {value}");
    }

    #[test]
    fn ints_coerce_from_text_and_floats() {
        assert_eq!(decode(ScalarType::Int, &Value::from("1")).unwrap(), Data::Int(1));
        assert_eq!(decode(ScalarType::Int, &Value::from(2.9)).unwrap(), Data::Int(2));
        assert!(matches!(
            decode(ScalarType::Int, &Value::from("x")).unwrap_err().kind,
            ConvertErrorKind::InvalidValue { .. }
        ));
        assert!(matches!(
            decode(ScalarType::Int, &Value::Null).unwrap_err().kind,
            ConvertErrorKind::TypeMismatch { .. }
        ));
    }

    #[test]
    fn strings_and_bools_coerce() {
        assert_eq!(decode(ScalarType::Str, &Value::from(3)).unwrap(), Data::from("3"));
        assert_eq!(decode(ScalarType::Bool, &Value::from("TRUE")).unwrap(), Data::Bool(true));
        assert_eq!(decode(ScalarType::Bool, &Value::from(0)).unwrap(), Data::Bool(false));
        assert!(decode(ScalarType::Bool, &Value::from(2)).is_err());
    }

    #[test]
    fn temporal_values_use_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(encode(ScalarType::Date, &Data::Date(date), false).unwrap(), Value::from("2024-02-29"));
        roundtrip(ScalarType::Date, Data::Date(date));
        roundtrip(ScalarType::Time, Data::Time(NaiveTime::from_hms_milli_opt(10, 11, 12, 500).unwrap()));
        roundtrip(
            ScalarType::DateTime,
            Data::DateTime(DateTime::parse_from_rfc3339("2024-01-02T03:04:05+02:00").unwrap()),
        );
        roundtrip(
            ScalarType::NaiveDateTime,
            Data::NaiveDateTime(date.and_hms_micro_opt(1, 2, 3, 4).unwrap()),
        );
    }

    #[test]
    fn durations_are_seconds() {
        let d = TimeDelta::milliseconds(1500);
        assert_eq!(encode(ScalarType::Duration, &Data::Duration(d), false).unwrap(), Value::from(1.5));
        roundtrip(ScalarType::Duration, Data::Duration(TimeDelta::milliseconds(-2250)));
    }

    #[test]
    fn text_forms() {
        roundtrip(ScalarType::Decimal, Data::Decimal(Decimal::from_str("12.340").unwrap()));
        roundtrip(ScalarType::Fraction, Data::Fraction(Fraction::new(3, 4).unwrap()));
        roundtrip(ScalarType::Uuid, Data::Uuid(Uuid::from_u128(0x1234)));
        roundtrip(ScalarType::IpAddr, Data::Ip("::1".parse().unwrap()));
        roundtrip(ScalarType::Path, Data::Path(Utf8PathBuf::from("/tmp/x")));
        assert!(decode(ScalarType::Ipv4Addr, &Value::from("::1")).is_err());
    }

    #[test]
    fn bytes_are_base64_unless_native() {
        let data = Data::Bytes(b"hi".to_vec());
        assert_eq!(encode(ScalarType::Bytes, &data, false).unwrap(), Value::from("aGk="));
        assert_eq!(encode(ScalarType::Bytes, &data, true).unwrap(), Value::Bytes(b"hi".to_vec()));
        roundtrip(ScalarType::Bytes, data);
    }

    #[test]
    fn encoding_checks_the_runtime_kind() {
        assert!(encode(ScalarType::Int, &Data::from("1"), false).is_err());
        assert_eq!(encode(ScalarType::Float, &Data::Int(2), false).unwrap(), Value::from(2));
    }
}
