//! Typed instance values.
//!
//! `Data` is what a record's fields hold in memory. Unlike
//! [`Value`](recast_value::Value) it keeps type fidelity: a date stays a
//! date, a UUID stays a UUID, an enum member remembers its enum.

use core::fmt;
use std::net::IpAddr;

use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A typed value held by a record field.
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    /// Absence of a value (`None`).
    None,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Str(String),
    /// Binary blob.
    Bytes(Vec<u8>),
    /// Arbitrary-precision decimal.
    Decimal(Decimal),
    /// Exact rational number.
    Fraction(Fraction),
    /// Calendar date.
    Date(NaiveDate),
    /// Wall-clock time.
    Time(NaiveTime),
    /// Timestamp with a UTC offset.
    DateTime(DateTime<FixedOffset>),
    /// Timestamp without offset.
    NaiveDateTime(NaiveDateTime),
    /// Signed duration.
    Duration(TimeDelta),
    /// Unique identifier.
    Uuid(Uuid),
    /// Network address.
    Ip(IpAddr),
    /// Filesystem path.
    Path(Utf8PathBuf),
    /// Member of a declared enumeration.
    Enum(EnumValue),
    /// Ordered collection (list, deque, sequence).
    List(Vec<Data>),
    /// Fixed or variadic tuple, or a named-tuple record.
    Tuple(Vec<Data>),
    /// Unordered unique collection (set, frozenset).
    Set(Vec<Data>),
    /// Key-value mapping, in insertion order.
    Map(Vec<(Data, Data)>),
    /// Instance of a declared model.
    Record(Record),
}

impl Data {
    /// Short name of the runtime kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Data::None => "none",
            Data::Bool(_) => "bool",
            Data::Int(_) => "int",
            Data::Float(_) => "float",
            Data::Str(_) => "str",
            Data::Bytes(_) => "bytes",
            Data::Decimal(_) => "decimal",
            Data::Fraction(_) => "fraction",
            Data::Date(_) => "date",
            Data::Time(_) => "time",
            Data::DateTime(_) => "datetime",
            Data::NaiveDateTime(_) => "naive datetime",
            Data::Duration(_) => "duration",
            Data::Uuid(_) => "uuid",
            Data::Ip(_) => "ip address",
            Data::Path(_) => "path",
            Data::Enum(_) => "enum",
            Data::List(_) => "list",
            Data::Tuple(_) => "tuple",
            Data::Set(_) => "set",
            Data::Map(_) => "map",
            Data::Record(_) => "record",
        }
    }

    /// Returns true for [`Data::None`].
    pub const fn is_none(&self) -> bool {
        matches!(self, Data::None)
    }

    /// Gets the integer, if this is one.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Data::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Gets the text, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Gets the record, if this is one.
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Data::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Unwraps into a record, if this is one.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Data::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Builds a map from `(key, value)` pairs.
    pub fn map<K: Into<Data>, V: Into<Data>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Data::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds a list.
    pub fn list<T: Into<Data>>(items: impl IntoIterator<Item = T>) -> Self {
        Data::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! impl_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Data {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from! {
    bool => |v| Data::Bool(v),
    i32 => |v| Data::Int(i64::from(v)),
    i64 => |v| Data::Int(v),
    u32 => |v| Data::Int(i64::from(v)),
    f64 => |v| Data::Float(v),
    &str => |v| Data::Str(v.to_owned()),
    String => |v| Data::Str(v),
    Decimal => |v| Data::Decimal(v),
    Fraction => |v| Data::Fraction(v),
    NaiveDate => |v| Data::Date(v),
    NaiveTime => |v| Data::Time(v),
    DateTime<FixedOffset> => |v| Data::DateTime(v),
    NaiveDateTime => |v| Data::NaiveDateTime(v),
    TimeDelta => |v| Data::Duration(v),
    Uuid => |v| Data::Uuid(v),
    IpAddr => |v| Data::Ip(v),
    Utf8PathBuf => |v| Data::Path(v),
    EnumValue => |v| Data::Enum(v),
    Record => |v| Data::Record(v),
}

impl<T: Into<Data>> From<Option<T>> for Data {
    fn from(v: Option<T>) -> Self {
        v.map_or(Data::None, Into::into)
    }
}

impl<T: Into<Data>> From<Vec<T>> for Data {
    fn from(v: Vec<T>) -> Self {
        Data::list(v)
    }
}

/// A member of a declared enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    /// Name of the enum declaration.
    pub enum_name: String,
    /// Name of the member.
    pub member: String,
}

impl EnumValue {
    /// Creates a reference to `enum_name.member`.
    pub fn new(enum_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            enum_name: enum_name.into(),
            member: member.into(),
        }
    }
}

/// An exact rational number, always stored in lowest terms with a positive
/// denominator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fraction {
    numer: i128,
    denom: i128,
}

impl Fraction {
    /// Creates `numer / denom`, or `None` when `denom` is zero.
    pub fn new(numer: i128, denom: i128) -> Option<Self> {
        if denom == 0 {
            return None;
        }
        let g = gcd(numer.unsigned_abs(), denom.unsigned_abs()) as i128;
        let sign = if denom < 0 { -1 } else { 1 };
        Some(Self {
            numer: sign * numer / g,
            denom: sign * denom / g,
        })
    }

    /// Numerator (carries the sign).
    pub const fn numer(&self) -> i128 {
        self.numer
    }

    /// Denominator (always positive).
    pub const fn denom(&self) -> i128 {
        self.denom
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denom == 1 {
            write!(f, "{}", self.numer)
        } else {
            write!(f, "{}/{}", self.numer, self.denom)
        }
    }
}

/// Error returned when a fraction cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFractionError(String);

impl fmt::Display for ParseFractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fraction literal {:?}", self.0)
    }
}

impl core::error::Error for ParseFractionError {}

impl core::str::FromStr for Fraction {
    type Err = ParseFractionError;

    /// Accepts `"n"`, `"n/d"` and finite decimal text such as `"0.75"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFractionError(s.to_owned());
        let s = s.trim();
        if let Some((n, d)) = s.split_once('/') {
            let n = n.trim().parse::<i128>().map_err(|_| err())?;
            let d = d.trim().parse::<i128>().map_err(|_| err())?;
            return Fraction::new(n, d).ok_or_else(err);
        }
        let dec: Decimal = s.parse().map_err(|_| err())?;
        Fraction::new(dec.mantissa(), 10i128.pow(dec.scale())).ok_or_else(err)
    }
}

/// An instance of a declared model.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    model: String,
    fields: IndexMap<String, Data>,
}

impl Record {
    /// Creates an empty record of the named model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fields: IndexMap::new(),
        }
    }

    /// Adds a field value (builder style).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Data>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Name of the model this record instantiates.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Value of a field.
    pub fn get(&self, name: &str) -> Option<&Data> {
        self.fields.get(name)
    }

    /// Value of a field, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Data> {
        self.fields.get_mut(name)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Data>) -> Option<Data> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a field, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<Data> {
        self.fields.shift_remove(name)
    }

    /// Field values in insertion order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = (&str, &Data)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields set.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
