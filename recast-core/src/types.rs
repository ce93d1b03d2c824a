//! Declared field types.
//!
//! A [`TypeExpr`] is what a field *says* its type is. It may still mention
//! generic parameters, refer to declarations by name before they exist, or
//! point at the enclosing model through [`TypeExpr::SelfType`]. The engine's
//! resolver turns it into a concrete shape.

use core::fmt;

use crate::{Discriminator, Strategy};

/// Scalar kinds with a fixed conversion rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarType {
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// `str`
    Str,
    /// `bytes`
    Bytes,
    /// The `None` type itself.
    NoneType,
    /// Arbitrary-precision decimal.
    Decimal,
    /// Exact rational.
    Fraction,
    /// Calendar date.
    Date,
    /// Wall-clock time.
    Time,
    /// Offset-aware timestamp.
    DateTime,
    /// Timestamp without offset.
    NaiveDateTime,
    /// Signed duration.
    Duration,
    /// Unique identifier.
    Uuid,
    /// IPv4 or IPv6 address.
    IpAddr,
    /// IPv4 address.
    Ipv4Addr,
    /// IPv6 address.
    Ipv6Addr,
    /// Filesystem path.
    Path,
}

impl ScalarType {
    /// Name used when printing shapes.
    pub const fn name(self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Bool => "bool",
            ScalarType::Str => "str",
            ScalarType::Bytes => "bytes",
            ScalarType::NoneType => "None",
            ScalarType::Decimal => "Decimal",
            ScalarType::Fraction => "Fraction",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::DateTime => "datetime",
            ScalarType::NaiveDateTime => "naive_datetime",
            ScalarType::Duration => "timedelta",
            ScalarType::Uuid => "UUID",
            ScalarType::IpAddr => "ip_address",
            ScalarType::Ipv4Addr => "IPv4Address",
            ScalarType::Ipv6Addr => "IPv6Address",
            ScalarType::Path => "Path",
        }
    }

    /// Returns true for the types whose in-memory and representation forms
    /// coincide (bool, int, float, str, None).
    pub const fn is_primitive(self) -> bool {
        matches!(
            self,
            ScalarType::Int
                | ScalarType::Float
                | ScalarType::Bool
                | ScalarType::Str
                | ScalarType::NoneType
        )
    }
}

/// Flavours of homogeneous collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    /// `list[T]`
    List,
    /// `deque[T]`
    Deque,
    /// `Sequence[T]`
    Sequence,
    /// `set[T]`
    Set,
    /// `frozenset[T]`
    FrozenSet,
    /// `tuple[T, ...]`
    VarTuple,
}

impl CollectionKind {
    /// Name used when printing shapes.
    pub const fn name(self) -> &'static str {
        match self {
            CollectionKind::List => "list",
            CollectionKind::Deque => "deque",
            CollectionKind::Sequence => "Sequence",
            CollectionKind::Set => "set",
            CollectionKind::FrozenSet => "frozenset",
            CollectionKind::VarTuple => "tuple",
        }
    }

    /// Returns true for collections without duplicates.
    pub const fn is_set(self) -> bool {
        matches!(self, CollectionKind::Set | CollectionKind::FrozenSet)
    }
}

/// Flavours of key-value mappings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MappingKind {
    /// `dict[K, V]`
    Dict,
    /// `OrderedDict[K, V]`
    OrderedDict,
    /// `defaultdict[K, V]`
    DefaultDict,
    /// `Mapping[K, V]`
    Mapping,
    /// `Counter[K]` (values are ints)
    Counter,
}

impl MappingKind {
    /// Name used when printing shapes.
    pub const fn name(self) -> &'static str {
        match self {
            MappingKind::Dict => "dict",
            MappingKind::OrderedDict => "OrderedDict",
            MappingKind::DefaultDict => "defaultdict",
            MappingKind::Mapping => "Mapping",
            MappingKind::Counter => "Counter",
        }
    }
}

/// Container categories a dialect can pass through without per-element
/// conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerCategory {
    /// Lists, deques and sequences.
    List,
    /// Sets and frozensets.
    Set,
    /// Tuples of any arity.
    Tuple,
    /// Mappings of any kind.
    Dict,
}

/// A literal value allowed by a `Literal[...]` type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    /// `None`
    None,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// String literal.
    Str(String),
    /// Bytes literal.
    Bytes(Vec<u8>),
    /// Enum member literal: `(enum name, member name)`.
    Enum(String, String),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::None => f.write_str("None"),
            LiteralValue::Bool(true) => f.write_str("True"),
            LiteralValue::Bool(false) => f.write_str("False"),
            LiteralValue::Int(i) => write!(f, "{i}"),
            LiteralValue::Str(s) => write!(f, "{s:?}"),
            LiteralValue::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            LiteralValue::Enum(e, m) => write!(f, "{e}.{m}"),
        }
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::Str(s.to_owned())
    }
}

impl From<i64> for LiteralValue {
    fn from(i: i64) -> Self {
        LiteralValue::Int(i)
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Bool(b)
    }
}

/// Extra metadata attached with [`TypeExpr::Annotated`].
#[derive(Clone, Debug)]
pub enum Annotation {
    /// Pick a concrete model out of a union or abstract model.
    Discriminator(Discriminator),
    /// Override conversion for this occurrence of the type.
    Strategy(Strategy),
    /// Free-form marker; carried through resolution but ignored by codecs.
    Marker(String),
}

/// A declared field type.
#[derive(Clone, Debug)]
pub enum TypeExpr {
    /// Anything: passed through opaquely.
    Any,
    /// A scalar with a fixed conversion rule.
    Scalar(ScalarType),
    /// `Optional[T]`
    Optional(Box<TypeExpr>),
    /// `Union[A, B, ...]`
    Union(Vec<TypeExpr>),
    /// `Literal[v1, v2, ...]`
    Literal(Vec<LiteralValue>),
    /// Homogeneous collection.
    Collection(CollectionKind, Box<TypeExpr>),
    /// Key-value mapping. `Counter` ignores the value type.
    Mapping(MappingKind, Box<TypeExpr>, Box<TypeExpr>),
    /// Fixed-arity tuple. Elements may include [`TypeExpr::Unpack`].
    Tuple(Vec<TypeExpr>),
    /// `*Ts` or `*tuple[T, ...]` inside a tuple or type-argument list.
    Unpack(Box<TypeExpr>),
    /// Reference to a generic parameter of the enclosing model.
    Param(String),
    /// Reference by name to a model, enum, alias, named tuple, typed dict,
    /// custom type or external type. Resolved lazily, so it may be declared
    /// later (forward reference).
    Named(String),
    /// A generic model applied to type arguments.
    Generic(String, Vec<TypeExpr>),
    /// The enclosing model itself, with its current type arguments.
    SelfType,
    /// A type with attached metadata.
    Annotated(Box<TypeExpr>, Vec<Annotation>),
}

impl TypeExpr {
    /// `int`
    pub const fn int() -> Self {
        TypeExpr::Scalar(ScalarType::Int)
    }

    /// `float`
    pub const fn float() -> Self {
        TypeExpr::Scalar(ScalarType::Float)
    }

    /// `bool`
    pub const fn bool() -> Self {
        TypeExpr::Scalar(ScalarType::Bool)
    }

    /// `str`
    pub const fn str() -> Self {
        TypeExpr::Scalar(ScalarType::Str)
    }

    /// `bytes`
    pub const fn bytes() -> Self {
        TypeExpr::Scalar(ScalarType::Bytes)
    }

    /// Any scalar.
    pub const fn scalar(ty: ScalarType) -> Self {
        TypeExpr::Scalar(ty)
    }

    /// `Optional[inner]`
    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    /// `Union[...]`
    pub fn union(members: impl IntoIterator<Item = TypeExpr>) -> Self {
        TypeExpr::Union(members.into_iter().collect())
    }

    /// `Literal[...]`
    pub fn literal<L: Into<LiteralValue>>(values: impl IntoIterator<Item = L>) -> Self {
        TypeExpr::Literal(values.into_iter().map(Into::into).collect())
    }

    /// `list[elem]`
    pub fn list(elem: TypeExpr) -> Self {
        TypeExpr::Collection(CollectionKind::List, Box::new(elem))
    }

    /// `set[elem]`
    pub fn set(elem: TypeExpr) -> Self {
        TypeExpr::Collection(CollectionKind::Set, Box::new(elem))
    }

    /// `tuple[elem, ...]`
    pub fn var_tuple(elem: TypeExpr) -> Self {
        TypeExpr::Collection(CollectionKind::VarTuple, Box::new(elem))
    }

    /// `dict[key, value]`
    pub fn dict(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Mapping(MappingKind::Dict, Box::new(key), Box::new(value))
    }

    /// `tuple[a, b, ...]` of fixed arity.
    pub fn tuple(elems: impl IntoIterator<Item = TypeExpr>) -> Self {
        TypeExpr::Tuple(elems.into_iter().collect())
    }

    /// `*inner`
    pub fn unpack(inner: TypeExpr) -> Self {
        TypeExpr::Unpack(Box::new(inner))
    }

    /// Generic parameter reference.
    pub fn param(name: impl Into<String>) -> Self {
        TypeExpr::Param(name.into())
    }

    /// Reference to a declaration by name.
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    /// Generic model application.
    pub fn generic(name: impl Into<String>, args: impl IntoIterator<Item = TypeExpr>) -> Self {
        TypeExpr::Generic(name.into(), args.into_iter().collect())
    }

    /// Attaches metadata to this type.
    #[must_use]
    pub fn annotated(self, annotations: impl IntoIterator<Item = Annotation>) -> Self {
        TypeExpr::Annotated(Box::new(self), annotations.into_iter().collect())
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            TypeExpr::Any => f.write_str("Any"),
            TypeExpr::Scalar(s) => f.write_str(s.name()),
            TypeExpr::Optional(inner) => write!(f, "Optional[{inner}]"),
            TypeExpr::Union(members) => {
                f.write_str("Union[")?;
                list(f, members)?;
                f.write_str("]")
            }
            TypeExpr::Literal(values) => {
                f.write_str("Literal[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            TypeExpr::Collection(CollectionKind::VarTuple, elem) => write!(f, "tuple[{elem}, ...]"),
            TypeExpr::Collection(kind, elem) => write!(f, "{}[{elem}]", kind.name()),
            TypeExpr::Mapping(MappingKind::Counter, key, _) => write!(f, "Counter[{key}]"),
            TypeExpr::Mapping(kind, key, value) => write!(f, "{}[{key}, {value}]", kind.name()),
            TypeExpr::Tuple(elems) => {
                f.write_str("tuple[")?;
                list(f, elems)?;
                f.write_str("]")
            }
            TypeExpr::Unpack(inner) => write!(f, "*{inner}"),
            TypeExpr::Param(name) | TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Generic(name, args) => {
                write!(f, "{name}[")?;
                list(f, args)?;
                f.write_str("]")
            }
            TypeExpr::SelfType => f.write_str("Self"),
            TypeExpr::Annotated(inner, _) => write!(f, "Annotated[{inner}, ...]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_like_declarations() {
        let t = TypeExpr::dict(
            TypeExpr::str(),
            TypeExpr::optional(TypeExpr::list(TypeExpr::generic(
                "Box",
                [TypeExpr::param("T")],
            ))),
        );
        assert_eq!(t.to_string(), "dict[str, Optional[list[Box[T]]]]");
        assert_eq!(
            TypeExpr::tuple([TypeExpr::int(), TypeExpr::unpack(TypeExpr::var_tuple(TypeExpr::str()))])
                .to_string(),
            "tuple[int, *tuple[str, ...]]"
        );
        assert_eq!(
            TypeExpr::literal(["a", "b"]).to_string(),
            r#"Literal["a", "b"]"#
        );
    }
}
