//! Non-record declarations: enums, named tuples, typed dicts, custom types
//! and type aliases.

use core::fmt;
use std::sync::Arc;

use recast_value::Value;

use crate::{BoxError, Data, Model, TypeExpr};

/// An enumeration whose members convert by value.
#[derive(Clone, Debug)]
pub struct EnumDecl {
    /// Enum name.
    pub name: String,
    /// `(member name, member value)` in declaration order.
    pub members: Vec<(String, Value)>,
}

impl EnumDecl {
    /// An enum without members.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Adds a member.
    #[must_use]
    pub fn member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.push((name.into(), value.into()));
        self
    }

    /// Value of a member.
    pub fn value_of(&self, member: &str) -> Option<&Value> {
        self.members.iter().find(|(n, _)| n == member).map(|(_, v)| v)
    }

    /// Member whose value equals `value`.
    pub fn member_for(&self, value: &Value) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| v == value)
            .map(|(n, _)| n.as_str())
    }
}

/// A tuple with named, typed positions. Instances are [`Data::Tuple`].
#[derive(Clone, Debug)]
pub struct NamedTupleDecl {
    /// Type name.
    pub name: String,
    /// `(name, type, default)` per position.
    pub fields: Vec<(String, TypeExpr, Option<Data>)>,
}

impl NamedTupleDecl {
    /// A named tuple without fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a required position.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.fields.push((name.into(), ty, None));
        self
    }

    /// Adds a position with a default.
    #[must_use]
    pub fn field_with_default(mut self, name: impl Into<String>, ty: TypeExpr, default: impl Into<Data>) -> Self {
        self.fields.push((name.into(), ty, Some(default.into())));
        self
    }
}

/// A mapping with a known set of string keys. Instances are [`Data::Map`]
/// with string keys.
#[derive(Clone, Debug)]
pub struct TypedDictDecl {
    /// Type name.
    pub name: String,
    /// `(key, type, required)` in declaration order.
    pub keys: Vec<(String, TypeExpr, bool)>,
}

impl TypedDictDecl {
    /// A typed dict without keys.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
        }
    }

    /// Adds a required key.
    #[must_use]
    pub fn required(mut self, key: impl Into<String>, ty: TypeExpr) -> Self {
        self.keys.push((key.into(), ty, true));
        self
    }

    /// Adds an optional key.
    #[must_use]
    pub fn optional(mut self, key: impl Into<String>, ty: TypeExpr) -> Self {
        self.keys.push((key.into(), ty, false));
        self
    }
}

/// Serializes a custom value directly to its representation.
pub type CustomSerializeFn = Arc<dyn Fn(&Data) -> Result<Value, BoxError> + Send + Sync>;
/// Deserializes a custom value directly from its representation.
pub type CustomDeserializeFn = Arc<dyn Fn(&Value) -> Result<Data, BoxError> + Send + Sync>;

/// A type that knows how to convert itself.
#[derive(Clone)]
pub struct CustomType {
    /// Type name.
    pub name: String,
    /// To the representation.
    pub serialize: CustomSerializeFn,
    /// From the representation.
    pub deserialize: CustomDeserializeFn,
}

impl CustomType {
    /// Declares a self-converting type.
    pub fn new<S, D>(name: impl Into<String>, serialize: S, deserialize: D) -> Self
    where
        S: Fn(&Data) -> Result<Value, BoxError> + Send + Sync + 'static,
        D: Fn(&Value) -> Result<Data, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            serialize: Arc::new(serialize),
            deserialize: Arc::new(deserialize),
        }
    }
}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomType").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A named type alias. It may refer to itself.
#[derive(Clone, Debug)]
pub struct AliasDecl {
    /// Alias name.
    pub name: String,
    /// Aliased type.
    pub ty: TypeExpr,
}

impl AliasDecl {
    /// Declares `name = ty`.
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Anything that can be declared by name.
#[derive(Clone, Debug)]
pub enum Decl {
    /// A record type.
    Model(Model),
    /// An enumeration.
    Enum(EnumDecl),
    /// A named tuple.
    NamedTuple(NamedTupleDecl),
    /// A typed dict.
    TypedDict(TypedDictDecl),
    /// A self-converting type.
    Custom(CustomType),
    /// A type alias.
    Alias(AliasDecl),
}

impl Decl {
    /// Declared name.
    pub fn name(&self) -> &str {
        match self {
            Decl::Model(d) => &d.name,
            Decl::Enum(d) => &d.name,
            Decl::NamedTuple(d) => &d.name,
            Decl::TypedDict(d) => &d.name,
            Decl::Custom(d) => &d.name,
            Decl::Alias(d) => &d.name,
        }
    }

    /// Kind of declaration, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Decl::Model(_) => "model",
            Decl::Enum(_) => "enum",
            Decl::NamedTuple(_) => "named tuple",
            Decl::TypedDict(_) => "typed dict",
            Decl::Custom(_) => "custom type",
            Decl::Alias(_) => "alias",
        }
    }
}

macro_rules! impl_into_decl {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Decl {
                fn from(d: $ty) -> Self {
                    Decl::$variant(d)
                }
            }
        )*
    };
}

impl_into_decl! {
    Model => Model,
    EnumDecl => Enum,
    NamedTupleDecl => NamedTuple,
    TypedDictDecl => TypedDict,
    CustomType => Custom,
    AliasDecl => Alias,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_members_match_by_value() {
        let color = EnumDecl::new("Color").member("RED", 1).member("GREEN", "g");
        assert_eq!(color.member_for(&Value::from(1)), Some("RED"));
        assert_eq!(color.member_for(&Value::from("g")), Some("GREEN"));
        assert_eq!(color.member_for(&Value::from(2)), None);
        assert_eq!(color.value_of("GREEN"), Some(&Value::from("g")));
    }
}
