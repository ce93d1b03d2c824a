//! User-supplied conversion overrides.

use core::fmt;
use std::sync::Arc;

use crate::{Data, TypeExpr};

/// Error type returned by user callbacks (strategies, hooks, factories).
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Turns an in-memory value into the value handed to the output side.
pub type SerializeFn = Arc<dyn Fn(&Data) -> Result<Data, BoxError> + Send + Sync>;

/// Turns a value read from the input side into the in-memory value.
pub type DeserializeFn = Arc<dyn Fn(Data) -> Result<Data, BoxError> + Send + Sync>;

/// A `{serialize, deserialize}` pair overriding the default conversion for a
/// field or a type.
///
/// Either side may be absent; an absent side falls back to the default
/// conversion for the declared type. The output of `serialize` is packed with
/// the `serialize_as` type when given, otherwise as an opaque value. The input
/// of `deserialize` is unpacked with the `deserialize_from` type first.
#[derive(Clone, Default)]
pub struct Strategy {
    name: Option<String>,
    serialize: Option<SerializeFn>,
    deserialize: Option<DeserializeFn>,
    serialize_as: Option<TypeExpr>,
    deserialize_from: Option<TypeExpr>,
    pass_through: bool,
}

impl Strategy {
    /// Creates an empty strategy, which behaves like the default conversion.
    pub fn new() -> Self {
        Self::default()
    }

    /// A strategy that copies the value unchanged in both directions.
    pub fn pass_through() -> Self {
        Self {
            name: Some("pass_through".into()),
            pass_through: true,
            ..Self::default()
        }
    }

    /// Names the strategy; the name shows up in procedure listings.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the serialize side.
    #[must_use]
    pub fn serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Data) -> Result<Data, BoxError> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }

    /// Sets the deserialize side.
    #[must_use]
    pub fn deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Data) -> Result<Data, BoxError> + Send + Sync + 'static,
    {
        self.deserialize = Some(Arc::new(f));
        self
    }

    /// Declares the type the serialize side returns.
    #[must_use]
    pub fn serialize_as(mut self, ty: TypeExpr) -> Self {
        self.serialize_as = Some(ty);
        self
    }

    /// Declares the type the deserialize side accepts.
    #[must_use]
    pub fn deserialize_from(mut self, ty: TypeExpr) -> Self {
        self.deserialize_from = Some(ty);
        self
    }

    /// Name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The serialize side.
    pub fn serialize_fn(&self) -> Option<&SerializeFn> {
        self.serialize.as_ref()
    }

    /// The deserialize side.
    pub fn deserialize_fn(&self) -> Option<&DeserializeFn> {
        self.deserialize.as_ref()
    }

    /// Output type of the serialize side.
    pub fn serialize_type(&self) -> Option<&TypeExpr> {
        self.serialize_as.as_ref()
    }

    /// Input type of the deserialize side.
    pub fn deserialize_type(&self) -> Option<&TypeExpr> {
        self.deserialize_from.as_ref()
    }

    /// Returns true if values are copied unchanged.
    pub fn is_pass_through(&self) -> bool {
        self.pass_through
    }

    /// Returns true if neither side overrides anything.
    pub fn is_empty(&self) -> bool {
        !self.pass_through && self.serialize.is_none() && self.deserialize.is_none()
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .field("serialize_as", &self.serialize_as)
            .field("deserialize_from", &self.deserialize_from)
            .field("pass_through", &self.pass_through)
            .finish()
    }
}
