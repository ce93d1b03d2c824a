//! Lifecycle hooks run around a model's procedures.

use core::fmt;
use std::sync::Arc;

use recast_value::Value;

use crate::{BoxError, Record};

/// Rewrites the raw input mapping before any field is read.
pub type PreDeserializeFn = Arc<dyn Fn(Value, &Value) -> Result<Value, BoxError> + Send + Sync>;
/// Rewrites the constructed record after decoding.
pub type PostDeserializeFn = Arc<dyn Fn(Record, &Value) -> Result<Record, BoxError> + Send + Sync>;
/// Rewrites the record before any field is written.
pub type PreSerializeFn = Arc<dyn Fn(Record, &Value) -> Result<Record, BoxError> + Send + Sync>;
/// Rewrites the produced mapping after encoding.
pub type PostSerializeFn = Arc<dyn Fn(Value, &Value) -> Result<Value, BoxError> + Send + Sync>;

/// Optional hooks. The second argument of each hook is the caller's context
/// (`Value::Null` unless the model enables context passing).
///
/// A model without a hook inherits it from the nearest ancestor that has one.
#[derive(Clone, Default)]
pub struct Hooks {
    /// Runs on the raw input.
    pub pre_deserialize: Option<PreDeserializeFn>,
    /// Runs on the decoded record.
    pub post_deserialize: Option<PostDeserializeFn>,
    /// Runs on the record about to be encoded.
    pub pre_serialize: Option<PreSerializeFn>,
    /// Runs on the encoded mapping.
    pub post_serialize: Option<PostSerializeFn>,
}

impl Hooks {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pre-deserialize hook.
    #[must_use]
    pub fn pre_deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.pre_deserialize = Some(Arc::new(f));
        self
    }

    /// Sets the post-deserialize hook.
    #[must_use]
    pub fn post_deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Record, &Value) -> Result<Record, BoxError> + Send + Sync + 'static,
    {
        self.post_deserialize = Some(Arc::new(f));
        self
    }

    /// Sets the pre-serialize hook.
    #[must_use]
    pub fn pre_serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Record, &Value) -> Result<Record, BoxError> + Send + Sync + 'static,
    {
        self.pre_serialize = Some(Arc::new(f));
        self
    }

    /// Sets the post-serialize hook.
    #[must_use]
    pub fn post_serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.post_serialize = Some(Arc::new(f));
        self
    }

    /// Fills every unset hook from `ancestor`.
    pub fn inherit(&mut self, ancestor: &Hooks) {
        if self.pre_deserialize.is_none() {
            self.pre_deserialize = ancestor.pre_deserialize.clone();
        }
        if self.post_deserialize.is_none() {
            self.post_deserialize = ancestor.post_deserialize.clone();
        }
        if self.pre_serialize.is_none() {
            self.pre_serialize = ancestor.pre_serialize.clone();
        }
        if self.post_serialize.is_none() {
            self.post_serialize = ancestor.post_serialize.clone();
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_deserialize", &self.pre_deserialize.is_some())
            .field("post_deserialize", &self.post_deserialize.is_some())
            .field("pre_serialize", &self.pre_serialize.is_some())
            .field("post_serialize", &self.post_serialize.is_some())
            .finish()
    }
}
