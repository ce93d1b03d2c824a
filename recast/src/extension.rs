//! User-registered handlers for types the engine does not know.

use core::fmt;
use std::sync::Arc;

use recast_core::{BoxError, Data};
use recast_value::Value;

type AcceptsFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;
type ExtEncodeFn = Arc<dyn Fn(&str, &Data) -> Result<Value, BoxError> + Send + Sync>;
type ExtDecodeFn = Arc<dyn Fn(&str, &Value) -> Result<Data, BoxError> + Send + Sync>;

/// Converts values of named types that are not declared in the catalog.
///
/// A name used in a field type that matches no declaration resolves to an
/// external shape when some handler accepts it. Handlers are tried in
/// registration order; the first that accepts a name handles it.
#[derive(Clone)]
pub struct ExtensionHandler {
    name: String,
    accepts: AcceptsFn,
    encode: ExtEncodeFn,
    decode: ExtDecodeFn,
}

impl ExtensionHandler {
    /// Creates a handler. `accepts` decides which type names it handles;
    /// `encode` and `decode` receive the type name along with the value.
    pub fn new<A, E, D>(name: impl Into<String>, accepts: A, encode: E, decode: D) -> Self
    where
        A: Fn(&str) -> bool + Send + Sync + 'static,
        E: Fn(&str, &Data) -> Result<Value, BoxError> + Send + Sync + 'static,
        D: Fn(&str, &Value) -> Result<Data, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            accepts: Arc::new(accepts),
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    /// Handler name, shown in procedure listings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this handler converts `type_name`.
    pub fn accepts(&self, type_name: &str) -> bool {
        (self.accepts)(type_name)
    }

    pub(crate) fn encode(&self, type_name: &str, data: &Data) -> Result<Value, BoxError> {
        (self.encode)(type_name, data)
    }

    pub(crate) fn decode(&self, type_name: &str, value: &Value) -> Result<Data, BoxError> {
        (self.decode)(type_name, value)
    }
}

impl fmt::Debug for ExtensionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
