//! Bridges between Rust types and records.

use recast_core::Record;
use recast_value::Value;

use crate::engine::Engine;
use crate::error::ConvertError;
use crate::options::{DecodeOptions, EncodeOptions};

/// A Rust type that can be viewed as a record of a declared model.
///
/// Implementors get [`ToRecord::to_value`], which forwards to the model's
/// cached encoder.
pub trait ToRecord {
    /// Builds the record.
    fn to_record(&self) -> Record;

    /// Encodes through `engine`.
    fn to_value(&self, engine: &Engine, options: &EncodeOptions) -> Result<Value, ConvertError> {
        engine.encode(&self.to_record(), options)
    }
}

/// A Rust type that can be built from a record of a declared model.
pub trait FromRecord: Sized {
    /// The model records are decoded as.
    const MODEL: &'static str;

    /// Builds the value from a decoded record.
    fn from_record(record: Record) -> Result<Self, ConvertError>;

    /// Decodes through `engine`.
    fn from_value(engine: &Engine, value: &Value, options: &DecodeOptions) -> Result<Self, ConvertError> {
        Self::from_record(engine.decode(Self::MODEL, value, options)?)
    }
}
