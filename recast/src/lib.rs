#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod tracing_macros;

mod cache;
mod catalog;
mod convert;
mod discriminator;
mod engine;
mod error;
mod extension;
mod format;
mod opaque;
mod options;
mod overrides;
mod procedure;
mod registry;
mod resolver;
mod shape;
mod synth;

pub use cache::CacheStats;
pub use convert::{FromRecord, ToRecord};
pub use engine::Engine;
pub use error::{BuildError, ConvertError, ConvertErrorKind, Error, FormatError, PathSegment};
pub use extension::ExtensionHandler;
pub use format::{Format, ParseFn, RenderFn};
pub use options::{DecodeOptions, EncodeOptions};
pub use procedure::{Procedure, ProcedureKind};
pub use shape::Shape;

pub use recast_core::*;
pub use recast_value::{VNumber, VObject, Value, ValueType, value};
