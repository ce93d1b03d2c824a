//! `recast-value` provides the dynamic value type recast procedures produce
//! and consume.
//!
//! # Features
//!
//! - **Seven value types**: Null, Bool, Number, String, Bytes, Array, Object
//! - **Ordered objects**: object keys keep insertion order, so encoded records
//!   list their fields in declaration order
//! - **Bytes support**: binary formats can carry blobs without a text detour
//!
//! Formats are reached through two plain functions (`bytes -> Value` and
//! `Value -> bytes`), so nothing in this crate parses or renders a concrete
//! wire format. [`format_value`] produces a compact JSON-like rendering that
//! is only meant for diagnostics.

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![forbid(unsafe_code)]

mod macros;

mod value;
pub use value::*;

mod number;
pub use number::*;

mod object;
pub use object::*;

mod format;
pub use format::format_value;
