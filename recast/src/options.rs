//! Per-call options.

use recast_core::{Dialect, TypeExpr};
use recast_value::Value;

/// Options for one encode call.
///
/// Each set option must be enabled by the model's
/// [`CodegenOptions`](recast_core::CodegenOptions), except `type_args`.
#[derive(Clone, Debug, Default)]
pub struct EncodeOptions {
    /// Dialect to encode with.
    pub dialect: Option<Dialect>,
    /// Override omit-none.
    pub omit_none: Option<bool>,
    /// Override omit-default.
    pub omit_default: Option<bool>,
    /// Override serialize-by-alias.
    pub by_alias: Option<bool>,
    /// Passed to hooks.
    pub context: Value,
    /// Arguments for a generic model.
    pub type_args: Vec<TypeExpr>,
}

impl EncodeOptions {
    /// No options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Sets omit-none.
    #[must_use]
    pub fn omit_none(mut self, on: bool) -> Self {
        self.omit_none = Some(on);
        self
    }

    /// Sets omit-default.
    #[must_use]
    pub fn omit_default(mut self, on: bool) -> Self {
        self.omit_default = Some(on);
        self
    }

    /// Sets serialize-by-alias.
    #[must_use]
    pub fn by_alias(mut self, on: bool) -> Self {
        self.by_alias = Some(on);
        self
    }

    /// Sets the hook context.
    #[must_use]
    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Sets the type arguments.
    #[must_use]
    pub fn type_args(mut self, args: impl IntoIterator<Item = TypeExpr>) -> Self {
        self.type_args = args.into_iter().collect();
        self
    }
}

/// Options for one decode call.
#[derive(Clone, Debug, Default)]
pub struct DecodeOptions {
    /// Dialect to decode with.
    pub dialect: Option<Dialect>,
    /// Passed to hooks.
    pub context: Value,
    /// Arguments for a generic model.
    pub type_args: Vec<TypeExpr>,
}

impl DecodeOptions {
    /// No options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Sets the hook context.
    #[must_use]
    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Sets the type arguments.
    #[must_use]
    pub fn type_args(mut self, args: impl IntoIterator<Item = TypeExpr>) -> Self {
        self.type_args = args.into_iter().collect();
        self
    }
}
