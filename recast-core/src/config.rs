//! Per-model declared configuration.

use std::collections::HashMap;

use crate::{Dialect, Discriminator, Strategy, TypeExpr};

bitflags::bitflags! {
    /// Per-call options a model's procedures accept.
    ///
    /// Passing an option the model did not enable is a configuration error.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CodegenOptions: u8 {
        /// Accept a per-call `omit_none`.
        const OMIT_NONE_FLAG = 1 << 0;
        /// Accept a per-call `omit_default`.
        const OMIT_DEFAULT_FLAG = 1 << 1;
        /// Accept a per-call `by_alias`.
        const BY_ALIAS_FLAG = 1 << 2;
        /// Accept a per-call dialect.
        const DIALECT_SUPPORT = 1 << 3;
        /// Thread the per-call context into hooks.
        const CONTEXT = 1 << 4;
    }
}

/// Declared configuration of a model.
///
/// Every setting is optional: an unset setting is taken from the nearest
/// ancestor that sets it, and falls back to the documented default.
#[derive(Clone, Debug, Default)]
pub struct ModelConfig {
    /// Field name to alias.
    pub aliases: Option<HashMap<String, String>>,
    /// Encode writes aliases (default `true`).
    pub serialize_by_alias: Option<bool>,
    /// Decode also accepts the declared field name (default `false`).
    pub allow_deserialization_not_by_alias: Option<bool>,
    /// Skip `None` fields when encoding (default `false`).
    pub omit_none: Option<bool>,
    /// Skip fields equal to their default when encoding (default `false`).
    pub omit_default: Option<bool>,
    /// Unknown input keys are an error (default `false`).
    pub forbid_extra_keys: Option<bool>,
    /// Per-type strategies.
    pub strategies: Option<Vec<(TypeExpr, Strategy)>>,
    /// Dialect used when the caller does not pass one.
    pub default_dialect: Option<Dialect>,
    /// How to pick a subtype when this model is decoded. Unlike every other
    /// setting it is not inherited: it applies to the declaring model only.
    pub discriminator: Option<Discriminator>,
    /// Accepted per-call options.
    pub code_generation_options: Option<CodegenOptions>,
    /// Defer synthesis until first use when a forward reference does not
    /// resolve yet (default `false`).
    pub lazy_compilation: Option<bool>,
    /// Log the procedure listing when synthesized (default `false`).
    pub debug: Option<bool>,
}

impl ModelConfig {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field alias.
    #[must_use]
    pub fn alias(mut self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases
            .get_or_insert_with(HashMap::new)
            .insert(field.into(), alias.into());
        self
    }

    /// Sets serialize-by-alias.
    #[must_use]
    pub fn serialize_by_alias(mut self, on: bool) -> Self {
        self.serialize_by_alias = Some(on);
        self
    }

    /// Sets the permissive decode mode.
    #[must_use]
    pub fn allow_deserialization_not_by_alias(mut self, on: bool) -> Self {
        self.allow_deserialization_not_by_alias = Some(on);
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

    /// Sets forbid-extra-keys.
    #[must_use]
    pub fn forbid_extra_keys(mut self, on: bool) -> Self {
        self.forbid_extra_keys = Some(on);
        self
    }

    /// Adds a per-type strategy.
    #[must_use]
    pub fn strategy(mut self, ty: TypeExpr, strategy: Strategy) -> Self {
        self.strategies.get_or_insert_with(Vec::new).push((ty, strategy));
        self
    }

    /// Sets the default dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.default_dialect = Some(dialect);
        self
    }

    /// Sets the discriminator.
    #[must_use]
    pub fn discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    /// Enables per-call options.
    #[must_use]
    pub fn options(mut self, options: CodegenOptions) -> Self {
        self.code_generation_options = Some(options);
        self
    }

    /// Sets lazy compilation.
    #[must_use]
    pub fn lazy_compilation(mut self, on: bool) -> Self {
        self.lazy_compilation = Some(on);
        self
    }

    /// Sets debug output.
    #[must_use]
    pub fn debug(mut self, on: bool) -> Self {
        self.debug = Some(on);
        self
    }

    /// Fills every unset setting except the discriminator from `ancestor`.
    pub fn inherit(&mut self, ancestor: &ModelConfig) {
        macro_rules! fill {
            ($($field:ident),*) => {
                $(
                    if self.$field.is_none() {
                        self.$field = ancestor.$field.clone();
                    }
                )*
            };
        }
        fill!(
            aliases,
            serialize_by_alias,
            allow_deserialization_not_by_alias,
            omit_none,
            omit_default,
            forbid_extra_keys,
            strategies,
            default_dialect,
            code_generation_options,
            lazy_compilation,
            debug
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_settings_come_from_the_ancestor() {
        let base = ModelConfig::new()
            .omit_none(true)
            .serialize_by_alias(false)
            .alias("a", "A");
        let mut derived = ModelConfig::new().serialize_by_alias(true);
        derived.inherit(&base);

        assert_eq!(derived.omit_none, Some(true));
        assert_eq!(derived.serialize_by_alias, Some(true));
        assert_eq!(
            derived.aliases.as_ref().and_then(|a| a.get("a")).map(String::as_str),
            Some("A")
        );
        assert_eq!(derived.debug, None);
    }

    #[test]
    fn options_combine() {
        let opts = CodegenOptions::OMIT_NONE_FLAG | CodegenOptions::CONTEXT;
        assert!(opts.contains(CodegenOptions::CONTEXT));
        assert!(!opts.contains(CodegenOptions::BY_ALIAS_FLAG));
    }
}
