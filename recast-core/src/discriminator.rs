//! Rules for picking a concrete model out of a union or an abstract model.

use core::fmt;
use std::sync::Arc;

/// Computes the tag value(s) a candidate model answers to, given its name.
pub type VariantTaggerFn = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Selection rule applied while decoding a union member or an abstract model.
///
/// With a `field`, the tag is read from the input and matched against each
/// candidate's tag (the default of that field, or the result of the variant
/// tagger). Without one, candidates are trial-decoded in order and the first
/// success wins.
#[derive(Clone, Default)]
pub struct Discriminator {
    /// Name of the tag field in the input mapping.
    pub field: Option<String>,
    /// Consider every (transitive) subtype of the model.
    pub include_subtypes: bool,
    /// Consider the model itself and its ancestors up to the root.
    pub include_supertypes: bool,
    /// Overrides how tags are computed per candidate.
    pub variant_tagger_fn: Option<VariantTaggerFn>,
    /// In trial mode, more than one successful candidate is an error.
    pub require_unique: bool,
}

impl Discriminator {
    /// Discriminates on the given tag field.
    pub fn by_field(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::default()
        }
    }

    /// Discriminates by trying each candidate in turn.
    pub fn by_trial() -> Self {
        Self::default()
    }

    /// Includes subtypes as candidates.
    #[must_use]
    pub fn subtypes(mut self) -> Self {
        self.include_subtypes = true;
        self
    }

    /// Includes the model and its ancestors as candidates.
    #[must_use]
    pub fn supertypes(mut self) -> Self {
        self.include_supertypes = true;
        self
    }

    /// Computes tags with `f` instead of reading the tag field's default.
    #[must_use]
    pub fn tagger<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        self.variant_tagger_fn = Some(Arc::new(f));
        self
    }

    /// Makes trial decoding fail when several candidates succeed.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.require_unique = true;
        self
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discriminator")
            .field("field", &self.field)
            .field("include_subtypes", &self.include_subtypes)
            .field("include_supertypes", &self.include_supertypes)
            .field("variant_tagger_fn", &self.variant_tagger_fn.is_some())
            .field("require_unique", &self.require_unique)
            .finish()
    }
}
