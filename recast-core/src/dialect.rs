//! Named, mergeable bundles of conversion overrides and toggles.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{ContainerCategory, Strategy, TypeExpr};

static NEXT_DIALECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a dialect, used in procedure cache keys.
///
/// Every constructed, modified or merged dialect gets a fresh id. Clones
/// share it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DialectId(u64);

impl DialectId {
    /// The id used when no dialect is active.
    pub const NONE: DialectId = DialectId(0);

    fn fresh() -> Self {
        DialectId(NEXT_DIALECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DialectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// A bundle of per-type strategies and formatting toggles.
///
/// Toggles are `Option`s so that [`Dialect::merge`] can tell "explicitly set"
/// from "inherit".
#[derive(Clone)]
pub struct Dialect {
    id: DialectId,
    name: String,
    strategies: Vec<(TypeExpr, Strategy)>,
    omit_none: Option<bool>,
    omit_default: Option<bool>,
    serialize_by_alias: Option<bool>,
    namedtuple_as_dict: Option<bool>,
    no_copy_collections: Option<Vec<ContainerCategory>>,
    native_bytes: Option<bool>,
    fallback: Option<Arc<Dialect>>,
}

impl Dialect {
    /// Creates an empty dialect.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DialectId::fresh(),
            name: name.into(),
            strategies: Vec::new(),
            omit_none: None,
            omit_default: None,
            serialize_by_alias: None,
            namedtuple_as_dict: None,
            no_copy_collections: None,
            native_bytes: None,
            fallback: None,
        }
    }

    /// Adds (or replaces) the strategy for a type.
    #[must_use]
    pub fn strategy(mut self, ty: TypeExpr, strategy: Strategy) -> Self {
        self.id = DialectId::fresh();
        let key = ty.to_string();
        self.strategies.retain(|(t, _)| t.to_string() != key);
        self.strategies.push((ty, strategy));
        self
    }

    /// Sets omit-none.
    #[must_use]
    pub fn omit_none(mut self, on: bool) -> Self {
        self.id = DialectId::fresh();
        self.omit_none = Some(on);
        self
    }

    /// Sets omit-default.
    #[must_use]
    pub fn omit_default(mut self, on: bool) -> Self {
        self.id = DialectId::fresh();
        self.omit_default = Some(on);
        self
    }

    /// Sets whether encode writes aliases.
    #[must_use]
    pub fn serialize_by_alias(mut self, on: bool) -> Self {
        self.id = DialectId::fresh();
        self.serialize_by_alias = Some(on);
        self
    }

    /// Sets whether named tuples encode as objects instead of arrays.
    #[must_use]
    pub fn namedtuple_as_dict(mut self, on: bool) -> Self {
        self.id = DialectId::fresh();
        self.namedtuple_as_dict = Some(on);
        self
    }

    /// Sets the container categories passed through without per-element
    /// conversion.
    #[must_use]
    pub fn no_copy_collections(mut self, categories: impl IntoIterator<Item = ContainerCategory>) -> Self {
        self.id = DialectId::fresh();
        self.no_copy_collections = Some(categories.into_iter().collect());
        self
    }

    /// Sets whether bytes stay binary instead of becoming base64 text.
    #[must_use]
    pub fn native_bytes(mut self, on: bool) -> Self {
        self.id = DialectId::fresh();
        self.native_bytes = Some(on);
        self
    }

    /// Sets the dialect consulted after this one.
    #[must_use]
    pub fn fallback(mut self, dialect: Dialect) -> Self {
        self.id = DialectId::fresh();
        self.fallback = Some(Arc::new(dialect));
        self
    }

    /// Combines two dialects. Entries and toggles set on `later` win;
    /// anything it leaves unset is inherited from `self`. The result has a
    /// fresh identity.
    pub fn merge(&self, later: &Dialect) -> Dialect {
        let mut strategies = self.strategies.clone();
        for (ty, strategy) in &later.strategies {
            let key = ty.to_string();
            strategies.retain(|(t, _)| t.to_string() != key);
            strategies.push((ty.clone(), strategy.clone()));
        }
        Dialect {
            id: DialectId::fresh(),
            name: format!("{}+{}", self.name, later.name),
            strategies,
            omit_none: later.omit_none.or(self.omit_none),
            omit_default: later.omit_default.or(self.omit_default),
            serialize_by_alias: later.serialize_by_alias.or(self.serialize_by_alias),
            namedtuple_as_dict: later.namedtuple_as_dict.or(self.namedtuple_as_dict),
            no_copy_collections: later
                .no_copy_collections
                .clone()
                .or_else(|| self.no_copy_collections.clone()),
            native_bytes: later.native_bytes.or(self.native_bytes),
            fallback: later.fallback.clone().or_else(|| self.fallback.clone()),
        }
    }

    /// Identity used for caching.
    pub fn id(&self) -> DialectId {
        self.id
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-type strategies, in insertion order.
    pub fn strategies(&self) -> &[(TypeExpr, Strategy)] {
        &self.strategies
    }

    /// Explicit omit-none setting.
    pub fn get_omit_none(&self) -> Option<bool> {
        self.omit_none
    }

    /// Explicit omit-default setting.
    pub fn get_omit_default(&self) -> Option<bool> {
        self.omit_default
    }

    /// Explicit serialize-by-alias setting.
    pub fn get_serialize_by_alias(&self) -> Option<bool> {
        self.serialize_by_alias
    }

    /// Explicit named-tuple-as-object setting.
    pub fn get_namedtuple_as_dict(&self) -> Option<bool> {
        self.namedtuple_as_dict
    }

    /// Explicit pass-through container categories.
    pub fn get_no_copy_collections(&self) -> Option<&[ContainerCategory]> {
        self.no_copy_collections.as_deref()
    }

    /// Explicit native-bytes setting.
    pub fn get_native_bytes(&self) -> Option<bool> {
        self.native_bytes
    }

    /// The dialect consulted after this one.
    pub fn get_fallback(&self) -> Option<&Dialect> {
        self.fallback.as_deref()
    }
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("strategies", &self.strategies.len())
            .field("omit_none", &self.omit_none)
            .field("omit_default", &self.omit_default)
            .field("serialize_by_alias", &self.serialize_by_alias)
            .field("namedtuple_as_dict", &self.namedtuple_as_dict)
            .field("no_copy_collections", &self.no_copy_collections)
            .field("native_bytes", &self.native_bytes)
            .field("fallback", &self.fallback.as_ref().map(|d| d.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_later_explicit_settings() {
        let base = Dialect::new("base")
            .omit_none(true)
            .serialize_by_alias(false)
            .strategy(TypeExpr::int(), Strategy::new().named("a"));
        let later = Dialect::new("later")
            .serialize_by_alias(true)
            .strategy(TypeExpr::int(), Strategy::new().named("b"))
            .strategy(TypeExpr::str(), Strategy::new().named("c"));

        let merged = base.merge(&later);
        assert_eq!(merged.get_omit_none(), Some(true));
        assert_eq!(merged.get_serialize_by_alias(), Some(true));
        assert_eq!(merged.get_omit_default(), None);
        let names: Vec<_> = merged
            .strategies()
            .iter()
            .map(|(t, s)| (t.to_string(), s.name().unwrap_or_default().to_owned()))
            .collect();
        assert_eq!(
            names,
            vec![("int".into(), "b".into()), ("str".into(), "c".into())]
        );
        assert_ne!(merged.id(), base.id());
        assert_ne!(merged.id(), later.id());
    }

    #[test]
    fn clones_share_identity() {
        let d = Dialect::new("x");
        assert_eq!(d.clone().id(), d.id());
        assert_ne!(Dialect::new("x").id(), d.id());
    }

    #[test]
    fn modified_clones_get_a_new_identity() {
        let d = Dialect::new("x");
        let tweaked = d.clone().omit_none(true);
        assert_ne!(tweaked.id(), d.id());
    }
}
