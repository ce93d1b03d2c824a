//! Strategy/Dialect Resolver.
//!
//! Overrides are looked up, for every shape the registry visits, in this
//! order: the active dialect, that dialect's fallback chain, the model's
//! strategy table, the model's default dialect and its fallback chain.
//! Field-level strategies are applied by the synthesizer before any of these.
//! Toggles resolve through the same chain, after an enabled per-call option.

use recast_core::{ContainerCategory, Dialect, ModelConfig, Strategy, TypeExpr};

use crate::error::BuildError;
use crate::resolver::Resolver;
use crate::shape::Shape;
use crate::tracing_macros::trace;

/// Dialects in lookup order, split around the model's own strategy table.
struct Layers<'a> {
    active: Vec<&'a Dialect>,
    default: Vec<&'a Dialect>,
}

impl<'a> Layers<'a> {
    fn new(active: Option<&'a Dialect>, config: &'a ModelConfig) -> Self {
        fn chain(d: Option<&Dialect>) -> Vec<&Dialect> {
            let mut out = Vec::new();
            let mut next = d;
            while let Some(d) = next {
                if out.iter().any(|seen: &&Dialect| seen.id() == d.id()) {
                    break;
                }
                out.push(d);
                next = d.get_fallback();
            }
            out
        }
        Self {
            active: chain(active),
            default: chain(config.default_dialect.as_ref()),
        }
    }

    fn resolve<T: Clone>(&self, from_dialect: impl Fn(&Dialect) -> Option<T>, from_config: Option<T>) -> Option<T> {
        self.active
            .iter()
            .find_map(|&d| from_dialect(d))
            .or(from_config)
            .or_else(|| self.default.iter().find_map(|&d| from_dialect(d)))
    }
}

/// Compile-time settings of one procedure.
#[derive(Clone, Debug)]
pub(crate) struct Settings {
    pub(crate) omit_none: bool,
    pub(crate) omit_default: bool,
    pub(crate) serialize_by_alias: bool,
    pub(crate) namedtuple_as_dict: bool,
    pub(crate) native_bytes: bool,
    pub(crate) no_copy: Vec<ContainerCategory>,
}

impl Settings {
    pub(crate) fn resolve(active: Option<&Dialect>, config: &ModelConfig) -> Self {
        let layers = Layers::new(active, config);
        Self {
            omit_none: layers
                .resolve(Dialect::get_omit_none, config.omit_none)
                .unwrap_or(false),
            omit_default: layers
                .resolve(Dialect::get_omit_default, config.omit_default)
                .unwrap_or(false),
            serialize_by_alias: layers
                .resolve(Dialect::get_serialize_by_alias, config.serialize_by_alias)
                .unwrap_or(true),
            namedtuple_as_dict: layers
                .resolve(Dialect::get_namedtuple_as_dict, None)
                .unwrap_or(false),
            native_bytes: layers.resolve(Dialect::get_native_bytes, None).unwrap_or(false),
            no_copy: layers
                .resolve(|d| d.get_no_copy_collections().map(<[_]>::to_vec), None)
                .unwrap_or_default(),
        }
    }

    pub(crate) fn passes_through(&self, shape: &Shape) -> bool {
        shape
            .container_category()
            .is_some_and(|c| self.no_copy.contains(&c))
    }
}

/// Resolved strategy tables, highest priority first.
#[derive(Clone, Default)]
pub(crate) struct Overrides {
    entries: Vec<(String, Strategy)>,
}

impl Overrides {
    pub(crate) fn resolve(
        resolver: &mut Resolver<'_>,
        active: Option<&Dialect>,
        config: &ModelConfig,
        model: &str,
    ) -> Result<Self, BuildError> {
        let layers = Layers::new(active, config);
        let mut entries = Vec::new();
        let mut add = |resolver: &mut Resolver<'_>, origin: &str, table: &[(TypeExpr, Strategy)]| {
            for (ty, strategy) in table {
                let invalid = |reason: String| BuildError::InvalidDialect {
                    dialect: origin.to_owned(),
                    reason,
                };
                if strategy.is_empty() {
                    return Err(invalid(format!("strategy for `{ty}` converts nothing")));
                }
                let shape = resolver
                    .resolve_free(ty, origin)
                    .map_err(|e| invalid(e.to_string()))?;
                entries.push((shape.fingerprint(), strategy.clone()));
            }
            Ok(())
        };
        for d in &layers.active {
            add(resolver, d.name(), d.strategies())?;
        }
        if let Some(table) = &config.strategies {
            add(resolver, &format!("{model} config"), table)?;
        }
        for d in &layers.default {
            add(resolver, d.name(), d.strategies())?;
        }
        Ok(Self { entries })
    }

    /// First strategy registered for `shape` that defines `side`. Entries
    /// that only convert the other way leave `side` to later layers.
    pub(crate) fn lookup(&self, shape: &Shape, side: Side) -> Option<&Strategy> {
        if self.entries.is_empty() {
            return None;
        }
        let key = shape.fingerprint();
        let found = self
            .entries
            .iter()
            .find(|(k, s)| *k == key && side.defined_by(s))
            .map(|(_, s)| s);
        if found.is_some() {
            trace!("{:?} override found for `{}`", side, key);
        }
        found
    }

    /// Returns true if any layer overrides `shape` in either direction.
    pub(crate) fn touches(&self, shape: &Shape) -> bool {
        let key = shape.fingerprint();
        self.entries.iter().any(|(k, _)| *k == key)
    }
}

/// The half of a strategy a conversion needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Serialize,
    Deserialize,
}

impl Side {
    pub(crate) fn defined_by(self, strategy: &Strategy) -> bool {
        strategy.is_pass_through()
            || match self {
                Side::Serialize => strategy.serialize_fn().is_some(),
                Side::Deserialize => strategy.deserialize_fn().is_some(),
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn active_dialect_beats_config_beats_default_dialect() {
        let config = ModelConfig::new()
            .omit_none(false)
            .dialect(Dialect::new("default").omit_none(true).omit_default(true));
        let active = Dialect::new("active").omit_none(true);

        let s = Settings::resolve(Some(&active), &config);
        assert!(s.omit_none);
        assert!(s.omit_default);

        let s = Settings::resolve(None, &config);
        assert!(!s.omit_none);
        assert!(s.omit_default);
        assert!(s.serialize_by_alias);
    }

    #[test]
    fn fallback_dialects_are_consulted_in_turn() {
        let active = Dialect::new("outer").fallback(Dialect::new("inner").serialize_by_alias(false));
        let s = Settings::resolve(Some(&active), &ModelConfig::new().serialize_by_alias(true));
        assert!(!s.serialize_by_alias);
    }

    #[test]
    fn strategies_resolve_in_priority_order() {
        let catalog = Catalog::default();
        let mut resolver = Resolver::new(&catalog);
        let config = ModelConfig::new()
            .strategy(TypeExpr::int(), Strategy::pass_through().named("config"))
            .dialect(Dialect::new("default").strategy(TypeExpr::str(), Strategy::pass_through().named("default")));
        let active = Dialect::new("active").strategy(TypeExpr::int(), Strategy::pass_through().named("active"));

        let o = Overrides::resolve(&mut resolver, Some(&active), &config, "M").unwrap();
        let int = Shape::Scalar(recast_core::ScalarType::Int);
        let str = Shape::Scalar(recast_core::ScalarType::Str);
        assert_eq!(o.lookup(&int, Side::Serialize).and_then(Strategy::name), Some("active"));
        assert_eq!(o.lookup(&str, Side::Deserialize).and_then(Strategy::name), Some("default"));

        let o = Overrides::resolve(&mut resolver, None, &config, "M").unwrap();
        assert_eq!(o.lookup(&int, Side::Serialize).and_then(Strategy::name), Some("config"));
    }

    #[test]
    fn one_sided_strategies_leave_the_other_side_to_later_layers() {
        let catalog = Catalog::default();
        let mut resolver = Resolver::new(&catalog);
        let config = ModelConfig::new().strategy(
            TypeExpr::int(),
            Strategy::new().named("config").serialize(|d| Ok(d.clone())),
        );
        let active = Dialect::new("active").strategy(
            TypeExpr::int(),
            Strategy::new().named("active").deserialize(Ok),
        );

        let o = Overrides::resolve(&mut resolver, Some(&active), &config, "M").unwrap();
        let int = Shape::Scalar(recast_core::ScalarType::Int);
        assert_eq!(o.lookup(&int, Side::Serialize).and_then(Strategy::name), Some("config"));
        assert_eq!(o.lookup(&int, Side::Deserialize).and_then(Strategy::name), Some("active"));
        assert!(o.touches(&int));
    }

    #[test]
    fn empty_strategies_are_rejected() {
        let catalog = Catalog::default();
        let mut resolver = Resolver::new(&catalog);
        let active = Dialect::new("broken").strategy(TypeExpr::int(), Strategy::new());
        let err = Overrides::resolve(&mut resolver, Some(&active), &ModelConfig::new(), "M")
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::InvalidDialect { dialect, .. } if dialect == "broken"));
    }
}
