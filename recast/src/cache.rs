//! Procedure cache keyed by (model, type arguments, dialect, direction).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use recast_core::{Dialect, DialectId};

use crate::error::ConvertError;
use crate::procedure::{Procedure, ProcedureKind, Runtime};
use crate::shape::{Shape, join};

/// Cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub(crate) model: String,
    /// Fingerprint of the type arguments.
    pub(crate) args: String,
    pub(crate) dialect: DialectId,
    pub(crate) kind: ProcedureKind,
}

impl CacheKey {
    pub(crate) fn new(model: &str, args: &[Shape], dialect: Option<&Dialect>, kind: ProcedureKind) -> Self {
        Self {
            model: model.to_owned(),
            args: join(args),
            dialect: dialect.map_or(DialectId::NONE, Dialect::id),
            kind,
        }
    }
}

/// A cache entry. It exists before its procedure is synthesized so that
/// self-references can bind to it.
pub(crate) type Slot = OnceLock<Arc<Procedure>>;

/// Counters for cache behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Procedures synthesized.
    pub syntheses: usize,
    /// Requests answered from the cache.
    pub hits: usize,
    /// Model layouts resolved.
    pub layouts: usize,
    /// Keys present.
    pub entries: usize,
}

/// Append-only map of slots. Entries are never invalidated.
#[derive(Default)]
pub(crate) struct ProcedureCache {
    slots: RwLock<HashMap<CacheKey, Arc<Slot>>>,
    syntheses: AtomicUsize,
    hits: AtomicUsize,
    layouts: AtomicUsize,
}

impl ProcedureCache {
    /// Returns the slot for `key`, inserting an empty one if absent.
    pub(crate) fn slot(&self, key: &CacheKey) -> Arc<Slot> {
        if let Some(slot) = self.slots.read().get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write();
        // another thread may have inserted it in between
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Stores `procedure` unless the slot was filled concurrently, and
    /// returns whichever procedure the slot now holds.
    pub(crate) fn fill(&self, slot: &Slot, procedure: Procedure) -> Arc<Procedure> {
        self.syntheses.fetch_add(1, Ordering::Relaxed);
        Arc::clone(slot.get_or_init(|| Arc::new(procedure)))
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_layout(&self) {
        self.layouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            syntheses: self.syntheses.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            layouts: self.layouts.load(Ordering::Relaxed),
            entries: self.slots.read().len(),
        }
    }
}

/// A reference to another model's procedure, captured by a compiled body.
///
/// The slot may still be empty while the referring procedure is being
/// synthesized (self-references), or if an earlier synthesis failed; in that
/// case the procedure is synthesized on first use.
#[derive(Clone)]
pub(crate) struct ProcRef {
    pub(crate) model: String,
    pub(crate) args: Vec<Shape>,
    pub(crate) dialect: Option<Dialect>,
    pub(crate) kind: ProcedureKind,
    pub(crate) slot: Arc<Slot>,
}

impl ProcRef {
    pub(crate) fn get(&self, rt: &Runtime<'_>) -> Result<Arc<Procedure>, ConvertError> {
        if let Some(p) = self.slot.get() {
            return Ok(Arc::clone(p));
        }
        rt.engine
            .procedure(&self.model, &self.args, self.dialect.as_ref(), self.kind)
            .map_err(ConvertError::from)
    }
}
