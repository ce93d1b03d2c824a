//! The public entry point.

use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use recast_core::{CodegenOptions, Data, Decl, Dialect, DialectId, Record, TypeExpr};
use recast_value::Value;

use crate::cache::{CacheStats, ProcedureCache};
use crate::catalog::Catalog;
use crate::error::{BuildError, ConvertError, Error};
use crate::extension::ExtensionHandler;
use crate::format::Format;
use crate::options::{DecodeOptions, EncodeOptions};
use crate::procedure::{Procedure, ProcedureKind, Runtime, check_decode_options, check_encode_options};
use crate::resolver::Resolver;
use crate::shape::Shape;
use crate::synth::Synthesizer;
use crate::tracing_macros::debug;

/// Declarations plus the procedures synthesized from them.
///
/// Procedures are synthesized on first use (or by [`Engine::register`]) and
/// cached for the life of the engine. An engine is `Send + Sync`; concurrent
/// first uses of the same procedure may both synthesize it, but only one
/// result is kept.
///
/// ```
/// use recast::{DecodeOptions, EncodeOptions, Engine, Field, Model, Record, TypeExpr, value};
///
/// let engine = Engine::new();
/// engine
///     .declare(
///         Model::new("Point")
///             .field(Field::new("x", TypeExpr::int()))
///             .field(Field::new("y", TypeExpr::int())),
///     )
///     .unwrap();
///
/// let point = Record::new("Point").with("x", 1).with("y", 2);
/// let encoded = engine.encode(&point, &EncodeOptions::new()).unwrap();
/// assert_eq!(encoded, value!({"x": 1, "y": 2}));
///
/// let decoded = engine
///     .decode("Point", &value!({"x": "1", "y": "2"}), &DecodeOptions::new())
///     .unwrap();
/// assert_eq!(decoded, point);
/// ```
pub struct Engine {
    inner: EngineInner,
}

pub(crate) struct EngineInner {
    pub(crate) catalog: Catalog,
    pub(crate) cache: ProcedureCache,
    /// Merges of format dialects with call dialects, kept so that repeated
    /// calls share cache keys.
    merged: RwLock<HashMap<(DialectId, DialectId), Dialect>>,
}

impl EngineInner {
    pub(crate) fn procedure(
        &self,
        model: &str,
        args: &[Shape],
        dialect: Option<&Dialect>,
        kind: ProcedureKind,
    ) -> Result<Arc<Procedure>, BuildError> {
        Synthesizer::new(self).procedure(model, args, dialect, kind)
    }

    fn merged(&self, base: &Dialect, later: &Dialect) -> Dialect {
        let key = (base.id(), later.id());
        if let Some(d) = self.merged.read().get(&key) {
            return d.clone();
        }
        self.merged
            .write()
            .entry(key)
            .or_insert_with(|| base.merge(later))
            .clone()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine with no declarations.
    pub fn new() -> Self {
        Self {
            inner: EngineInner {
                catalog: Catalog::default(),
                cache: ProcedureCache::default(),
                merged: RwLock::new(HashMap::new()),
            },
        }
    }

    /// The process-wide engine.
    pub fn global() -> &'static Engine {
        static GLOBAL: LazyLock<Engine> = LazyLock::new(Engine::new);
        &GLOBAL
    }

    pub(crate) fn inner(&self) -> &EngineInner {
        &self.inner
    }

    /// Adds a declaration. Names are unique across every kind of declaration.
    pub fn declare(&self, decl: impl Into<Decl>) -> Result<(), BuildError> {
        self.inner.catalog.declare(decl.into())
    }

    /// Adds several declarations, stopping at the first failure.
    pub fn declare_all<D: Into<Decl>>(&self, decls: impl IntoIterator<Item = D>) -> Result<(), BuildError> {
        decls.into_iter().try_for_each(|d| self.declare(d))
    }

    /// Registers a handler for type names nothing else declares. Handlers
    /// are consulted in registration order.
    pub fn register_handler(&self, handler: ExtensionHandler) {
        self.inner.catalog.add_extension(handler);
    }

    /// Synthesizes a model's encoder and decoder now.
    ///
    /// If the model (or an ancestor) sets `lazy_compilation` and a name it
    /// uses is not declared yet, synthesis is deferred to the first call
    /// instead of failing.
    pub fn register(&self, model: &str) -> Result<(), BuildError> {
        let lazy = self
            .inner
            .catalog
            .ancestry(model)?
            .iter()
            .find_map(|m| m.config.lazy_compilation)
            .unwrap_or(false);
        for kind in [ProcedureKind::Encode, self.decode_kind(model)?] {
            match self.inner.procedure(model, &[], None, kind) {
                Ok(_) => {}
                Err(BuildError::UnresolvedForwardRef { .. }) if lazy => {
                    debug!("deferring `{}` until the names it uses are declared", model);
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// The encoder for `model` applied to `type_args` under `dialect`.
    pub fn encoder(
        &self,
        model: &str,
        type_args: &[TypeExpr],
        dialect: Option<&Dialect>,
    ) -> Result<Arc<Procedure>, BuildError> {
        let args = self.resolve_args(model, type_args)?;
        self.inner.procedure(model, &args, dialect, ProcedureKind::Encode)
    }

    /// The decoder for `model` applied to `type_args` under `dialect`. For a
    /// model that declares a discriminator this is the dispatching decoder.
    pub fn decoder(
        &self,
        model: &str,
        type_args: &[TypeExpr],
        dialect: Option<&Dialect>,
    ) -> Result<Arc<Procedure>, BuildError> {
        let args = self.resolve_args(model, type_args)?;
        self.inner.procedure(model, &args, dialect, self.decode_kind(model)?)
    }

    /// Encodes a record with its model's encoder.
    pub fn encode(&self, record: &Record, options: &EncodeOptions) -> Result<Value, ConvertError> {
        self.encode_with(record, options, options.dialect.clone())
    }

    /// Decodes `value` as `model`.
    pub fn decode(&self, model: &str, value: &Value, options: &DecodeOptions) -> Result<Record, ConvertError> {
        self.decode_with(model, value, options, options.dialect.clone())
    }

    /// Encodes a record and renders it with `format`.
    pub fn encode_to(&self, format: &Format, record: &Record, options: &EncodeOptions) -> Result<Vec<u8>, Error> {
        let dialect = self.format_dialect(format, options.dialect.as_ref());
        let value = self.encode_with(record, options, dialect)?;
        Ok((format.render)(&value)?)
    }

    /// Parses `input` with `format` and decodes it as `model`.
    pub fn decode_from(
        &self,
        format: &Format,
        model: &str,
        input: &[u8],
        options: &DecodeOptions,
    ) -> Result<Record, Error> {
        let value = (format.parse)(input)?;
        let dialect = self.format_dialect(format, options.dialect.as_ref());
        Ok(self.decode_with(model, &value, options, dialect)?)
    }

    /// Cache counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    fn encode_with(
        &self,
        record: &Record,
        options: &EncodeOptions,
        dialect: Option<Dialect>,
    ) -> Result<Value, ConvertError> {
        let model = record.model();
        check_encode_options(model, self.codegen_options(model)?, options)?;
        let procedure = self.encoder(model, &options.type_args, dialect.as_ref())?;
        let rt = Runtime {
            engine: &self.inner,
            omit_none: options.omit_none,
            omit_default: options.omit_default,
            by_alias: options.by_alias,
            context: &options.context,
        };
        procedure.run_encode(&Data::Record(record.clone()), &rt)
    }

    fn decode_with(
        &self,
        model: &str,
        value: &Value,
        options: &DecodeOptions,
        dialect: Option<Dialect>,
    ) -> Result<Record, ConvertError> {
        check_decode_options(model, self.codegen_options(model)?, options)?;
        let procedure = self.decoder(model, &options.type_args, dialect.as_ref())?;
        let rt = Runtime {
            context: &options.context,
            ..Runtime::plain(&self.inner)
        };
        match procedure.run_decode(value, &rt)? {
            Data::Record(record) => Ok(record),
            other => Err(ConvertError::mismatch_data(model, &other)),
        }
    }

    fn format_dialect(&self, format: &Format, call: Option<&Dialect>) -> Option<Dialect> {
        match (&format.dialect, call) {
            (Some(base), Some(call)) => Some(self.inner.merged(base, call)),
            (Some(base), None) => Some(base.clone()),
            (None, call) => call.cloned(),
        }
    }

    fn resolve_args(&self, model: &str, type_args: &[TypeExpr]) -> Result<Vec<Shape>, BuildError> {
        if type_args.is_empty() {
            return Ok(Vec::new());
        }
        Resolver::new(&self.inner.catalog).resolve_args(type_args, model)
    }

    fn decode_kind(&self, model: &str) -> Result<ProcedureKind, BuildError> {
        let declared = self.inner.catalog.model(model)?;
        Ok(if declared.config.discriminator.is_some() {
            ProcedureKind::Dispatch
        } else {
            ProcedureKind::Decode
        })
    }

    fn codegen_options(&self, model: &str) -> Result<CodegenOptions, BuildError> {
        Ok(self
            .inner
            .catalog
            .ancestry(model)?
            .iter()
            .find_map(|m| m.config.code_generation_options)
            .unwrap_or_default())
    }
}
