//! Method Synthesizer: assembles per-model procedures and fills the cache.

use core::fmt::Write as _;
use std::collections::HashSet;
use std::sync::Arc;

use recast_core::{CodegenOptions, Data, DefaultValue, Dialect, Record};
use recast_value::{VObject, Value};

use crate::cache::{CacheKey, ProcRef, Slot};
use crate::discriminator;
use crate::engine::EngineInner;
use crate::error::{BuildError, ConvertError, ConvertErrorKind, PathSegment};
use crate::overrides::{Overrides, Settings};
use crate::procedure::{Body, DecodeExpr, EncodeExpr, Procedure, ProcedureKind, Runtime};
use crate::registry::{Codegen, scalar};
use crate::resolver::{Layout, Resolver};
use crate::shape::{Shape, join};
use crate::tracing_macros::{debug, trace};

static NO_CONTEXT: Value = Value::Null;

/// One synthesis run. Remembers which procedures are being built so that
/// references back into them bind to their (still empty) cache slots.
pub(crate) struct Synthesizer<'e> {
    pub(crate) engine: &'e EngineInner,
    in_progress: HashSet<CacheKey>,
}

impl<'e> Synthesizer<'e> {
    pub(crate) fn new(engine: &'e EngineInner) -> Self {
        Self {
            engine,
            in_progress: HashSet::new(),
        }
    }

    /// Resolves a model's layout, counting it in the cache statistics.
    pub(crate) fn layout(&self, model: &str, args: &[Shape]) -> Result<Layout, BuildError> {
        self.engine.cache.record_layout();
        Resolver::new(&self.engine.catalog).layout(model, args)
    }

    /// Returns the cached procedure for the key, synthesizing it on a miss.
    pub(crate) fn procedure(
        &mut self,
        model: &str,
        args: &[Shape],
        dialect: Option<&Dialect>,
        kind: ProcedureKind,
    ) -> Result<Arc<Procedure>, BuildError> {
        let key = CacheKey::new(model, args, dialect, kind);
        let slot = self.engine.cache.slot(&key);
        if let Some(procedure) = slot.get() {
            self.engine.cache.record_hit();
            trace!("cache hit for {} `{}[{}]`", kind, model, key.args);
            return Ok(Arc::clone(procedure));
        }
        self.synthesize(key, &slot, model, args, dialect)
    }

    /// A reference to another procedure for a compiled body to call.
    ///
    /// The target is synthesized now unless it is already being built
    /// further up this run, in which case the reference waits on its slot.
    pub(crate) fn proc_ref(
        &mut self,
        model: &str,
        args: &[Shape],
        dialect: Option<&Dialect>,
        kind: ProcedureKind,
    ) -> Result<ProcRef, BuildError> {
        let key = CacheKey::new(model, args, dialect, kind);
        let slot = self.engine.cache.slot(&key);
        if slot.get().is_none() && !self.in_progress.contains(&key) {
            self.synthesize(key, &slot, model, args, dialect)?;
        }
        Ok(ProcRef {
            model: model.to_owned(),
            args: args.to_vec(),
            dialect: dialect.cloned(),
            kind,
            slot,
        })
    }

    fn synthesize(
        &mut self,
        key: CacheKey,
        slot: &Slot,
        model: &str,
        args: &[Shape],
        dialect: Option<&Dialect>,
    ) -> Result<Arc<Procedure>, BuildError> {
        debug!("synthesizing {} for `{}[{}]` ({})", key.kind, model, key.args, key.dialect);
        let kind = key.kind;
        self.in_progress.insert(key.clone());
        let built = match kind {
            ProcedureKind::Encode => self.build_encoder(model, args, dialect),
            ProcedureKind::Decode => self.build_decoder(model, args, dialect),
            ProcedureKind::Dispatch => self.build_dispatcher(model, args, dialect),
        };
        self.in_progress.remove(&key);
        let (procedure, show) = built?;
        if show {
            debug!("{}", procedure.source);
        }
        Ok(self.engine.cache.fill(slot, procedure))
    }

    fn codegen(&mut self, layout: &Layout, dialect: Option<&Dialect>) -> Result<Codegen<'_, 'e>, BuildError> {
        let settings = Settings::resolve(dialect, &layout.config);
        let mut resolver = Resolver::new(&self.engine.catalog);
        let overrides = Overrides::resolve(&mut resolver, dialect, &layout.config, &layout.model.name)?;
        Ok(Codegen::new(self, &layout.model.name, dialect.cloned(), overrides, settings))
    }

    fn build_encoder(
        &mut self,
        model: &str,
        args: &[Shape],
        dialect: Option<&Dialect>,
    ) -> Result<(Procedure, bool), BuildError> {
        let layout = self.layout(model, args)?;
        let aliases = layout.config.aliases.clone().unwrap_or_default();
        let options = layout.config.code_generation_options.unwrap_or_default();
        let mut codegen = self.codegen(&layout, dialect)?;
        let settings = codegen.settings.clone();
        let mut fields = Vec::with_capacity(layout.fields.len());
        for resolved in &layout.fields {
            let field = &resolved.field;
            if field.meta.omit {
                continue;
            }
            codegen.field = field.name.clone();
            let expr = match &field.meta.strategy {
                Some(strategy) => codegen.pack_strategy(&resolved.shape, strategy)?,
                None => codegen.pack(&resolved.shape)?,
            };
            fields.push(EncodeField {
                name: field.name.clone(),
                alias: field.meta.alias.clone().or_else(|| aliases.get(&field.name).cloned()),
                shape: resolved.shape.to_string(),
                default: field.default.clone(),
                expr,
            });
        }
        drop(codegen);

        let mut source = format!("def encode_{model}(record):\n");
        for f in &fields {
            let key = if settings.serialize_by_alias {
                f.alias.as_deref().unwrap_or(&f.name)
            } else {
                &f.name
            };
            let _ = writeln!(source, "    out[{key:?}] = {}  # v = record.{}", f.expr.source, f.name);
        }

        let model_name = model.to_owned();
        let hooks = layout.hooks.clone();
        let body = move |data: &Data, rt: &Runtime<'_>| -> Result<Value, ConvertError> {
            let Data::Record(record) = data else {
                return Err(ConvertError::mismatch_data(&model_name, data));
            };
            let context = if options.contains(CodegenOptions::CONTEXT) {
                rt.context
            } else {
                &NO_CONTEXT
            };
            let rewritten;
            let record: &Record = match &hooks.pre_serialize {
                Some(hook) => {
                    rewritten = hook(record.clone(), context).map_err(hook_error)?;
                    &rewritten
                }
                None => record,
            };
            let omit_none = toggle(options, CodegenOptions::OMIT_NONE_FLAG, rt.omit_none, settings.omit_none);
            let omit_default =
                toggle(options, CodegenOptions::OMIT_DEFAULT_FLAG, rt.omit_default, settings.omit_default);
            let by_alias = toggle(options, CodegenOptions::BY_ALIAS_FLAG, rt.by_alias, settings.serialize_by_alias);

            let mut out = VObject::with_capacity(fields.len());
            for f in &fields {
                let fallback;
                let value = match record.get(&f.name) {
                    Some(value) => value,
                    None => match &f.default {
                        Some(default) => {
                            fallback = default.get();
                            &fallback
                        }
                        None => return Err(ConvertError::missing(&model_name, &f.name)),
                    },
                };
                if omit_none && value.is_none() {
                    continue;
                }
                if omit_default && f.default.as_ref().is_some_and(|d| d.get() == *value) {
                    continue;
                }
                let encoded = (f.expr.run)(value, rt)
                    .map_err(|e| field_error(e, &model_name, &f.name, &f.shape, || raw_data(value)))?;
                let key = match (&f.alias, by_alias) {
                    (Some(alias), true) => alias.as_str(),
                    _ => f.name.as_str(),
                };
                out.insert(key, encoded);
            }
            let out = Value::Object(out);
            match &hooks.post_serialize {
                Some(hook) => hook(out, context).map_err(hook_error),
                None => Ok(out),
            }
        };

        Ok((
            Procedure {
                model: model.to_owned(),
                type_args: join(args),
                dialect: dialect.map_or(recast_core::DialectId::NONE, Dialect::id),
                kind: ProcedureKind::Encode,
                options,
                body: Body::Encode(Arc::new(body)),
                source,
            },
            layout.config.debug.unwrap_or(false),
        ))
    }

    fn build_decoder(
        &mut self,
        model: &str,
        args: &[Shape],
        dialect: Option<&Dialect>,
    ) -> Result<(Procedure, bool), BuildError> {
        let layout = self.layout(model, args)?;
        let aliases = layout.config.aliases.clone().unwrap_or_default();
        let options = layout.config.code_generation_options.unwrap_or_default();
        let permissive = layout.config.allow_deserialization_not_by_alias.unwrap_or(false);
        let forbid_extra = layout.config.forbid_extra_keys.unwrap_or(false);
        let mut codegen = self.codegen(&layout, dialect)?;
        let mut fields = Vec::with_capacity(layout.fields.len());
        for resolved in &layout.fields {
            let field = &resolved.field;
            codegen.field = field.name.clone();
            let expr = if field.init {
                Some(match &field.meta.strategy {
                    Some(strategy) => codegen.unpack_strategy(&resolved.shape, strategy)?,
                    None => codegen.unpack(&resolved.shape)?,
                })
            } else {
                None
            };
            let key = field
                .meta
                .alias
                .clone()
                .or_else(|| aliases.get(&field.name).cloned())
                .unwrap_or_else(|| field.name.clone());
            fields.push(DecodeField {
                name: field.name.clone(),
                key,
                shape: resolved.shape.to_string(),
                default: field.default.clone(),
                expr,
            });
        }
        drop(codegen);

        let mut accepted: Vec<String> = Vec::new();
        for f in fields.iter().filter(|f| f.expr.is_some()) {
            accepted.push(f.key.clone());
            if permissive && f.key != f.name {
                accepted.push(f.name.clone());
            }
        }
        if let Some(tag) = layout.discriminator.as_ref().and_then(|d| d.field.clone()) {
            accepted.push(tag);
        }

        let mut source = format!("def decode_{model}(value):\n");
        for f in &fields {
            match &f.expr {
                Some(expr) => {
                    let _ = writeln!(source, "    {} = {}  # v = value[{:?}]", f.name, expr.source, f.key);
                }
                None => {
                    let _ = writeln!(source, "    {} = <default>", f.name);
                }
            }
        }

        let model_name = model.to_owned();
        let hooks = layout.hooks.clone();
        let body = move |value: &Value, rt: &Runtime<'_>| -> Result<Data, ConvertError> {
            let context = if options.contains(CodegenOptions::CONTEXT) {
                rt.context
            } else {
                &NO_CONTEXT
            };
            let rewritten;
            let value = match &hooks.pre_deserialize {
                Some(hook) => {
                    rewritten = hook(value.clone(), context).map_err(hook_error)?;
                    &rewritten
                }
                None => value,
            };
            let Value::Object(obj) = value else {
                return Err(ConvertError::mismatch(&model_name, value));
            };
            let mut record = Record::new(model_name.as_str());
            for f in &fields {
                let Some(expr) = &f.expr else {
                    if let Some(default) = &f.default {
                        record.set(f.name.as_str(), default.get());
                    }
                    continue;
                };
                let raw = obj
                    .get(&f.key)
                    .or_else(|| if permissive { obj.get(&f.name) } else { None });
                match (raw, &f.default) {
                    (Some(raw), _) => {
                        let data = (expr.run)(raw, rt)
                            .map_err(|e| field_error(e, &model_name, &f.name, &f.shape, || raw.clone()))?;
                        record.set(f.name.as_str(), data);
                    }
                    (None, Some(default)) => {
                        record.set(f.name.as_str(), default.get());
                    }
                    (None, None) => return Err(ConvertError::missing(&model_name, &f.name)),
                }
            }
            if forbid_extra {
                let extra: Vec<String> = obj
                    .keys()
                    .filter(|k| !accepted.iter().any(|a| a == k))
                    .map(str::to_owned)
                    .collect();
                if !extra.is_empty() {
                    return Err(ConvertError::new(ConvertErrorKind::ExtraKeys {
                        model: model_name.clone(),
                        keys: extra,
                    }));
                }
            }
            let record = match &hooks.post_deserialize {
                Some(hook) => hook(record, context).map_err(hook_error)?,
                None => record,
            };
            Ok(Data::Record(record))
        };

        Ok((
            Procedure {
                model: model.to_owned(),
                type_args: join(args),
                dialect: dialect.map_or(recast_core::DialectId::NONE, Dialect::id),
                kind: ProcedureKind::Decode,
                options,
                body: Body::Decode(Arc::new(body)),
                source,
            },
            layout.config.debug.unwrap_or(false),
        ))
    }

    fn build_dispatcher(
        &mut self,
        model: &str,
        args: &[Shape],
        dialect: Option<&Dialect>,
    ) -> Result<(Procedure, bool), BuildError> {
        let layout = self.layout(model, args)?;
        let Some(disc) = layout.discriminator.clone() else {
            return Err(BuildError::InvalidDiscriminator {
                target: model.to_owned(),
                reason: "the model declares no discriminator".to_owned(),
            });
        };
        let candidates = discriminator::model_candidates(self, model, args, &disc, dialect)?;
        let DecodeExpr { run, source } = discriminator::dispatch(&disc, model, candidates);
        Ok((
            Procedure {
                model: model.to_owned(),
                type_args: join(args),
                dialect: dialect.map_or(recast_core::DialectId::NONE, Dialect::id),
                kind: ProcedureKind::Dispatch,
                options: layout.config.code_generation_options.unwrap_or_default(),
                body: Body::Decode(run),
                source: format!("def dispatch_{model}(value):\n    return {source}\n"),
            },
            layout.config.debug.unwrap_or(false),
        ))
    }
}

struct EncodeField {
    name: String,
    alias: Option<String>,
    shape: String,
    default: Option<DefaultValue>,
    expr: EncodeExpr,
}

struct DecodeField {
    name: String,
    key: String,
    shape: String,
    default: Option<DefaultValue>,
    /// `None` for fields that are not read from input.
    expr: Option<DecodeExpr>,
}

/// A per-call toggle applies only if the model enabled it.
fn toggle(options: CodegenOptions, flag: CodegenOptions, per_call: Option<bool>, compiled: bool) -> bool {
    match per_call {
        Some(on) if options.contains(flag) => on,
        _ => compiled,
    }
}

fn hook_error(err: recast_core::BoxError) -> ConvertError {
    ConvertError::new(ConvertErrorKind::Hook(err))
}

fn raw_data(data: &Data) -> Value {
    scalar::to_value(data).unwrap_or_else(|| Value::String(format!("{data:?}")))
}

/// Leaf failures get the field's context; anything already carrying
/// context only gets the field added to its path.
fn field_error(
    err: ConvertError,
    model: &str,
    field: &str,
    shape: &str,
    raw: impl FnOnce() -> Value,
) -> ConvertError {
    let err = if err.is_leaf() {
        ConvertError::new(ConvertErrorKind::InvalidFieldValue {
            model: model.to_owned(),
            field: field.to_owned(),
            shape: shape.to_owned(),
            value: raw(),
            source: Box::new(err),
        })
    } else {
        err
    };
    err.with_path(PathSegment::Field(field.to_owned()))
}
