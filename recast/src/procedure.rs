//! Synthesized conversion routines.

use core::fmt;
use std::sync::Arc;

use recast_core::{CodegenOptions, Data, DialectId, Record};
use recast_value::Value;

use crate::engine::{Engine, EngineInner};
use crate::error::{BuildError, ConvertError};
use crate::options::{DecodeOptions, EncodeOptions};

/// Compiled encoder body.
pub(crate) type EncodeFn =
    Arc<dyn Fn(&Data, &Runtime<'_>) -> Result<Value, ConvertError> + Send + Sync>;
/// Compiled decoder body.
pub(crate) type DecodeFn =
    Arc<dyn Fn(&Value, &Runtime<'_>) -> Result<Data, ConvertError> + Send + Sync>;

/// A compiled conversion paired with the pseudo-source it was built from.
#[derive(Clone)]
pub(crate) struct Expr<F> {
    pub(crate) run: F,
    pub(crate) source: String,
}

pub(crate) type EncodeExpr = Expr<EncodeFn>;
pub(crate) type DecodeExpr = Expr<DecodeFn>;

impl EncodeExpr {
    pub(crate) fn encode<F>(source: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Data, &Runtime<'_>) -> Result<Value, ConvertError> + Send + Sync + 'static,
    {
        Expr {
            run: Arc::new(f),
            source: source.into(),
        }
    }
}

impl DecodeExpr {
    pub(crate) fn decode<F>(source: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &Runtime<'_>) -> Result<Data, ConvertError> + Send + Sync + 'static,
    {
        Expr {
            run: Arc::new(f),
            source: source.into(),
        }
    }
}

/// Per-call state threaded through a running procedure.
pub(crate) struct Runtime<'a> {
    pub(crate) engine: &'a EngineInner,
    pub(crate) omit_none: Option<bool>,
    pub(crate) omit_default: Option<bool>,
    pub(crate) by_alias: Option<bool>,
    pub(crate) context: &'a Value,
}

impl<'a> Runtime<'a> {
    pub(crate) fn plain(engine: &'a EngineInner) -> Self {
        static NULL: Value = Value::Null;
        Self {
            engine,
            omit_none: None,
            omit_default: None,
            by_alias: None,
            context: &NULL,
        }
    }
}

/// What a procedure does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcedureKind {
    /// Record to representation.
    Encode,
    /// Representation to record, for exactly the named model.
    Decode,
    /// Representation to record, picking a model with the declared
    /// discriminator.
    Dispatch,
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProcedureKind::Encode => "encode",
            ProcedureKind::Decode => "decode",
            ProcedureKind::Dispatch => "dispatch",
        })
    }
}

pub(crate) enum Body {
    Encode(EncodeFn),
    Decode(DecodeFn),
}

/// A compiled encode or decode routine for one model, type-argument list and
/// dialect.
///
/// Procedures hold only compile-time constants and closures, and are shared
/// through the engine's cache once synthesized.
pub struct Procedure {
    pub(crate) model: String,
    pub(crate) type_args: String,
    pub(crate) dialect: DialectId,
    pub(crate) kind: ProcedureKind,
    pub(crate) options: CodegenOptions,
    pub(crate) body: Body,
    pub(crate) source: String,
}

impl Procedure {
    /// Model the procedure converts.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fingerprint of the type arguments it was synthesized for.
    pub fn type_args(&self) -> &str {
        &self.type_args
    }

    /// Dialect it was synthesized for.
    pub fn dialect(&self) -> DialectId {
        self.dialect
    }

    /// Direction.
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Pseudo-source listing of the procedure.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Encodes `record`. The dialect and type arguments in `options` are
    /// ignored: they were fixed when the procedure was synthesized.
    pub fn encode(&self, engine: &Engine, record: &Record, options: &EncodeOptions) -> Result<Value, ConvertError> {
        check_encode_options(&self.model, self.options, options)?;
        let rt = Runtime {
            engine: engine.inner(),
            omit_none: options.omit_none,
            omit_default: options.omit_default,
            by_alias: options.by_alias,
            context: &options.context,
        };
        self.run_encode(&Data::Record(record.clone()), &rt)
    }

    /// Decodes `value`. The dialect and type arguments in `options` are
    /// ignored: they were fixed when the procedure was synthesized.
    pub fn decode(&self, engine: &Engine, value: &Value, options: &DecodeOptions) -> Result<Record, ConvertError> {
        check_decode_options(&self.model, self.options, options)?;
        let rt = Runtime {
            engine: engine.inner(),
            omit_none: None,
            omit_default: None,
            by_alias: None,
            context: &options.context,
        };
        match self.run_decode(value, &rt)? {
            Data::Record(record) => Ok(record),
            other => Err(ConvertError::mismatch_data(&self.model, &other)),
        }
    }

    pub(crate) fn run_encode(&self, data: &Data, rt: &Runtime<'_>) -> Result<Value, ConvertError> {
        match &self.body {
            Body::Encode(f) => f(data, rt),
            Body::Decode(_) => Err(ConvertError::invalid(
                &self.model,
                format!("{} procedure cannot encode", self.kind),
            )),
        }
    }

    pub(crate) fn run_decode(&self, value: &Value, rt: &Runtime<'_>) -> Result<Data, ConvertError> {
        match &self.body {
            Body::Decode(f) => f(value, rt),
            Body::Encode(_) => Err(ConvertError::invalid(
                &self.model,
                "encode procedure cannot decode",
            )),
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("model", &self.model)
            .field("type_args", &self.type_args)
            .field("dialect", &self.dialect)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

pub(crate) fn check_encode_options(
    model: &str,
    enabled: CodegenOptions,
    options: &EncodeOptions,
) -> Result<(), BuildError> {
    let checks = [
        (options.omit_none.is_some(), CodegenOptions::OMIT_NONE_FLAG, "omit_none"),
        (options.omit_default.is_some(), CodegenOptions::OMIT_DEFAULT_FLAG, "omit_default"),
        (options.by_alias.is_some(), CodegenOptions::BY_ALIAS_FLAG, "by_alias"),
        (options.dialect.is_some(), CodegenOptions::DIALECT_SUPPORT, "dialect"),
        (!options.context.is_null(), CodegenOptions::CONTEXT, "context"),
    ];
    check(model, enabled, &checks)
}

pub(crate) fn check_decode_options(
    model: &str,
    enabled: CodegenOptions,
    options: &DecodeOptions,
) -> Result<(), BuildError> {
    let checks = [
        (options.dialect.is_some(), CodegenOptions::DIALECT_SUPPORT, "dialect"),
        (!options.context.is_null(), CodegenOptions::CONTEXT, "context"),
    ];
    check(model, enabled, &checks)
}

fn check(model: &str, enabled: CodegenOptions, checks: &[(bool, CodegenOptions, &'static str)]) -> Result<(), BuildError> {
    for (used, flag, option) in checks {
        if *used && !enabled.contains(*flag) {
            return Err(BuildError::OptionNotEnabled {
                model: model.to_owned(),
                option,
            });
        }
    }
    Ok(())
}
