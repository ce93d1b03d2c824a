//! Codec Registry: turns shapes into compiled conversions.
//!
//! [`Codegen::pack`] and [`Codegen::unpack`] try the handler families in a
//! fixed order and return the first match:
//!
//! 1. overrides (dialect and model strategy tables, annotations)
//! 2. self-converting custom types
//! 3. nested models, through their own cached procedures
//! 4. `Any`, converted opaquely
//! 5. optionals and unions (trial chains)
//! 6. type variables, through their bound or constraints
//! 7. literals
//! 8. scalars
//! 9. collections, mappings, tuples, named tuples and typed dicts
//! 10. enums
//! 11. registered extension handlers
//!
//! Anything else is an unsupported field type.

mod pack;
pub(crate) mod scalar;
mod unpack;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use recast_core::{
    Annotation, CollectionKind, Data, Dialect, Discriminator, EnumValue, LiteralValue, ScalarType, Strategy,
};
use recast_value::Value;

use crate::catalog::Entry;
use crate::error::{BuildError, ConvertError, ConvertErrorKind};
use crate::opaque;
use crate::overrides::{Overrides, Settings};
use crate::procedure::{DecodeExpr, DecodeFn, EncodeExpr, EncodeFn, Expr, Runtime};
use crate::resolver::Resolver;
use crate::shape::Shape;
use crate::synth::Synthesizer;

type AliasSlot<F> = Arc<OnceLock<F>>;

/// Build state for the conversions of one procedure.
pub(crate) struct Codegen<'s, 'e> {
    pub(crate) synth: &'s mut Synthesizer<'e>,
    pub(crate) model: String,
    pub(crate) field: String,
    pub(crate) dialect: Option<Dialect>,
    pub(crate) overrides: Overrides,
    pub(crate) settings: Settings,
    alias_encoders: HashMap<String, Weak<OnceLock<EncodeFn>>>,
    alias_decoders: HashMap<String, Weak<OnceLock<DecodeFn>>>,
}

impl<'s, 'e> Codegen<'s, 'e> {
    pub(crate) fn new(
        synth: &'s mut Synthesizer<'e>,
        model: &str,
        dialect: Option<Dialect>,
        overrides: Overrides,
        settings: Settings,
    ) -> Self {
        Self {
            synth,
            model: model.to_owned(),
            field: String::new(),
            dialect,
            overrides,
            settings,
            alias_encoders: HashMap::new(),
            alias_decoders: HashMap::new(),
        }
    }

    /// Encoder that judges data by its runtime kind, keeping this
    /// procedure's bytes setting and dialect.
    pub(crate) fn opaque_encoder(&self, source: impl Into<String>) -> EncodeExpr {
        let inherited = opaque::Inherited {
            native_bytes: self.settings.native_bytes,
            dialect: self.dialect.clone(),
        };
        Expr::encode(source, move |d, rt| opaque::encode(d, &inherited, rt))
    }

    pub(crate) fn unsupported(&self, shape: &Shape) -> BuildError {
        BuildError::UnsupportedFieldType {
            model: self.model.clone(),
            field: self.field.clone(),
            shape: shape.to_string(),
        }
    }

    fn resolve_type(&mut self, ty: &recast_core::TypeExpr) -> Result<Shape, BuildError> {
        Resolver::new(&self.synth.engine.catalog).resolve_free(ty, &self.model)
    }

    /// Encodes through a strategy: the user function first, then the
    /// strategy's declared output type. A strategy without a serialize side
    /// leaves the shape to the override layers below it.
    pub(crate) fn pack_strategy(&mut self, shape: &Shape, strategy: &Strategy) -> Result<EncodeExpr, BuildError> {
        let name = strategy.name().unwrap_or("strategy").to_owned();
        if strategy.is_pass_through() {
            return Ok(self.opaque_encoder(format!("{name}(v)")));
        }
        let Some(f) = strategy.serialize_fn().cloned() else {
            return self.pack(shape);
        };
        let out = match strategy.serialize_type() {
            Some(ty) => {
                let out_shape = self.resolve_type(ty)?;
                if out_shape.fingerprint() == shape.fingerprint() {
                    self.pack_plain(&out_shape)?
                } else {
                    self.pack(&out_shape)?
                }
            }
            None => self.opaque_encoder("v"),
        };
        let source = format!("{}[v = {name}.serialize(v)]", out.source);
        Ok(Expr::encode(source, move |d, rt| {
            let mid = f(d).map_err(callback_error)?;
            (out.run)(&mid, rt)
        }))
    }

    /// Decodes through a strategy: the strategy's declared input type first,
    /// then the user function. A strategy without a deserialize side leaves
    /// the shape to the override layers below it.
    pub(crate) fn unpack_strategy(&mut self, shape: &Shape, strategy: &Strategy) -> Result<DecodeExpr, BuildError> {
        let name = strategy.name().unwrap_or("strategy").to_owned();
        if strategy.is_pass_through() {
            return Ok(opaque_decoder(format!("{name}(v)")));
        }
        let Some(f) = strategy.deserialize_fn().cloned() else {
            return self.unpack(shape);
        };
        let input = match strategy.deserialize_type() {
            Some(ty) => {
                let in_shape = self.resolve_type(ty)?;
                if in_shape.fingerprint() == shape.fingerprint() {
                    self.unpack_plain(&in_shape)?
                } else {
                    self.unpack(&in_shape)?
                }
            }
            None => opaque_decoder("v"),
        };
        let source = format!("{name}.deserialize({})", input.source);
        Ok(Expr::decode(source, move |v, rt| {
            let mid = (input.run)(v, rt)?;
            f(mid).map_err(callback_error)
        }))
    }

    /// Returns true if the dialect passes `shape` through and its items
    /// need no conversion of their own.
    pub(crate) fn passes_through(&self, shape: &Shape) -> bool {
        if !self.settings.passes_through(shape) {
            return false;
        }
        match shape.unannotated() {
            Shape::Collection(_, elem) => self.is_identity(elem),
            Shape::Mapping(_, key, value) => is_text_key(key) && self.is_identity(value),
            Shape::Tuple(elems) => elems.iter().all(|e| self.is_identity(e)),
            _ => false,
        }
    }

    /// Returns true if values of `shape` look the same in memory and in the
    /// representation, so converting them opaquely loses nothing.
    fn is_identity(&self, shape: &Shape) -> bool {
        if self.overrides.touches(shape) {
            return false;
        }
        match shape {
            Shape::Any => true,
            Shape::Annotated(inner, annotations) => {
                annotation_strategy(annotations).is_none()
                    && annotation_discriminator(annotations).is_none()
                    && self.is_identity(inner)
            }
            Shape::Scalar(ScalarType::Int | ScalarType::Bool | ScalarType::Str | ScalarType::NoneType) => true,
            Shape::Scalar(ScalarType::Bytes) => self.settings.native_bytes,
            Shape::Optional(inner) => self.is_identity(inner),
            Shape::TypeVar {
                bound, constraints, ..
            } => bound.is_none() && constraints.is_empty(),
            Shape::Collection(kind, elem) => {
                !kind.is_set() && *kind != CollectionKind::VarTuple && self.is_identity(elem)
            }
            Shape::Mapping(_, key, value) => is_text_key(key) && self.is_identity(value),
            _ => false,
        }
    }

    /// Value of a literal in the representation.
    fn literal_value(&self, literal: &LiteralValue) -> Result<Value, BuildError> {
        Ok(match literal {
            LiteralValue::None => Value::Null,
            LiteralValue::Bool(b) => Value::Bool(*b),
            LiteralValue::Int(i) => Value::from(*i),
            LiteralValue::Str(s) => Value::String(s.clone()),
            LiteralValue::Bytes(b) if self.settings.native_bytes => Value::Bytes(b.clone()),
            LiteralValue::Bytes(b) => Value::String(STANDARD.encode(b)),
            LiteralValue::Enum(e, m) => match self.synth.engine.catalog.get(e) {
                Some(Entry::Enum(decl)) => decl.value_of(m).cloned().ok_or_else(|| {
                    BuildError::UnsupportedFieldType {
                        model: self.model.clone(),
                        field: self.field.clone(),
                        shape: format!("{e}.{m}"),
                    }
                })?,
                _ => {
                    return Err(BuildError::UnresolvedForwardRef {
                        model: self.model.clone(),
                        field: self.field.clone(),
                        name: e.clone(),
                    });
                }
            },
        })
    }

    /// `(in-memory, representation)` pairs of a literal shape.
    fn literal_table(&self, values: &[LiteralValue]) -> Result<Arc<Vec<(Data, Value)>>, BuildError> {
        values
            .iter()
            .map(|l| Ok((literal_data(l), self.literal_value(l)?)))
            .collect::<Result<Vec<_>, BuildError>>()
            .map(Arc::new)
    }

    fn alias_encoder_slot(&mut self, name: &str) -> AliasSlot<EncodeFn> {
        let slot = Arc::new(OnceLock::new());
        self.alias_encoders.insert(name.to_owned(), Arc::downgrade(&slot));
        slot
    }

    fn alias_decoder_slot(&mut self, name: &str) -> AliasSlot<DecodeFn> {
        let slot = Arc::new(OnceLock::new());
        self.alias_decoders.insert(name.to_owned(), Arc::downgrade(&slot));
        slot
    }
}

fn is_text_key(key: &Shape) -> bool {
    matches!(key.unannotated(), Shape::Scalar(ScalarType::Str) | Shape::Any)
}

/// The strategy or discriminator attached with annotations, if any.
fn annotation_strategy(annotations: &[Annotation]) -> Option<&Strategy> {
    annotations.iter().find_map(|a| match a {
        Annotation::Strategy(s) => Some(s),
        _ => None,
    })
}

fn annotation_discriminator(annotations: &[Annotation]) -> Option<&Discriminator> {
    annotations.iter().find_map(|a| match a {
        Annotation::Discriminator(d) => Some(d),
        _ => None,
    })
}

pub(crate) fn literal_data(literal: &LiteralValue) -> Data {
    match literal {
        LiteralValue::None => Data::None,
        LiteralValue::Bool(b) => Data::Bool(*b),
        LiteralValue::Int(i) => Data::Int(*i),
        LiteralValue::Str(s) => Data::Str(s.clone()),
        LiteralValue::Bytes(b) => Data::Bytes(b.clone()),
        LiteralValue::Enum(e, m) => Data::Enum(EnumValue::new(e.as_str(), m.as_str())),
    }
}


pub(crate) fn opaque_decoder(source: impl Into<String>) -> DecodeExpr {
    Expr::decode(source, |v, _| Ok(opaque::decode(v)))
}

pub(crate) fn callback_error(err: recast_core::BoxError) -> ConvertError {
    ConvertError::new(ConvertErrorKind::Callback(err))
}

/// Runtime type check used to pick a union member when encoding.
pub(crate) fn accepts(shape: &Shape, data: &Data, rt: &Runtime<'_>) -> bool {
    match shape {
        Shape::Any | Shape::Lazy(_) | Shape::Custom(_) | Shape::External(_) => true,
        Shape::Scalar(ty) => scalar::matches(*ty, data),
        Shape::Optional(inner) => data.is_none() || accepts(inner, data, rt),
        Shape::Union(members) => members.iter().any(|m| accepts(m, data, rt)),
        Shape::Literal(values) => values.iter().any(|l| literal_data(l) == *data),
        Shape::Enum(decl) => matches!(data, Data::Enum(e) if e.enum_name == decl.name),
        Shape::Collection(..) => matches!(data, Data::List(_) | Data::Set(_) | Data::Tuple(_)),
        Shape::Mapping(..) | Shape::TypedDict(..) => matches!(data, Data::Map(_)),
        Shape::Tuple(elems) => match data {
            Data::Tuple(items) | Data::List(items) => {
                items.len() == elems.len() && elems.iter().zip(items).all(|(s, d)| accepts(s, d, rt))
            }
            _ => false,
        },
        Shape::VariadicTuple { .. } | Shape::NamedTuple(..) => {
            matches!(data, Data::Tuple(_) | Data::List(_))
        }
        Shape::Record { model, .. } => {
            matches!(data, Data::Record(r) if rt.engine.catalog.is_subtype(r.model(), model))
        }
        Shape::Alias(_, inner) | Shape::Annotated(inner, _) => accepts(inner, data, rt),
        Shape::TypeVar {
            bound, constraints, ..
        } => match bound {
            Some(b) => accepts(b, data, rt),
            None if !constraints.is_empty() => constraints.iter().any(|c| accepts(c, data, rt)),
            None => true,
        },
        Shape::Unpacked(_) => false,
    }
}
