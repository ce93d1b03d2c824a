//! Decoders: representation to in-memory data.

use std::sync::Arc;

use recast_core::{CollectionKind, Data, EnumValue, MappingKind};
use recast_value::Value;

use super::{
    Codegen, annotation_discriminator, annotation_strategy, callback_error, opaque_decoder,
    scalar,
};
use crate::discriminator;
use crate::error::{BuildError, ConvertError, ConvertErrorKind, PathSegment};
use crate::overrides::Side;
use crate::procedure::{DecodeExpr, Expr, ProcedureKind, Runtime};
use crate::shape::Shape;
use crate::tracing_macros::trace;

impl Codegen<'_, '_> {
    /// Compiles the decoder for `shape`, honouring strategy overrides.
    pub(crate) fn unpack(&mut self, shape: &Shape) -> Result<DecodeExpr, BuildError> {
        if let Some(strategy) = self.overrides.lookup(shape, Side::Deserialize).cloned() {
            return self.unpack_strategy(shape, &strategy);
        }
        self.unpack_plain(shape)
    }

    /// Compiles the decoder for `shape` without consulting overrides.
    pub(crate) fn unpack_plain(&mut self, shape: &Shape) -> Result<DecodeExpr, BuildError> {
        trace!("unpack `{}` for {}.{}", shape, self.model, self.field);
        match shape {
            Shape::Annotated(inner, annotations) => {
                if let Some(strategy) = annotation_strategy(annotations) {
                    let strategy = strategy.clone();
                    return self.unpack_strategy(inner, &strategy);
                }
                if let Some(disc) = annotation_discriminator(annotations) {
                    let disc = disc.clone();
                    return discriminator::annotated_decoder(self, inner, &disc);
                }
                self.unpack(inner)
            }
            Shape::Custom(custom) => {
                let custom = Arc::clone(custom);
                let source = format!("{}.deserialize(v)", custom.name);
                Ok(Expr::decode(source, move |v, _| (custom.deserialize)(v).map_err(callback_error)))
            }
            Shape::Record { model, args } => self.unpack_record(model, args),
            Shape::Any => Ok(opaque_decoder("v")),
            Shape::Optional(inner) => {
                let inner = self.unpack(inner)?;
                let source = format!("None if v is None else {}", inner.source);
                Ok(Expr::decode(source, move |v, rt| {
                    if v.is_null() {
                        Ok(Data::None)
                    } else {
                        (inner.run)(v, rt)
                    }
                }))
            }
            Shape::Union(members) => self.unpack_union(shape, members),
            Shape::TypeVar {
                bound, constraints, ..
            } => match bound {
                Some(bound) => self.unpack(bound),
                None if !constraints.is_empty() => self.unpack_union(shape, constraints),
                None => Ok(opaque_decoder("v")),
            },
            Shape::Literal(values) => {
                let table = self.literal_table(values)?;
                let name = shape.to_string();
                Ok(Expr::decode(format!("{name}(v)"), move |v, _| {
                    table
                        .iter()
                        .find(|(_, value)| value == v)
                        .map(|(data, _)| data.clone())
                        .ok_or_else(|| ConvertError::invalid(&name, format!("{v} is not allowed")))
                }))
            }
            Shape::Scalar(ty) => {
                let ty = *ty;
                Ok(Expr::decode(format!("{}(v)", ty.name()), move |v, _| scalar::decode(ty, v)))
            }
            Shape::Collection(kind, elem) => {
                if self.passes_through(shape) {
                    return Ok(collection_decoder(*kind, opaque_decoder("v")));
                }
                let elem = self.unpack(elem)?;
                Ok(collection_decoder(*kind, elem))
            }
            Shape::Mapping(kind, key, value) => {
                if matches!(key.unannotated(), Shape::Record { .. }) {
                    return Err(BuildError::RecordKeyInMapping {
                        model: self.model.clone(),
                        field: self.field.clone(),
                        shape: shape.to_string(),
                    });
                }
                if self.passes_through(shape) {
                    return Ok(opaque_decoder("v"));
                }
                self.unpack_mapping(*kind, key, value)
            }
            Shape::Tuple(elems) => {
                let elems = if self.passes_through(shape) {
                    elems.iter().map(|_| opaque_decoder("v")).collect()
                } else {
                    self.unpack_each(elems)?
                };
                let name = shape.to_string();
                let source = format!("({})", sources(&elems));
                Ok(Expr::decode(source, move |v, rt| {
                    let items = array_items(&name, v)?;
                    if items.len() != elems.len() {
                        return Err(ConvertError::invalid(
                            &name,
                            format!("expected {} items, got {}", elems.len(), items.len()),
                        ));
                    }
                    decode_items(elems.iter(), items, 0, rt).map(Data::Tuple)
                }))
            }
            Shape::VariadicTuple {
                prefix,
                middle,
                suffix,
            } => self.unpack_variadic(shape, prefix, middle, suffix),
            Shape::NamedTuple(decl, shapes) => {
                let elems = self.unpack_each(shapes)?;
                let decl = Arc::clone(decl);
                let source = format!("{}({})", decl.name, sources(&elems));
                Ok(Expr::decode(source, move |v, rt| {
                    let mut out = Vec::with_capacity(elems.len());
                    for (i, ((name, _, default), elem)) in decl.fields.iter().zip(&elems).enumerate() {
                        let raw = match v {
                            Value::Array(items) => items.get(i),
                            Value::Object(obj) => obj.get(name),
                            _ => return Err(ConvertError::mismatch(&decl.name, v)),
                        };
                        match (raw, default) {
                            (Some(raw), _) => out.push(
                                (elem.run)(raw, rt).map_err(|e| e.with_path(PathSegment::Field(name.clone())))?,
                            ),
                            (None, Some(default)) => out.push(default.clone()),
                            (None, None) => return Err(ConvertError::missing(&decl.name, name)),
                        }
                    }
                    Ok(Data::Tuple(out))
                }))
            }
            Shape::TypedDict(decl, shapes) => {
                let elems = self.unpack_each(shapes)?;
                let decl = Arc::clone(decl);
                let source = format!("{}({})", decl.name, sources(&elems));
                Ok(Expr::decode(source, move |v, rt| {
                    let Value::Object(obj) = v else {
                        return Err(ConvertError::mismatch(&decl.name, v));
                    };
                    let mut out = Vec::with_capacity(decl.keys.len());
                    for ((key, _, required), elem) in decl.keys.iter().zip(&elems) {
                        match obj.get(key) {
                            Some(raw) => {
                                let data = (elem.run)(raw, rt).map_err(|e| e.with_path(PathSegment::Key(key.clone())))?;
                                out.push((Data::Str(key.clone()), data));
                            }
                            None if *required => return Err(ConvertError::missing(&decl.name, key)),
                            None => {}
                        }
                    }
                    Ok(Data::Map(out))
                }))
            }
            Shape::Enum(decl) => {
                let decl = Arc::clone(decl);
                Ok(Expr::decode(format!("{}(v)", decl.name), move |v, _| {
                    decl.member_for(v)
                        .map(|member| Data::Enum(EnumValue::new(decl.name.as_str(), member)))
                        .ok_or_else(|| ConvertError::invalid(&decl.name, format!("{v} is not a member")))
                }))
            }
            Shape::Alias(name, inner) => {
                let slot = self.alias_decoder_slot(name);
                let body = self.unpack(inner)?;
                let _ = slot.set(Arc::clone(&body.run));
                let source = format!("{name}[{}]", body.source);
                Ok(Expr::decode(source, move |v, rt| match slot.get() {
                    Some(f) => f(v, rt),
                    None => Err(ConvertError::invalid("alias", "alias used before it was compiled")),
                }))
            }
            Shape::Lazy(name) => {
                let slot = self
                    .alias_decoders
                    .get(name)
                    .cloned()
                    .ok_or_else(|| self.unsupported(shape))?;
                let name = name.clone();
                Ok(Expr::decode(format!("{name}(v)"), move |v, rt| {
                    let f = slot
                        .upgrade()
                        .and_then(|s| s.get().cloned())
                        .ok_or_else(|| ConvertError::invalid(&name, "recursive alias used outside its definition"))?;
                    f(v, rt)
                }))
            }
            Shape::External(name) => {
                let handler = self
                    .synth
                    .engine
                    .catalog
                    .extension_for(name)
                    .ok_or_else(|| self.unsupported(shape))?;
                let name = name.clone();
                let source = format!("{}.deserialize({name}, v)", handler.name());
                Ok(Expr::decode(source, move |v, _| handler.decode(&name, v).map_err(callback_error)))
            }
            Shape::Unpacked(_) => Err(self.unsupported(shape)),
        }
    }

    fn unpack_each(&mut self, shapes: &[Shape]) -> Result<Vec<DecodeExpr>, BuildError> {
        shapes.iter().map(|s| self.unpack(s)).collect()
    }

    fn unpack_record(&mut self, model: &str, args: &[Shape]) -> Result<DecodeExpr, BuildError> {
        let kind = if self.synth.engine.catalog.model(model)?.config.discriminator.is_some() {
            ProcedureKind::Dispatch
        } else {
            ProcedureKind::Decode
        };
        let target = self.synth.proc_ref(model, args, self.dialect.as_ref(), kind)?;
        let source = format!("{model}.{kind}(v)");
        Ok(Expr::decode(source, move |v, rt| target.get(rt)?.run_decode(v, rt)))
    }

    fn unpack_union(&mut self, shape: &Shape, members: &[Shape]) -> Result<DecodeExpr, BuildError> {
        let branches = self.unpack_each(members)?;
        let name = shape.to_string();
        let source = format!("first_of({})", sources(&branches));
        Ok(Expr::decode(source, move |v, rt| {
            let mut attempts = Vec::with_capacity(branches.len());
            for branch in &branches {
                match (branch.run)(v, rt) {
                    Ok(data) => return Ok(data),
                    Err(err) => attempts.push(err),
                }
            }
            Err(ConvertError::new(ConvertErrorKind::UnionExhausted {
                shape: name.clone(),
                attempts,
            }))
        }))
    }

    fn unpack_mapping(&mut self, kind: MappingKind, key: &Shape, value: &Shape) -> Result<DecodeExpr, BuildError> {
        // `None` keys are written as "null"
        let nullable = matches!(key.unannotated(), Shape::Optional(_));
        let key = self.unpack(key)?;
        let value = self.unpack(value)?;
        let source = format!("{}({{{}: {} for k, v in v.items()}})", kind.name(), key.source, value.source);
        Ok(Expr::decode(source, move |v, rt| {
            let Value::Object(obj) = v else {
                return Err(ConvertError::mismatch(kind.name(), v));
            };
            let mut out = Vec::with_capacity(obj.len());
            for (k, raw) in obj.iter() {
                let with_key = |e: ConvertError| e.with_path(PathSegment::Key(k.to_owned()));
                let raw_key = if nullable && k == "null" {
                    Value::Null
                } else {
                    Value::String(k.to_owned())
                };
                let k_data = (key.run)(&raw_key, rt).map_err(with_key)?;
                let v_data = (value.run)(raw, rt).map_err(with_key)?;
                out.push((k_data, v_data));
            }
            Ok(Data::Map(out))
        }))
    }

    fn unpack_variadic(
        &mut self,
        shape: &Shape,
        prefix: &[Shape],
        middle: &Shape,
        suffix: &[Shape],
    ) -> Result<DecodeExpr, BuildError> {
        let prefix = self.unpack_each(prefix)?;
        let middle = self.unpack(middle)?;
        let suffix = self.unpack_each(suffix)?;
        let name = shape.to_string();
        let source = format!("({}, *[{}], {})", sources(&prefix), middle.source, sources(&suffix));
        Ok(Expr::decode(source, move |v, rt| {
            let items = array_items(&name, v)?;
            let fixed = prefix.len() + suffix.len();
            if items.len() < fixed {
                return Err(ConvertError::invalid(
                    &name,
                    format!("expected at least {fixed} items, got {}", items.len()),
                ));
            }
            let tail = items.len() - suffix.len();
            let mut out = decode_items(prefix.iter(), &items[..prefix.len()], 0, rt)?;
            out.extend(decode_items(
                core::iter::repeat(&middle),
                &items[prefix.len()..tail],
                prefix.len(),
                rt,
            )?);
            out.extend(decode_items(suffix.iter(), &items[tail..], tail, rt)?);
            Ok(Data::Tuple(out))
        }))
    }
}

fn collection_decoder(kind: CollectionKind, elem: DecodeExpr) -> DecodeExpr {
    let source = format!("{}({} for v in v)", kind.name(), elem.source);
    Expr::decode(source, move |v, rt| {
        let items = array_items(kind.name(), v)?;
        let out = decode_items(core::iter::repeat(&elem), items, 0, rt)?;
        Ok(match kind {
            CollectionKind::VarTuple => Data::Tuple(out),
            _ if kind.is_set() => {
                let mut unique: Vec<Data> = Vec::with_capacity(out.len());
                for item in out {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Data::Set(unique)
            }
            _ => Data::List(out),
        })
    })
}

fn sources(exprs: &[DecodeExpr]) -> String {
    exprs.iter().map(|e| e.source.as_str()).collect::<Vec<_>>().join(", ")
}

fn array_items<'v>(name: &str, v: &'v Value) -> Result<&'v [Value], ConvertError> {
    match v {
        Value::Array(items) => Ok(items),
        _ => Err(ConvertError::mismatch(name, v)),
    }
}

fn decode_items<'x>(
    exprs: impl Iterator<Item = &'x DecodeExpr>,
    items: &[Value],
    offset: usize,
    rt: &Runtime<'_>,
) -> Result<Vec<Data>, ConvertError> {
    exprs
        .zip(items)
        .enumerate()
        .map(|(i, (expr, item))| (expr.run)(item, rt).map_err(|e| e.with_path(PathSegment::Index(offset + i))))
        .collect()
}
