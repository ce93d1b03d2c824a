//! Encoders: in-memory data to representation.

use std::sync::Arc;

use recast_core::{CollectionKind, Data, MappingKind, ScalarType};
use recast_value::{VObject, Value};

use super::{Codegen, accepts, annotation_strategy, callback_error, scalar};
use crate::error::{BuildError, ConvertError, ConvertErrorKind, PathSegment};
use crate::opaque;
use crate::overrides::Side;
use crate::procedure::{EncodeExpr, Expr, ProcedureKind, Runtime};
use crate::shape::Shape;
use crate::tracing_macros::trace;

impl Codegen<'_, '_> {
    /// Compiles the encoder for `shape`, honouring strategy overrides.
    pub(crate) fn pack(&mut self, shape: &Shape) -> Result<EncodeExpr, BuildError> {
        if let Some(strategy) = self.overrides.lookup(shape, Side::Serialize).cloned() {
            return self.pack_strategy(shape, &strategy);
        }
        self.pack_plain(shape)
    }

    /// Compiles the encoder for `shape` without consulting overrides.
    pub(crate) fn pack_plain(&mut self, shape: &Shape) -> Result<EncodeExpr, BuildError> {
        trace!("pack `{}` for {}.{}", shape, self.model, self.field);
        match shape {
            Shape::Annotated(inner, annotations) => match annotation_strategy(annotations) {
                Some(strategy) => {
                    let strategy = strategy.clone();
                    self.pack_strategy(inner, &strategy)
                }
                None => self.pack(inner),
            },
            Shape::Custom(custom) => {
                let custom = Arc::clone(custom);
                let source = format!("{}.serialize(v)", custom.name);
                Ok(Expr::encode(source, move |d, _| (custom.serialize)(d).map_err(callback_error)))
            }
            Shape::Record { model, args } => self.pack_record(model, args),
            Shape::Any => Ok(self.opaque_encoder("v")),
            Shape::Optional(inner) => {
                let inner = self.pack(inner)?;
                let source = format!("None if v is None else {}", inner.source);
                Ok(Expr::encode(source, move |d, rt| {
                    if d.is_none() {
                        Ok(Value::Null)
                    } else {
                        (inner.run)(d, rt)
                    }
                }))
            }
            Shape::Union(members) => self.pack_union(shape, members),
            Shape::TypeVar {
                bound, constraints, ..
            } => match bound {
                Some(bound) => self.pack(bound),
                None if !constraints.is_empty() => self.pack_union(shape, constraints),
                None => Ok(self.opaque_encoder("v")),
            },
            Shape::Literal(values) => {
                let table = self.literal_table(values)?;
                let name = shape.to_string();
                Ok(Expr::encode(format!("{name}(v)"), move |d, _| {
                    table
                        .iter()
                        .find(|(data, _)| data == d)
                        .map(|(_, value)| value.clone())
                        .ok_or_else(|| ConvertError::invalid(&name, format!("{d:?} is not allowed")))
                }))
            }
            Shape::Scalar(ty) => Ok(self.pack_scalar(*ty)),
            Shape::Collection(kind, elem) => {
                if self.passes_through(shape) {
                    return Ok(self.opaque_encoder("v"));
                }
                self.pack_collection(*kind, elem)
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
                    return Ok(self.opaque_encoder("v"));
                }
                self.pack_mapping(*kind, key, value)
            }
            Shape::Tuple(elems) => {
                if self.passes_through(shape) {
                    return Ok(self.opaque_encoder("v"));
                }
                let elems = self.pack_each(elems)?;
                let name = shape.to_string();
                let source = format!("({})", sources(&elems));
                Ok(Expr::encode(source, move |d, rt| {
                    let items = tuple_items(&name, d)?;
                    if items.len() != elems.len() {
                        return Err(ConvertError::invalid(
                            &name,
                            format!("expected {} items, got {}", elems.len(), items.len()),
                        ));
                    }
                    encode_items(elems.iter(), items, 0, rt).map(Value::Array)
                }))
            }
            Shape::VariadicTuple {
                prefix,
                middle,
                suffix,
            } => self.pack_variadic(shape, prefix, middle, suffix),
            Shape::NamedTuple(decl, shapes) => {
                let elems = self.pack_each(shapes)?;
                let names: Vec<String> = decl.fields.iter().map(|(n, _, _)| n.clone()).collect();
                let as_dict = self.settings.namedtuple_as_dict;
                let name = decl.name.clone();
                let source = if as_dict {
                    format!("{name}._asdict(v)")
                } else {
                    format!("{name}({})", sources(&elems))
                };
                Ok(Expr::encode(source, move |d, rt| {
                    let items = tuple_items(&name, d)?;
                    if items.len() != elems.len() {
                        return Err(ConvertError::invalid(
                            &name,
                            format!("expected {} items, got {}", elems.len(), items.len()),
                        ));
                    }
                    let values = encode_items(elems.iter(), items, 0, rt)?;
                    Ok(if as_dict {
                        Value::Object(names.iter().cloned().zip(values).collect())
                    } else {
                        Value::Array(values)
                    })
                }))
            }
            Shape::TypedDict(decl, shapes) => {
                let elems = self.pack_each(shapes)?;
                let decl = Arc::clone(decl);
                let source = format!("{}({})", decl.name, sources(&elems));
                Ok(Expr::encode(source, move |d, rt| {
                    let Data::Map(entries) = d else {
                        return Err(ConvertError::mismatch_data(&decl.name, d));
                    };
                    let mut obj = VObject::with_capacity(entries.len());
                    for ((key, _, required), elem) in decl.keys.iter().zip(&elems) {
                        let found = entries.iter().find(|(k, _)| k.as_str() == Some(key.as_str()));
                        match found {
                            Some((_, v)) => {
                                let value = (elem.run)(v, rt).map_err(|e| e.with_path(PathSegment::Key(key.clone())))?;
                                obj.insert(key.as_str(), value);
                            }
                            None if *required => return Err(ConvertError::missing(&decl.name, key)),
                            None => {}
                        }
                    }
                    Ok(Value::Object(obj))
                }))
            }
            Shape::Enum(decl) => {
                let decl = Arc::clone(decl);
                Ok(Expr::encode(format!("{}(v).value", decl.name), move |d, _| match d {
                    Data::Enum(member) if member.enum_name == decl.name => decl
                        .value_of(&member.member)
                        .cloned()
                        .ok_or_else(|| ConvertError::invalid(&decl.name, format!("no member `{}`", member.member))),
                    _ => Err(ConvertError::mismatch_data(&decl.name, d)),
                }))
            }
            Shape::Alias(name, inner) => {
                let slot = self.alias_encoder_slot(name);
                let body = self.pack(inner)?;
                let _ = slot.set(Arc::clone(&body.run));
                let source = format!("{name}[{}]", body.source);
                Ok(Expr::encode(source, move |d, rt| match slot.get() {
                    Some(f) => f(d, rt),
                    None => Err(ConvertError::invalid("alias", "alias used before it was compiled")),
                }))
            }
            Shape::Lazy(name) => {
                let slot = self
                    .alias_encoders
                    .get(name)
                    .cloned()
                    .ok_or_else(|| self.unsupported(shape))?;
                let name = name.clone();
                Ok(Expr::encode(format!("{name}(v)"), move |d, rt| {
                    let f = slot
                        .upgrade()
                        .and_then(|s| s.get().cloned())
                        .ok_or_else(|| ConvertError::invalid(&name, "recursive alias used outside its definition"))?;
                    f(d, rt)
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
                let source = format!("{}.serialize({name}, v)", handler.name());
                Ok(Expr::encode(source, move |d, _| handler.encode(&name, d).map_err(callback_error)))
            }
            Shape::Unpacked(_) => Err(self.unsupported(shape)),
        }
    }

    fn pack_each(&mut self, shapes: &[Shape]) -> Result<Vec<EncodeExpr>, BuildError> {
        shapes.iter().map(|s| self.pack(s)).collect()
    }

    fn pack_scalar(&self, ty: ScalarType) -> EncodeExpr {
        let native_bytes = self.settings.native_bytes;
        let source = match ty {
            ScalarType::Bytes if !native_bytes => "b64encode(v)".to_owned(),
            _ => format!("{}(v)", ty.name()),
        };
        Expr::encode(source, move |d, _| scalar::encode(ty, d, native_bytes))
    }

    fn pack_record(&mut self, model: &str, args: &[Shape]) -> Result<EncodeExpr, BuildError> {
        let target = self
            .synth
            .proc_ref(model, args, self.dialect.as_ref(), ProcedureKind::Encode)?;
        let dialect = self.dialect.clone();
        let source = format!("{model}.encode(v)");
        let model = model.to_owned();
        let args = args.to_vec();
        Ok(Expr::encode(source, move |d, rt| {
            let Data::Record(record) = d else {
                return Err(ConvertError::mismatch_data(&model, d));
            };
            if record.model() == model {
                return target.get(rt)?.run_encode(d, rt);
            }
            if rt.engine.catalog.is_subtype(record.model(), &model) {
                let sub_args = rt.engine.catalog.subtype_args(record.model(), &model, &args);
                let procedure = rt
                    .engine
                    .procedure(record.model(), &sub_args, dialect.as_ref(), ProcedureKind::Encode)?;
                return procedure.run_encode(d, rt);
            }
            Err(ConvertError::new(ConvertErrorKind::TypeMismatch {
                expected: model.clone(),
                got: record.model().to_owned(),
            }))
        }))
    }

    fn pack_union(&mut self, shape: &Shape, members: &[Shape]) -> Result<EncodeExpr, BuildError> {
        let branches = members
            .iter()
            .map(|m| Ok((m.clone(), self.pack(m)?)))
            .collect::<Result<Vec<_>, BuildError>>()?;
        let name = shape.to_string();
        let source = format!(
            "first_of({})",
            branches.iter().map(|(_, e)| e.source.as_str()).collect::<Vec<_>>().join(", ")
        );
        Ok(Expr::encode(source, move |d, rt| {
            let mut attempts = Vec::new();
            for (member, branch) in &branches {
                if !accepts(member, d, rt) {
                    continue;
                }
                match (branch.run)(d, rt) {
                    Ok(v) => return Ok(v),
                    Err(err) => attempts.push(err),
                }
            }
            if attempts.is_empty() {
                return Err(ConvertError::mismatch_data(&name, d));
            }
            Err(ConvertError::new(ConvertErrorKind::UnionExhausted {
                shape: name.clone(),
                attempts,
            }))
        }))
    }

    fn pack_collection(&mut self, kind: CollectionKind, elem: &Shape) -> Result<EncodeExpr, BuildError> {
        let elem = self.pack(elem)?;
        let source = format!("[{} for v in v]", elem.source);
        Ok(Expr::encode(source, move |d, rt| {
            let items = match d {
                Data::List(items) | Data::Set(items) | Data::Tuple(items) => items,
                _ => return Err(ConvertError::mismatch_data(kind.name(), d)),
            };
            encode_items(core::iter::repeat(&elem), items, 0, rt).map(Value::Array)
        }))
    }

    fn pack_mapping(&mut self, kind: MappingKind, key: &Shape, value: &Shape) -> Result<EncodeExpr, BuildError> {
        let key = self.pack(key)?;
        let value = self.pack(value)?;
        let source = format!("{{{}: {} for k, v in v.items()}}", key.source, value.source);
        Ok(Expr::encode(source, move |d, rt| {
            let Data::Map(entries) = d else {
                return Err(ConvertError::mismatch_data(kind.name(), d));
            };
            let mut obj = VObject::with_capacity(entries.len());
            for (k, v) in entries {
                let at_key = |e: ConvertError| e.with_path(PathSegment::Key(opaque::key_label(k)));
                let name = opaque::key_string(&(key.run)(k, rt).map_err(at_key)?).map_err(at_key)?;
                let v = (value.run)(v, rt).map_err(|e| e.with_path(PathSegment::Key(name.clone())))?;
                obj.insert(name, v);
            }
            Ok(Value::Object(obj))
        }))
    }

    fn pack_variadic(
        &mut self,
        shape: &Shape,
        prefix: &[Shape],
        middle: &Shape,
        suffix: &[Shape],
    ) -> Result<EncodeExpr, BuildError> {
        let prefix = self.pack_each(prefix)?;
        let middle = self.pack(middle)?;
        let suffix = self.pack_each(suffix)?;
        let name = shape.to_string();
        let source = format!("({}, *[{}], {})", sources(&prefix), middle.source, sources(&suffix));
        Ok(Expr::encode(source, move |d, rt| {
            let items = tuple_items(&name, d)?;
            let fixed = prefix.len() + suffix.len();
            if items.len() < fixed {
                return Err(ConvertError::invalid(
                    &name,
                    format!("expected at least {fixed} items, got {}", items.len()),
                ));
            }
            let tail = items.len() - suffix.len();
            let mut out = encode_items(prefix.iter(), &items[..prefix.len()], 0, rt)?;
            out.extend(encode_items(
                core::iter::repeat(&middle),
                &items[prefix.len()..tail],
                prefix.len(),
                rt,
            )?);
            out.extend(encode_items(suffix.iter(), &items[tail..], tail, rt)?);
            Ok(Value::Array(out))
        }))
    }
}

fn sources(exprs: &[EncodeExpr]) -> String {
    exprs.iter().map(|e| e.source.as_str()).collect::<Vec<_>>().join(", ")
}

fn tuple_items<'d>(name: &str, d: &'d Data) -> Result<&'d [Data], ConvertError> {
    match d {
        Data::Tuple(items) | Data::List(items) => Ok(items),
        _ => Err(ConvertError::mismatch_data(name, d)),
    }
}

fn encode_items<'x>(
    exprs: impl Iterator<Item = &'x EncodeExpr>,
    items: &[Data],
    offset: usize,
    rt: &Runtime<'_>,
) -> Result<Vec<Value>, ConvertError> {
    exprs
        .zip(items)
        .enumerate()
        .map(|(i, (expr, item))| (expr.run)(item, rt).map_err(|e| e.with_path(PathSegment::Index(offset + i))))
        .collect()
}
