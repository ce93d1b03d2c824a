//! Discriminator Resolver: picks one concrete model while decoding.

use recast_core::{Data, Dialect, Discriminator};
use recast_value::Value;

use crate::cache::ProcRef;
use crate::catalog::{Catalog, Entry};
use crate::error::{BuildError, ConvertError, ConvertErrorKind};
use crate::procedure::{DecodeExpr, Expr, ProcedureKind, Runtime};
use crate::registry::{Codegen, literal_data, scalar};
use crate::shape::Shape;
use crate::synth::Synthesizer;
use crate::tracing_macros::{debug, trace};

/// A model the discriminator may select, with the tags it answers to.
pub(crate) struct Candidate {
    model: String,
    decoder: ProcRef,
    tags: Vec<Value>,
}

/// Candidates for a model that declares `disc` in its own configuration.
///
/// Subtypes come first (depth-first, declaration order), then the model
/// itself and its ancestors up to the root. Abstract models never qualify.
pub(crate) fn model_candidates(
    synth: &mut Synthesizer<'_>,
    model: &str,
    args: &[Shape],
    disc: &Discriminator,
    dialect: Option<&Dialect>,
) -> Result<Vec<Candidate>, BuildError> {
    if !disc.include_subtypes && !disc.include_supertypes {
        return Err(BuildError::InvalidDiscriminator {
            target: model.to_owned(),
            reason: "a model discriminator needs subtypes or supertypes enabled".to_owned(),
        });
    }
    let catalog = &synth.engine.catalog;
    let mut names = Vec::new();
    if disc.include_subtypes {
        names.extend(catalog.subtype_closure(model));
    }
    if disc.include_supertypes {
        names.extend(catalog.ancestry(model)?.iter().map(|m| m.name.clone()));
    }
    let names = names
        .into_iter()
        .map(|name| {
            let args = catalog.subtype_args(&name, model, args);
            (name, args)
        })
        .collect::<Vec<_>>();
    collect(synth, model, names, disc, dialect)
}

/// Decoder for a field annotated with a discriminator: a union of models, a
/// single model (with its subtypes or supertypes), or an optional of either.
pub(crate) fn annotated_decoder(
    codegen: &mut Codegen<'_, '_>,
    inner: &Shape,
    disc: &Discriminator,
) -> Result<DecodeExpr, BuildError> {
    let target = inner.to_string();
    let (members, optional) = match inner.unannotated() {
        Shape::Optional(member) => (flatten(member), true),
        other => (flatten(other), false),
    };
    let mut names = Vec::new();
    for member in members {
        let Shape::Record { model, args } = member.unannotated() else {
            return Err(BuildError::InvalidDiscriminator {
                target,
                reason: format!("`{member}` is not a model"),
            });
        };
        names.push((model.clone(), args.clone()));
        if disc.include_subtypes {
            let catalog = &codegen.synth.engine.catalog;
            names.extend(catalog.subtype_closure(model).into_iter().map(|n| {
                let args = catalog.subtype_args(&n, model, args);
                (n, args)
            }));
        }
        if disc.include_supertypes {
            let catalog = &codegen.synth.engine.catalog;
            names.extend(
                catalog
                    .ancestry(model)?
                    .iter()
                    .skip(1)
                    .map(|m| (m.name.clone(), Vec::new())),
            );
        }
    }
    let dialect = codegen.dialect.clone();
    let candidates = collect(codegen.synth, &target, names, disc, dialect.as_ref())?;
    let expr = dispatch(disc, &target, candidates);
    if !optional {
        return Ok(expr);
    }
    let source = format!("None if v is None else {}", expr.source);
    Ok(Expr::decode(source, move |v, rt| {
        if v.is_null() {
            Ok(Data::None)
        } else {
            (expr.run)(v, rt)
        }
    }))
}

fn flatten(shape: &Shape) -> Vec<&Shape> {
    match shape.unannotated() {
        Shape::Union(members) => members.iter().collect(),
        _ => vec![shape],
    }
}

fn collect(
    synth: &mut Synthesizer<'_>,
    target: &str,
    names: Vec<(String, Vec<Shape>)>,
    disc: &Discriminator,
    dialect: Option<&Dialect>,
) -> Result<Vec<Candidate>, BuildError> {
    let mut out: Vec<Candidate> = Vec::new();
    for (name, args) in names {
        if out.iter().any(|c| c.model == name) {
            continue;
        }
        let model = synth.engine.catalog.model(&name)?;
        if model.is_abstract {
            trace!("skipping abstract candidate `{}` for `{}`", name, target);
            continue;
        }
        let tags = match &disc.field {
            Some(field) => tags_for(synth, &name, &args, field, disc)?,
            None => Vec::new(),
        };
        let decoder = synth.proc_ref(&name, &args, dialect, ProcedureKind::Decode)?;
        out.push(Candidate {
            model: name,
            decoder,
            tags,
        });
    }
    if out.is_empty() {
        return Err(BuildError::InvalidDiscriminator {
            target: target.to_owned(),
            reason: "no concrete candidates".to_owned(),
        });
    }
    Ok(out)
}

/// Tag values a candidate answers to: the tagger's output, the tag field's
/// default, or the values of a literal-typed tag field.
fn tags_for(
    synth: &mut Synthesizer<'_>,
    model: &str,
    args: &[Shape],
    field: &str,
    disc: &Discriminator,
) -> Result<Vec<Value>, BuildError> {
    if let Some(tagger) = &disc.variant_tagger_fn {
        return Ok(tagger(model).into_iter().map(Value::String).collect());
    }
    let layout = synth.layout(model, args)?;
    let Some(resolved) = layout.field(field) else {
        return Ok(Vec::new());
    };
    let catalog = &synth.engine.catalog;
    if let Some(default) = &resolved.field.default {
        return Ok(tag_value(&default.get(), catalog).into_iter().collect());
    }
    match resolved.shape.unannotated() {
        Shape::Literal(values) => Ok(values
            .iter()
            .filter_map(|l| tag_value(&literal_data(l), catalog))
            .collect()),
        _ => Ok(Vec::new()),
    }
}

fn tag_value(data: &Data, catalog: &Catalog) -> Option<Value> {
    match data {
        Data::Enum(member) => match catalog.get(&member.enum_name) {
            Some(Entry::Enum(decl)) => decl.value_of(&member.member).cloned(),
            _ => None,
        },
        other => scalar::to_value(other),
    }
}

/// Builds the selecting decoder over `candidates`.
pub(crate) fn dispatch(disc: &Discriminator, target: &str, candidates: Vec<Candidate>) -> DecodeExpr {
    let names = candidates.iter().map(|c| c.model.as_str()).collect::<Vec<_>>().join(", ");
    let field = disc.field.clone();
    let unique = disc.require_unique;
    let target = target.to_owned();
    let source = match &field {
        Some(f) => format!("by_tag({f:?}, {names})"),
        None => format!("first_success({names})"),
    };
    Expr::decode(source, move |v, rt| match &field {
        Some(field) => by_tag(&target, field, &candidates, unique, v, rt),
        None => by_trial(&target, candidates.iter(), unique, v, rt),
    })
}

fn by_tag(
    target: &str,
    field: &str,
    candidates: &[Candidate],
    unique: bool,
    v: &Value,
    rt: &Runtime<'_>,
) -> Result<Data, ConvertError> {
    let Value::Object(obj) = v else {
        return Err(ConvertError::mismatch(target, v));
    };
    let fail = |value: Value, source: ConvertError| {
        ConvertError::new(ConvertErrorKind::InvalidFieldValue {
            model: target.to_owned(),
            field: field.to_owned(),
            shape: target.to_owned(),
            value,
            source: Box::new(source),
        })
    };
    let Some(tag) = obj.get(field) else {
        return Err(fail(Value::Null, ConvertError::missing(target, field)));
    };
    let mut matched = candidates.iter().filter(|c| c.tags.contains(tag)).peekable();
    let Some(first) = matched.next() else {
        return Err(fail(
            tag.clone(),
            ConvertError::invalid(target, format!("unknown tag {tag}")),
        ));
    };
    if matched.peek().is_none() {
        debug!("tag {} selects `{}`", tag, first.model);
        return first.decoder.get(rt)?.run_decode(v, rt);
    }
    let sharing = core::iter::once(first).chain(matched);
    by_trial(target, sharing, unique, v, rt)
}

fn by_trial<'c>(
    target: &str,
    candidates: impl Iterator<Item = &'c Candidate>,
    unique: bool,
    v: &Value,
    rt: &Runtime<'_>,
) -> Result<Data, ConvertError> {
    let mut attempts = Vec::new();
    let mut winners: Vec<&str> = Vec::new();
    let mut found = None;
    for candidate in candidates {
        match candidate.decoder.get(rt)?.run_decode(v, rt) {
            Ok(data) => {
                trace!("candidate `{}` accepted input for `{}`", candidate.model, target);
                if !unique {
                    return Ok(data);
                }
                winners.push(&candidate.model);
                found.get_or_insert(data);
            }
            Err(err) => attempts.push(err),
        }
    }
    match found {
        Some(data) if winners.len() == 1 => Ok(data),
        Some(_) => Err(ConvertError::new(ConvertErrorKind::Ambiguous {
            shape: target.to_owned(),
            candidates: winners.into_iter().map(str::to_owned).collect(),
        })),
        None => Err(ConvertError::new(ConvertErrorKind::UnionExhausted {
            shape: target.to_owned(),
            attempts,
        })),
    }
}
