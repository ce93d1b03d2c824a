//! Type Shape Resolver: declared types to shapes.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use recast_core::{
    CollectionKind, Discriminator, Field, Hooks, MappingKind, Model, ModelConfig, ScalarType,
    TypeExpr,
};

use crate::catalog::{Catalog, Entry};
use crate::error::BuildError;
use crate::shape::Shape;
use crate::tracing_macros::trace;

/// What a generic parameter is bound to.
#[derive(Clone, Debug)]
enum Binding {
    One(Shape),
    /// A parameter pack; items may be [`Shape::Unpacked`].
    Pack(Vec<Shape>),
}

type Subst = HashMap<String, Binding>;

/// A field with its resolved shape.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedField {
    pub(crate) field: Field,
    pub(crate) shape: Shape,
}

/// A model's fields, configuration and hooks for one set of type arguments,
/// with inheritance applied.
#[derive(Clone, Debug)]
pub(crate) struct Layout {
    pub(crate) model: Arc<Model>,
    pub(crate) fields: Vec<ResolvedField>,
    pub(crate) config: ModelConfig,
    pub(crate) hooks: Hooks,
    pub(crate) discriminator: Option<Discriminator>,
}

impl Layout {
    pub(crate) fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.field.name == name)
    }
}

struct Scope<'s> {
    owner: Option<&'s Model>,
    subst: &'s Subst,
    self_shape: Option<&'s Shape>,
}

impl Scope<'_> {
    fn empty() -> Scope<'static> {
        static EMPTY: std::sync::LazyLock<Subst> = std::sync::LazyLock::new(HashMap::new);
        Scope {
            owner: None,
            subst: &EMPTY,
            self_shape: None,
        }
    }
}

/// Resolves declared types against a catalog.
pub(crate) struct Resolver<'c> {
    catalog: &'c Catalog,
    /// Aliases currently being expanded.
    alias_stack: Vec<String>,
    /// `(model, field)` reported in errors.
    site: (String, String),
}

impl<'c> Resolver<'c> {
    pub(crate) fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            alias_stack: Vec::new(),
            site: (String::new(), String::new()),
        }
    }

    /// Resolves a type outside of any model, such as a type argument passed
    /// by a caller or a strategy key.
    pub(crate) fn resolve_free(&mut self, ty: &TypeExpr, site: &str) -> Result<Shape, BuildError> {
        self.site = (site.to_owned(), String::new());
        self.resolve(ty, &Scope::empty())
    }

    /// Resolves a list of type arguments outside of any model.
    pub(crate) fn resolve_args(&mut self, args: &[TypeExpr], site: &str) -> Result<Vec<Shape>, BuildError> {
        self.site = (site.to_owned(), String::new());
        self.resolve_items(args, &Scope::empty())
    }

    /// Lays out `name` applied to `args`.
    pub(crate) fn layout(&mut self, name: &str, args: &[Shape]) -> Result<Layout, BuildError> {
        let chain = self.catalog.ancestry(name)?;
        let target = Arc::clone(&chain[0]);
        let self_shape = Shape::Record {
            model: name.to_owned(),
            args: args.to_vec(),
        };

        // a model without parameters that names no base arguments hands its
        // own arguments to the base
        let implicit = |m: &Model| m.type_params.is_empty() && m.base.as_ref().is_some_and(|b| b.args.is_empty());
        let mut incoming = args.to_vec();
        let mut substs = vec![if implicit(&target) {
            Subst::new()
        } else {
            bind_params(&target, incoming.clone())?
        }];
        for pair in chain.windows(2) {
            let (child, parent) = (&pair[0], &pair[1]);
            let items = if implicit(child) {
                incoming
            } else {
                let base_args = child.base.as_ref().map(|b| b.args.as_slice()).unwrap_or(&[]);
                self.site = (child.name.clone(), String::new());
                let subst = &substs[substs.len() - 1];
                self.resolve_items(
                    base_args,
                    &Scope {
                        owner: Some(child),
                        subst,
                        self_shape: Some(&self_shape),
                    },
                )?
            };
            substs.push(bind_params(parent, items.clone())?);
            incoming = items;
        }

        let mut fields: IndexMap<String, ResolvedField> = IndexMap::new();
        for (model, subst) in chain.iter().zip(&substs).rev() {
            let scope = Scope {
                owner: Some(model),
                subst,
                self_shape: Some(&self_shape),
            };
            for field in &model.fields {
                self.site = (model.name.clone(), field.name.clone());
                let shape = self.resolve(&field.ty, &scope)?;
                // a redeclared field keeps its original position
                fields.insert(
                    field.name.clone(),
                    ResolvedField {
                        field: field.clone(),
                        shape,
                    },
                );
            }
        }

        let mut config = target.config.clone();
        let mut hooks = target.hooks.clone();
        for ancestor in &chain[1..] {
            config.inherit(&ancestor.config);
            hooks.inherit(&ancestor.hooks);
        }

        trace!(
            "laid out `{}` with {} field(s) over {} ancestor(s)",
            self_shape,
            fields.len(),
            chain.len() - 1
        );
        Ok(Layout {
            discriminator: target.config.discriminator.clone(),
            model: target,
            fields: fields.into_values().collect(),
            config,
            hooks,
        })
    }

    fn resolve(&mut self, ty: &TypeExpr, scope: &Scope<'_>) -> Result<Shape, BuildError> {
        Ok(match ty {
            TypeExpr::Any => Shape::Any,
            TypeExpr::Scalar(s) => Shape::Scalar(*s),
            TypeExpr::Optional(inner) => {
                let inner = self.resolve(inner, scope)?;
                normalize_union(vec![inner, Shape::Scalar(ScalarType::NoneType)])
            }
            TypeExpr::Union(members) => {
                let members = members
                    .iter()
                    .map(|m| self.resolve(m, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                normalize_union(members)
            }
            TypeExpr::Literal(values) => Shape::Literal(values.clone()),
            TypeExpr::Collection(kind, elem) => {
                Shape::Collection(*kind, Box::new(self.resolve(elem, scope)?))
            }
            TypeExpr::Mapping(kind, key, value) => {
                let key = self.resolve(key, scope)?;
                let value = match kind {
                    MappingKind::Counter => Shape::Scalar(ScalarType::Int),
                    _ => self.resolve(value, scope)?,
                };
                Shape::Mapping(*kind, Box::new(key), Box::new(value))
            }
            TypeExpr::Tuple(elems) => {
                let items = self.resolve_items(elems, scope)?;
                self.tuple_shape(items)?
            }
            TypeExpr::Unpack(_) => return Err(self.args_error("unpacking is only allowed inside a tuple")),
            TypeExpr::Param(name) => match scope.subst.get(name) {
                Some(Binding::One(shape)) => shape.clone(),
                Some(Binding::Pack(_)) => {
                    return Err(self.args_error(format!("parameter pack `{name}` must be unpacked")));
                }
                None => self.unbound_param(name, scope)?,
            },
            TypeExpr::Named(name) => self.resolve_named(name, scope)?,
            TypeExpr::Generic(name, args) => {
                match self.catalog.get(name) {
                    Some(Entry::Model(_)) => {}
                    Some(_) => {
                        return Err(self.args_error(format!("`{name}` is not a generic model")));
                    }
                    None => return Err(self.forward_ref(name)),
                }
                let args = self.resolve_items(args, scope)?;
                Shape::Record {
                    model: name.clone(),
                    args,
                }
            }
            TypeExpr::SelfType => match scope.self_shape {
                Some(shape) => shape.clone(),
                None => return Err(self.args_error("`Self` used outside of a model")),
            },
            TypeExpr::Annotated(inner, annotations) => {
                Shape::Annotated(Box::new(self.resolve(inner, scope)?), annotations.clone())
            }
        })
    }

    /// Resolves a tuple body or an argument list, expanding unpacked items.
    fn resolve_items(&mut self, elems: &[TypeExpr], scope: &Scope<'_>) -> Result<Vec<Shape>, BuildError> {
        let mut items = Vec::with_capacity(elems.len());
        for elem in elems {
            let TypeExpr::Unpack(inner) = elem else {
                items.push(self.resolve(elem, scope)?);
                continue;
            };
            match inner.as_ref() {
                TypeExpr::Param(name) => match scope.subst.get(name) {
                    Some(Binding::Pack(pack)) => items.extend(pack.iter().cloned()),
                    Some(Binding::One(_)) => {
                        return Err(self.args_error(format!("`{name}` is not a parameter pack")));
                    }
                    None => items.push(Shape::Unpacked(Box::new(Shape::Any))),
                },
                TypeExpr::Collection(CollectionKind::VarTuple, elem) => {
                    items.push(Shape::Unpacked(Box::new(self.resolve(elem, scope)?)));
                }
                TypeExpr::Tuple(inner_elems) => {
                    let nested = self.resolve_items(inner_elems, scope)?;
                    items.extend(nested);
                }
                other => {
                    return Err(self.args_error(format!("cannot unpack `{other}`")));
                }
            }
        }
        Ok(items)
    }

    fn tuple_shape(&self, items: Vec<Shape>) -> Result<Shape, BuildError> {
        let mut prefix = Vec::new();
        let mut middle = None;
        let mut suffix = Vec::new();
        for item in items {
            match item {
                Shape::Unpacked(elem) => {
                    if middle.is_some() {
                        return Err(self.args_error("a tuple may contain at most one unbounded part"));
                    }
                    middle = Some(elem);
                }
                fixed if middle.is_some() => suffix.push(fixed),
                fixed => prefix.push(fixed),
            }
        }
        Ok(match middle {
            None => Shape::Tuple(prefix),
            Some(middle) => Shape::VariadicTuple {
                prefix,
                middle,
                suffix,
            },
        })
    }

    fn unbound_param(&mut self, name: &str, scope: &Scope<'_>) -> Result<Shape, BuildError> {
        let param = scope
            .owner
            .and_then(|m| m.type_params.iter().find(|p| p.name == name))
            .ok_or_else(|| self.args_error(format!("unknown type parameter `{name}`")))?;
        if param.variadic {
            return Err(self.args_error(format!("parameter pack `{name}` must be unpacked")));
        }
        let bound = match &param.bound {
            Some(b) => Some(Box::new(self.resolve(b, scope)?)),
            None => None,
        };
        let constraints = param
            .constraints
            .iter()
            .map(|c| self.resolve(c, scope))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Shape::TypeVar {
            name: name.to_owned(),
            bound,
            constraints,
        })
    }

    fn resolve_named(&mut self, name: &str, scope: &Scope<'_>) -> Result<Shape, BuildError> {
        let Some(entry) = self.catalog.get(name) else {
            if self.catalog.extension_for(name).is_some() {
                return Ok(Shape::External(name.to_owned()));
            }
            return Err(self.forward_ref(name));
        };
        Ok(match entry {
            Entry::Model(_) => Shape::Record {
                model: name.to_owned(),
                args: Vec::new(),
            },
            Entry::Enum(decl) => Shape::Enum(decl),
            Entry::NamedTuple(decl) => {
                let shapes = decl
                    .fields
                    .iter()
                    .map(|(_, ty, _)| self.resolve(ty, &Scope::empty()))
                    .collect::<Result<Vec<_>, _>>()?;
                Shape::NamedTuple(decl, shapes)
            }
            Entry::TypedDict(decl) => {
                let shapes = decl
                    .keys
                    .iter()
                    .map(|(_, ty, _)| self.resolve(ty, &Scope::empty()))
                    .collect::<Result<Vec<_>, _>>()?;
                Shape::TypedDict(decl, shapes)
            }
            Entry::Custom(custom) => Shape::Custom(custom),
            Entry::Alias(alias) => {
                if self.alias_stack.iter().any(|a| a == name) {
                    trace!("alias `{}` re-entered, deferring", name);
                    return Ok(Shape::Lazy(name.to_owned()));
                }
                self.alias_stack.push(name.to_owned());
                let resolved = self.resolve(&alias.ty, scope);
                self.alias_stack.pop();
                Shape::Alias(name.to_owned(), Box::new(resolved?))
            }
        })
    }

    fn forward_ref(&self, name: &str) -> BuildError {
        BuildError::UnresolvedForwardRef {
            model: self.site.0.clone(),
            field: self.site.1.clone(),
            name: name.to_owned(),
        }
    }

    fn args_error(&self, reason: impl Into<String>) -> BuildError {
        BuildError::TypeArguments {
            model: self.site.0.clone(),
            reason: reason.into(),
        }
    }
}

/// Pairs a model's generic parameters with arguments. Missing trailing
/// arguments leave parameters unbound.
fn bind_params(model: &Model, args: Vec<Shape>) -> Result<Subst, BuildError> {
    let err = |reason: String| BuildError::TypeArguments {
        model: model.name.clone(),
        reason,
    };
    let params = &model.type_params;
    let mut subst = Subst::new();
    if args.is_empty() {
        return Ok(subst);
    }
    let packs: Vec<usize> = params
        .iter()
        .enumerate()
        .filter(|(_, p)| p.variadic)
        .map(|(i, _)| i)
        .collect();
    let fixed = |shape: &Shape| !matches!(shape, Shape::Unpacked(_));

    match packs.as_slice() {
        [] => {
            if args.len() > params.len() {
                return Err(err(format!(
                    "expected at most {} argument(s), got {}",
                    params.len(),
                    args.len()
                )));
            }
            for (param, arg) in params.iter().zip(args) {
                if !fixed(&arg) {
                    return Err(err(format!("`{}` cannot take an unpacked argument", param.name)));
                }
                subst.insert(param.name.clone(), Binding::One(arg));
            }
        }
        [pack] => {
            let pack = *pack;
            let after = params.len() - pack - 1;
            if args.len() < pack + after {
                return Err(err(format!(
                    "expected at least {} argument(s), got {}",
                    pack + after,
                    args.len()
                )));
            }
            let mut args = args;
            let suffix = args.split_off(args.len() - after);
            let middle = args.split_off(pack);
            for (param, arg) in params[..pack].iter().zip(args) {
                if !fixed(&arg) {
                    return Err(err(format!("`{}` cannot take an unpacked argument", param.name)));
                }
                subst.insert(param.name.clone(), Binding::One(arg));
            }
            for (param, arg) in params[pack + 1..].iter().zip(suffix) {
                if !fixed(&arg) {
                    return Err(err(format!("`{}` cannot take an unpacked argument", param.name)));
                }
                subst.insert(param.name.clone(), Binding::One(arg));
            }
            subst.insert(params[pack].name.clone(), Binding::Pack(middle));
        }
        _ => return Err(err("more than one parameter pack".into())),
    }
    Ok(subst)
}

/// Flattens nested unions and optionals, drops duplicates, and turns a
/// union with `None` into an optional.
fn normalize_union(members: Vec<Shape>) -> Shape {
    fn push(out: &mut Vec<Shape>, has_none: &mut bool, shape: Shape) {
        match shape {
            Shape::Union(inner) => {
                for s in inner {
                    push(out, has_none, s);
                }
            }
            Shape::Optional(inner) => {
                *has_none = true;
                push(out, has_none, *inner);
            }
            Shape::Scalar(ScalarType::NoneType) => *has_none = true,
            other => {
                let key = other.to_string();
                if !out.iter().any(|s| s.to_string() == key) {
                    out.push(other);
                }
            }
        }
    }

    let mut out = Vec::new();
    let mut has_none = false;
    for m in members {
        push(&mut out, &mut has_none, m);
    }
    let body = match out.len() {
        0 => return Shape::Scalar(ScalarType::NoneType),
        1 => out.remove(0),
        _ => Shape::Union(out),
    };
    if has_none {
        Shape::Optional(Box::new(body))
    } else {
        body
    }
}
