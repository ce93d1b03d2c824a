//! Declarations known to an engine.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use recast_core::{AliasDecl, CustomType, Decl, EnumDecl, Model, NamedTupleDecl, TypeExpr, TypedDictDecl};

use crate::error::BuildError;
use crate::extension::ExtensionHandler;
use crate::shape::Shape;
use crate::tracing_macros::trace;

/// A declaration, shared.
#[derive(Clone, Debug)]
pub(crate) enum Entry {
    Model(Arc<Model>),
    Enum(Arc<EnumDecl>),
    NamedTuple(Arc<NamedTupleDecl>),
    TypedDict(Arc<TypedDictDecl>),
    Custom(Arc<CustomType>),
    Alias(Arc<AliasDecl>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Model(_) => "model",
            Entry::Enum(_) => "enum",
            Entry::NamedTuple(_) => "named tuple",
            Entry::TypedDict(_) => "typed dict",
            Entry::Custom(_) => "custom type",
            Entry::Alias(_) => "alias",
        }
    }
}

impl From<Decl> for Entry {
    fn from(decl: Decl) -> Self {
        match decl {
            Decl::Model(d) => Entry::Model(Arc::new(d)),
            Decl::Enum(d) => Entry::Enum(Arc::new(d)),
            Decl::NamedTuple(d) => Entry::NamedTuple(Arc::new(d)),
            Decl::TypedDict(d) => Entry::TypedDict(Arc::new(d)),
            Decl::Custom(d) => Entry::Custom(Arc::new(d)),
            Decl::Alias(d) => Entry::Alias(Arc::new(d)),
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: IndexMap<String, Entry>,
    /// Base model name to direct subtypes, in declaration order.
    subtypes: HashMap<String, Vec<String>>,
    extensions: Vec<Arc<ExtensionHandler>>,
}

/// Append-only set of declarations.
///
/// Declarations are immutable once added. Lookups clone an `Arc` so no lock
/// is held while a caller works with a declaration.
#[derive(Default)]
pub(crate) struct Catalog {
    inner: RwLock<Inner>,
}

impl Catalog {
    pub(crate) fn declare(&self, decl: Decl) -> Result<(), BuildError> {
        let name = decl.name().to_owned();
        let mut inner = self.inner.write();
        if let Some(existing) = inner.entries.get(&name) {
            return Err(BuildError::DuplicateDeclaration {
                name,
                existing: existing.kind(),
            });
        }
        let entry = Entry::from(decl);
        if let Entry::Model(model) = &entry
            && let Some(base) = &model.base
        {
            inner
                .subtypes
                .entry(base.model.clone())
                .or_default()
                .push(name.clone());
        }
        trace!("declared {} `{}`", entry.kind(), name);
        inner.entries.insert(name, entry);
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<Entry> {
        self.inner.read().entries.get(name).cloned()
    }

    pub(crate) fn model(&self, name: &str) -> Result<Arc<Model>, BuildError> {
        match self.get(name) {
            Some(Entry::Model(m)) => Ok(m),
            _ => Err(BuildError::UnknownModel { name: name.to_owned() }),
        }
    }

    /// The model and its ancestors, nearest first.
    pub(crate) fn ancestry(&self, name: &str) -> Result<Vec<Arc<Model>>, BuildError> {
        let mut chain: Vec<Arc<Model>> = Vec::new();
        let mut next = Some(name.to_owned());
        while let Some(current) = next {
            if chain.iter().any(|m| m.name == current) {
                return Err(BuildError::TypeArguments {
                    model: name.to_owned(),
                    reason: format!("inheritance cycle through `{current}`"),
                });
            }
            let model = self.model(&current)?;
            next = model.base.as_ref().map(|b| b.model.clone());
            chain.push(model);
        }
        Ok(chain)
    }

    /// Transitive subtypes, depth-first in declaration order.
    pub(crate) fn subtype_closure(&self, name: &str) -> Vec<String> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        let mut stack: Vec<&str> = Vec::new();
        if let Some(children) = inner.subtypes.get(name) {
            stack.extend(children.iter().rev().map(String::as_str));
        }
        while let Some(child) = stack.pop() {
            if out.iter().any(|seen: &String| seen == child) {
                continue;
            }
            out.push(child.to_owned());
            if let Some(grandchildren) = inner.subtypes.get(child) {
                stack.extend(grandchildren.iter().rev().map(String::as_str));
            }
        }
        out
    }

    /// Returns true if `model` is `ancestor` or derives from it.
    pub(crate) fn is_subtype(&self, model: &str, ancestor: &str) -> bool {
        if model == ancestor {
            return true;
        }
        self.ancestry(model)
            .map(|chain| chain.iter().any(|m| m.name == ancestor))
            .unwrap_or(false)
    }

    /// Type arguments for `model` when it stands in for `ancestor[args]`.
    ///
    /// The arguments carry over when every model between the two forwards
    /// its parameters to its base. Otherwise the subtype gets none.
    pub(crate) fn subtype_args(&self, model: &str, ancestor: &str, args: &[Shape]) -> Vec<Shape> {
        let Ok(chain) = self.ancestry(model) else {
            return Vec::new();
        };
        for link in &chain {
            if link.name == ancestor {
                return args.to_vec();
            }
            let takes_all = link.type_params.is_empty() || args.len() <= link.type_params.len();
            if !forwards_params(link) || !takes_all {
                break;
            }
        }
        Vec::new()
    }

    pub(crate) fn add_extension(&self, handler: ExtensionHandler) {
        self.inner.write().extensions.push(Arc::new(handler));
    }

    pub(crate) fn extension_for(&self, type_name: &str) -> Option<Arc<ExtensionHandler>> {
        self.inner
            .read()
            .extensions
            .iter()
            .find(|h| h.accepts(type_name))
            .cloned()
    }
}

/// Returns true if `model` hands its own type arguments to its base
/// unchanged: either it has no parameters and names no base arguments, or
/// it passes each of its parameters through in order.
pub(crate) fn forwards_params(model: &Model) -> bool {
    let Some(base) = &model.base else {
        return false;
    };
    if base.args.is_empty() {
        return model.type_params.is_empty();
    }
    base.args.len() == model.type_params.len()
        && model
            .type_params
            .iter()
            .zip(&base.args)
            .all(|(p, a)| !p.variadic && matches!(a, TypeExpr::Param(name) if *name == p.name))
}
