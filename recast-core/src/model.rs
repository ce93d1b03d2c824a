//! Record type declarations.

use core::fmt;
use std::sync::Arc;

use crate::{Data, Hooks, ModelConfig, Strategy, TypeExpr};

/// A generic parameter of a model.
#[derive(Clone, Debug)]
pub struct TypeParam {
    /// Parameter name, referenced by [`TypeExpr::Param`].
    pub name: String,
    /// Upper bound used when no argument is supplied.
    pub bound: Option<TypeExpr>,
    /// Allowed types used (as a union) when no argument is supplied.
    pub constraints: Vec<TypeExpr>,
    /// A parameter pack (`*Ts`) that absorbs any number of arguments.
    pub variadic: bool,
}

impl TypeParam {
    /// An unbounded parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bound: None,
            constraints: Vec::new(),
            variadic: false,
        }
    }

    /// A parameter pack.
    pub fn pack(name: impl Into<String>) -> Self {
        Self {
            variadic: true,
            ..Self::new(name)
        }
    }

    /// Sets the bound.
    #[must_use]
    pub fn bound(mut self, ty: TypeExpr) -> Self {
        self.bound = Some(ty);
        self
    }

    /// Sets the constraints.
    #[must_use]
    pub fn constraints(mut self, tys: impl IntoIterator<Item = TypeExpr>) -> Self {
        self.constraints = tys.into_iter().collect();
        self
    }
}

/// The base of a model, with the type arguments the model passes to it.
#[derive(Clone, Debug)]
pub struct BaseRef {
    /// Name of the base model.
    pub model: String,
    /// Arguments for the base's generic parameters.
    pub args: Vec<TypeExpr>,
}

/// Produces a fresh default value.
pub type DefaultFactory = Arc<dyn Fn() -> Data + Send + Sync>;

/// Default of a field.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value, cloned for each use.
    Value(Data),
    /// A factory called for each use.
    Factory(DefaultFactory),
}

impl DefaultValue {
    /// Produces the default.
    pub fn get(&self) -> Data {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// Per-field metadata.
#[derive(Clone, Debug, Default)]
pub struct FieldMeta {
    /// Key used in the representation, beats the model alias table.
    pub alias: Option<String>,
    /// Conversion override, beats every dialect.
    pub strategy: Option<Strategy>,
    /// Never written by encode.
    pub omit: bool,
}

/// A model field.
#[derive(Clone, Debug)]
pub struct Field {
    /// Declared name.
    pub name: String,
    /// Declared type.
    pub ty: TypeExpr,
    /// Default used when the input lacks the field.
    pub default: Option<DefaultValue>,
    /// Metadata.
    pub meta: FieldMeta,
    /// Read from input. Fields with `init = false` always get their default.
    pub init: bool,
}

impl Field {
    /// A required field.
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            meta: FieldMeta::default(),
            init: true,
        }
    }

    /// Sets a fixed default.
    #[must_use]
    pub fn default(mut self, value: impl Into<Data>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Sets a default factory.
    #[must_use]
    pub fn default_factory<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Data + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Factory(Arc::new(f)));
        self
    }

    /// Sets the alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.meta.alias = Some(alias.into());
        self
    }

    /// Sets the conversion override.
    #[must_use]
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.meta.strategy = Some(strategy);
        self
    }

    /// Never writes this field when encoding.
    #[must_use]
    pub fn omit(mut self) -> Self {
        self.meta.omit = true;
        self
    }

    /// Excludes the field from input.
    #[must_use]
    pub fn no_init(mut self) -> Self {
        self.init = false;
        self
    }

    /// Returns true if the field can be absent from input.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// A named record type.
#[derive(Clone, Debug)]
pub struct Model {
    /// Unique name.
    pub name: String,
    /// Generic parameters.
    pub type_params: Vec<TypeParam>,
    /// Base model.
    pub base: Option<BaseRef>,
    /// Fields declared by this model (not inherited ones).
    pub fields: Vec<Field>,
    /// Abstract models are never constructed by discriminated decoding.
    pub is_abstract: bool,
    /// Declared configuration.
    pub config: ModelConfig,
    /// Lifecycle hooks.
    pub hooks: Hooks,
}

impl Model {
    /// An empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            base: None,
            fields: Vec::new(),
            is_abstract: false,
            config: ModelConfig::default(),
            hooks: Hooks::default(),
        }
    }

    /// Adds a generic parameter.
    #[must_use]
    pub fn param(mut self, param: TypeParam) -> Self {
        self.type_params.push(param);
        self
    }

    /// Sets the base model.
    #[must_use]
    pub fn extends(mut self, model: impl Into<String>, args: impl IntoIterator<Item = TypeExpr>) -> Self {
        self.base = Some(BaseRef {
            model: model.into(),
            args: args.into_iter().collect(),
        });
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Marks the model abstract.
    #[must_use]
    pub fn abstract_model(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Looks up a field declared by this model.
    pub fn own_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_fields_in_order() {
        let m = Model::new("Point")
            .field(Field::new("x", TypeExpr::int()))
            .field(Field::new("y", TypeExpr::int()).default(0).alias("Y"));
        let names: Vec<_> = m.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
        assert!(!m.fields[0].has_default());
        assert_eq!(m.own_field("y").and_then(|f| f.meta.alias.as_deref()), Some("Y"));
    }

    #[test]
    fn factory_defaults_are_fresh() {
        let f = Field::new("items", TypeExpr::list(TypeExpr::int()))
            .default_factory(|| Data::List(Vec::new()));
        let d = f.default.as_ref().map(DefaultValue::get);
        assert_eq!(d, Some(Data::List(Vec::new())));
    }
}
