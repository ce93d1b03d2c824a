#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod config;
mod data;
mod decls;
mod dialect;
mod discriminator;
mod hooks;
mod model;
mod strategy;
mod types;

pub use config::{CodegenOptions, ModelConfig};
pub use data::{Data, EnumValue, Fraction, ParseFractionError, Record};
pub use decls::{
    AliasDecl, CustomDeserializeFn, CustomSerializeFn, CustomType, Decl, EnumDecl,
    NamedTupleDecl, TypedDictDecl,
};
pub use dialect::{Dialect, DialectId};
pub use discriminator::{Discriminator, VariantTaggerFn};
pub use hooks::{Hooks, PostDeserializeFn, PostSerializeFn, PreDeserializeFn, PreSerializeFn};
pub use model::{BaseRef, DefaultFactory, DefaultValue, Field, FieldMeta, Model, TypeParam};
pub use recast_value;
pub use strategy::{BoxError, DeserializeFn, SerializeFn, Strategy};
pub use types::{
    Annotation, CollectionKind, ContainerCategory, LiteralValue, MappingKind, ScalarType,
    TypeExpr,
};
