//! Resolved shapes.

use core::fmt;
use std::sync::Arc;

use recast_core::{
    Annotation, CollectionKind, ContainerCategory, CustomType, EnumDecl, LiteralValue,
    MappingKind, NamedTupleDecl, ScalarType, TypedDictDecl,
};

/// The concrete classification of a field's type, used to pick a codec.
///
/// A shape contains no generic parameters (unbound ones are kept as
/// [`Shape::TypeVar`] with their bound and constraints) and no unresolved
/// names. Its `Display` form is also its fingerprint.
#[derive(Clone, Debug)]
pub enum Shape {
    /// Anything; converted opaquely.
    Any,
    /// A scalar with a fixed conversion rule.
    Scalar(ScalarType),
    /// `T` or `None`.
    Optional(Box<Shape>),
    /// One of several members, tried in order.
    Union(Vec<Shape>),
    /// One of a fixed set of values.
    Literal(Vec<LiteralValue>),
    /// A declared enumeration.
    Enum(Arc<EnumDecl>),
    /// A homogeneous collection.
    Collection(CollectionKind, Box<Shape>),
    /// A key-value mapping.
    Mapping(MappingKind, Box<Shape>, Box<Shape>),
    /// A fixed-arity tuple.
    Tuple(Vec<Shape>),
    /// A tuple with fixed ends around an arbitrary-length middle.
    VariadicTuple {
        /// Leading fixed elements.
        prefix: Vec<Shape>,
        /// Element type of the middle.
        middle: Box<Shape>,
        /// Trailing fixed elements.
        suffix: Vec<Shape>,
    },
    /// `*tuple[T, ...]` inside a type-argument list.
    Unpacked(Box<Shape>),
    /// A nested model applied to type arguments.
    Record {
        /// Model name.
        model: String,
        /// Resolved type arguments.
        args: Vec<Shape>,
    },
    /// A named alias and what it stands for.
    Alias(String, Box<Shape>),
    /// Re-entry into an alias that is being resolved.
    Lazy(String),
    /// A generic parameter without an argument.
    TypeVar {
        /// Parameter name.
        name: String,
        /// Declared bound.
        bound: Option<Box<Shape>>,
        /// Declared constraints.
        constraints: Vec<Shape>,
    },
    /// A shape with metadata.
    Annotated(Box<Shape>, Vec<Annotation>),
    /// A named tuple with its resolved element shapes.
    NamedTuple(Arc<NamedTupleDecl>, Vec<Shape>),
    /// A typed dict with its resolved value shapes.
    TypedDict(Arc<TypedDictDecl>, Vec<Shape>),
    /// A self-converting type.
    Custom(Arc<CustomType>),
    /// A name handled by a registered extension.
    External(String),
}

impl Shape {
    /// Strips annotations.
    pub fn unannotated(&self) -> &Shape {
        match self {
            Shape::Annotated(inner, _) => inner.unannotated(),
            other => other,
        }
    }

    /// Fingerprint of the shape without annotations.
    pub fn fingerprint(&self) -> String {
        self.unannotated().to_string()
    }

    /// Container category, for pass-through checks.
    pub fn container_category(&self) -> Option<ContainerCategory> {
        match self.unannotated() {
            Shape::Collection(CollectionKind::VarTuple, _) => Some(ContainerCategory::Tuple),
            Shape::Collection(kind, _) if kind.is_set() => Some(ContainerCategory::Set),
            Shape::Collection(..) => Some(ContainerCategory::List),
            Shape::Tuple(_) | Shape::VariadicTuple { .. } => Some(ContainerCategory::Tuple),
            Shape::Mapping(..) => Some(ContainerCategory::Dict),
            _ => None,
        }
    }

    /// Returns true if `None` is an accepted value.
    pub fn is_optional(&self) -> bool {
        match self.unannotated() {
            Shape::Optional(_) | Shape::Any => true,
            Shape::Scalar(ScalarType::NoneType) => true,
            Shape::Union(members) => members.iter().any(Shape::is_optional),
            Shape::Alias(_, inner) => inner.is_optional(),
            _ => false,
        }
    }
}

/// Joins shapes with `", "`.
pub(crate) fn join(shapes: &[Shape]) -> String {
    let mut out = String::new();
    for (i, s) in shapes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&s.to_string());
    }
    out
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Any => f.write_str("Any"),
            Shape::Scalar(s) => f.write_str(s.name()),
            Shape::Optional(inner) => write!(f, "Optional[{inner}]"),
            Shape::Union(members) => write!(f, "Union[{}]", join(members)),
            Shape::Literal(values) => {
                f.write_str("Literal[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Shape::Enum(decl) => f.write_str(&decl.name),
            Shape::Collection(CollectionKind::VarTuple, elem) => write!(f, "tuple[{elem}, ...]"),
            Shape::Collection(kind, elem) => write!(f, "{}[{elem}]", kind.name()),
            Shape::Mapping(MappingKind::Counter, key, _) => write!(f, "Counter[{key}]"),
            Shape::Mapping(kind, key, value) => write!(f, "{}[{key}, {value}]", kind.name()),
            Shape::Tuple(elems) if elems.is_empty() => f.write_str("tuple[()]"),
            Shape::Tuple(elems) => write!(f, "tuple[{}]", join(elems)),
            Shape::VariadicTuple {
                prefix,
                middle,
                suffix,
            } => {
                f.write_str("tuple[")?;
                for p in prefix {
                    write!(f, "{p}, ")?;
                }
                write!(f, "*tuple[{middle}, ...]")?;
                for s in suffix {
                    write!(f, ", {s}")?;
                }
                f.write_str("]")
            }
            Shape::Unpacked(inner) => write!(f, "*tuple[{inner}, ...]"),
            Shape::Record { model, args } if args.is_empty() => f.write_str(model),
            Shape::Record { model, args } => write!(f, "{model}[{}]", join(args)),
            Shape::Alias(name, _) | Shape::Lazy(name) => f.write_str(name),
            Shape::TypeVar { name, .. } => write!(f, "~{name}"),
            Shape::Annotated(inner, _) => write!(f, "Annotated[{inner}]"),
            Shape::NamedTuple(decl, _) => f.write_str(&decl.name),
            Shape::TypedDict(decl, _) => f.write_str(&decl.name),
            Shape::Custom(custom) => f.write_str(&custom.name),
            Shape::External(name) => f.write_str(name),
        }
    }
}
