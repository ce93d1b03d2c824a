//! Error types.
//!
//! [`BuildError`]s happen while a procedure is being synthesized, before any
//! value is converted. [`ConvertError`]s happen while converting one value
//! and carry the path to the offending part of it.

use core::fmt;

use recast_core::{BoxError, Data};
use recast_value::Value;

/// Configuration-time failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// No handler can convert this shape.
    UnsupportedFieldType {
        /// Model that declares the field.
        model: String,
        /// Field name.
        field: String,
        /// Resolved shape.
        shape: String,
    },
    /// A name used in a field type is not declared (yet).
    UnresolvedForwardRef {
        /// Model that declares the field.
        model: String,
        /// Field name.
        field: String,
        /// The name that could not be resolved.
        name: String,
    },
    /// No model with this name is declared.
    UnknownModel {
        /// The name that was looked up.
        name: String,
    },
    /// A declaration with this name already exists.
    DuplicateDeclaration {
        /// Declared name.
        name: String,
        /// Kind of the existing declaration.
        existing: &'static str,
    },
    /// A dialect contains something unusable.
    InvalidDialect {
        /// Dialect name.
        dialect: String,
        /// What is wrong.
        reason: String,
    },
    /// A discriminator cannot be applied.
    InvalidDiscriminator {
        /// Where the discriminator was declared.
        target: String,
        /// What is wrong.
        reason: String,
    },
    /// Type arguments do not fit the generic parameters.
    TypeArguments {
        /// Generic model.
        model: String,
        /// What is wrong.
        reason: String,
    },
    /// A per-call option was passed to a model that does not accept it.
    OptionNotEnabled {
        /// Model name.
        model: String,
        /// Option name.
        option: &'static str,
    },
    /// Records cannot be mapping keys.
    RecordKeyInMapping {
        /// Model that declares the field.
        model: String,
        /// Field name.
        field: String,
        /// Mapping shape.
        shape: String,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnsupportedFieldType { model, field, shape } => {
                write!(f, "field `{field}` of `{model}` has unsupported type `{shape}`")
            }
            BuildError::UnresolvedForwardRef { model, field, name } => {
                write!(f, "field `{field}` of `{model}` refers to undeclared `{name}`")
            }
            BuildError::UnknownModel { name } => write!(f, "unknown model `{name}`"),
            BuildError::DuplicateDeclaration { name, existing } => {
                write!(f, "`{name}` is already declared as a {existing}")
            }
            BuildError::InvalidDialect { dialect, reason } => {
                write!(f, "invalid dialect `{dialect}`: {reason}")
            }
            BuildError::InvalidDiscriminator { target, reason } => {
                write!(f, "invalid discriminator on `{target}`: {reason}")
            }
            BuildError::TypeArguments { model, reason } => {
                write!(f, "bad type arguments for `{model}`: {reason}")
            }
            BuildError::OptionNotEnabled { model, option } => {
                write!(f, "`{model}` does not accept the `{option}` option")
            }
            BuildError::RecordKeyInMapping { model, field, shape } => {
                write!(f, "field `{field}` of `{model}`: records cannot be keys of `{shape}`")
            }
        }
    }
}

impl core::error::Error for BuildError {}

/// A step in the path to the part of a value that failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A record field.
    Field(String),
    /// A mapping key.
    Key(String),
    /// A sequence position.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Key(key) => write!(f, "[{key:?}]"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Conversion-time failure.
#[derive(Debug)]
pub struct ConvertError {
    /// What went wrong.
    pub kind: ConvertErrorKind,
    /// Where, outermost first.
    pub path: Vec<PathSegment>,
}

/// The specific kind of [`ConvertError`].
#[derive(Debug)]
pub enum ConvertErrorKind {
    /// A required field is absent from the input.
    MissingField {
        /// Model (or typed dict) name.
        model: String,
        /// Field name.
        field: String,
    },
    /// A field's value could not be converted.
    InvalidFieldValue {
        /// Model (or union / typed dict) name.
        model: String,
        /// Field name.
        field: String,
        /// Resolved shape of the field.
        shape: String,
        /// Raw value that failed.
        value: Value,
        /// Underlying failure.
        source: Box<ConvertError>,
    },
    /// The value has the wrong representation type.
    TypeMismatch {
        /// What the shape expected.
        expected: String,
        /// What was found.
        got: String,
    },
    /// The value has the right type but an unusable content.
    InvalidValue {
        /// Shape being converted.
        shape: String,
        /// What is wrong.
        message: String,
    },
    /// No union member (or discriminator candidate) accepted the value.
    UnionExhausted {
        /// Union shape.
        shape: String,
        /// One failure per member tried.
        attempts: Vec<ConvertError>,
    },
    /// Several candidates accepted the value where one was required.
    Ambiguous {
        /// Shape being decoded.
        shape: String,
        /// Names of the candidates that succeeded.
        candidates: Vec<String>,
    },
    /// The input has keys no field reads.
    ExtraKeys {
        /// Model name.
        model: String,
        /// Unexpected keys.
        keys: Vec<String>,
    },
    /// A strategy, custom type or extension handler failed.
    Callback(BoxError),
    /// A hook failed.
    Hook(BoxError),
    /// A procedure needed at call time could not be synthesized.
    Build(BuildError),
}

impl ConvertError {
    /// Creates an error with an empty path.
    pub fn new(kind: ConvertErrorKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
        }
    }

    /// Shorthand for [`ConvertErrorKind::TypeMismatch`].
    pub fn mismatch(expected: impl Into<String>, got: &Value) -> Self {
        Self::new(ConvertErrorKind::TypeMismatch {
            expected: expected.into(),
            got: got.value_type().to_string(),
        })
    }

    /// [`ConvertErrorKind::TypeMismatch`] for an in-memory value.
    pub fn mismatch_data(expected: impl Into<String>, got: &Data) -> Self {
        Self::new(ConvertErrorKind::TypeMismatch {
            expected: expected.into(),
            got: got.kind().to_owned(),
        })
    }

    /// Shorthand for [`ConvertErrorKind::InvalidValue`].
    pub fn invalid(shape: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ConvertErrorKind::InvalidValue {
            shape: shape.into(),
            message: message.into(),
        })
    }

    /// Shorthand for [`ConvertErrorKind::MissingField`].
    pub fn missing(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ConvertErrorKind::MissingField {
            model: model.into(),
            field: field.into(),
        })
    }

    /// Prepends a path segment.
    pub fn with_path(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// Returns true for failures that belong to a single value, which a
    /// record procedure wraps into [`ConvertErrorKind::InvalidFieldValue`].
    pub fn is_leaf(&self) -> bool {
        matches!(
            self.kind,
            ConvertErrorKind::TypeMismatch { .. }
                | ConvertErrorKind::InvalidValue { .. }
                | ConvertErrorKind::UnionExhausted { .. }
                | ConvertErrorKind::Callback(_)
        )
    }

    /// Renders the path, `<root>` when empty.
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            "<root>".into()
        } else {
            use core::fmt::Write;
            let mut s = String::new();
            for seg in &self.path {
                let _ = write!(s, "{seg}");
            }
            s
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "at {}: {}", self.path_string(), self.kind)
        }
    }
}

impl fmt::Display for ConvertErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertErrorKind::MissingField { model, field } => {
                write!(f, "missing required field `{field}` of `{model}`")
            }
            ConvertErrorKind::InvalidFieldValue {
                model,
                field,
                shape,
                value,
                source,
            } => write!(
                f,
                "invalid value {value} for field `{field}` of `{model}` ({shape}): {source}"
            ),
            ConvertErrorKind::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            ConvertErrorKind::InvalidValue { shape, message } => {
                write!(f, "invalid {shape}: {message}")
            }
            ConvertErrorKind::UnionExhausted { shape, attempts } => {
                write!(f, "no member of `{shape}` accepted the value")?;
                for attempt in attempts {
                    write!(f, "; {attempt}")?;
                }
                Ok(())
            }
            ConvertErrorKind::Ambiguous { shape, candidates } => {
                write!(f, "`{shape}` is ambiguous between {}", candidates.join(", "))
            }
            ConvertErrorKind::ExtraKeys { model, keys } => {
                write!(f, "unexpected keys for `{model}`: {}", keys.join(", "))
            }
            ConvertErrorKind::Callback(e) => write!(f, "conversion callback failed: {e}"),
            ConvertErrorKind::Hook(e) => write!(f, "hook failed: {e}"),
            ConvertErrorKind::Build(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.kind {
            ConvertErrorKind::InvalidFieldValue { source, .. } => Some(source.as_ref()),
            ConvertErrorKind::Callback(e) | ConvertErrorKind::Hook(e) => Some(e.as_ref()),
            ConvertErrorKind::Build(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BuildError> for ConvertError {
    fn from(err: BuildError) -> Self {
        ConvertError::new(ConvertErrorKind::Build(err))
    }
}

/// Failure of an injected format function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    /// Format name.
    pub format: String,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.format, self.message)
    }
}

impl core::error::Error for FormatError {}

/// Failure of a format-level call ([`Engine::encode_to`](crate::Engine::encode_to),
/// [`Engine::decode_from`](crate::Engine::decode_from)).
#[derive(Debug)]
pub enum Error {
    /// Conversion failed.
    Convert(ConvertError),
    /// Parsing or rendering failed.
    Format(FormatError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Convert(e) => write!(f, "{e}"),
            Error::Format(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Convert(e) => Some(e),
            Error::Format(e) => Some(e),
        }
    }
}

impl From<ConvertError> for Error {
    fn from(err: ConvertError) -> Self {
        Error::Convert(err)
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Self {
        Error::Format(err)
    }
}
