//! # Error Types — Binding Error Taxonomy
//!
//! Defines the error types used throughout jdto. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Data errors ([`ErrorKind`]) are recorded per field with a path and
//!   aggregated into one [`ReadError`] per top-level read.
//! - Setup errors ([`SetupError`]) are returned by schema, union and registry
//!   builders and represent programmer error.
//! - Writes only fail when a custom codec rejects a value or a union value
//!   has no registered tag ([`WriteError`]).

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::node::NodeKind;
use crate::path::Segment;

/// The reason a single value could not be read.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorKind {
    /// A mandatory field is absent from its object.
    #[error("missing required field")]
    MissingRequiredField,

    /// The node has the wrong scalar kind (or a non-integral number where an
    /// integer is declared).
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared value shape, e.g. `"i32"` or `"string"`.
        expected: String,
        /// Kind of the node actually present.
        found: NodeKind,
    },

    /// The number does not fit the declared numeric type.
    #[error("value {value} is out of range for {target}")]
    OutOfRange {
        /// Declared numeric type.
        target: String,
        /// Offending number as written in the document.
        value: String,
    },

    /// The node has the wrong container shape (object vs array) or the
    /// document nests deeper than the configured limit.
    #[error("malformed structure: expected {expected}, found {found}")]
    MalformedStructure {
        /// Expected shape.
        expected: String,
        /// Shape actually present.
        found: String,
    },

    /// A validator rejected an extracted value.
    #[error("{0}")]
    ValidationFailed(String),

    /// A tagged object does not carry its discriminator key.
    #[error("missing discriminator field '{key}'")]
    MissingDiscriminator {
        /// Discriminator key that was expected.
        key: String,
    },

    /// A tagged object carries a discriminator with no registered binder.
    #[error("unknown tag '{tag}'")]
    UnknownTag {
        /// Offending discriminator value.
        tag: String,
    },

    /// A user-supplied codec rejected the node.
    #[error("custom codec failure: {0}")]
    CustomCodecFailure(String),
}

impl ErrorKind {
    /// Scalar kind mismatch against a node of kind `found`.
    pub fn type_mismatch(expected: impl Into<String>, found: NodeKind) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found,
        }
    }

    /// Container shape mismatch against a node of kind `found`.
    pub fn malformed(expected: impl Into<String>, found: NodeKind) -> Self {
        Self::MalformedStructure {
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Number outside the range of `target`.
    pub fn out_of_range(target: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::OutOfRange {
            target: target.into(),
            value: value.to_string(),
        }
    }

    /// Stable snake_case name of the variant, for matching in reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRequiredField => "missing_required_field",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::OutOfRange { .. } => "out_of_range",
            Self::MalformedStructure { .. } => "malformed_structure",
            Self::ValidationFailed(_) => "validation_failed",
            Self::MissingDiscriminator { .. } => "missing_discriminator",
            Self::UnknownTag { .. } => "unknown_tag",
            Self::CustomCodecFailure(_) => "custom_codec_failure",
        }
    }
}

/// A single read failure with the path of the offending value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Dotted/indexed path, e.g. `.items[3].name`. Empty for the root.
    pub path: String,
    /// Why the value was rejected.
    pub kind: ErrorKind,
}

impl FieldError {
    /// Human-readable message without the path.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

/// Every failure discovered by one top-level read, in discovery order
/// (schema field order, then sequence index order).
#[derive(Debug, Clone, PartialEq)]
pub struct ReadError {
    errors: Vec<FieldError>,
}

impl ReadError {
    pub(crate) fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Returns the number of recorded failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if no failure was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns a slice of all failures.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Paths of all failures, in order.
    pub fn paths(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.path.as_str()).collect()
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<FieldError> {
        self.errors
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "read failed with {} error(s)", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ReadError {}

/// Failure while rendering a native value into a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteError {
    /// A custom codec refused to render a value.
    #[error("error writing {}: custom codec failure: {message}", display_path(.path))]
    CustomCodecFailure {
        /// Path of the offending value.
        path: String,
        /// Message returned by the custom codec.
        message: String,
    },

    /// A union value's variant has no registered tag.
    #[error("error writing {}: no tag registered for this variant of '{union_name}'", display_path(.path))]
    UnregisteredVariant {
        /// Path of the offending value.
        path: String,
        /// Name of the tagged union.
        union_name: String,
    },
}

impl WriteError {
    /// Custom codec failure at the current (root) position.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::CustomCodecFailure {
            path: String::new(),
            message: message.into(),
        }
    }

    /// Prefix the error path with the segment it bubbled out of.
    pub fn within(mut self, segment: &Segment) -> Self {
        let path = match &mut self {
            Self::CustomCodecFailure { path, .. } | Self::UnregisteredVariant { path, .. } => path,
        };
        *path = format!("{segment}{path}");
        self
    }

    /// Path of the offending value.
    pub fn path(&self) -> &str {
        match self {
            Self::CustomCodecFailure { path, .. } | Self::UnregisteredVariant { path, .. } => path,
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "(root)"
    } else {
        path
    }
}

/// Programmer error detected while building schemas, unions or registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// Two fields of one schema share a name.
    #[error("schema '{schema}' declares field '{field}' more than once")]
    DuplicateField {
        /// Schema name.
        schema: String,
        /// Duplicated field name.
        field: String,
    },

    /// Two variants of one tagged union share a tag.
    #[error("tagged union '{union_name}' registers tag '{tag}' more than once")]
    DuplicateTagRegistration {
        /// Union name.
        union_name: String,
        /// Duplicated tag.
        tag: String,
    },

    /// A variant schema declares a field named like the discriminator.
    #[error("variant '{tag}' of tagged union '{union_name}' declares a field named like the discriminator '{key}'")]
    DiscriminatorCollision {
        /// Union name.
        union_name: String,
        /// Offending variant tag.
        tag: String,
        /// Discriminator key.
        key: String,
    },

    /// A tagged union was configured with an empty discriminator key.
    #[error("tagged union '{union_name}' has an empty discriminator key")]
    EmptyDiscriminator {
        /// Union name.
        union_name: String,
    },

    /// A codec was registered twice for the same type.
    #[error("a codec for type '{type_name}' is already registered")]
    DuplicateCodec {
        /// Rust type name.
        type_name: String,
    },

    /// A field type has neither a built-in nor a registered codec.
    #[error("no codec available for type '{type_name}' (field '{field}')")]
    MissingCodec {
        /// Field name.
        field: String,
        /// Rust type name.
        type_name: String,
    },

    /// A positional binding requires more elements than it declares.
    #[error("array binding '{binding}' requires at least {at_least} elements but declares {members}")]
    InvalidArrayBounds {
        /// Binding name.
        binding: String,
        /// Configured minimum length.
        at_least: usize,
        /// Number of declared members.
        members: usize,
    },

    /// A validator was constructed with inconsistent parameters.
    #[error("invalid validator: {0}")]
    InvalidValidator(String),

    /// Engine options are inconsistent.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The process-wide registry was already installed or frozen by use.
    #[error("the global codec registry is already initialized")]
    RegistryAlreadyInstalled,
}

/// Failure loading [`crate::BindOptions`] from text.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The YAML text could not be parsed.
    #[error("invalid YAML options: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The JSON text could not be parsed.
    #[error("invalid JSON options: {0}")]
    Json(#[from] serde_json::Error),

    /// The options parsed but are inconsistent.
    #[error(transparent)]
    Invalid(#[from] SetupError),
}

/// Top-level error type for text and stream entry points.
#[derive(Error, Debug)]
pub enum JdtoError {
    /// JSON text could not be parsed into a document tree.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document did not match the schema.
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The native value could not be rendered.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Schema or registry construction failed.
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
