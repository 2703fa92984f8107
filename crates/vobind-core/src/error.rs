//! Error types for vobind core
//!
//! Two classes are kept apart: [`DefinitionError`] is a
//! wiring defect (bad field identifiers, duplicate schema entries, path/query
//! collisions) and is reproducible on every request; [`ValidationError`] is a
//! data problem in one request and carries every field failure at once.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Static wiring defects detected at construction or unification time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("empty {what} identifier")]
    EmptyIdentifier { what: &'static str },

    #[error("invalid {what} identifier `{value}`")]
    InvalidIdentifier { what: &'static str, value: String },

    #[error("duplicate field `{view}` in schema")]
    DuplicateField { view: String },

    #[error("field metadata for table `{found}` cannot be declared on entity `{expected}`")]
    TableMismatch { expected: String, found: String },

    #[error("parameter `{key}` is defined both as path and query parameter")]
    ParamConflict { key: String },

    #[error("query parameter `{key}` was supplied {count} times")]
    MultiValue { key: String, count: usize },
}

/// Why a single field was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldErrorKind {
    /// Required field absent from both the body and the parameters.
    Missing,
    /// Raw value does not have the shape of the declared type.
    Parse { expected: String, value: String },
    /// Raw value has the right shape but does not fit the declared width.
    Overflow { target: String, value: String },
    /// No timestamp layout accepted the value.
    BadDateFormat { value: String },
    /// JSON value of an incompatible kind (object for a scalar, list for a scalar, ...).
    TypeMismatch { expected: String, found: String },
    /// An attached validator rejected the coerced value.
    Constraint { validator: String, message: String },
}

impl FieldErrorKind {
    pub fn is_overflow(&self) -> bool {
        matches!(self, FieldErrorKind::Overflow { .. })
    }

    /// Stable machine-readable tag.
    pub fn code(&self) -> &'static str {
        match self {
            FieldErrorKind::Missing => "missing",
            FieldErrorKind::Parse { .. } => "parse",
            FieldErrorKind::Overflow { .. } => "overflow",
            FieldErrorKind::BadDateFormat { .. } => "bad_date_format",
            FieldErrorKind::TypeMismatch { .. } => "type_mismatch",
            FieldErrorKind::Constraint { .. } => "constraint",
        }
    }
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldErrorKind::Missing => f.write_str("missing required field"),
            FieldErrorKind::Parse { expected, value } => {
                write!(f, "cannot parse {value:?} as {expected}")
            }
            FieldErrorKind::Overflow { target, value } => {
                write!(f, "value {value:?} overflows {target}")
            }
            FieldErrorKind::BadDateFormat { value } => write!(f, "bad date format {value:?}"),
            FieldErrorKind::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            FieldErrorKind::Constraint { validator, message } => {
                write!(f, "{validator}: {message}")
            }
        }
    }
}

/// A field-scoped failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

impl Serialize for FieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FieldError", 3)?;
        s.serialize_field("field", &self.field)?;
        s.serialize_field("kind", self.kind.code())?;
        s.serialize_field("message", &self.kind.to_string())?;
        s.end()
    }
}

/// Every field failure from one validation pass, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: impl Into<String>, kind: FieldErrorKind) {
        self.0.push(FieldError::new(field, kind));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Errors reported against one view-name.
    pub fn by_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.0.iter().filter(move |e| e.field == field)
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Data problems in one request.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("validation failed: {0}")]
    Fields(FieldErrors),
}

impl ValidationError {
    /// Field failures, empty for a malformed body.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ValidationError::Fields(errs) => Some(errs),
            ValidationError::InvalidJson(_) => None,
        }
    }
}

pub type Result<T, E = DefinitionError> = std::result::Result<T, E>;
