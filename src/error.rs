//! Error types for template reconciliation and policy export.
//!
//! Every fallible operation in the crate returns [`TemplateError`]. The
//! variants mirror the failure kinds callers are expected to surface: a
//! malformed duration or OID, a missing input, a desired-state value that
//! cannot be coerced to the type its attribute class expects, and a
//! reconciliation target that does not exist in the directory.

use thiserror::Error;

/// Result type alias using [`TemplateError`].
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Errors that can occur while diffing, reconciling or serializing templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Unparseable duration text or malformed OID value.
    #[error("Format error: {0}")]
    Format(String),

    /// Numeric component outside the accepted range.
    #[error("Range error: {0}")]
    Range(String),

    /// Required input was not supplied.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// A value could not be coerced to the type its attribute class expects.
    #[error("Cannot coerce '{attribute}' to {expected}: found {found}")]
    TypeCoercion {
        /// Attribute name.
        attribute: String,
        /// Expected comparison type.
        expected: &'static str,
        /// Description of the value that was found.
        found: String,
    },

    /// Reconciliation target does not exist.
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Configuration is invalid or could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Policy document could not be written.
    #[error("XML error: {0}")]
    Xml(String),

    /// DER encoding error while building extension payloads.
    #[error("DER error: {0}")]
    Der(#[from] der::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// Create a format error with the given message.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a range error with the given message.
    pub fn range(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }

    /// Create a missing input error.
    pub fn missing_input(what: impl Into<String>) -> Self {
        Self::MissingInput(what.into())
    }

    /// Create a type coercion error for an attribute.
    pub fn type_coercion(
        attribute: impl Into<String>,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeCoercion {
            attribute: attribute.into(),
            expected,
            found: found.into(),
        }
    }

    /// Create a not found error for a template name.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an XML error.
    pub fn xml(msg: impl Into<String>) -> Self {
        Self::Xml(msg.into())
    }

    /// Short, stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Format(_) => "FormatError",
            Self::Range(_) => "RangeError",
            Self::MissingInput(_) => "MissingInputError",
            Self::TypeCoercion { .. } => "TypeCoercionError",
            Self::NotFound(_) => "NotFoundError",
            Self::Config(_) => "ConfigError",
            Self::Xml(_) => "XmlError",
            Self::Der(_) => "DerError",
            Self::Json(_) => "JsonError",
            Self::Io(_) => "IoError",
        }
    }

    /// Returns the attribute name for coercion errors.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::TypeCoercion { attribute, .. } => Some(attribute),
            _ => None,
        }
    }
}
