//! Error handling for the pirisk service
//!
//! Every failure in the prediction flow is one of the categories below. Input
//! problems are caught by the feature adapter before the model is touched;
//! artifact and schema problems are fatal for the request (or for startup).

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for the pirisk service
#[derive(Error, Debug)]
pub enum PiRiskError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to load model artifact {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Schema mismatch: expected [{expected}], got [{actual}] (offending columns: {columns})")]
    SchemaMismatch {
        expected: String,
        actual: String,
        columns: String,
    },

    #[error("Missing value for field {field}")]
    MissingField { field: String },

    #[error("Unknown field {field}")]
    UnknownField { field: String },

    #[error("Schema violation for {field}: expected \"Yes\" or \"No\", got {value}")]
    SchemaViolation { field: String, value: String },

    #[error("Cannot convert {value} to a number for {field}")]
    Coercion { field: String, value: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Result with PiRiskError
pub type PiRiskResult<T> = Result<T, PiRiskError>;

impl PiRiskError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a model load error
    pub fn model_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    pub fn schema_violation(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn coercion(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Coercion {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when the error was caused by what the user typed, as opposed to
    /// the artifact or the server.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PiRiskError::MissingField { .. }
                | PiRiskError::UnknownField { .. }
                | PiRiskError::SchemaViolation { .. }
                | PiRiskError::Coercion { .. }
                | PiRiskError::Validation { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PiRiskError::MissingField { .. }
            | PiRiskError::UnknownField { .. }
            | PiRiskError::SchemaViolation { .. }
            | PiRiskError::Coercion { .. }
            | PiRiskError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PiRiskError::Serialization { .. } => StatusCode::BAD_REQUEST,
            PiRiskError::Config { .. }
            | PiRiskError::ModelLoad { .. }
            | PiRiskError::SchemaMismatch { .. }
            | PiRiskError::Io { .. }
            | PiRiskError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for PiRiskError {
    fn from(err: serde_json::Error) -> Self {
        PiRiskError::serialization("json_operation", err)
    }
}

/// Convert from std::io errors
impl From<std::io::Error> for PiRiskError {
    fn from(err: std::io::Error) -> Self {
        PiRiskError::io("io_operation", err)
    }
}

impl From<figment::Error> for PiRiskError {
    fn from(err: figment::Error) -> Self {
        PiRiskError::config(err.to_string())
    }
}
