//! Schema engine error types

use thiserror::Error;

use crate::domain::IdentifierViolation;
use crate::persistence::PersistenceError;

/// Errors returned by form creation, synthesis, submission and query
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A table or column name failed the identifier allow-list; nothing was executed
    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier {
        identifier: String,
        reason: IdentifierViolation,
    },

    /// Name collision for a form or a field within a form
    #[error("Duplicate definition: {entity} '{name}' already exists")]
    DuplicateDefinition { entity: String, name: String },

    /// A form must declare at least one field
    #[error("Form '{form}' declares no fields")]
    EmptyDefinition { form: String },

    /// DDL execution failed; the form metadata is left without a table
    #[error("Failed to synthesize table '{table}': {message}")]
    SynthesisFailed { table: String, message: String },

    /// Unknown form name or id for this tenant
    #[error("Form not found: '{form}'")]
    NotFound { form: String },

    /// A required field was absent, null or empty
    #[error("Required field '{label}' was not provided")]
    MissingRequiredField { label: String },

    /// INSERT execution failed in the backend
    #[error("Submission to form '{form}' failed: {message}")]
    SubmissionFailed { form: String, message: String },

    /// SELECT execution failed in the backend
    #[error("Query of form '{form}' failed: {message}")]
    QueryFailed { form: String, message: String },

    /// Metadata store failure
    #[error(transparent)]
    Registry(#[from] PersistenceError),
}

impl SchemaError {
    /// Convert to HTTP status code for API responses
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidIdentifier { .. } => StatusCode::BAD_REQUEST,
            Self::DuplicateDefinition { .. } => StatusCode::CONFLICT,
            Self::EmptyDefinition { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MissingRequiredField { .. } => StatusCode::BAD_REQUEST,
            Self::SubmissionFailed { .. } => StatusCode::BAD_REQUEST,
            Self::Registry(PersistenceError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Registry(PersistenceError::Duplicate { .. }) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
