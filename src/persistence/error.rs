//! Persistence layer error types

use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Item not found
    #[error("Item not found: {entity_type} with identifier '{identifier}'")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// Duplicate entry
    #[error("Duplicate entry: {entity_type} with name '{name}' already exists")]
    Duplicate { entity_type: String, name: String },

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored metadata could not be decoded
    #[error("Corrupt metadata: {0}")]
    Corrupt(String),

    /// Database error from SQLx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistenceError {
    /// True when the error is a unique-constraint violation reported by the backend
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(e) => e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false),
            _ => false,
        }
    }
}
