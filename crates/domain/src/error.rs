//! Domain error taxonomy.

use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the domain services.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced aggregate or row is absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A field constraint was violated.
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The operation is blocked by a referencing or duplicate row.
    #[error("{0}")]
    Conflict(String),

    /// Storage failure; propagated, never retried.
    #[error(transparent)]
    Store(StoreError),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::Referenced { .. } | StoreError::Duplicate { .. } => {
                DomainError::Conflict(e.to_string())
            }
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
