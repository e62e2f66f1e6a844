use thiserror::Error;

use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::domain::slug::SlugError;
use crate::infra::error::InfraError;

/// Application-level error surfaced by services and the object cache.
#[derive(Debug, Error)]
pub enum AppError {
    /// A lookup matched zero rows.
    #[error("`{entity}` not found")]
    NotFound { entity: &'static str },
    /// A lookup expected to be unique matched more than one row.
    #[error("lookup `{lookup}` matched more than one row")]
    AmbiguousLookup { lookup: String },
    /// A uniqueness or integrity constraint was violated.
    #[error("constraint `{constraint}` violated")]
    ConstraintViolation { constraint: String },
    /// A cascading write could not complete atomically; the store is
    /// unchanged.
    #[error("transaction aborted: {reason}")]
    TransactionAbort { reason: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl AppError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn ambiguous(lookup: impl Into<String>) -> Self {
        Self::AmbiguousLookup {
            lookup: lookup.into(),
        }
    }

    pub fn constraint(constraint: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            constraint: constraint.into(),
        }
    }

    /// Map a repository error, naming the entity for not-found reporting.
    pub fn repo(entity: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound { entity },
            RepoError::Duplicate { constraint } => Self::ConstraintViolation { constraint },
            RepoError::TransactionAbort { reason } => Self::TransactionAbort { reason },
            RepoError::Persistence(message) => Self::Persistence(message),
        }
    }
}

impl From<SlugError> for AppError {
    fn from(err: SlugError) -> Self {
        Self::Domain(DomainError::validation(err.to_string()))
    }
}
