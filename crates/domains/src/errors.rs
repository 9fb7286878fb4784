//! # DomainError
//!
//! Centralized error handling for Verdespace.
//! Adapters translate their own failures into these variants at the
//! boundary; the API layer maps each variant to exactly one HTTP status.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or constraint-violating input (empty text, duplicate
    /// wishlist entry, out-of-range rating, oversized upload, ...).
    #[error("{message}")]
    Validation { field: String, message: String },

    /// No identity was presented or the presented one is not valid.
    #[error("authentication required")]
    Unauthenticated,

    /// The identity is known but lacks the capability for this action.
    #[error("permission denied")]
    Forbidden,

    /// Resource not found (e.g., Plant, Comment, WishList entry)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Object storage failure (upload, presigning, removal).
    #[error("storage error: {0}")]
    Storage(String),

    /// Infrastructure failure (e.g., DB down, pool exhausted)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for failures the caller caused and can correct.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Internal(_))
    }
}

/// A specialized Result type for Verdespace logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
