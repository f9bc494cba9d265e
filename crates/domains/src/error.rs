//! # AppError
//!
//! Centralized error taxonomy for the blog core. The HTTP layer maps
//! these to status codes and redirects; the core never renders anything.

use thiserror::Error;

/// A single invalid form field, surfaced inline next to the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

/// The primary error type for all core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unresolved slug / username / post id / follow edge. Terminal: 404.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// Unauthenticated access to a protected operation. The HTTP layer
    /// redirects to login rather than surfacing a hard error.
    #[error("authentication required")]
    Unauthorized,

    /// Authenticated but not the owner. The post-edit handlers translate
    /// this to a silent redirect to the detail view, no error body.
    #[error("caller does not own this resource")]
    Forbidden,

    /// Recoverable form failures; the form is re-rendered with the
    /// submitted values and per-field messages.
    #[error("validation failed on {} field(s)", .0.len())]
    Invalid(Vec<FieldError>),

    /// Infrastructure failure (store, cache, media) mapped at the port
    /// boundary.
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound { kind, key: key.into() }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid(vec![FieldError::new(field, message)])
    }
}

/// A specialized Result type for the blog core.
pub type Result<T> = std::result::Result<T, AppError>;
