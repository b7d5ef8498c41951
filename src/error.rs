//! Error types for the reconciliation core.

use thiserror::Error;

/// Raw failure returned by the provisioning backend.
///
/// `code` and `message` are the backend's own wording. The
/// [`ErrorClassifier`](crate::classifier::ErrorClassifier) matches on them
/// textually, so they must be passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct BackendError {
    pub code: String,
    pub message: String,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcilerError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error(
        "Stack {stack_name} is being updated by another account/region (observed token {observed_token})"
    )]
    StackContention {
        stack_name: String,
        observed_token: String,
    },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Coordination store error: {0}")]
    Store(String),
    #[error("Workflow engine error: {0}")]
    Workflow(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ReconcilerError {
    fn from(error: serde_json::Error) -> Self {
        ReconcilerError::Serialization(error.to_string())
    }
}

impl From<config::ConfigError> for ReconcilerError {
    fn from(error: config::ConfigError) -> Self {
        ReconcilerError::Configuration(error.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ReconcilerError {
    fn from(error: sqlx::Error) -> Self {
        ReconcilerError::Store(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReconcilerError>;
