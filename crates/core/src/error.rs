// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Store read/write failed; the operation was aborted with nothing written
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Helper access required")]
    Unauthorized,

    /// Conditional writes kept losing to concurrent writers
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Validation failures can be retried with corrected input
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Domain(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::StoreUnavailable(String)
