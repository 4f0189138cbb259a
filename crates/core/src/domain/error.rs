// Domain Error Types

use thiserror::Error;

/// Validation failures raised by the queue and Q&A rules.
///
/// All of these are recoverable: the caller may retry with corrected input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("{0} is already in the queue")]
    DuplicateName(String),

    #[error("The queue is empty")]
    EmptyQueue,

    #[error("Index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("{0} is not in the queue")]
    NotInQueue(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;

/// True when the value is empty or whitespace only.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
