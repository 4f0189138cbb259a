// Domain Layer - Pure business logic and entities

pub mod error;
pub mod question;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use question::{Answer, Question, QuestionBoard};
pub use queue::{HelpQueue, QueueEntry};
