// Port Layer - Interfaces for external dependencies

pub mod shared_store;
pub mod time_provider;

// Re-exports
pub use shared_store::{Collection, SharedStore, Version, Versioned, WriteOutcome};
pub use time_provider::TimeProvider;
