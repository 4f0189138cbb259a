// Help Desk Infrastructure - SQLite Adapter
// Implements: SharedStore
//
// Many client processes opening the same database file behave as many
// clients sharing one store.

mod connection;
mod migration;
mod store;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use store::SqliteSharedStore;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
