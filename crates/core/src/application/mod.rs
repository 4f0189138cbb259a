// Application Layer - Use Cases and Business Logic

pub mod access_gate;
pub mod constants;
pub mod qa_manager;
pub mod queue_manager;
pub mod refresh;
pub mod session;

// Re-exports
pub use access_gate::{AccessGate, HelperSecret};
pub use qa_manager::QaManager;
pub use queue_manager::QueueManager;
pub use refresh::{stop_channel, RefreshLoop, StopHandle, StopSignal};
pub use session::{BoardView, Session, WritePolicy};
