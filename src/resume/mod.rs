//! Resume capability for replay runs
//!
//! Provides durable checkpoint storage with atomic writes and file locking.

pub mod checkpoint;
pub mod lock;
pub mod state;

pub use checkpoint::Checkpoint;
pub use lock::ReplayLock;
pub use state::{CheckpointError, CheckpointStore};
