//! Redlock Core - quorum-based distributed locking
//!
//! This crate provides:
//! - `LockManager`: acquire/release a lock across independent storage nodes
//! - `RetryPolicy`: bounded retry with jitter
//! - `LockNode`: the two atomic primitives a storage node must offer
//! - `MemoryNode`: an in-process node with fault injection

pub mod config;
pub mod error;
pub mod lock;
pub mod node;

pub use config::LockManagerConfig;
pub use error::{LockError, NodeError, Result};
pub use lock::{
    AcquireAttempt, Lock, LockManager, NodeOutcome, NodeReport, ReleaseReport, RetryPolicy,
    generate_token, quorum,
};
pub use node::{LockNode, MemoryNode};
