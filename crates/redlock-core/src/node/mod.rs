//! Storage node capability
//!
//! The lock manager only needs two atomic primitives from each independent
//! storage backend. Any backend (Redis, an in-process map, ...) that can
//! offer them is usable through `Arc<dyn LockNode>`.

mod memory;

pub use memory::MemoryNode;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::NodeError;

/// One independent, unreplicated storage node
#[async_trait]
pub trait LockNode: Send + Sync {
    /// Stable identifier used in logs and reports (usually the endpoint)
    fn id(&self) -> &str;

    /// Store `value` at `key` with expiry `ttl` only if `key` is absent.
    ///
    /// Returns whether the store happened. Must apply atomically.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool, NodeError>;

    /// Delete `key` only if its current value equals `expected`.
    ///
    /// Must be a single atomic server-side operation, never a get followed
    /// by a delete issued by the caller.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, NodeError>;
}
