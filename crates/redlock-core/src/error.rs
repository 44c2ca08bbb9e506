//! Error types for Redlock
//!
//! Two layers exist:
//! - `NodeError`: a single storage node failed to answer. The lock manager
//!   absorbs these into "not acquired" / "not deleted" votes.
//! - `LockError`: the manager itself cannot be built. Acquire and release
//!   never surface errors.

/// Transient failure talking to one storage node
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("node request timed out")]
    Timeout,

    #[error("node unavailable: {0}")]
    Unavailable(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Error building a lock manager
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("lock manager requires at least one node")]
    NoNodes,

    #[error("invalid lock manager config: {0}")]
    InvalidConfig(String),

    #[error("node registered more than once: {0}")]
    DuplicateNode(String),
}

pub type Result<T> = std::result::Result<T, LockError>;
