// Error types for the Redis node

use redis::RedisError;
use redlock_core::NodeError;

/// Error building a Redis node
#[derive(Debug, thiserror::Error)]
pub enum RedisNodeError {
    #[error("invalid redis url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: RedisError,
    },
}

/// Classify a Redis client error as a node-level transient error
pub(crate) fn map_redis_err(e: &RedisError) -> NodeError {
    if e.is_timeout() {
        return NodeError::Timeout;
    }
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
        return NodeError::Connection(e.to_string());
    }
    NodeError::Protocol(e.to_string())
}

/// Whether the cached connection should be thrown away after `e`
///
/// A client-side timeout counts: the connection is reopened on the next
/// request, even though concurrent callers share it. The manager's own
/// per-node timeout drops the request future and never reaches this path.
pub(crate) fn is_fatal_to_connection(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
}
