// Redis storage node
// One node per independent Redis master, connection established lazily

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, Script};
use redlock_core::{LockNode, NodeError};
use tracing::{debug, warn};

use crate::error::{RedisNodeError, is_fatal_to_connection, map_redis_err};

/// Delete KEYS[1] only if it still holds ARGV[1]
pub const UNLOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// `LockNode` backed by a single Redis server
pub struct RedisNode {
    id: String,
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    connect_timeout: Duration,
    unlock: Script,
}

impl RedisNode {
    /// Create a node for `url` (e.g. `redis://127.0.0.1:6379/`).
    ///
    /// No connection is made until the first request.
    pub fn open(url: &str) -> Result<Self, RedisNodeError> {
        let client = Client::open(url).map_err(|source| RedisNodeError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let id = client.get_connection_info().addr.to_string();

        Ok(Self {
            id,
            client,
            connection: Mutex::new(None),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            unlock: Script::new(UNLOCK_SCRIPT),
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn connection(&self) -> Result<MultiplexedConnection, NodeError> {
        let cached = self.connection.lock().clone();
        if let Some(conn) = cached {
            return Ok(conn);
        }

        let conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| NodeError::Timeout)?
        .map_err(|e| map_redis_err(&e))?;

        debug!(node = %self.id, "Connected to redis");
        *self.connection.lock() = Some(conn.clone());
        Ok(conn)
    }

    fn request_failed(&self, e: RedisError) -> NodeError {
        if is_fatal_to_connection(&e) {
            warn!(node = %self.id, error = %e, "Dropping redis connection");
            self.connection.lock().take();
        }
        map_redis_err(&e)
    }
}

#[async_trait]
impl LockNode for RedisNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, NodeError> {
        let mut conn = self.connection().await?;
        // PX rejects 0
        let ttl_ms = (ttl.as_millis() as u64).max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| self.request_failed(e))?;
        Ok(reply.is_some())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, NodeError> {
        let mut conn = self.connection().await?;

        let deleted: i64 = self
            .unlock
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| self.request_failed(e))?;
        Ok(deleted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_uses_endpoint_as_id() {
        let node = RedisNode::open("redis://127.0.0.1:6380/").unwrap();
        assert_eq!(node.id(), "127.0.0.1:6380");
    }

    #[test]
    fn test_open_rejects_invalid_url() {
        let err = RedisNode::open("not a url").err().unwrap();
        assert!(matches!(err, RedisNodeError::InvalidUrl { .. }));
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_unlock_script_is_token_guarded() {
        assert!(UNLOCK_SCRIPT.contains(r#"redis.call("GET", KEYS[1]) == ARGV[1]"#));
        assert!(UNLOCK_SCRIPT.contains(r#"redis.call("DEL", KEYS[1])"#));
        assert!(UNLOCK_SCRIPT.contains("return 0"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_node_error() {
        // Port 1 is never a redis server
        let node = RedisNode::open("redis://127.0.0.1:1/")
            .unwrap()
            .with_connect_timeout(Duration::from_millis(200));

        let result = node
            .set_if_absent("key", "value", Duration::from_secs(1))
            .await;
        assert!(result.is_err());
        assert!(node.compare_and_delete("key", "value").await.is_err());
    }
}
