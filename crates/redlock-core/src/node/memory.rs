// In-process storage node
// Keys expire on their own TTL; availability and latency can be injected

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tracing::debug;

use super::LockNode;
use crate::error::NodeError;

/// A stored value with its expiry
struct StoredEntry {
    value: String,
    stored_at: Instant,
    ttl: Duration,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Storage node backed by a `DashMap`
///
/// Both primitives run under the shard lock of the key, which makes them
/// atomic with respect to each other.
pub struct MemoryNode {
    id: String,
    entries: DashMap<String, StoredEntry>,
    available: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: DashMap::new(),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Make the node behave as unreachable (`false`) or healthy (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Delay every request by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Current live value at `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    /// Unconditionally store `value` at `key`
    pub fn overwrite(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(node = %self.id, purged, "Purged expired entries");
        }
        purged
    }

    /// Purge expired entries every `period` in the background.
    ///
    /// The task holds a weak reference and stops once the node is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let node: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match node.upgrade() {
                    Some(node) => {
                        node.purge_expired();
                    }
                    None => break,
                }
            }
        })
    }

    async fn before_request(&self) -> Result<(), NodeError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if !self.is_available() {
            return Err(NodeError::Unavailable(self.id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl LockNode for MemoryNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, NodeError> {
        self.before_request().await?;

        let stored = StoredEntry {
            value: value.to_string(),
            stored_at: Instant::now(),
            ttl,
        };
        let acquired = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(stored);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(stored);
                true
            }
        };

        debug!(node = %self.id, key = %key, acquired, "set_if_absent");
        Ok(acquired)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, NodeError> {
        self.before_request().await?;

        let deleted = self
            .entries
            .remove_if(key, |_, entry| {
                !entry.is_expired() && entry.value == expected
            })
            .is_some();

        debug!(node = %self.id, key = %key, deleted, "compare_and_delete");
        Ok(deleted)
    }
}
