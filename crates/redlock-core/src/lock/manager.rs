//! Redlock Lock Manager
//!
//! Acquires a lock by writing a fresh token to every node and counting the
//! nodes that accepted it. The lock is granted only when a strict majority
//! accepted it and time is left once elapsed time and clock drift are
//! subtracted from the TTL. A failed attempt removes its token from every
//! node before the retry policy decides whether to try again.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::time::error::Elapsed;
use tracing::{debug, warn};

use super::model::{AcquireAttempt, Lock, NodeOutcome, NodeReport, ReleaseReport, generate_token};
use super::retry::RetryPolicy;
use crate::config::LockManagerConfig;
use crate::error::{LockError, NodeError, Result};
use crate::node::LockNode;

/// Nodes that must agree for `node_count` nodes: `floor(n / 2) + 1`
pub fn quorum(node_count: usize) -> usize {
    node_count / 2 + 1
}

/// Distributed lock manager over a fixed set of independent nodes
///
/// Holds no state between calls besides the node set and its config, so a
/// single instance can be shared freely across tasks.
pub struct LockManager {
    nodes: Vec<Arc<dyn LockNode>>,
    config: LockManagerConfig,
    retry: RetryPolicy,
}

impl LockManager {
    /// Create a manager with the default configuration
    pub fn new(nodes: Vec<Arc<dyn LockNode>>) -> Result<Self> {
        Self::with_config(nodes, LockManagerConfig::default())
    }

    /// Create a manager with a custom configuration
    ///
    /// Node ids must be unique: each id counts once toward the quorum.
    pub fn with_config(nodes: Vec<Arc<dyn LockNode>>, config: LockManagerConfig) -> Result<Self> {
        if nodes.is_empty() {
            return Err(LockError::NoNodes);
        }
        let mut seen = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !seen.insert(node.id()) {
                return Err(LockError::DuplicateNode(node.id().to_string()));
            }
        }
        config.validate()?;

        let retry = RetryPolicy::from_config(&config);
        Ok(Self {
            nodes,
            config,
            retry,
        })
    }

    pub fn nodes(&self) -> &[Arc<dyn LockNode>] {
        &self.nodes
    }

    pub fn config(&self) -> &LockManagerConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn quorum(&self) -> usize {
        quorum(self.nodes.len())
    }

    /// Acquire `resource` for `ttl`, retrying with jitter.
    ///
    /// Returns `None` when the lock could not be obtained within the
    /// configured number of attempts. Node failures never surface here.
    pub async fn acquire(&self, resource: &str, ttl: Duration) -> Option<Lock> {
        let lock = self
            .retry
            .execute(|| async move { self.try_acquire_once(resource, ttl).await.lock })
            .await;

        match &lock {
            Some(lock) => debug!(
                resource = %resource,
                validity_ms = lock.validity().as_millis() as u64,
                "Lock acquired"
            ),
            None => debug!(
                resource = %resource,
                attempts = self.retry.max_attempts,
                "Lock not acquired"
            ),
        }
        lock
    }

    /// A single acquisition attempt without retries.
    ///
    /// On failure the attempt's token has already been removed from every
    /// node that accepted it.
    pub async fn try_acquire_once(&self, resource: &str, ttl: Duration) -> AcquireAttempt {
        let token = generate_token();
        let timeout = self.config.node_timeout();
        let start = Instant::now();

        let requests = self.nodes.iter().map(|node| {
            let token = token.as_str();
            async move {
                let result =
                    tokio::time::timeout(timeout, node.set_if_absent(resource, token, ttl)).await;
                settle(node.as_ref(), "set_if_absent", result)
            }
        });
        let nodes = join_all(requests).await;

        // Measured after the slowest node has answered
        let measured_at = Instant::now();
        let elapsed = measured_at.duration_since(start);
        let drift = self.config.drift_for(ttl);
        let validity = ttl
            .checked_sub(elapsed.saturating_add(drift))
            .filter(|v| !v.is_zero());

        let acquired = nodes.iter().filter(|n| n.outcome.is_applied()).count();
        let quorum = self.quorum();

        debug!(
            resource = %resource,
            acquired,
            quorum,
            elapsed_ms = elapsed.as_millis() as u64,
            drift_ms = drift.as_millis() as u64,
            validity_ms = validity.map(|v| v.as_millis() as u64),
            "Acquire attempt finished"
        );

        let lock = match validity {
            Some(validity) if acquired >= quorum => {
                Some(Lock::new(resource, token.clone(), validity, measured_at))
            }
            _ => {
                self.delete_token(resource, &token).await;
                None
            }
        };

        AcquireAttempt {
            token,
            acquired,
            quorum,
            validity,
            lock,
            nodes,
        }
    }

    /// Release `lock` on every node.
    ///
    /// Best effort: a node only deletes the key if it still holds this lock's
    /// token, and unreachable nodes are skipped. Safe to call repeatedly or
    /// with an expired lock.
    pub async fn release(&self, lock: &Lock) -> ReleaseReport {
        let report = self.delete_token(lock.resource(), lock.token()).await;
        debug!(
            resource = %lock.resource(),
            deleted = report.deleted(),
            failed = report.failed(),
            "Lock released"
        );
        report
    }

    async fn delete_token(&self, resource: &str, token: &str) -> ReleaseReport {
        let timeout = self.config.node_timeout();

        let requests = self.nodes.iter().map(|node| async move {
            let result =
                tokio::time::timeout(timeout, node.compare_and_delete(resource, token)).await;
            settle(node.as_ref(), "compare_and_delete", result)
        });

        ReleaseReport {
            nodes: join_all(requests).await,
        }
    }
}

/// Fold one node's answer into an outcome, logging failures
fn settle(
    node: &dyn LockNode,
    operation: &'static str,
    result: std::result::Result<std::result::Result<bool, NodeError>, Elapsed>,
) -> NodeReport {
    let outcome = match result.unwrap_or(Err(NodeError::Timeout)) {
        Ok(true) => NodeOutcome::Applied,
        Ok(false) => NodeOutcome::Rejected,
        Err(e) => {
            warn!(node = %node.id(), operation, error = %e, "Node request failed");
            NodeOutcome::Failed(e.to_string())
        }
    };

    NodeReport {
        node_id: node.id().to_string(),
        outcome,
    }
}

impl fmt::Display for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", std::any::type_name::<Self>())?;
        writeln!(f, "Registered nodes:")?;
        for node in &self.nodes {
            writeln!(f, "{}", node.id())?;
        }
        Ok(())
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field(
                "nodes",
                &self.nodes.iter().map(|n| n.id()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish()
    }
}
