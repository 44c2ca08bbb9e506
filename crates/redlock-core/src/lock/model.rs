//! Redlock Data Model

use std::fmt;
use std::time::{Duration, Instant};

use rand::RngCore;

/// Random bytes in a lock token (160 bits)
const TOKEN_BYTES: usize = 20;

/// Generate a fresh, hex-encoded lock token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    const_hex::encode(bytes)
}

/// A lock held on a quorum of nodes
///
/// Only `LockManager::acquire` creates one. The value is immutable; hand it
/// back to `LockManager::release` when done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    resource: String,
    token: String,
    validity: Duration,
    validity_start: Instant,
}

impl Lock {
    pub(crate) fn new(
        resource: impl Into<String>,
        token: impl Into<String>,
        validity: Duration,
        validity_start: Instant,
    ) -> Self {
        Self {
            resource: resource.into(),
            token: token.into(),
            validity,
            validity_start,
        }
    }

    /// Resource key the lock protects
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Token stored on the nodes, proves ownership on release
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Validity window computed at acquisition time
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Validity still left now
    pub fn remaining_validity(&self) -> Duration {
        self.validity.saturating_sub(self.validity_start.elapsed())
    }

    /// Whether the caller may still assume exclusive ownership
    pub fn is_valid(&self) -> bool {
        !self.remaining_validity().is_zero()
    }
}

/// Outcome of one per-node request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    /// The node applied the operation
    Applied,
    /// The node answered but the condition did not hold
    /// (key already held on acquire, token mismatch on release)
    Rejected,
    /// The node could not be reached or failed to answer in time
    Failed(String),
}

impl NodeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, NodeOutcome::Applied)
    }
}

impl fmt::Display for NodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeOutcome::Applied => write!(f, "applied"),
            NodeOutcome::Rejected => write!(f, "rejected"),
            NodeOutcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Per-node outcome, keyed by node id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub node_id: String,
    pub outcome: NodeOutcome,
}

/// Result of a single, non-retried acquisition attempt
#[derive(Debug, Clone)]
pub struct AcquireAttempt {
    /// Token written on this attempt
    pub token: String,
    /// Nodes that stored the token
    pub acquired: usize,
    /// Nodes required
    pub quorum: usize,
    /// Validity left after elapsed time and drift, `None` when non-positive
    pub validity: Option<Duration>,
    /// Lock handed to the caller, set only when the attempt succeeded
    pub lock: Option<Lock>,
    pub nodes: Vec<NodeReport>,
}

impl AcquireAttempt {
    pub fn is_success(&self) -> bool {
        self.lock.is_some()
    }
}

/// Per-node outcomes of a release
///
/// Release always completes; this report only exists for observability.
#[derive(Debug, Clone, Default)]
pub struct ReleaseReport {
    pub nodes: Vec<NodeReport>,
}

impl ReleaseReport {
    /// Nodes where the token matched and the key was deleted
    pub fn deleted(&self) -> usize {
        self.nodes.iter().filter(|n| n.outcome.is_applied()).count()
    }

    /// Nodes that could not be reached
    pub fn failed(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.outcome, NodeOutcome::Failed(_)))
            .count()
    }
}
