// Lock manager configuration
// Retry, clock drift and per-node timeout tuning

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LockError, Result};

/// Default number of acquisition attempts
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default upper bound of the jittered delay between attempts
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;
/// Assumed maximum fractional clock skew between nodes
pub const DEFAULT_CLOCK_DRIFT_FACTOR: f64 = 0.01;
/// Expiry precision (1ms) plus minimum drift for small TTLs (1ms)
pub const DEFAULT_DRIFT_PADDING_MS: u64 = 2;
/// Default bound on a single node round-trip
pub const DEFAULT_NODE_TIMEOUT_MS: u64 = 200;

/// Configuration for the lock manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockManagerConfig {
    /// Maximum acquisition attempts per `acquire` call
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Upper bound of the random delay between attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Fraction of the TTL reserved for clock drift
    #[serde(default = "default_clock_drift_factor")]
    pub clock_drift_factor: f64,
    /// Fixed milliseconds added to the drift allowance
    #[serde(default = "default_drift_padding_ms")]
    pub drift_padding_ms: u64,
    /// Timeout applied to every per-node call, in milliseconds
    #[serde(default = "default_node_timeout_ms")]
    pub node_timeout_ms: u64,
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_clock_drift_factor() -> f64 {
    DEFAULT_CLOCK_DRIFT_FACTOR
}

fn default_drift_padding_ms() -> u64 {
    DEFAULT_DRIFT_PADDING_MS
}

fn default_node_timeout_ms() -> u64 {
    DEFAULT_NODE_TIMEOUT_MS
}

impl Default for LockManagerConfig {
    fn default() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            clock_drift_factor: DEFAULT_CLOCK_DRIFT_FACTOR,
            drift_padding_ms: DEFAULT_DRIFT_PADDING_MS,
            node_timeout_ms: DEFAULT_NODE_TIMEOUT_MS,
        }
    }
}

impl LockManagerConfig {
    pub fn with_retry(mut self, retry_count: u32, retry_delay_ms: u64) -> Self {
        self.retry_count = retry_count;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_node_timeout_ms(mut self, node_timeout_ms: u64) -> Self {
        self.node_timeout_ms = node_timeout_ms;
        self
    }

    pub fn with_clock_drift(mut self, factor: f64, padding_ms: u64) -> Self {
        self.clock_drift_factor = factor;
        self.drift_padding_ms = padding_ms;
        self
    }

    /// Reject values the acquisition algorithm cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.retry_count == 0 {
            return Err(LockError::InvalidConfig(
                "retry_count must be greater than 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.clock_drift_factor) {
            return Err(LockError::InvalidConfig(format!(
                "clock_drift_factor must be in [0, 1), got {}",
                self.clock_drift_factor
            )));
        }
        if self.node_timeout_ms == 0 {
            return Err(LockError::InvalidConfig(
                "node_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn node_timeout(&self) -> Duration {
        Duration::from_millis(self.node_timeout_ms)
    }

    /// Clock drift allowance for a TTL: `ttl * factor + padding`, whole milliseconds
    pub fn drift_for(&self, ttl: Duration) -> Duration {
        let scaled = (ttl.as_millis() as f64 * self.clock_drift_factor).round() as u64;
        Duration::from_millis(scaled.saturating_add(self.drift_padding_ms))
    }
}
