// Bounded retry with jitter
// Spreads contending clients out so they do not keep splitting the quorum

use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::config::{DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY_MS, LockManagerConfig};

/// Retry policy for lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one attempt always runs)
    pub max_attempts: u32,
    /// Upper bound of the random delay between attempts
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_COUNT,
            base_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    pub fn from_config(config: &LockManagerConfig) -> Self {
        Self::new(config.retry_count, config.retry_delay())
    }

    /// Run `attempt` until it yields `Some`, at most `max_attempts` times.
    ///
    /// Between unsuccessful attempts the calling task sleeps for a duration
    /// drawn uniformly from `[0, base_delay]`. Exhaustion returns `None`.
    pub async fn execute<T, F, Fut>(&self, mut attempt: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut rng = StdRng::from_os_rng();

        for n in 1..=max_attempts {
            if let Some(value) = attempt().await {
                return Some(value);
            }
            if n < max_attempts {
                let delay = self.jitter(&mut rng);
                trace!(attempt = n, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
            }
        }
        None
    }

    /// Boolean form of `execute`
    pub async fn execute_bool<F, Fut>(&self, mut attempt: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        self.execute(|| {
            let fut = attempt();
            async move { fut.await.then_some(()) }
        })
        .await
        .is_some()
    }

    fn jitter(&self, rng: &mut StdRng) -> Duration {
        let max_ms = self.base_delay.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.random_range(0..=max_ms))
    }
}
