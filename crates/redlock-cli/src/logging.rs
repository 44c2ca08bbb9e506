//! Logging bootstrap
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to every
//! target. Output goes to stderr so command results on stdout stay clean.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Build the filter for `level`, preferring `RUST_LOG`
pub fn env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    Ok(filter)
}

/// Install the global subscriber
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(level)?)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_levels() {
        assert!(env_filter("info").is_ok());
        assert!(env_filter("redlock_core=debug,warn").is_ok());
    }
}
