//! Configuration management for the Redlock CLI
//!
//! Sources, lowest precedence first: the YAML file, `REDLOCK_*` environment
//! variables, then command line flags.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use config::{Config, Environment};
use redlock_core::LockManagerConfig;
use serde::Deserialize;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "redlock", version, about = "Distributed lock across independent redis nodes")]
pub struct Cli {
    /// Configuration file
    #[arg(
        short = 'c',
        long = "config",
        env = "REDLOCK_CONFIG",
        default_value = "conf/redlock.yml"
    )]
    pub config: PathBuf,
    /// Node URL, repeat for several nodes (replaces configured nodes)
    #[arg(short = 'n', long = "node")]
    pub nodes: Vec<String>,
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Acquire a lock, hold it, then release it
    Acquire {
        resource: String,
        #[arg(long = "ttl-ms", default_value_t = 10_000)]
        ttl_ms: u64,
        #[arg(long = "hold-ms", default_value_t = 0)]
        hold_ms: u64,
    },
    /// Print the registered nodes
    Nodes,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(flatten)]
    pub manager: LockManagerConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    pub fn load(
        path: &Path,
        node_overrides: &[String],
        log_level: Option<&str>,
    ) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                Environment::with_prefix("REDLOCK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("nodes"),
            );

        if !node_overrides.is_empty() {
            builder = builder.set_override("nodes", node_overrides.to_vec())?;
        }
        if let Some(level) = log_level {
            builder = builder.set_override("log_level", level)?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("no redlock nodes configured");
        }
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for url in &self.nodes {
            if !seen.insert(url.trim_end_matches('/')) {
                anyhow::bail!("redlock node listed more than once: {}", url);
            }
        }
        self.manager.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            "nodes:\n  - redis://127.0.0.1:6379/\n  - redis://127.0.0.1:6380/\nretry_count: 5\nlog_level: debug\n",
        );

        let config = AppConfig::load(file.path(), &[], None).unwrap();

        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.manager.retry_count, 5);
        assert_eq!(config.manager.retry_delay_ms, 200);
        assert_eq!(config.manager.clock_drift_factor, 0.01);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = write_config("nodes:\n  - redis://127.0.0.1:6379/\n");

        let config = AppConfig::load(
            file.path(),
            &[
                "redis://10.0.0.1:6379/".to_string(),
                "redis://10.0.0.2:6379/".to_string(),
                "redis://10.0.0.3:6379/".to_string(),
            ],
            Some("warn"),
        )
        .unwrap();

        assert_eq!(config.nodes.len(), 3);
        assert_eq!(config.nodes[0], "redis://10.0.0.1:6379/");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_missing_nodes_is_rejected() {
        let file = write_config("retry_count: 3\n");
        assert!(AppConfig::load(file.path(), &[], None).is_err());
    }

    #[test]
    fn test_invalid_manager_config_is_rejected() {
        let file = write_config("nodes:\n  - redis://127.0.0.1:6379/\nretry_count: 0\n");
        assert!(AppConfig::load(file.path(), &[], None).is_err());
    }

    #[test]
    fn test_duplicate_nodes_are_rejected() {
        let file = write_config(
            "nodes:\n  - redis://127.0.0.1:6379/\n  - redis://127.0.0.1:6380/\n  - redis://127.0.0.1:6379\n",
        );
        let err = AppConfig::load(file.path(), &[], None).unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let file = write_config("retry_count: 3\n");
        let repeated = vec!["redis://10.0.0.1:6379/".to_string(); 2];
        assert!(AppConfig::load(file.path(), &repeated, None).is_err());
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::parse_from([
            "redlock",
            "-n",
            "redis://127.0.0.1:6379/",
            "acquire",
            "orders",
            "--ttl-ms",
            "5000",
        ]);

        assert_eq!(cli.nodes, vec!["redis://127.0.0.1:6379/"]);
        match cli.command {
            Command::Acquire {
                resource,
                ttl_ms,
                hold_ms,
            } => {
                assert_eq!(resource, "orders");
                assert_eq!(ttl_ms, 5000);
                assert_eq!(hold_ms, 0);
            }
            Command::Nodes => panic!("expected acquire"),
        }
    }
}
