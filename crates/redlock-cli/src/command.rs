// CLI commands
// Output goes to the given writer; logging goes through tracing

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use redlock_core::{LockManager, LockNode};
use redlock_redis::RedisNode;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Build a lock manager over the configured redis nodes
pub fn build_manager(config: &AppConfig) -> anyhow::Result<LockManager> {
    let nodes = config
        .nodes
        .iter()
        .map(|url| -> anyhow::Result<Arc<dyn LockNode>> {
            let node = RedisNode::open(url)?.with_connect_timeout(config.manager.node_timeout());
            Ok(Arc::new(node) as Arc<dyn LockNode>)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(LockManager::with_config(nodes, config.manager.clone())?)
}

/// Acquire `resource`, hold it for `hold`, release it.
///
/// Returns whether the lock was obtained.
pub async fn run_acquire(
    manager: &LockManager,
    resource: &str,
    ttl: Duration,
    hold: Duration,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let Some(lock) = manager.acquire(resource, ttl).await else {
        warn!(resource = %resource, "Lock not obtained");
        writeln!(out, "lock not obtained: {}", resource)?;
        return Ok(false);
    };

    info!(
        resource = %resource,
        validity_ms = lock.validity().as_millis() as u64,
        "Lock obtained"
    );
    writeln!(out, "resource: {}", lock.resource())?;
    writeln!(out, "token: {}", lock.token())?;
    writeln!(out, "validity_ms: {}", lock.validity().as_millis())?;

    if !hold.is_zero() {
        tokio::time::sleep(hold).await;
        if !lock.is_valid() {
            warn!(resource = %resource, "Validity window elapsed while holding");
            writeln!(out, "warning: validity elapsed before release")?;
        }
    }

    let report = manager.release(&lock).await;
    info!(
        resource = %resource,
        deleted = report.deleted(),
        failed = report.failed(),
        "Lock released"
    );
    for node in &report.nodes {
        writeln!(out, "release {}: {}", node.node_id, node.outcome)?;
    }
    Ok(true)
}

/// Print the manager's node listing
pub fn print_nodes(manager: &LockManager, out: &mut impl Write) -> anyhow::Result<()> {
    write!(out, "{}", manager)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use redlock_core::{LockManagerConfig, MemoryNode};

    fn memory_manager(nodes: &[Arc<MemoryNode>]) -> LockManager {
        LockManager::with_config(
            nodes
                .iter()
                .map(|n| n.clone() as Arc<dyn LockNode>)
                .collect(),
            LockManagerConfig::default().with_retry(1, 0),
        )
        .unwrap()
    }

    fn cluster() -> Vec<Arc<MemoryNode>> {
        (0..3)
            .map(|i| Arc::new(MemoryNode::new(format!("memory-{}", i))))
            .collect()
    }

    #[tokio::test]
    async fn test_acquire_prints_lock_and_releases() {
        let nodes = cluster();
        let manager = memory_manager(&nodes);
        let mut out = Vec::new();

        let ok = run_acquire(
            &manager,
            "orders",
            Duration::from_secs(10),
            Duration::from_millis(5),
            &mut out,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(ok);
        assert!(text.contains("resource: orders"));
        assert!(text.contains("token: "));
        assert!(text.contains("release memory-0: applied"));
        assert!(nodes.iter().all(|n| n.is_empty()));
    }

    #[tokio::test]
    async fn test_acquire_reports_failure() {
        let nodes = cluster();
        nodes[0].overwrite("orders", "other", Duration::from_secs(10));
        nodes[1].overwrite("orders", "other", Duration::from_secs(10));
        let manager = memory_manager(&nodes);
        let mut out = Vec::new();

        let ok = run_acquire(
            &manager,
            "orders",
            Duration::from_secs(10),
            Duration::ZERO,
            &mut out,
        )
        .await
        .unwrap();

        assert!(!ok);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "lock not obtained: orders\n"
        );
    }

    #[test]
    fn test_build_manager_from_config() {
        let config = AppConfig {
            nodes: vec![
                "redis://127.0.0.1:6379/".to_string(),
                "redis://127.0.0.1:6380/".to_string(),
                "redis://127.0.0.1:6381/".to_string(),
            ],
            log_level: "info".to_string(),
            manager: LockManagerConfig::default(),
        };

        let manager = build_manager(&config).unwrap();
        assert_eq!(manager.quorum(), 2);

        let mut out = Vec::new();
        print_nodes(&manager, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("127.0.0.1:6380"));
    }

    #[test]
    fn test_build_manager_rejects_same_endpoint_twice() {
        // Different URLs, same host:port
        let config = AppConfig {
            nodes: vec![
                "redis://127.0.0.1:6379/".to_string(),
                "redis://127.0.0.1:6379/1".to_string(),
            ],
            log_level: "info".to_string(),
            manager: LockManagerConfig::default(),
        };

        let err = build_manager(&config).unwrap_err();
        assert!(err.to_string().contains("127.0.0.1:6379"));
    }
}
