//! Configuration Module
//!
//! All runtime knobs come from environment variables with defaults suited to
//! a single local node; only `SELF_ID` and `SELF_ADDR` matter for clustering.

use std::env;
use std::time::Duration;

/// Node configuration loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// This node's identifier, unique across the cluster.
    pub self_id: String,
    /// Address peers can reach this node on (host or host:port).
    pub self_addr: String,
    /// Intended number of copies per key. Carried, not enforced.
    pub replication_factor: usize,
    /// HTTP listen port.
    pub server_port: u16,
    /// Store capacity in value bytes.
    pub capacity_bytes: usize,
    /// Virtual nodes per real node on the ring.
    pub ring_replicas: usize,
    /// Registry gateway base URL; empty disables discovery.
    pub registry_endpoint: String,
    /// Key prefix the cluster registers under.
    pub registry_prefix: String,
    /// Registration lease TTL in seconds.
    pub lease_ttl_secs: i64,
    /// Timeout for forwarded requests.
    pub forward_timeout: Duration,
    /// Interval between registry peer polls.
    pub watch_interval: Duration,
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// # Environment Variables
    /// - `SELF_ID` - node identifier (default: "node-<pid>")
    /// - `SELF_ADDR` - reachable address (default: "127.0.0.1:<port>")
    /// - `REPLICATION_FACTOR` - intended copies per key (default: 2)
    /// - `SERVER_PORT` - HTTP listen port (default: 8080)
    /// - `CACHE_CAPACITY_BYTES` - store byte cap (default: 64 MiB)
    /// - `RING_REPLICAS` - virtual nodes per node (default: 128)
    /// - `REGISTRY_ENDPOINT` - registry gateway URL (default: http://127.0.0.1:2379)
    /// - `REGISTRY_PREFIX` - registration key prefix (default: /zephyr/nodes/)
    /// - `LEASE_TTL_SECS` - registration lease TTL (default: 10)
    /// - `FORWARD_TIMEOUT_MS` - forward client timeout (default: 5000)
    /// - `WATCH_INTERVAL_MS` - peer poll interval (default: 2000)
    pub fn from_env() -> Self {
        let server_port = env_parsed("SERVER_PORT", 8080);
        Self {
            self_id: env::var("SELF_ID")
                .unwrap_or_else(|_| format!("node-{}", std::process::id())),
            self_addr: env::var("SELF_ADDR")
                .unwrap_or_else(|_| format!("127.0.0.1:{}", server_port)),
            replication_factor: env_parsed("REPLICATION_FACTOR", 2),
            server_port,
            capacity_bytes: env_parsed("CACHE_CAPACITY_BYTES", 64 << 20),
            ring_replicas: env_parsed("RING_REPLICAS", 128),
            registry_endpoint: env::var("REGISTRY_ENDPOINT")
                .unwrap_or_else(|_| "http://127.0.0.1:2379".to_string()),
            registry_prefix: env::var("REGISTRY_PREFIX")
                .unwrap_or_else(|_| "/zephyr/nodes/".to_string()),
            lease_ttl_secs: env_parsed("LEASE_TTL_SECS", 10),
            forward_timeout: Duration::from_millis(env_parsed("FORWARD_TIMEOUT_MS", 5000)),
            watch_interval: Duration::from_millis(env_parsed("WATCH_INTERVAL_MS", 2000)),
        }
    }
}
