//! Routing Wire Protocol
//!
//! Endpoint paths, header names, and the JSON DTOs served by the node's
//! observational endpoints. The key endpoints themselves speak raw bytes
//! (`application/octet-stream`), so there is no DTO for them.

use serde::{Deserialize, Serialize};

/// Prefix under which key operations live; the key is everything after it.
pub const KV_PREFIX: &str = "/kv/";

/// Port assumed when a registered address carries no explicit port.
pub const DEFAULT_PORT: &str = "8080";

/// Header carrying the original client address on forwarded requests.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Response body for `GET /info`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    /// Process id of the serving node.
    pub pid: u32,
    /// Server wall-clock time, RFC 3339.
    pub now: String,
    /// Number of entries currently in the local store.
    pub items: usize,
}

/// Response body for `GET /stats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub node_id: String,
    pub addr: String,
    /// Nodes currently on the ring, this one included.
    pub peers: usize,
    pub replication_factor: usize,
    pub store_items: usize,
    pub store_used_bytes: usize,
    pub store_capacity_bytes: usize,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}
