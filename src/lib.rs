//! Distributed In-Memory Cache Library
//!
//! This library crate defines the subsystems that make up one cache node.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The node is composed of tightly scoped subsystems in leaves-first order:
//!
//! - **`cache`**: the node-local store. A byte-capacity-bounded LRU map with
//!   per-entry TTL; the only place values live.
//! - **`ring`**: consistent hashing with virtual nodes. Maps every key to an
//!   owning node and keeps ownership stable under membership churn.
//! - **`routing`**: the request path. Resolves the owner for each key and
//!   either serves from the local store or forwards one hop to the owner.
//! - **`registry`**: peer discovery against an external leased key-value
//!   registry; produces membership snapshots the routing layer applies as
//!   ring diffs.
//! - **`telemetry`**: request counters, latency histograms, and the
//!   Prometheus text exposition.

pub mod cache;
pub mod config;
pub mod error;
pub mod registry;
pub mod ring;
pub mod routing;
pub mod telemetry;
