//! Registry Discovery Module
//!
//! Consumes an external, strongly consistent key-value registry for peer
//! discovery. Each node publishes its address under `{prefix}{id}` bound to a
//! lease it keeps alive in the background; peers are discovered by reading
//! the whole prefix.
//!
//! ## Core Mechanisms
//! - **Leased registration**: the published key disappears on its own when a
//!   node stops renewing, so crashed nodes age out of the cluster without an
//!   explicit deregistration step.
//! - **Snapshot watch**: the watcher delivers full `id -> addr` snapshots
//!   into a bounded channel. A single applier task consumes them and owns the
//!   ring write path; the producer never blocks on a slow consumer, it drops
//!   the snapshot and delivers a fresh one on the next tick. Consumers must
//!   tolerate redundant snapshots, which diff-based application makes free.

pub mod client;
pub mod types;

pub use client::{RegistrationHandle, RegistryClient};
