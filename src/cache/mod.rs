//! Local Cache Module
//!
//! Implements the node-local key-value store: a byte-capacity-bounded map
//! with LRU eviction and per-entry TTL.
//!
//! ## Core Concepts
//! - **Byte capacity**: the store is bounded by the total size of stored
//!   values, not by entry count. Inserting past the cap evicts from the
//!   least recently used end.
//! - **Lazy expiry**: entries carry an optional deadline that is checked on
//!   access. There is no background sweeper; an expired entry lingers until
//!   it is read, overwritten, or evicted.
//! - **Mutating reads**: a read refreshes recency and may expire the entry,
//!   so reads and writes are serialized behind the same lock.

pub mod store;

pub use store::KvStore;
