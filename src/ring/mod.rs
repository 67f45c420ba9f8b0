//! Consistent Hash Ring Module
//!
//! Maps keys to owning nodes via consistent hashing with virtual nodes.
//!
//! ## Mechanism
//! - **Placement**: each node contributes `replicas` tokens (virtual nodes)
//!   to a shared 32-bit hash circle, so load spreads evenly and every node
//!   computes identical ownership independently.
//! - **Lookup**: a key hashes to a point on the circle and is owned by the
//!   first token at or after it, wrapping around at the top.
//! - **Low-churn updates**: membership changes add or remove only the
//!   affected node's tokens. Keys owned by surviving nodes keep their owner,
//!   which is the property that makes cache movement proportional to the
//!   membership change.

pub mod ring;

pub use ring::{fnv1a32, HashRing};

#[cfg(test)]
mod tests;
