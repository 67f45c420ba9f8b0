//! Request Routing Module
//!
//! Decides, for every key operation, whether this node serves it from the
//! local store or proxies it to the owning peer.
//!
//! ## Core Concepts
//! - **Owner resolution**: the ring names an owner for each key; its address
//!   and this node's own address are normalized (scheme stripped, default
//!   port appended) before being compared, because the registry may hold
//!   bare hosts, prefixed URLs, or host:port forms inconsistently.
//! - **One-hop forwarding**: a non-owner proxies the request unchanged to the
//!   owner and streams the response back. The receiving node serves it
//!   locally; a forward that would loop back to the sender is refused.
//! - **Diff-based membership**: peer snapshots from discovery are applied to
//!   the ring as removals plus additions. Rebuilding the ring from scratch
//!   would leave a window with no owner for any key, so that form is banned.

pub mod handlers;
pub mod node;
pub mod protocol;

pub use handlers::create_router;
pub use node::CacheNode;
