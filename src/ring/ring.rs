use std::collections::HashMap;

use parking_lot::RwLock;

/// 32-bit FNV-1a. Deterministic, fast on short keys, and with enough
/// avalanche for token placement; it is deliberately not cryptographic.
pub fn fnv1a32(data: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &byte in data {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Ring state behind the lock: the sorted token circle, token ownership, and
/// the node address book.
#[derive(Debug, Default)]
struct RingInner {
    /// Token hashes, sorted ascending. One entry per distinct token value.
    tokens: Vec<u32>,
    /// Token hash -> owning node id. On a hash collision between two nodes
    /// the last writer wins.
    owners: HashMap<u32, String>,
    /// Node id -> opaque address string, exactly as registered.
    nodes: HashMap<String, String>,
}

impl RingInner {
    /// Index of the first token at or after `hash`, wrapping to 0.
    fn successor_index(&self, hash: u32) -> usize {
        let idx = self.tokens.partition_point(|&t| t < hash);
        if idx == self.tokens.len() {
            0
        } else {
            idx
        }
    }
}

/// Consistent hash ring with weighted virtual-node placement.
///
/// Reads (`lookup`, `lookup_n`, `addr`, `nodes`) take a shared lock and never
/// block each other; membership writes (`add`, `remove`, `clear`) take the
/// exclusive lock. The hasher and replica count are fixed at construction,
/// which makes token placement for a given node id deterministic.
pub struct HashRing {
    replicas: usize,
    hasher: fn(&[u8]) -> u32,
    inner: RwLock<RingInner>,
}

impl HashRing {
    /// Creates a ring with `replicas` virtual nodes per real node and the
    /// default FNV-1a hasher.
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, fnv1a32)
    }

    pub fn with_hasher(replicas: usize, hasher: fn(&[u8]) -> u32) -> Self {
        Self {
            replicas,
            hasher,
            inner: RwLock::new(RingInner::default()),
        }
    }

    /// Adds a node and its virtual tokens.
    ///
    /// Token `i` is placed at `hash(id ∥ le_u32(i))`. Re-adding an id that is
    /// already present is a no-op: tokens keep their positions and the stored
    /// address is not updated.
    pub fn add(&self, id: &str, addr: &str) {
        let mut inner = self.inner.write();
        if inner.nodes.contains_key(id) {
            return;
        }
        inner.nodes.insert(id.to_string(), addr.to_string());

        for i in 0..self.replicas {
            let mut token_key = Vec::with_capacity(id.len() + 4);
            token_key.extend_from_slice(id.as_bytes());
            token_key.extend_from_slice(&(i as u32).to_le_bytes());
            let hash = (self.hasher)(&token_key);

            if inner.owners.insert(hash, id.to_string()).is_none() {
                inner.tokens.push(hash);
            }
        }
        inner.tokens.sort_unstable();
    }

    /// Removes a node by filtering out only its own tokens.
    ///
    /// Tokens belonging to other nodes keep their positions, so keys they own
    /// resolve to the same owner before and after the removal.
    pub fn remove(&self, id: &str) {
        let mut inner = self.inner.write();
        if inner.nodes.remove(id).is_none() {
            return;
        }
        let owners = std::mem::take(&mut inner.owners);
        inner
            .tokens
            .retain(|hash| owners.get(hash).map(|o| o.as_str() != id).unwrap_or(false));
        inner.owners = owners
            .into_iter()
            .filter(|(_, owner)| owner.as_str() != id)
            .collect();
    }

    /// Drops every node and token.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.tokens.clear();
        inner.owners.clear();
        inner.nodes.clear();
    }

    /// Returns the id of the node owning `key`, or the empty string on an
    /// empty ring.
    pub fn lookup(&self, key: &[u8]) -> String {
        let hash = (self.hasher)(key);
        let inner = self.inner.read();
        if inner.tokens.is_empty() {
            return String::new();
        }
        let idx = inner.successor_index(hash);
        inner.owners[&inner.tokens[idx]].clone()
    }

    /// Returns up to `n` distinct owners by walking the ring clockwise from
    /// the key's successor token. The first entry is the primary owner.
    pub fn lookup_n(&self, key: &[u8], n: usize) -> Vec<String> {
        let hash = (self.hasher)(key);
        let inner = self.inner.read();
        if inner.tokens.is_empty() || n == 0 {
            return Vec::new();
        }

        let start = inner.successor_index(hash);
        let mut out: Vec<String> = Vec::with_capacity(n);
        for step in 0..inner.tokens.len() {
            let token = inner.tokens[(start + step) % inner.tokens.len()];
            let owner = &inner.owners[&token];
            if !out.iter().any(|o| o == owner) {
                out.push(owner.clone());
                if out.len() == n {
                    break;
                }
            }
        }
        out
    }

    /// Address registered for `id`, if the node is present.
    pub fn addr(&self, id: &str) -> Option<String> {
        self.inner.read().nodes.get(id).cloned()
    }

    /// Snapshot of the current membership. The returned map is an owned copy;
    /// later ring mutations are not visible through it.
    pub fn nodes(&self) -> HashMap<String, String> {
        self.inner.read().nodes.clone()
    }

    /// Number of real nodes.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tokens currently on the circle.
    pub fn token_count(&self) -> usize {
        self.inner.read().tokens.len()
    }
}
