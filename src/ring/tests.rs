use std::collections::HashMap;

use super::HashRing;

fn three_node_ring() -> HashRing {
    let ring = HashRing::new(128);
    ring.add("n1", "n1:8080");
    ring.add("n2", "n2:8080");
    ring.add("n3", "n3:8080");
    ring
}

// ============================================================
// PLACEMENT AND LOOKUP
// ============================================================

#[test]
fn test_add_and_addr() {
    let ring = three_node_ring();

    assert_eq!(ring.addr("n1"), Some("n1:8080".to_string()));
    assert_eq!(ring.addr("n2"), Some("n2:8080".to_string()));
    assert_eq!(ring.addr("missing"), None);
    assert_eq!(ring.len(), 3);
}

#[test]
fn test_lookup_is_stable() {
    let ring = three_node_ring();

    for key in [b"foo".as_slice(), b"bar", b"baz", b"a-much-longer-key"] {
        let first = ring.lookup(key);
        let second = ring.lookup(key);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}

#[test]
fn test_lookup_on_empty_ring() {
    let ring = HashRing::new(128);

    assert_eq!(ring.lookup(b"anything"), "");
    assert!(ring.lookup_n(b"anything", 3).is_empty());
}

#[test]
fn test_token_count_tracks_membership() {
    let ring = HashRing::new(128);

    ring.add("n1", "a:1");
    assert_eq!(ring.token_count(), 128);

    ring.add("n2", "a:2");
    assert_eq!(ring.token_count(), 256);

    ring.remove("n1");
    assert_eq!(ring.token_count(), 128);

    ring.clear();
    assert_eq!(ring.token_count(), 0);
    assert!(ring.is_empty());
}

#[test]
fn test_readd_existing_id_is_noop() {
    let ring = HashRing::new(128);
    ring.add("n1", "first:1");
    let tokens_before = ring.token_count();

    ring.add("n1", "second:2");

    assert_eq!(ring.token_count(), tokens_before);
    assert_eq!(ring.addr("n1"), Some("first:1".to_string()));
}

// ============================================================
// CHURN
// ============================================================

#[test]
fn test_remove_moves_only_the_removed_nodes_keys() {
    let ring = three_node_ring();

    let keys: Vec<String> = (0..500).map(|i| format!("churn-key-{}", i)).collect();
    let before: HashMap<&String, String> =
        keys.iter().map(|k| (k, ring.lookup(k.as_bytes()))).collect();

    ring.remove("n2");

    for key in &keys {
        let after = ring.lookup(key.as_bytes());
        assert_ne!(after, "n2");
        if before[key] != "n2" {
            assert_eq!(
                before[key],
                after,
                "key {} changed owner without its node leaving",
                key
            );
        }
    }
}

#[test]
fn test_remove_owner_changes_lookup() {
    let ring = three_node_ring();

    let key = b"hot-key-123";
    let before = ring.lookup(key);
    assert!(!before.is_empty());

    ring.remove(&before);

    let after = ring.lookup(key);
    assert!(!after.is_empty());
    assert_ne!(before, after);
}

#[test]
fn test_remove_unknown_id_is_noop() {
    let ring = three_node_ring();
    let tokens = ring.token_count();

    ring.remove("ghost");

    assert_eq!(ring.token_count(), tokens);
    assert_eq!(ring.len(), 3);
}

// ============================================================
// SUCCESSOR LOOKUP
// ============================================================

#[test]
fn test_lookup_n_distinct_owners() {
    let ring = three_node_ring();

    let owners = ring.lookup_n(b"replica-key", 3);
    assert_eq!(owners.len(), 3);

    let mut dedup = owners.clone();
    dedup.sort();
    dedup.dedup();
    assert_eq!(dedup.len(), 3);

    // The first owner is the primary.
    assert_eq!(owners[0], ring.lookup(b"replica-key"));
}

#[test]
fn test_lookup_n_caps_at_node_count() {
    let ring = three_node_ring();

    let owners = ring.lookup_n(b"some-key", 10);
    assert_eq!(owners.len(), 3);
}

// ============================================================
// DISTRIBUTION
// ============================================================

#[test]
fn test_distribution_is_roughly_balanced() {
    let ring = three_node_ring();

    const N: usize = 6000;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for i in 0..N {
        let key = [
            (i >> 24) as u8,
            (i >> 16) as u8,
            (i >> 8) as u8,
            i as u8,
        ];
        *counts.entry(ring.lookup(&key)).or_insert(0) += 1;
    }

    let ideal = N / 3;
    assert_eq!(counts.len(), 3);
    for (node, count) in counts {
        assert!(
            count >= ideal / 2 && count <= ideal * 2,
            "node {} owns {} of {} keys, outside [{}, {}]",
            node,
            count,
            N,
            ideal / 2,
            ideal * 2
        );
    }
}

// ============================================================
// SNAPSHOTS
// ============================================================

#[test]
fn test_nodes_snapshot_is_independent() {
    let ring = three_node_ring();

    let snapshot = ring.nodes();
    ring.remove("n1");
    ring.add("n4", "n4:8080");

    assert!(snapshot.contains_key("n1"));
    assert!(!snapshot.contains_key("n4"));
    assert_eq!(snapshot.len(), 3);
}
