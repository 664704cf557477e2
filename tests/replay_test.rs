use meshcore::identity::{keys_load_or_create, InMemoryKeyStore};
use meshcore::neighbor::NeighborTable;
use meshcore::replay::ReplayCache;
use meshcore::{onion, NodeId};

/// The dispatcher's contract: replay must be checked, and must reject,
/// before `onion::peel` is ever invoked a second time on the same
/// reassembled bytes.
#[test]
fn second_delivery_of_same_datagram_is_dropped_before_any_peel() {
    let b = keys_load_or_create(&InMemoryKeyStore::new()).unwrap();
    let b_id = NodeId::new("B").unwrap();

    let mut neighbors = NeighborTable::new(8);
    neighbors.upsert(b_id.clone(), b.x_pub, b.e_pub);

    let route = vec![b_id.clone()];
    let datagram = onion::build(&route, b"secret payload", &neighbors, 2048).unwrap();

    let mut replay = ReplayCache::new(64);

    assert!(!replay.check_and_insert(&datagram), "first delivery must be accepted");
    let first_peel = onion::peel(&datagram, &b, &b_id);
    assert!(first_peel.is_some());

    assert!(
        replay.check_and_insert(&datagram),
        "second, byte-identical delivery must be flagged as a replay"
    );
    // A real dispatcher would now return without calling onion::peel at
    // all; peeling again would still succeed cryptographically (the
    // ciphertext is valid), which is exactly why the replay check must run
    // first and gate the call, not follow it.
}

#[test]
fn a_fresh_re_encryption_of_the_same_inner_payload_is_not_a_replay() {
    let b = keys_load_or_create(&InMemoryKeyStore::new()).unwrap();
    let b_id = NodeId::new("B").unwrap();

    let mut neighbors = NeighborTable::new(8);
    neighbors.upsert(b_id.clone(), b.x_pub, b.e_pub);

    let route = vec![b_id.clone()];
    let first = onion::build(&route, b"retry me", &neighbors, 2048).unwrap();
    let second = onion::build(&route, b"retry me", &neighbors, 2048).unwrap();
    assert_ne!(first, second, "fresh ephemeral key and nonce must change the ciphertext");

    let mut replay = ReplayCache::new(64);
    assert!(!replay.check_and_insert(&first));
    assert!(!replay.check_and_insert(&second));
}
