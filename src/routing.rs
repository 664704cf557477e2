//! Trivial routing policy: direct neighbor if known, else a single relay.
//!
//! Real routing is explicitly out of scope for this core — the onion layer
//! does not assume the chosen relay actually knows how to reach `dest_id`.
//! Operators should treat the relay fallback as best-effort only: if
//! `neighbor[0]` has no route to `dest_id` the datagram is silently
//! undeliverable and there is no feedback to the sender.

use crate::config::NodeId;
use crate::neighbor::NeighborTable;

/// Compute a route to `dest_id` from the current neighbor table.
///
/// Returns `[dest_id]` if `dest_id` is itself a known neighbor, or
/// `[relay, dest_id]` using any known neighbor as a one-hop relay, or
/// `None` if the table is empty.
pub fn route_to(dest_id: &NodeId, neighbors: &NeighborTable) -> Option<Vec<NodeId>> {
    if neighbors.get(dest_id.as_str()).is_some() {
        return Some(vec![dest_id.clone()]);
    }
    neighbors
        .any()
        .map(|relay| vec![relay.id.clone(), dest_id.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;
    use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};

    fn fake_keys() -> (XPublicKey, ed25519_dalek::VerifyingKey) {
        let x = StaticSecret::random_from_rng(OsRng);
        let e = SigningKey::generate(&mut OsRng);
        (XPublicKey::from(&x), e.verifying_key())
    }

    #[test]
    fn empty_table_has_no_route() {
        let table = NeighborTable::new(8);
        assert!(route_to(&NodeId::new("Z").unwrap(), &table).is_none());
    }

    #[test]
    fn direct_neighbor_is_one_hop() {
        let mut table = NeighborTable::new(8);
        let (x, e) = fake_keys();
        table.upsert(NodeId::new("Z").unwrap(), x, e);
        let route = route_to(&NodeId::new("Z").unwrap(), &table).unwrap();
        assert_eq!(route, vec![NodeId::new("Z").unwrap()]);
    }

    #[test]
    fn unknown_dest_relays_through_any_neighbor() {
        let mut table = NeighborTable::new(8);
        let (x, e) = fake_keys();
        table.upsert(NodeId::new("R").unwrap(), x, e);
        let route = route_to(&NodeId::new("Z").unwrap(), &table).unwrap();
        assert_eq!(
            route,
            vec![NodeId::new("R").unwrap(), NodeId::new("Z").unwrap()]
        );
    }
}
