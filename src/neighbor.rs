//! Neighbor table: the set of peers this node has seen a validly signed
//! HELLO from. Trust-on-first-use, keyed by node id, bounded with oldest-
//! first eviction on overflow.

use crate::config::NodeId;
use ed25519_dalek::VerifyingKey;
use std::time::Instant;
use tracing::debug;
use x25519_dalek::PublicKey as XPublicKey;

/// One entry in the neighbor table. `last_seen` drives LRU eviction.
#[derive(Clone)]
pub struct Neighbor {
    pub id: NodeId,
    pub x_pub: XPublicKey,
    pub e_pub: VerifyingKey,
    pub last_seen: Instant,
}

pub struct NeighborTable {
    entries: Vec<Neighbor>,
    capacity: usize,
}

impl NeighborTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert or refresh a neighbor record. If the table is full and `id`
    /// is new, the oldest entry (by `last_seen`) is evicted to make room —
    /// acceptable churn for a MAX_NB-sized table that otherwise never
    /// shrinks.
    pub fn upsert(&mut self, id: NodeId, x_pub: XPublicKey, e_pub: VerifyingKey) {
        let now = Instant::now();
        if let Some(existing) = self.entries.iter_mut().find(|n| n.id == id) {
            existing.x_pub = x_pub;
            existing.e_pub = e_pub;
            existing.last_seen = now;
            debug!(id = %existing.id, "neighbor refreshed");
            return;
        }

        if self.entries.len() >= self.capacity {
            if let Some(oldest_idx) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, n)| n.last_seen)
                .map(|(idx, _)| idx)
            {
                let evicted = self.entries.swap_remove(oldest_idx);
                debug!(id = %evicted.id, "neighbor evicted to make room");
            }
        }

        debug!(%id, "neighbor added");
        self.entries.push(Neighbor {
            id,
            x_pub,
            e_pub,
            last_seen: now,
        });
    }

    pub fn get(&self, id: &str) -> Option<&Neighbor> {
        self.entries.iter().find(|n| n.id.as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Neighbor> {
        self.entries.iter()
    }

    /// Any neighbor at all, for the trivial single-relay routing fallback.
    /// Picks the first entry; any deterministic choice is acceptable here.
    pub fn any(&self) -> Option<&Neighbor> {
        self.entries.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;
    use x25519_dalek::StaticSecret;

    fn fake_keys() -> (XPublicKey, VerifyingKey) {
        let x = StaticSecret::random_from_rng(OsRng);
        let e = SigningKey::generate(&mut OsRng);
        (XPublicKey::from(&x), e.verifying_key())
    }

    #[test]
    fn upsert_then_get_roundtrips() {
        let mut table = NeighborTable::new(4);
        let (x_pub, e_pub) = fake_keys();
        table.upsert(NodeId::new("A").unwrap(), x_pub, e_pub);
        let n = table.get("A").unwrap();
        assert_eq!(n.x_pub.as_bytes(), x_pub.as_bytes());
    }

    #[test]
    fn ids_are_unique_after_repeated_upsert() {
        let mut table = NeighborTable::new(4);
        let (x_pub, e_pub) = fake_keys();
        table.upsert(NodeId::new("A").unwrap(), x_pub, e_pub);
        table.upsert(NodeId::new("A").unwrap(), x_pub, e_pub);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut table = NeighborTable::new(2);
        let (x_pub, e_pub) = fake_keys();
        table.upsert(NodeId::new("A").unwrap(), x_pub, e_pub);
        std::thread::sleep(std::time::Duration::from_millis(2));
        table.upsert(NodeId::new("B").unwrap(), x_pub, e_pub);
        std::thread::sleep(std::time::Duration::from_millis(2));
        table.upsert(NodeId::new("C").unwrap(), x_pub, e_pub);
        assert_eq!(table.len(), 2);
        assert!(table.get("A").is_none());
        assert!(table.get("B").is_some());
        assert!(table.get("C").is_some());
    }
}
