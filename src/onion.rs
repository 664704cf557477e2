//! Layered (onion) encryption: building a source-routed nested envelope
//! outbound, and peeling one layer inbound.

use crate::config::{NodeId, HKDF_LAYER_INFO_PREFIX, LOCAL_DESTINATION};
use crate::crypto::{self, AEAD_NONCE_LEN};
use crate::error::MeshError;
use crate::identity::Identity;
use crate::neighbor::NeighborTable;
use serde::{Deserialize, Serialize};
use tracing::warn;
use x25519_dalek::PublicKey as XPublicKey;

#[derive(Serialize, Deserialize)]
struct LayerPlaintext {
    next: String,
    inner: String,
}

/// Build a layered onion datagram for `route`, wrapping `inner_payload` so
/// that only the last hop in `route` sees `next == "LOCAL"`. Every
/// intermediate hop must have a known `x_pub` in `neighbors`.
pub fn build(
    route: &[NodeId],
    inner_payload: &[u8],
    neighbors: &NeighborTable,
    max_bytes: usize,
) -> Result<Vec<u8>, MeshError> {
    let mut payload = inner_payload.to_vec();

    for (i, hop) in route.iter().enumerate().rev() {
        let hop_x_pub = neighbors
            .get(hop.as_str())
            .map(|n| n.x_pub)
            .ok_or_else(|| MeshError::UnknownHop(hop.clone()))?;

        let next = if i + 1 < route.len() {
            route[i + 1].as_str().to_string()
        } else {
            LOCAL_DESTINATION.to_string()
        };

        let plain = LayerPlaintext {
            next,
            inner: hex::encode(&payload),
        };
        let plain_bytes = serde_json::to_vec(&plain).expect("LayerPlaintext always serializes");

        let eph = crypto::x25519_ephemeral();
        let shared = eph.shared_with(&hop_x_pub);
        let key = hkdf_layer_key(&shared, hop.as_str());
        let nonce = crypto::random_nonce();
        let ct = crypto::aead_seal(&key, &nonce, &plain_bytes);

        let mut layer = Vec::with_capacity(32 + AEAD_NONCE_LEN + ct.len());
        layer.extend_from_slice(eph.public.as_bytes());
        layer.extend_from_slice(&nonce);
        layer.extend_from_slice(&ct);

        if layer.len() > max_bytes {
            return Err(MeshError::TooLarge(layer.len()));
        }
        payload = layer;
    }

    Ok(payload)
}

pub enum Peeled {
    /// This hop is the final destination; deliver to the local sink.
    Local(Vec<u8>),
    /// Forward the already-layered `payload` to `next` unchanged — it
    /// carries its own complete envelope for the following hop.
    Forward { next: NodeId, payload: Vec<u8> },
}

/// Peel one onion layer addressed to this node. Any structural, AEAD, or
/// parse failure returns `None`: per the crate's error policy these are
/// silent drops, never propagated as an error to the caller.
pub fn peel(datagram: &[u8], identity: &Identity, self_id: &NodeId) -> Option<Peeled> {
    if datagram.len() < 32 + AEAD_NONCE_LEN {
        warn!(len = datagram.len(), "onion datagram shorter than minimum layer size");
        return None;
    }

    let epk_bytes: [u8; 32] = datagram[0..32].try_into().ok()?;
    let epk = XPublicKey::from(epk_bytes);
    let nonce: [u8; AEAD_NONCE_LEN] = datagram[32..32 + AEAD_NONCE_LEN].try_into().ok()?;
    let ct = &datagram[32 + AEAD_NONCE_LEN..];

    let shared = crypto::x25519_shared(&identity.x_priv, &epk);
    let key = hkdf_layer_key(&shared, self_id.as_str());

    let plain_bytes = match crypto::aead_open(&key, &nonce, ct) {
        Ok(p) => p,
        Err(_) => {
            warn!("onion layer failed to decrypt, dropping");
            return None;
        }
    };

    let plain: LayerPlaintext = match serde_json::from_slice(&plain_bytes) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "onion layer plaintext malformed, dropping");
            return None;
        }
    };

    let inner = match hex::decode(&plain.inner) {
        Ok(i) => i,
        Err(e) => {
            warn!(error = %e, "onion layer inner hex malformed, dropping");
            return None;
        }
    };

    if plain.next == LOCAL_DESTINATION {
        Some(Peeled::Local(inner))
    } else {
        match NodeId::new(plain.next) {
            Ok(next) => Some(Peeled::Forward { next, payload: inner }),
            Err(e) => {
                warn!(error = %e, "onion layer next-hop id invalid, dropping");
                None
            }
        }
    }
}

fn hkdf_layer_key(shared: &[u8; 32], hop_id: &str) -> [u8; 32] {
    let mut info = Vec::with_capacity(HKDF_LAYER_INFO_PREFIX.len() + hop_id.len());
    info.extend_from_slice(HKDF_LAYER_INFO_PREFIX.as_bytes());
    info.extend_from_slice(hop_id.as_bytes());
    crypto::hkdf_sha256(shared, &info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{keys_load_or_create, InMemoryKeyStore};

    fn identity() -> Identity {
        keys_load_or_create(&InMemoryKeyStore::new()).unwrap()
    }

    #[test]
    fn two_hop_round_trip() {
        let b_identity = identity();
        let c_identity = identity();
        let b_id = NodeId::new("B").unwrap();
        let c_id = NodeId::new("C").unwrap();

        let mut neighbors = NeighborTable::new(8);
        neighbors.upsert(b_id.clone(), b_identity.x_pub, b_identity.e_pub);
        neighbors.upsert(c_id.clone(), c_identity.x_pub, c_identity.e_pub);

        let inner = vec![0x01, 0x02, 0x03];
        let route = vec![b_id.clone(), c_id.clone()];
        let outer = build(&route, &inner, &neighbors, 2048).unwrap();

        let at_b = peel(&outer, &b_identity, &b_id).unwrap();
        let forwarded = match at_b {
            Peeled::Forward { next, payload } => {
                assert_eq!(next, c_id);
                payload
            }
            Peeled::Local(_) => panic!("expected forward at B"),
        };

        let at_c = peel(&forwarded, &c_identity, &c_id).unwrap();
        match at_c {
            Peeled::Local(payload) => assert_eq!(payload, inner),
            Peeled::Forward { .. } => panic!("expected local delivery at C"),
        }
    }

    #[test]
    fn build_fails_for_unknown_hop() {
        let neighbors = NeighborTable::new(8);
        let route = vec![NodeId::new("ghost").unwrap()];
        let result = build(&route, b"payload", &neighbors, 2048);
        assert!(matches!(result, Err(MeshError::UnknownHop(_))));
    }

    #[test]
    fn peel_rejects_garbage() {
        let a = identity();
        let a_id = NodeId::new("A").unwrap();
        let garbage = vec![0xffu8; 10];
        assert!(peel(&garbage, &a, &a_id).is_none());

        let garbage2 = crypto::random_bytes(200);
        assert!(peel(&garbage2, &a, &a_id).is_none());
    }

    #[test]
    fn peel_at_wrong_hop_fails_silently() {
        let b_identity = identity();
        let wrong_identity = identity();
        let b_id = NodeId::new("B").unwrap();

        let mut neighbors = NeighborTable::new(8);
        neighbors.upsert(b_id.clone(), b_identity.x_pub, b_identity.e_pub);

        let route = vec![b_id.clone()];
        let outer = build(&route, b"secret", &neighbors, 2048).unwrap();

        assert!(peel(&outer, &wrong_identity, &b_id).is_none());
    }
}
