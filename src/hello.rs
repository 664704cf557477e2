//! HELLO beacons: periodic signed neighbor advertisements.
//!
//! The signed bytes are the compact JSON serialization of [`HelloData`].
//! `serde`'s derive emits struct fields in declaration order and
//! `serde_json`'s compact writer never reorders or pads them, so the
//! signature covers a deterministic byte string without depending on any
//! map's iteration order. Field order here — `type, id, x_pub, e_pub, ttl`
//! — must never change; it is part of the wire contract.

use crate::config::NodeId;
use crate::crypto;
use crate::identity::Identity;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use x25519_dalek::PublicKey as XPublicKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloData {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub x_pub: String,
    pub e_pub: String,
    pub ttl: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloEnvelope {
    pub data: String,
    pub sig: String,
}

/// Build the outer envelope bytes for a beacon originated (or rebroadcast)
/// by this node, signed with `e_priv`.
pub fn build(identity: &Identity, node_id: &NodeId, ttl: u8) -> Vec<u8> {
    let data = HelloData {
        kind: "HELLO".to_string(),
        id: node_id.as_str().to_string(),
        x_pub: hex::encode(identity.x_pub.as_bytes()),
        e_pub: hex::encode(identity.e_pub.as_bytes()),
        ttl,
    };
    let data_bytes = serde_json::to_vec(&data).expect("HelloData always serializes");
    let sig = crypto::sign(&identity.e_priv, &data_bytes);

    let envelope = HelloEnvelope {
        data: String::from_utf8(data_bytes).expect("serde_json output is valid utf8"),
        sig: hex::encode(sig),
    };
    serde_json::to_vec(&envelope).expect("HelloEnvelope always serializes")
}

pub struct ParsedHello {
    pub data: HelloData,
    pub x_pub: XPublicKey,
    pub e_pub: VerifyingKey,
}

#[derive(Debug, thiserror::Error)]
pub enum HelloError {
    #[error("malformed envelope or data: {0}")]
    Malformed(String),
    #[error("signature verification failed")]
    BadSignature,
    #[error("beacon originated from self")]
    SelfOrigin,
}

/// Parse and verify an inbound beacon. Returns the parsed record only if
/// its signature checks out against the `e_pub` it advertises and it did
/// not originate from `self_id`. This is trust-on-first-use: a fresh
/// identifier's signature only proves internal consistency, not that the
/// claimed identity is who it says it is.
pub fn parse_and_verify(bytes: &[u8], self_id: &NodeId) -> Result<ParsedHello, HelloError> {
    let envelope: HelloEnvelope =
        serde_json::from_slice(bytes).map_err(|e| HelloError::Malformed(e.to_string()))?;
    let data_bytes = envelope.data.as_bytes();
    let data: HelloData =
        serde_json::from_slice(data_bytes).map_err(|e| HelloError::Malformed(e.to_string()))?;

    if data.id == self_id.as_str() {
        return Err(HelloError::SelfOrigin);
    }

    let e_pub_bytes = hex::decode(&data.e_pub).map_err(|e| HelloError::Malformed(e.to_string()))?;
    let e_pub = crypto::verifying_key_from_bytes(&e_pub_bytes)
        .map_err(|_| HelloError::Malformed("bad e_pub".into()))?;

    let sig_bytes = hex::decode(&envelope.sig).map_err(|e| HelloError::Malformed(e.to_string()))?;
    crypto::verify(&e_pub, data_bytes, &sig_bytes).map_err(|_| HelloError::BadSignature)?;

    let x_pub_bytes = hex::decode(&data.x_pub).map_err(|e| HelloError::Malformed(e.to_string()))?;
    let x_pub_arr: [u8; 32] = x_pub_bytes
        .try_into()
        .map_err(|_| HelloError::Malformed("bad x_pub length".into()))?;
    let x_pub = XPublicKey::from(x_pub_arr);

    Ok(ParsedHello { data, x_pub, e_pub })
}

/// Build a rebroadcast of an inbound beacon, re-signed by this node with
/// `ttl - 1`. Returns `None` if the beacon's TTL was already exhausted.
/// The rebroadcast is attributed to the forwarder, not the origin: this
/// preserves the original protocol's behavior rather than "fixing" it.
pub fn rebroadcast(parsed: &ParsedHello, identity: &Identity) -> Option<Vec<u8>> {
    if parsed.data.ttl == 0 {
        debug!(id = %parsed.data.id, "beacon ttl exhausted, not rebroadcasting");
        return None;
    }
    let data = HelloData {
        kind: "HELLO".to_string(),
        id: parsed.data.id.clone(),
        x_pub: parsed.data.x_pub.clone(),
        e_pub: parsed.data.e_pub.clone(),
        ttl: parsed.data.ttl - 1,
    };
    let data_bytes = serde_json::to_vec(&data).expect("HelloData always serializes");
    let sig = crypto::sign(&identity.e_priv, &data_bytes);
    let envelope = HelloEnvelope {
        data: String::from_utf8(data_bytes).expect("serde_json output is valid utf8"),
        sig: hex::encode(sig),
    };
    Some(serde_json::to_vec(&envelope).expect("HelloEnvelope always serializes"))
}
