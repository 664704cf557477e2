//! Wire and timing constants shared by every component, plus the node
//! identity type and runtime configuration struct.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often the HELLO task broadcasts a fresh beacon.
pub const HELLO_INTERVAL_MS: u64 = 10_000;

/// TTL stamped on an originated beacon. Each rebroadcast decrements by one;
/// a beacon received with `ttl == 0` is upserted but not forwarded further.
pub const HELLO_TTL: u8 = 5;

/// Largest datagram the onion layer will build or accept, post-assembly.
/// Chosen well under the 3840-byte ceiling implied by a 128-fragment,
/// 30-byte-payload link frame, leaving headroom for per-hop layer growth.
pub const ONION_MAX_BYTES: usize = 2048;

/// Capacity of the delay-tolerant send queue. No eviction on overflow —
/// `enqueue` simply fails closed.
pub const DTN_MAX_ITEMS: usize = 32;

/// Depth of the replay-detection digest ring.
pub const REPLAY_CACHE_SIZE: usize = 64;

/// Maximum number of neighbor table entries.
pub const MAX_NB: usize = 32;

/// Number of concurrent in-flight reassembly slots.
pub const REASSEMBLY_SLOTS: usize = 5;

/// A reassembly slot with no new fragment for this long is reclaimed.
pub const REASSEMBLY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Usable payload bytes per 32-byte link frame (2-byte header + 30 payload).
pub const FRAG_PAYLOAD_SIZE: usize = 30;

/// Upper bound on fragments per datagram — derived from the 7-bit fragment
/// index field in the frame header (bit 7 is reserved for the LAST marker).
pub const MAX_FRAGMENTS: usize = 128;

/// Interval at which the DTN task inspects the head of the queue.
pub const DTN_DRAIN_INTERVAL: Duration = Duration::from_millis(5_000);

/// Discriminator byte prefixed to every reassembled datagram so the
/// dispatcher can classify it without inspecting its contents.
pub const FRAME_KIND_HELLO: u8 = 0x01;
pub const FRAME_KIND_ONION: u8 = 0x02;

/// HKDF `info` prefix for per-hop layer key derivation; the exact hop
/// identifier is appended with no separator or length prefix.
pub const HKDF_LAYER_INFO_PREFIX: &str = "layer:";

/// Literal `next` value meaning "deliver to the local sink, do not forward".
pub const LOCAL_DESTINATION: &str = "LOCAL";

/// A node identifier used both as a routing label on the wire and as the
/// exact bytes fed into the per-hop HKDF `info` string. Bounded to keep the
/// HELLO wire record and onion `next` field small and fixed-shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

/// Longest allowed identifier, in bytes. Chosen to leave a HELLO beacon's
/// `id` field comfortably inside a single onion layer's plaintext budget.
pub const MAX_NODE_ID_BYTES: usize = 31;

#[derive(Debug, Error)]
pub enum NodeIdError {
    #[error("node id exceeds {MAX_NODE_ID_BYTES} bytes")]
    TooLong,
    #[error("node id must be ascii")]
    NotAscii,
    #[error("node id must not be empty")]
    Empty,
}

use thiserror::Error;

impl NodeId {
    pub fn new(id: impl Into<String>) -> Result<Self, NodeIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(NodeIdError::Empty);
        }
        if !id.is_ascii() {
            return Err(NodeIdError::NotAscii);
        }
        if id.len() > MAX_NODE_ID_BYTES {
            return Err(NodeIdError::TooLong);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NodeId {
    type Error = NodeIdError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeId> for String {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Runtime configuration for a [`crate::node::MeshNode`]. The constants
/// above are its defaults; tests override individual fields (shorter
/// intervals, smaller tables) without touching the wire-format constants
/// baked into [`crate::frag`] and [`crate::onion`].
#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub node_id: NodeId,
    pub data_dir: std::path::PathBuf,
    pub hello_interval: Duration,
    pub hello_ttl: u8,
    pub onion_max_bytes: usize,
    pub dtn_max_items: usize,
    pub replay_cache_size: usize,
    pub max_neighbors: usize,
    pub reassembly_slots: usize,
    pub reassembly_timeout: Duration,
    pub dtn_drain_interval: Duration,
}

impl MeshConfig {
    pub fn new(node_id: NodeId, data_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            node_id,
            data_dir: data_dir.into(),
            hello_interval: Duration::from_millis(HELLO_INTERVAL_MS),
            hello_ttl: HELLO_TTL,
            onion_max_bytes: ONION_MAX_BYTES,
            dtn_max_items: DTN_MAX_ITEMS,
            replay_cache_size: REPLAY_CACHE_SIZE,
            max_neighbors: MAX_NB,
            reassembly_slots: REASSEMBLY_SLOTS,
            reassembly_timeout: REASSEMBLY_TIMEOUT,
            dtn_drain_interval: DTN_DRAIN_INTERVAL,
        }
    }
}
