//! Classifies a reassembled link datagram as HELLO (control) or onion
//! (data) via a single leading discriminator byte, replacing the source's
//! substring scan. The byte sits outside both the signed HELLO `data` and
//! the onion layer layout — it exists purely for this classification.

use crate::config::{FRAME_KIND_HELLO, FRAME_KIND_ONION};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Hello,
    Onion,
}

/// Classify `datagram` and return its kind plus the remaining bytes past
/// the discriminator. Returns `None` for an empty buffer or an unknown
/// leading byte — callers must drop, never panic, on either.
pub fn classify(datagram: &[u8]) -> Option<(FrameKind, &[u8])> {
    let (&kind_byte, rest) = datagram.split_first()?;
    match kind_byte {
        FRAME_KIND_HELLO => Some((FrameKind::Hello, rest)),
        FRAME_KIND_ONION => Some((FrameKind::Onion, rest)),
        other => {
            trace!(kind_byte = other, "unknown frame discriminator, dropping");
            None
        }
    }
}

/// Prefix `payload` with the discriminator byte for `kind`, producing the
/// bytes handed to the fragmentation layer for transmission.
pub fn frame(kind: FrameKind, payload: &[u8]) -> Vec<u8> {
    let byte = match kind {
        FrameKind::Hello => FRAME_KIND_HELLO,
        FrameKind::Onion => FRAME_KIND_ONION,
    };
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(byte);
    out.extend_from_slice(payload);
    out
}
