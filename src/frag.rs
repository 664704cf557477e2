//! Fragmentation over fixed 32-byte link frames and bounded reassembly.
//!
//! Frame layout: byte 0 is `packet_id`, byte 1 packs the LAST marker into
//! bit 7 and the fragment index into bits 6..0, bytes 2..32 are payload.

use crate::config::{FRAG_PAYLOAD_SIZE, MAX_FRAGMENTS};
use std::time::Instant;
use tracing::{debug, trace, warn};

pub const LINK_FRAME_LEN: usize = 32;
const LAST_BIT: u8 = 0x80;
const INDEX_MASK: u8 = 0x7f;

pub type LinkFrame = [u8; LINK_FRAME_LEN];

/// Split `datagram` into link frames. Fails if the datagram would need more
/// than [`MAX_FRAGMENTS`] frames — the 7-bit index field cannot address
/// more.
pub fn fragment(packet_id: u8, datagram: &[u8]) -> Option<Vec<LinkFrame>> {
    let n_frags = datagram.len().div_ceil(FRAG_PAYLOAD_SIZE).max(1);
    if n_frags > MAX_FRAGMENTS {
        warn!(n_frags, "datagram needs more fragments than the frame header can address");
        return None;
    }

    let mut frames = Vec::with_capacity(n_frags);
    if datagram.is_empty() {
        let mut frame = [0u8; LINK_FRAME_LEN];
        frame[1] = LAST_BIT;
        frames.push(frame);
        return Some(frames);
    }

    for (index, chunk) in datagram.chunks(FRAG_PAYLOAD_SIZE).enumerate() {
        let mut frame = [0u8; LINK_FRAME_LEN];
        frame[0] = packet_id;
        let is_last = index + 1 == n_frags;
        frame[1] = (index as u8 & INDEX_MASK) | if is_last { LAST_BIT } else { 0 };
        frame[2..2 + chunk.len()].copy_from_slice(chunk);
        frames.push(frame);
    }

    Some(frames)
}

struct Slot {
    packet_id: u8,
    total_frags: Option<u8>,
    received: [bool; MAX_FRAGMENTS],
    buf: Vec<u8>,
    last_frag_time: Instant,
    in_use: bool,
}

impl Slot {
    fn empty() -> Self {
        Self {
            packet_id: 0,
            total_frags: None,
            received: [false; MAX_FRAGMENTS],
            buf: Vec::new(),
            last_frag_time: Instant::now(),
            in_use: false,
        }
    }

    fn received_count(&self) -> usize {
        self.received.iter().filter(|b| **b).count()
    }

    fn is_complete(&self) -> bool {
        match self.total_frags {
            Some(total) => (0..total as usize).all(|i| self.received[i]),
            None => false,
        }
    }
}

/// Fixed-capacity pool of in-flight reassembly slots, one per concurrently
/// in-flight `packet_id`. Slots that receive no fragment for
/// `reassembly_timeout` are reclaimed for reuse.
pub struct ReassemblyPool {
    slots: Vec<Slot>,
    timeout: std::time::Duration,
}

impl ReassemblyPool {
    pub fn new(capacity: usize, timeout: std::time::Duration) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::empty()).collect(),
            timeout,
        }
    }

    /// Feed one inbound link frame. Returns the full reassembled datagram
    /// once every fragment of its packet has arrived. The returned buffer is
    /// padded to `total_frags * FRAG_PAYLOAD_SIZE` bytes — callers must
    /// tolerate trailing zero padding, since the true length of the final
    /// fragment is not signalled on the wire.
    pub fn receive(&mut self, frame: &LinkFrame) -> Option<Vec<u8>> {
        self.reclaim_expired();

        let packet_id = frame[0];
        let header = frame[1];
        let index = (header & INDEX_MASK) as usize;
        let is_last = header & LAST_BIT != 0;
        let payload = &frame[2..LINK_FRAME_LEN];

        let slot_idx = self.find_or_allocate(packet_id)?;
        let slot = &mut self.slots[slot_idx];

        if slot.received[index] {
            trace!(packet_id, index, "duplicate fragment, ignoring");
            return None;
        }

        let needed_len = (index + 1) * FRAG_PAYLOAD_SIZE;
        if slot.buf.len() < needed_len {
            slot.buf.resize(needed_len, 0);
        }
        slot.buf[index * FRAG_PAYLOAD_SIZE..needed_len].copy_from_slice(payload);
        slot.received[index] = true;
        slot.last_frag_time = Instant::now();

        if is_last {
            slot.total_frags = Some((index + 1) as u8);
        }

        if slot.is_complete() {
            let total = slot.total_frags.unwrap() as usize;
            let out_len = total * FRAG_PAYLOAD_SIZE;
            slot.buf.resize(out_len, 0);
            let out = std::mem::take(&mut slot.buf);
            debug!(packet_id, total, "datagram reassembled");
            self.slots[slot_idx] = Slot::empty();
            return Some(out);
        }

        None
    }

    fn find_or_allocate(&mut self, packet_id: u8) -> Option<usize> {
        if let Some(idx) = self
            .slots
            .iter()
            .position(|s| s.in_use && s.packet_id == packet_id)
        {
            return Some(idx);
        }
        if let Some(idx) = self.slots.iter().position(|s| !s.in_use) {
            self.slots[idx] = Slot {
                packet_id,
                in_use: true,
                ..Slot::empty()
            };
            return Some(idx);
        }
        warn!(packet_id, "reassembly pool full, dropping fragment");
        None
    }

    fn reclaim_expired(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.in_use && slot.received_count() > 0 && slot.last_frag_time.elapsed() > self.timeout {
                debug!(packet_id = slot.packet_id, "reassembly slot timed out, reclaiming");
                *slot = Slot::empty();
            }
        }
    }
}
