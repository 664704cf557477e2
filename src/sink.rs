//! The local-delivery seam: a `LocalSink` trait for the external byte
//! stream that terminates `next == "LOCAL"` onion payloads (the phone
//! client over Wi-Fi soft-AP, in the original). No Wi-Fi stack is
//! implemented here — `ChannelSink` stands in for tests and integration.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

/// Boundary over the local data-terminating client.
#[async_trait]
pub trait LocalSink: Send + Sync {
    /// Deliver a locally-destined payload. Returns whether delivery
    /// succeeded; a `false` return means "no sink attached, drop with
    /// warning".
    async fn deliver(&self, payload: &[u8]) -> bool;
}

/// A channel-backed sink: every delivered payload is forwarded onto an
/// `mpsc` channel the test or integrator reads from.
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl LocalSink for ChannelSink {
    async fn deliver(&self, payload: &[u8]) -> bool {
        self.tx.send(payload.to_vec()).await.is_ok()
    }
}

/// Delivers to no one. Used when a node has no attached local client;
/// every delivery attempt is dropped with a warning.
pub struct NoSink;

#[async_trait]
impl LocalSink for NoSink {
    async fn deliver(&self, payload: &[u8]) -> bool {
        warn!(bytes = payload.len(), "no local sink attached, dropping locally-destined payload");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_forwards_payload() {
        let (sink, mut rx) = ChannelSink::new(4);
        assert!(sink.deliver(b"hello").await);
        assert_eq!(rx.recv().await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn no_sink_always_reports_failure() {
        assert!(!NoSink.deliver(b"anything").await);
    }
}
