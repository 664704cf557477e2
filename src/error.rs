use thiserror::Error;

/// Errors surfaced across the crate's fallible boundary operations.
///
/// Internal per-packet failures (a bad signature, a failed AEAD tag, a
/// malformed beacon) are never modeled here — they are logged and dropped
/// where they occur rather than propagated as a `Result` a caller must
/// handle. This enum covers only operations where the caller genuinely
/// needs to know whether the call succeeded: key persistence, onion
/// construction, queueing, and fragment transmission.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("keystore io error: {0}")]
    KeyStore(#[from] std::io::Error),

    #[error("keystore backend error: {0}")]
    Storage(String),

    #[error("no route to hop {0:?} while building onion")]
    UnknownHop(crate::config::NodeId),

    #[error("onion datagram too large: {0} bytes exceeds ONION_MAX_BYTES")]
    TooLarge(usize),

    #[error("dtn queue is full")]
    Full,

    #[error("no route available")]
    NoRoute,

    #[error("failed to send fragment over link")]
    SendFailed,
}
