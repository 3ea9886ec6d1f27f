//! Unified error type for serimesh.

use serimesh_protocol::ProtocolError;
use serimesh_transport::TransportError;

/// Errors from the outbound queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue is at capacity and its policy is to reject new items.
    #[error("outbound queue full ({0} items)")]
    Full(usize),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SerimeshError {
    /// The link failed or closed (read, write, end of stream).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message, name, or frame config was rejected.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The outbound queue refused an item.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A config file could not be parsed.
    #[error("invalid config file: {0}")]
    Config(#[from] serde_json::Error),

    /// The engine has stopped and no longer accepts work.
    #[error("engine is stopped")]
    Stopped,

    /// An engine task panicked.
    #[error("engine task failed: {0}")]
    TaskFailed(String),
}
