/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The link was closed by the other end.
    #[error("link closed: {0}")]
    Closed(String),

    /// Reading from the link failed.
    #[error("read failed: {0}")]
    ReadFailed(#[source] std::io::Error),

    /// Writing to the link failed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),
}
