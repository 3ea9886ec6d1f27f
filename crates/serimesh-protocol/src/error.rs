//! Error types for the protocol layer.
//!
//! The frame decoder and encoder never fail: malformed input is dropped and
//! encoding is a plain concatenation. Errors only arise when a caller hands
//! the protocol something it cannot represent on the wire, or when the frame
//! configuration itself is unusable.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A locally originated message or name cannot be sent as-is.
    ///
    /// Typical causes: an empty recipient or text, or a value containing
    /// one of the frame delimiters (which would corrupt framing for every
    /// receiver on the line).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The frame configuration cannot be used to build a codec.
    #[error("invalid frame config: {0}")]
    InvalidConfig(String),
}
