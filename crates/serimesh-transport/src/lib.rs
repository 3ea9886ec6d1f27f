//! Transport abstraction layer for serimesh.
//!
//! Provides the [`ByteSource`] and [`ByteSink`] traits that abstract over
//! whatever carries the bytes: a serial port, a serial-over-TCP bridge, or
//! an in-memory pipe in tests. Port enumeration and line settings (baud,
//! parity, stop bits) belong to whoever opens the link, not to this crate.
//!
//! [`split`] adapts any tokio `AsyncRead + AsyncWrite` stream into a
//! source/sink pair.

mod error;
mod stream;

pub use error::TransportError;
pub use stream::{split, StreamSink, StreamSource};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a link, used to tag log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

impl LinkId {
    /// Creates a new `LinkId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// The receiving half of a link: yields one byte at a time.
pub trait ByteSource: Send + 'static {
    /// Waits for the next byte.
    ///
    /// Returns `Ok(None)` when the link is cleanly closed. The future must
    /// be cancel-safe: dropping it before it resolves must not lose a byte,
    /// because the engine abandons a pending read when it is stopped.
    fn read_byte(
        &mut self,
    ) -> impl Future<Output = Result<Option<u8>, TransportError>> + Send;

    /// Returns the identifier of the link this source reads from.
    fn id(&self) -> LinkId;
}

/// The sending half of a link.
pub trait ByteSink: Send + 'static {
    /// Writes all of `data` and flushes it to the line.
    fn write_bytes(
        &mut self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Flushes and releases the sink.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the identifier of the link this sink writes to.
    fn id(&self) -> LinkId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_id_display() {
        let id = LinkId::new(7);
        assert_eq!(id.to_string(), "link-7");
    }

    #[test]
    fn test_link_id_equality() {
        assert_eq!(LinkId::new(1), LinkId::new(1));
        assert_ne!(LinkId::new(1), LinkId::new(2));
    }
}
