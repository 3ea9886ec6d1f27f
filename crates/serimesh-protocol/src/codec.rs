//! Frame decoder and encoder.
//!
//! The decoder turns an unbounded, possibly noisy byte stream into
//! [`Field`]s one byte at a time. It never fails: anything it cannot
//! classify is dropped. The rules, per byte, highest priority first:
//!
//! 1. The open byte resets the buffer to just that byte (resynchronize).
//! 2. Any other byte is appended.
//! 3. On the close byte the buffer is one frame. The first recognized
//!    prefix (`{NAME=`, `{FROM=`, `{TO=`, `{TEXT=`) decides the kind and
//!    the value is everything after `=`. Unrecognized frames are dropped.
//!    Either way the buffer is emptied.
//! 4. A partial frame that reaches `max_frame_len` is discarded.
//!
//! The encoder is the exact inverse for well-formed values: it concatenates
//! delimiters, tag, `=` and value with no escaping.

use tracing::trace;

use crate::{Envelope, Field, FieldKind, FrameConfig, ProtocolError};

// ---------------------------------------------------------------------------
// FrameDecoder
// ---------------------------------------------------------------------------

/// Reassembles fields from a byte stream.
///
/// Holds one accumulation buffer. Feed it every byte read from the line,
/// in order.
///
/// ```rust
/// use serimesh_protocol::{FieldKind, FrameConfig, FrameDecoder};
///
/// let mut decoder = FrameDecoder::new(FrameConfig::default()).unwrap();
/// let fields = decoder.feed_bytes(b"{NAME=A{NAME=B}");
/// assert_eq!(fields.len(), 1);
/// assert_eq!(fields[0].kind, FieldKind::Name);
/// assert_eq!(fields[0].value, b"B");
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    open_byte: u8,
    close_byte: u8,
    max_frame_len: usize,
    /// Recognized prefixes in checking order, built once from the config.
    prefixes: Vec<(FieldKind, Vec<u8>)>,
    buf: Vec<u8>,
    dropped: u64,
}

impl FrameDecoder {
    /// Creates a decoder for the given frame layout.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidConfig`] if the config fails
    /// [`FrameConfig::validate`].
    pub fn new(config: FrameConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        let prefixes = config
            .recognized
            .iter()
            .map(|&kind| (kind, config.prefix(kind)))
            .collect();
        Ok(Self {
            open_byte: config.open_byte,
            close_byte: config.close_byte,
            max_frame_len: config.max_frame_len,
            prefixes,
            buf: Vec::with_capacity(64),
            dropped: 0,
        })
    }

    /// Feeds one byte. Returns a field when this byte completed one.
    pub fn feed(&mut self, byte: u8) -> Option<Field> {
        if byte == self.open_byte {
            if self.buf.len() > 1 {
                trace!(len = self.buf.len(), "partial frame abandoned on resync");
            }
            self.buf.clear();
            self.buf.push(byte);
            return None;
        }

        self.buf.push(byte);

        if byte == self.close_byte {
            let field = self.classify();
            if field.is_none() {
                self.dropped += 1;
                trace!(
                    frame = %String::from_utf8_lossy(&self.buf),
                    "unrecognized frame dropped"
                );
            }
            self.buf.clear();
            return field;
        }

        if self.buf.len() >= self.max_frame_len {
            self.dropped += 1;
            trace!(
                max = self.max_frame_len,
                "frame exceeded size cap, buffer reset"
            );
            self.buf.clear();
        }

        None
    }

    /// Feeds a run of bytes, collecting every field they complete.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<Field> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Number of bytes currently buffered (a frame in progress).
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Frames discarded so far: unrecognized, or over the size cap.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Classifies the complete frame in `buf` (which ends in the close byte).
    fn classify(&self) -> Option<Field> {
        let (kind, prefix) = self
            .prefixes
            .iter()
            .find(|(_, prefix)| self.buf.starts_with(prefix))?;
        let value = &self.buf[prefix.len()..self.buf.len() - 1];
        Some(Field {
            kind: *kind,
            value: value.to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// FrameEncoder
// ---------------------------------------------------------------------------

/// Serializes fields, envelopes and announcements into wire bytes.
///
/// Cheap to clone; every task that sends gets its own copy.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    open_byte: u8,
    close_byte: u8,
}

impl FrameEncoder {
    /// Creates an encoder for the given frame layout.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidConfig`] if the config fails
    /// [`FrameConfig::validate`].
    pub fn new(config: &FrameConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        Ok(Self {
            open_byte: config.open_byte,
            close_byte: config.close_byte,
        })
    }

    /// Encodes a single frame `{TAG=value}`. The value is written as-is.
    pub fn encode_field(&self, kind: FieldKind, value: impl AsRef<[u8]>) -> Vec<u8> {
        let value = value.as_ref();
        let mut out = Vec::with_capacity(kind.tag().len() + value.len() + 3);
        self.write_field(&mut out, kind, value);
        out
    }

    /// Encodes `{FROM=<sender>}{TO=<recipient>}{TEXT=<payload>}`.
    ///
    /// Values are copied byte for byte, so a decoded envelope re-encodes to
    /// exactly the bytes it was read from.
    pub fn encode_envelope(&self, envelope: &Envelope) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            envelope.sender.len()
                + envelope.recipient.len()
                + envelope.payload.len()
                + 17,
        );
        self.write_field(&mut out, FieldKind::From, &envelope.sender);
        self.write_field(&mut out, FieldKind::To, &envelope.recipient);
        self.write_field(&mut out, FieldKind::Text, &envelope.payload);
        out
    }

    /// Encodes a presence announcement, `{NAME=<name>}`.
    pub fn encode_announcement(&self, name: &str) -> Vec<u8> {
        self.encode_field(FieldKind::Name, name.as_bytes())
    }

    fn write_field(&self, out: &mut Vec<u8>, kind: FieldKind, value: &[u8]) {
        out.push(self.open_byte);
        out.extend_from_slice(kind.tag().as_bytes());
        out.push(b'=');
        out.extend_from_slice(value);
        out.push(self.close_byte);
    }
}
