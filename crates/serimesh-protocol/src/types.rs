//! Core protocol types for the serimesh wire format.
//!
//! Everything that travels on the serial line is a sequence of frames of
//! the form `{TAG=value}`. A classified frame is a [`Field`]; three fields
//! in a row (FROM, TO, TEXT) make up one user message, the [`Envelope`].

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FieldKind
// ---------------------------------------------------------------------------

/// The tag of a frame, i.e. the text between the open delimiter and `=`.
///
/// `#[serde(rename_all = "UPPERCASE")]` makes config files spell the kinds
/// the same way they appear on the wire (`"NAME"`, `"FROM"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldKind {
    /// Presence announcement: `{NAME=<node>}`.
    Name,
    /// Sender of a message: `{FROM=<node>}`.
    From,
    /// Recipient of a message: `{TO=<node>}`.
    To,
    /// Message body: `{TEXT=<payload>}`. Completes an envelope.
    Text,
}

impl FieldKind {
    /// Every kind, in the order receivers check for them.
    pub const ALL: [FieldKind; 4] = [
        FieldKind::Name,
        FieldKind::From,
        FieldKind::To,
        FieldKind::Text,
    ];

    /// The tag text as it appears on the wire.
    pub fn tag(self) -> &'static str {
        match self {
            FieldKind::Name => "NAME",
            FieldKind::From => "FROM",
            FieldKind::To => "TO",
            FieldKind::Text => "TEXT",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// A single classified frame: its kind plus every byte between `=` and
/// the close delimiter.
///
/// The value is kept exactly as it arrived. Nodes on the line are free to
/// send any 8-bit text, so a relay must not normalize it; decode with
/// [`Field::text`] only for display.
///
/// An empty value (`{TEXT=}`) is legal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Which tag the frame carried.
    pub kind: FieldKind,
    /// The frame's value, byte for byte.
    pub value: Vec<u8>,
}

impl Field {
    /// Creates a field of the given kind.
    pub fn new(kind: FieldKind, value: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// The value decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.text())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One user message: who sent it, who it is for, and what it says.
///
/// On the wire an envelope is always exactly three consecutive frames,
/// `{FROM=<sender>}{TO=<recipient>}{TEXT=<payload>}`. Parts are raw bytes
/// so that re-encoding a received envelope reproduces it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Envelope {
    /// Name of the node that wrote the message.
    pub sender: Vec<u8>,
    /// Name of the node the message is addressed to.
    pub recipient: Vec<u8>,
    /// Message text.
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Creates an envelope from its three parts.
    pub fn new(
        sender: impl Into<Vec<u8>>,
        recipient: impl Into<Vec<u8>>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            payload: payload.into(),
        }
    }

    /// Sender name, lossily decoded.
    pub fn sender_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.sender)
    }

    /// Recipient name, lossily decoded.
    pub fn recipient_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.recipient)
    }

    /// Message text, lossily decoded.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<From: {}> <To: {}> {}",
            self.sender_text(),
            self.recipient_text(),
            self.payload_text()
        )
    }
}
