//! Builds envelopes out of consecutive FROM / TO / TEXT fields.

use tracing::debug;

use crate::{Envelope, Field, FieldKind};

/// Scratch state for the envelope currently arriving on the line.
///
/// FROM and TO fill their slot (a repeat overwrites the previous value).
/// TEXT completes the envelope, provided both other slots were filled since
/// the last reset; otherwise the fragment is dropped. Either way the slots
/// are cleared, so a sender or recipient never leaks into the next message.
#[derive(Debug, Default)]
pub struct EnvelopeAssembler {
    sender: Option<Vec<u8>>,
    recipient: Option<Vec<u8>>,
}

impl EnvelopeAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one field. Returns the envelope when this field completed it.
    ///
    /// NAME fields are not part of an envelope and leave the state untouched.
    pub fn push(&mut self, field: Field) -> Option<Envelope> {
        match field.kind {
            FieldKind::From => {
                self.sender = Some(field.value);
                None
            }
            FieldKind::To => {
                self.recipient = Some(field.value);
                None
            }
            FieldKind::Text => {
                let sender = self.sender.take();
                let recipient = self.recipient.take();
                match (sender, recipient) {
                    (Some(sender), Some(recipient)) => Some(Envelope {
                        sender,
                        recipient,
                        payload: field.value,
                    }),
                    (sender, recipient) => {
                        debug!(
                            has_sender = sender.is_some(),
                            has_recipient = recipient.is_some(),
                            "incomplete envelope dropped"
                        );
                        None
                    }
                }
            }
            FieldKind::Name => None,
        }
    }

    /// Whether any slot holds a value.
    pub fn is_pending(&self) -> bool {
        self.sender.is_some() || self.recipient.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from(v: &str) -> Field {
        Field::new(FieldKind::From, v)
    }
    fn to(v: &str) -> Field {
        Field::new(FieldKind::To, v)
    }
    fn text(v: &str) -> Field {
        Field::new(FieldKind::Text, v)
    }

    #[test]
    fn test_complete_sequence_yields_envelope() {
        let mut a = EnvelopeAssembler::new();
        assert!(a.push(from("Bob")).is_none());
        assert!(a.push(to("Alice")).is_none());
        assert_eq!(a.push(text("hi")), Some(Envelope::new("Bob", "Alice", "hi")));
        assert!(!a.is_pending());
    }

    #[test]
    fn test_out_of_order_fields_last_write_wins() {
        let mut a = EnvelopeAssembler::new();
        a.push(to("Carol"));
        a.push(from("Bob"));
        a.push(to("Alice"));
        assert_eq!(a.push(text("x")), Some(Envelope::new("Bob", "Alice", "x")));
    }

    #[test]
    fn test_reset_after_dispatch_prevents_stale_fields() {
        let mut a = EnvelopeAssembler::new();
        a.push(from("Bob"));
        a.push(to("Alice"));
        a.push(text("first"));

        // Only TO arrives for the second message: must not reuse "Bob".
        a.push(to("Alice"));
        assert!(a.push(text("second")).is_none());
    }

    #[test]
    fn test_text_without_header_dropped() {
        let mut a = EnvelopeAssembler::new();
        assert!(a.push(text("orphan")).is_none());
    }

    #[test]
    fn test_name_field_ignored() {
        let mut a = EnvelopeAssembler::new();
        a.push(from("Bob"));
        a.push(Field::new(FieldKind::Name, "Goat"));
        a.push(to("Alice"));
        assert_eq!(a.push(text("hi")), Some(Envelope::new("Bob", "Alice", "hi")));
    }

    #[test]
    fn test_empty_values_still_complete() {
        let mut a = EnvelopeAssembler::new();
        a.push(from(""));
        a.push(to(""));
        assert_eq!(a.push(text("")), Some(Envelope::new("", "", "")));
    }

    #[test]
    fn test_pending_until_text_arrives() {
        let mut a = EnvelopeAssembler::new();
        a.push(from("Bob"));
        assert!(a.is_pending());
        a.push(text("orphan"));
        assert!(!a.is_pending());
    }

    #[test]
    fn test_raw_bytes_carried_into_envelope() {
        let mut a = EnvelopeAssembler::new();
        a.push(Field::new(FieldKind::From, b"Jos\xe9".to_vec()));
        a.push(to("Carol"));
        let env = a.push(Field::new(FieldKind::Text, b"\x80".to_vec())).unwrap();
        assert_eq!(env.sender, b"Jos\xe9");
        assert_eq!(env.payload, b"\x80");
    }
}
