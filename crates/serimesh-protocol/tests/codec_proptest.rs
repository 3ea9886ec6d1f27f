use proptest::prelude::*;
use serimesh_protocol::{
    Envelope, EnvelopeAssembler, Field, FieldKind, FrameConfig, FrameDecoder,
    FrameEncoder,
};

/// Values that can travel unescaped: anything without a delimiter.
fn arb_value() -> impl Strategy<Value = String> {
    "[^{}]{0,40}"
}

fn arb_kind() -> impl Strategy<Value = FieldKind> {
    prop_oneof![
        Just(FieldKind::Name),
        Just(FieldKind::From),
        Just(FieldKind::To),
        Just(FieldKind::Text),
    ]
}

fn codec() -> (FrameEncoder, FrameDecoder) {
    let cfg = FrameConfig::default();
    (
        FrameEncoder::new(&cfg).expect("valid config"),
        FrameDecoder::new(cfg).expect("valid config"),
    )
}

proptest! {
    /// Encoding an envelope and feeding the bytes back one at a time
    /// reassembles the same envelope.
    #[test]
    fn envelope_survives_wire_roundtrip(
        sender in arb_value(),
        recipient in arb_value(),
        payload in arb_value(),
    ) {
        let (enc, mut dec) = codec();
        let env = Envelope::new(sender, recipient, payload);
        let bytes = enc.encode_envelope(&env);

        let mut assembler = EnvelopeAssembler::new();
        let mut out = Vec::new();
        for b in bytes {
            if let Some(field) = dec.feed(b) {
                if let Some(done) = assembler.push(field) {
                    out.push(done);
                }
            }
        }

        prop_assert_eq!(out, vec![env]);
    }

    /// Garbage in front of a frame never prevents the frame from decoding,
    /// as long as the garbage is followed by an open byte.
    #[test]
    fn leading_noise_is_resynchronized(
        noise in prop::collection::vec(any::<u8>(), 0..200),
        kind in arb_kind(),
        value in arb_value(),
    ) {
        let (enc, mut dec) = codec();
        let mut bytes = noise;
        bytes.extend(enc.encode_field(kind, &value));

        let fields = dec.feed_bytes(&bytes);
        prop_assert_eq!(fields.last(), Some(&Field::new(kind, value)));
        prop_assert_eq!(dec.buffered(), 0);
    }

    /// Reopening before the close byte discards the partial frame and
    /// yields only the frame that was actually closed.
    #[test]
    fn reopen_discards_partial_frame(
        partial in arb_value(),
        first in arb_kind(),
        second in arb_kind(),
        value in arb_value(),
    ) {
        let (enc, mut dec) = codec();
        let mut bytes = enc.encode_field(first, &partial);
        bytes.pop(); // drop the close byte: frame left open
        bytes.extend(enc.encode_field(second, &value));

        let fields = dec.feed_bytes(&bytes);
        prop_assert_eq!(fields, vec![Field::new(second, value)]);
    }

    /// The decoder never holds more than the configured cap.
    #[test]
    fn buffer_stays_bounded(bytes in prop::collection::vec(any::<u8>(), 0..2000)) {
        let cfg = FrameConfig { max_frame_len: 64, ..FrameConfig::default() };
        let mut dec = FrameDecoder::new(cfg).expect("valid config");
        for b in bytes {
            dec.feed(b);
            prop_assert!(dec.buffered() < 64);
        }
    }
}
