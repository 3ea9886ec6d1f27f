//! Decides what happens to an envelope that arrived on the line.
//!
//! Every completed envelope goes exactly one of two ways:
//!
//! - addressed to this node: deliver it to the local user
//! - addressed to anyone else: put it back on the line for the next hop
//!
//! Routing is single-hop flooding. There is no sequence number or
//! duplicate suppression, so on a looped topology a relayed message can
//! come back around.

use serimesh_protocol::Envelope;
use tracing::trace;

/// Outcome of routing one inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// The recipient is this node.
    Deliver {
        /// Who wrote the message.
        sender: String,
        /// Message text.
        payload: String,
    },
    /// The recipient is some other node; re-send the envelope unchanged.
    Relay(Envelope),
}

/// Routes `envelope` relative to the node currently named `self_name`.
///
/// Names are compared byte for byte; `"goat"` and `"Goat"` are different
/// nodes. A delivered message is decoded as UTF-8, lossily; a relayed one
/// keeps its raw bytes.
pub fn route(envelope: Envelope, self_name: &str) -> RouteDecision {
    if envelope.recipient == self_name.as_bytes() {
        trace!(sender = %envelope.sender_text(), "deliver");
        RouteDecision::Deliver {
            sender: envelope.sender_text().into_owned(),
            payload: envelope.payload_text().into_owned(),
        }
    } else {
        trace!(
            sender = %envelope.sender_text(),
            recipient = %envelope.recipient_text(),
            "relay"
        );
        RouteDecision::Relay(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addressed_to_self_is_delivered() {
        let decision = route(Envelope::new("Bear", "Goat", "hi"), "Goat");
        assert_eq!(
            decision,
            RouteDecision::Deliver {
                sender: "Bear".into(),
                payload: "hi".into(),
            }
        );
    }

    #[test]
    fn test_addressed_elsewhere_is_relayed_unchanged() {
        let env = Envelope::new("Bear", "Wisp", "hi");
        assert_eq!(route(env.clone(), "Goat"), RouteDecision::Relay(env));
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let env = Envelope::new("Bear", "goat", "hi");
        assert!(matches!(route(env, "Goat"), RouteDecision::Relay(_)));
    }

    #[test]
    fn test_empty_payload_still_routes() {
        let decision = route(Envelope::new("Bear", "Goat", ""), "Goat");
        assert!(matches!(
            decision,
            RouteDecision::Deliver { payload, .. } if payload.is_empty()
        ));
    }

    #[test]
    fn test_relay_keeps_non_utf8_bytes() {
        let env = Envelope::new("Bear", "Wisp", b"caf\xe9".to_vec());
        match route(env, "Goat") {
            RouteDecision::Relay(relayed) => assert_eq!(relayed.payload, b"caf\xe9"),
            other => panic!("expected relay, got {other:?}"),
        }
    }

    #[test]
    fn test_delivered_non_utf8_is_decoded_lossily() {
        let env = Envelope::new("Bear", "Goat", b"caf\xe9".to_vec());
        assert_eq!(
            route(env, "Goat"),
            RouteDecision::Deliver {
                sender: "Bear".into(),
                payload: "caf\u{fffd}".into(),
            }
        );
    }

    #[test]
    fn test_message_from_self_to_other_is_relayed() {
        // Our own message echoed back by a neighbour is not special.
        let env = Envelope::new("Goat", "Wisp", "hi");
        assert!(matches!(route(env, "Goat"), RouteDecision::Relay(_)));
    }
}
