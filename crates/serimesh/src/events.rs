//! Notifications from the engine to its host (UI, logger, test harness).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Something the host may want to show.
///
/// Serializes with a `type` tag so a host can forward events as JSON lines:
///
/// ```text
/// {"type":"message_received","sender":"Bear","payload":"hi"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The visible peer set after a cycle ended. Sent every cycle, even
    /// when nothing changed.
    PeersUpdated {
        /// Names heard in the last two cycles, sorted.
        peers: BTreeSet<String>,
    },
    /// A message addressed to this node.
    MessageReceived {
        /// Who wrote it.
        sender: String,
        /// Message text.
        payload: String,
    },
    /// A message for another node was put back on the line.
    MessageRelayed {
        /// Who wrote it.
        sender: String,
        /// Who it is for.
        recipient: String,
        /// Message text.
        payload: String,
    },
    /// A local message was queued for sending.
    MessageSent {
        /// Who it is for.
        recipient: String,
        /// Message text.
        payload: String,
    },
    /// Human-readable status line.
    Status {
        /// The line to show.
        text: String,
    },
    /// This node's name changed, at startup, on collision, or on request.
    IdentityChanged {
        /// The new name.
        name: String,
    },
}

impl EngineEvent {
    /// Shorthand for a [`EngineEvent::Status`] event.
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status { text: text.into() }
    }
}

/// Sending half of the event channel. Held by the engine tasks.
pub type EventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half of the event channel. Handed to the host.
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;
