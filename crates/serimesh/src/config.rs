//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serimesh_protocol::{FrameConfig, ProtocolError};
use serimesh_tick::CycleConfig;
use tracing::warn;

use crate::SerimeshError;

// ---------------------------------------------------------------------------
// OverflowPolicy
// ---------------------------------------------------------------------------

/// What the outbound queue does when it is full.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the oldest queued item to make room. Announcements and
    /// relays are periodic or best-effort anyway, so the newest data wins.
    #[default]
    DropOldest,
    /// Refuse the new item with [`QueueError::Full`](crate::QueueError::Full).
    Reject,
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Everything the engine needs to know at construction.
///
/// Line settings (port, baud, parity, stop bits, byte size) are not here:
/// they belong to whoever opens the link.
///
/// Can be loaded from JSON; missing fields take their defaults:
///
/// ```rust
/// use serimesh::EngineConfig;
///
/// let cfg = EngineConfig::from_json(r#"{ "node_name": "Goat" }"#).unwrap();
/// assert_eq!(cfg.node_name.as_deref(), Some("Goat"));
/// assert_eq!(cfg.announce_interval_secs, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial node name. A random nickname is drawn when absent.
    pub node_name: Option<String>,
    /// Seconds between announcements. One cycle of the peer table.
    pub announce_interval_secs: u64,
    /// Maximum random delay before the first periodic announcement.
    pub announce_jitter_ms: u64,
    /// Frame delimiters and recognized tags.
    pub frame: FrameConfig,
    /// Maximum number of items waiting to be written.
    pub outbound_capacity: usize,
    /// Behavior of the outbound queue at capacity.
    pub overflow: OverflowPolicy,
    /// Optional idle timeout on byte reads. An elapsed timeout is not an
    /// error; the reader re-checks for a stop request and keeps reading.
    pub read_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_name: None,
            announce_interval_secs: 5,
            announce_jitter_ms: 250,
            frame: FrameConfig::default(),
            outbound_capacity: 256,
            overflow: OverflowPolicy::default(),
            read_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Parses a config from JSON.
    ///
    /// # Errors
    /// Returns [`SerimeshError::Config`] if the text is not valid JSON or
    /// a field has the wrong type.
    pub fn from_json(text: &str) -> Result<Self, SerimeshError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Clamp out-of-range numbers so the config is safe to use.
    ///
    /// Called automatically when the engine starts. Rules:
    /// - `announce_interval_secs` of 0 becomes 1.
    /// - `outbound_capacity` of 0 becomes 1.
    /// - `read_timeout_ms` of 0 is treated as no timeout.
    pub fn validated(mut self) -> Self {
        if self.announce_interval_secs == 0 {
            warn!("announce_interval_secs is 0, using 1");
            self.announce_interval_secs = 1;
        }
        if self.outbound_capacity == 0 {
            warn!("outbound_capacity is 0, using 1");
            self.outbound_capacity = 1;
        }
        if self.read_timeout_ms == Some(0) {
            self.read_timeout_ms = None;
        }
        self
    }

    /// Checks the parts of the config that cannot be clamped.
    ///
    /// # Errors
    /// Returns [`SerimeshError::Protocol`] if the frame config is unusable
    /// or `node_name` is empty or contains a frame delimiter.
    pub fn validate(&self) -> Result<(), SerimeshError> {
        self.frame.validate()?;
        if let Some(name) = &self.node_name {
            check_name(&self.frame, name)?;
        }
        Ok(())
    }

    /// Time between announcements.
    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs(self.announce_interval_secs)
    }

    /// Optional idle read timeout.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Scheduler settings derived from this config.
    pub fn cycle_config(&self) -> CycleConfig {
        CycleConfig {
            interval: self.announce_interval(),
            initial_jitter: Duration::from_millis(self.announce_jitter_ms),
        }
    }
}

/// Rejects a node name that cannot be announced.
pub(crate) fn check_name(
    frame: &FrameConfig,
    name: &str,
) -> Result<(), ProtocolError> {
    if name.is_empty() {
        return Err(ProtocolError::InvalidMessage(
            "node name must not be empty".into(),
        ));
    }
    frame.check_value("node name", name)
}
