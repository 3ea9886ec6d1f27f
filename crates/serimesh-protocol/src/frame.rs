//! Frame layout configuration: delimiters, recognized tags, size cap.

use serde::{Deserialize, Serialize};

use crate::{FieldKind, ProtocolError};

/// How frames are delimited and which tags a receiver understands.
///
/// The defaults describe the standard line format, `{TAG=value}`, with all
/// four tags recognized. Values are never escaped: a value containing the
/// open or close byte corrupts framing for every receiver. That is a
/// property of the protocol, kept for compatibility with existing nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Byte that starts a frame. Seeing it always resynchronizes the decoder.
    pub open_byte: u8,
    /// Byte that ends a frame.
    pub close_byte: u8,
    /// Tags the decoder classifies, checked in this order. Frames with any
    /// other tag are dropped.
    pub recognized: Vec<FieldKind>,
    /// Upper bound on a single frame, delimiters included. A partial frame
    /// that reaches this length is discarded and accumulation starts over.
    pub max_frame_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            open_byte: b'{',
            close_byte: b'}',
            recognized: FieldKind::ALL.to_vec(),
            max_frame_len: 4096,
        }
    }
}

impl FrameConfig {
    /// Checks that a codec can be built from this config.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidConfig`] when the delimiters are
    /// equal, collide with tag text or `=`, no tag is recognized, or the
    /// frame cap is too small to hold any frame.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.open_byte == self.close_byte {
            return Err(ProtocolError::InvalidConfig(format!(
                "open and close delimiters are both {:?}",
                self.open_byte as char
            )));
        }
        for byte in [self.open_byte, self.close_byte] {
            if byte.is_ascii_alphanumeric() || byte == b'=' {
                return Err(ProtocolError::InvalidConfig(format!(
                    "delimiter {:?} would collide with frame contents",
                    byte as char
                )));
            }
        }
        if self.recognized.is_empty() {
            return Err(ProtocolError::InvalidConfig(
                "no recognized tags".into(),
            ));
        }
        // Smallest frame: open + tag + '=' + close, e.g. `{TO=}`.
        if self.max_frame_len < 5 {
            return Err(ProtocolError::InvalidConfig(format!(
                "max_frame_len {} cannot hold a frame",
                self.max_frame_len
            )));
        }
        Ok(())
    }

    /// The bytes a frame of `kind` starts with, e.g. `{NAME=`.
    pub fn prefix(&self, kind: FieldKind) -> Vec<u8> {
        let tag = kind.tag().as_bytes();
        let mut prefix = Vec::with_capacity(tag.len() + 2);
        prefix.push(self.open_byte);
        prefix.extend_from_slice(tag);
        prefix.push(b'=');
        prefix
    }

    /// Rejects a value that would break framing if sent.
    ///
    /// `what` names the value in the error message ("text", "recipient").
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] when `value` contains the
    /// open or close byte.
    pub fn check_value(
        &self,
        what: &str,
        value: &str,
    ) -> Result<(), ProtocolError> {
        let bytes = value.as_bytes();
        if bytes.contains(&self.open_byte) || bytes.contains(&self.close_byte) {
            return Err(ProtocolError::InvalidMessage(format!(
                "{what} must not contain {:?} or {:?}",
                self.open_byte as char, self.close_byte as char
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = FrameConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.open_byte, b'{');
        assert_eq!(cfg.close_byte, b'}');
        assert_eq!(cfg.recognized, FieldKind::ALL.to_vec());
    }

    #[test]
    fn test_equal_delimiters_rejected() {
        let cfg = FrameConfig {
            close_byte: b'{',
            ..FrameConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ProtocolError::InvalidConfig(_))));
    }

    #[test]
    fn test_alphanumeric_delimiter_rejected() {
        let cfg = FrameConfig {
            open_byte: b'N',
            ..FrameConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_recognized_rejected() {
        let cfg = FrameConfig {
            recognized: Vec::new(),
            ..FrameConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_tiny_frame_cap_rejected() {
        let cfg = FrameConfig {
            max_frame_len: 4,
            ..FrameConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_prefix_bytes() {
        let cfg = FrameConfig::default();
        assert_eq!(cfg.prefix(FieldKind::Name), b"{NAME=");
        assert_eq!(cfg.prefix(FieldKind::To), b"{TO=");
    }

    #[test]
    fn test_check_value_rejects_delimiters() {
        let cfg = FrameConfig::default();
        assert!(cfg.check_value("text", "hello").is_ok());
        assert!(cfg.check_value("text", "").is_ok());
        let err = cfg.check_value("text", "a}b").unwrap_err();
        assert!(err.to_string().contains("text"));
        assert!(cfg.check_value("text", "{").is_err());
    }
}
