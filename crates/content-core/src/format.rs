//! Payload formats and format intersection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Advanced attribute carrying video resolution constraints.
pub const ATTR_IMAGEATTR: &str = "imageattr";

/// One negotiable payload format (a codec entry of a content line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadFormat {
    /// RTP payload type number.
    pub payload_type: u8,
    /// Encoding name, e.g. "opus" or "VP8". Compared case-insensitively.
    pub name: String,
    /// Clock rate in Hz.
    pub clock_rate: u32,
    /// Channel count; `None` means unspecified and matches anything.
    pub channels: Option<u8>,
    /// Format parameters (fmtp).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,
    /// Advanced attributes such as `imageattr`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl PayloadFormat {
    pub fn new(payload_type: u8, name: impl Into<String>, clock_rate: u32) -> Self {
        Self {
            payload_type,
            name: name.into(),
            clock_rate,
            channels: None,
            parameters: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_channels(mut self, channels: u8) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Whether two formats describe the same codec.
    ///
    /// Payload type numbers are assigned per party and deliberately not
    /// compared. A missing channel count on either side matches any count.
    pub fn matches(&self, other: &PayloadFormat) -> bool {
        if !self.name.eq_ignore_ascii_case(&other.name) || self.clock_rate != other.clock_rate {
            return false;
        }
        match (self.channels, other.channels) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// Value of the `imageattr` advanced attribute, if present.
    pub fn image_attr(&self) -> Option<&str> {
        self.attributes.get(ATTR_IMAGEATTR).map(String::as_str)
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.payload_type, self.name, self.clock_rate)?;
        if let Some(channels) = self.channels {
            write!(f, "/{channels}")?;
        }
        Ok(())
    }
}

/// Intersects two format lists, preserving the order of `local`.
///
/// Local entries are kept verbatim so payload type numbers and parameters
/// stay the ones this party declared.
pub fn intersect_formats(local: &[PayloadFormat], remote: &[PayloadFormat]) -> Vec<PayloadFormat> {
    local
        .iter()
        .filter(|ours| remote.iter().any(|theirs| ours.matches(theirs)))
        .cloned()
        .collect()
}
