//! Media types negotiable in a Jingle session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of media a content line carries.
///
/// Desktop sharing is not a separate media type: it travels as
/// [`MediaType::Video`] with a remote-control marker on the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
    /// Application data channels.
    Data,
}

impl MediaType {
    /// All media types, in the order offers enumerate them.
    pub const ALL: [MediaType; 3] = [MediaType::Audio, MediaType::Video, MediaType::Data];

    /// Canonical lowercase name, as used for content names and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
            MediaType::Data => "data",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized media type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media type: {0}")]
pub struct UnknownMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "audio" => Ok(MediaType::Audio),
            "video" => Ok(MediaType::Video),
            "data" => Ok(MediaType::Data),
            other => Err(UnknownMediaType(other.to_string())),
        }
    }
}
