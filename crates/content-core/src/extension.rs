//! RTP header extensions.

use crate::direction::MediaDirection;
use serde::{Deserialize, Serialize};

/// One RTP header extension entry of a content line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpExtension {
    /// Extension id, local to the declaring party.
    pub id: u16,
    /// Extension URI; the identity used for matching.
    pub uri: String,
    /// Direction the extension applies to.
    pub direction: MediaDirection,
}

impl RtpExtension {
    pub fn new(id: u16, uri: impl Into<String>) -> Self {
        Self {
            id,
            uri: uri.into(),
            direction: MediaDirection::SendReceive,
        }
    }

    pub fn with_direction(mut self, direction: MediaDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Intersects extension lists by URI, preserving the order of `local`.
///
/// The answering side must echo the offerer's ids, so matched entries keep
/// the remote id; the direction is the intersection of both declarations.
pub fn intersect_extensions(local: &[RtpExtension], remote: &[RtpExtension]) -> Vec<RtpExtension> {
    local
        .iter()
        .filter_map(|ours| {
            remote.iter().find(|theirs| theirs.uri == ours.uri).map(|theirs| RtpExtension {
                id: theirs.id,
                uri: ours.uri.clone(),
                direction: ours.direction.and(theirs.direction),
            })
        })
        .collect()
}
