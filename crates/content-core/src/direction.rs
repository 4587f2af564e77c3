//! Media direction algebra.
//!
//! Directions form a small lattice over the two flags "may send" and
//! "may receive". [`MediaDirection::and`] intersects capabilities,
//! [`MediaDirection::or`] unions them, and
//! [`MediaDirection::direction_for_answer`] combines a local capability
//! with a remote request when answering an offer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of media flow, from the local party's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaDirection {
    /// Media flows both ways.
    #[default]
    #[serde(rename = "sendrecv")]
    SendReceive,
    /// We send, the remote party receives.
    #[serde(rename = "sendonly")]
    SendOnly,
    /// We receive, the remote party sends.
    #[serde(rename = "recvonly")]
    ReceiveOnly,
    /// No media flows in either direction.
    #[serde(rename = "inactive")]
    Inactive,
}

impl MediaDirection {
    /// Whether this direction permits sending media.
    pub fn allows_sending(self) -> bool {
        matches!(self, MediaDirection::SendReceive | MediaDirection::SendOnly)
    }

    /// Whether this direction permits receiving media.
    pub fn allows_receiving(self) -> bool {
        matches!(self, MediaDirection::SendReceive | MediaDirection::ReceiveOnly)
    }

    fn from_flags(send: bool, recv: bool) -> Self {
        match (send, recv) {
            (true, true) => MediaDirection::SendReceive,
            (true, false) => MediaDirection::SendOnly,
            (false, true) => MediaDirection::ReceiveOnly,
            (false, false) => MediaDirection::Inactive,
        }
    }

    /// Intersection: keeps only the flows both directions permit.
    ///
    /// `Inactive` is absorbing and `SendReceive` is the identity.
    pub fn and(self, other: MediaDirection) -> MediaDirection {
        MediaDirection::from_flags(
            self.allows_sending() && other.allows_sending(),
            self.allows_receiving() && other.allows_receiving(),
        )
    }

    /// Union: permits every flow either direction permits.
    ///
    /// `SendReceive` is absorbing and `Inactive` is the identity.
    pub fn or(self, other: MediaDirection) -> MediaDirection {
        MediaDirection::from_flags(
            self.allows_sending() || other.allows_sending(),
            self.allows_receiving() || other.allows_receiving(),
        )
    }

    /// The same flows seen from the other party's side.
    pub fn reversed(self) -> MediaDirection {
        MediaDirection::from_flags(self.allows_receiving(), self.allows_sending())
    }

    /// Direction a local answer must declare, given the local capability
    /// (`self`) and the direction the remote party requested from its own
    /// point of view.
    ///
    /// A remote that only sends is answered by receiving, capped by what
    /// we can actually do; an empty intersection collapses to `Inactive`.
    pub fn direction_for_answer(self, remote: MediaDirection) -> MediaDirection {
        self.and(remote.reversed())
    }
}

impl fmt::Display for MediaDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaDirection::SendReceive => "sendrecv",
            MediaDirection::SendOnly => "sendonly",
            MediaDirection::ReceiveOnly => "recvonly",
            MediaDirection::Inactive => "inactive",
        };
        f.write_str(s)
    }
}
