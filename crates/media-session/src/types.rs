//! Identifiers and session-level attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of one call leg.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LegId(pub String);

impl LegId {
    /// Generates a fresh leg id.
    pub fn new() -> Self {
        Self(format!("leg-{}", uuid::Uuid::new_v4()))
    }
}

impl Default for LegId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Our role in the Jingle session this leg belongs to.
///
/// The initiator sends the offer and thereby determines the transport;
/// the responder answers. Several negotiation rules branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationRole {
    Initiator,
    Responder,
}

impl NegotiationRole {
    pub fn is_initiator(self) -> bool {
        matches!(self, NegotiationRole::Initiator)
    }
}

impl fmt::Display for NegotiationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationRole::Initiator => f.write_str("initiator"),
            NegotiationRole::Responder => f.write_str("responder"),
        }
    }
}
