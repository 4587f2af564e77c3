//! Events emitted by the negotiation engine.
//!
//! Events are delivered on an unbounded channel; the receiver is handed
//! out once via [`crate::handler::MediaHandler::take_event_receiver`].

use crate::security::SrtpKind;
use rjingle_content_core::{MediaType, TransportKind};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Sender half used internally to publish [`NegotiationEvent`]s.
pub type EventSender = mpsc::UnboundedSender<NegotiationEvent>;

/// Receiver half handed to the embedding application.
pub type EventReceiver = mpsc::UnboundedReceiver<NegotiationEvent>;

/// Observable milestones of a call leg's media negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NegotiationEvent {
    /// A media stream was created for a content line.
    StreamCreated {
        content: String,
        media: MediaType,
        /// Whether this stream drives key material for secured siblings.
        master: bool,
    },
    /// A media stream was closed.
    StreamClosed { media: MediaType },
    /// An encryption protocol was selected for a media type, evicting any
    /// previously active protocol.
    EncryptionSelected { media: MediaType, protocol: SrtpKind },
    /// An offered encryption protocol was abandoned.
    SecurityNegotiationFailed {
        media: MediaType,
        protocol: SrtpKind,
        reason: String,
    },
    /// A transport manager implementation was chosen for the leg.
    TransportSelected { kind: TransportKind },
    /// A hold state changed; `remote` distinguishes who initiated it.
    HoldStateChanged { remote: bool, on_hold: bool },
    /// The desktop-sharing remote control session ended: the remote party
    /// re-negotiated without the marker, removed the content, or the leg
    /// closed while one was active.
    RemoteControlRevoked,
}
