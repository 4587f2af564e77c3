//! Error types for media negotiation.

use rjingle_content_core::MediaType;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, NegotiationError>;

/// Errors surfaced by the negotiation engine.
///
/// The variants are stable categories a signaling layer can branch on;
/// per-content problems that only disqualify a single content line are
/// handled by skipping that content and never reach this type.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// No active capture or playback device could serve any media type.
    #[error("could not find any active media devices to describe")]
    NoActiveDevices,

    /// The remote party sent contents we cannot produce an answer to.
    #[error("invalid remote content: {reason}")]
    IllegalRemoteContent { reason: String },

    /// The remote party proposed a Jingle transport outside the supported set.
    #[error("unsupported transport: {namespace}")]
    UnsupportedTransport { namespace: String },

    /// No transport is mutually supported by both parties.
    #[error("no mutually supported transport")]
    NoSupportedTransport,

    /// Waited for the offer to determine the transport, but it never arrived.
    /// The offering side is expected to fix the transport for the session.
    #[error("transport manager was not set within {waited_ms} ms")]
    TransportManagerUnset { waited_ms: u64 },

    /// The media engine failed to create or configure a stream.
    #[error("media engine failure on {media} stream: {message}")]
    MediaEngine { media: MediaType, message: String },

    /// An invariant of the negotiation engine was violated.
    #[error("internal negotiation error: {message}")]
    Internal { message: String },
}

impl NegotiationError {
    /// Shorthand for [`NegotiationError::IllegalRemoteContent`].
    pub fn illegal(reason: impl Into<String>) -> Self {
        NegotiationError::IllegalRemoteContent { reason: reason.into() }
    }

    /// Shorthand for [`NegotiationError::MediaEngine`].
    pub fn media_engine(media: MediaType, message: impl Into<String>) -> Self {
        NegotiationError::MediaEngine { media, message: message.into() }
    }

    /// Shorthand for [`NegotiationError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        NegotiationError::Internal { message: message.into() }
    }
}
