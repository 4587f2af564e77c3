//! # rjingle-content-core
//!
//! Shared vocabulary for Jingle media negotiation: media types, the
//! direction algebra, payload formats, RTP header extensions, transport
//! and encryption descriptors, and the content descriptor that ties them
//! together.
//!
//! The types in this crate are plain data. They carry no I/O and no
//! negotiation policy; the `rjingle-media-session` crate consumes them to
//! drive offer/answer rounds. Everything is `Clone` and serializable so a
//! signaling layer can translate descriptors to and from its own wire
//! representation.
//!
//! ## Core types
//!
//! - [`MediaType`] - audio, video or data
//! - [`MediaDirection`] - the send/receive lattice with `and`/`or`
//! - [`PayloadFormat`] - a negotiable codec entry
//! - [`RtpExtension`] - an RTP header extension entry
//! - [`TransportDescriptor`] - candidates, fingerprints and rtcp-mux
//! - [`EncryptionDescriptor`] - SDES crypto attributes and ZRTP hashes
//! - [`ContentDescriptor`] - one negotiated content line

pub mod content;
pub mod direction;
pub mod encryption;
pub mod extension;
pub mod format;
pub mod media;
pub mod transport;

pub use content::{ContentBuilder, ContentDescriptor, CreatorRole, RtpDescription, Senders, SourceDescriptor};
pub use direction::MediaDirection;
pub use encryption::{CryptoAttribute, EncryptionDescriptor, ZrtpHash};
pub use extension::{intersect_extensions, RtpExtension};
pub use format::{intersect_formats, PayloadFormat, ATTR_IMAGEATTR};
pub use media::MediaType;
pub use transport::{
    CandidateDescriptor, DtlsSetup, Fingerprint, MediaStreamTarget, TransportDescriptor,
    TransportKind, COMPONENT_RTCP, COMPONENT_RTP, DTLS_SRTP_FEATURE, ICE_UDP_NAMESPACE,
    RAW_UDP_NAMESPACE,
};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::content::{
        ContentBuilder, ContentDescriptor, CreatorRole, RtpDescription, Senders, SourceDescriptor,
    };
    pub use crate::direction::MediaDirection;
    pub use crate::encryption::{CryptoAttribute, EncryptionDescriptor, ZrtpHash};
    pub use crate::extension::RtpExtension;
    pub use crate::format::PayloadFormat;
    pub use crate::media::MediaType;
    pub use crate::transport::{
        CandidateDescriptor, DtlsSetup, Fingerprint, MediaStreamTarget, TransportDescriptor,
        TransportKind,
    };
}
