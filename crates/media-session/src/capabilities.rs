//! Seams between the negotiation engine and its surroundings.
//!
//! The engine never touches sockets, codecs or key material itself. It
//! talks to a [`MediaEngine`] for devices, formats and streams, to a
//! [`FeatureDiscovery`] for capability lookups, to a [`CallConference`]
//! for call-level context and to a [`TransportInfoSender`] to trickle
//! transport updates. Production code plugs real implementations into
//! these traits; tests plug in mocks.

use crate::errors::Result;
use crate::quality::QualityPreset;
use async_trait::async_trait;
use rjingle_content_core::{
    ContentDescriptor, CryptoAttribute, Fingerprint, MediaDirection, MediaStreamTarget, MediaType,
    PayloadFormat, RtpExtension, Senders, SourceDescriptor, ZrtpHash,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// A capture/playback device for one media type.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDevice {
    pub media: MediaType,
    /// What the device is physically capable of.
    pub direction: MediaDirection,
    /// Formats the device can produce or consume, in preference order.
    pub formats: Vec<PayloadFormat>,
    /// Header extensions the device supports.
    pub extensions: Vec<RtpExtension>,
}

impl MediaDevice {
    pub fn new(media: MediaType, direction: MediaDirection) -> Self {
        Self {
            media,
            direction,
            formats: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn with_formats(mut self, formats: Vec<PayloadFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<RtpExtension>) -> Self {
        self.extensions = extensions;
        self
    }

    /// A device without formats cannot carry media and is skipped.
    pub fn is_active(&self) -> bool {
        !self.formats.is_empty()
    }
}

/// Local sockets a stream binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConnector {
    pub rtp: SocketAddr,
    /// Absent when RTCP is multiplexed onto the RTP socket.
    pub rtcp: Option<SocketAddr>,
}

impl StreamConnector {
    pub fn new(rtp: SocketAddr, rtcp: Option<SocketAddr>) -> Self {
        Self { rtp, rtcp }
    }
}

/// Everything needed to create or reconfigure one media stream.
#[derive(Debug, Clone)]
pub struct StreamSpec {
    pub content_name: String,
    pub media: MediaType,
    /// The negotiated payload format.
    pub format: PayloadFormat,
    pub connector: Option<StreamConnector>,
    pub target: Option<MediaStreamTarget>,
    pub direction: MediaDirection,
    /// Negotiated header extensions.
    pub extensions: Vec<RtpExtension>,
    /// The master stream anchors key material for its secured siblings.
    pub master: bool,
}

/// A live media stream owned by the engine.
///
/// The handler only steers the stream; packet flow, jitter buffers and
/// SRTP belong to the implementation behind this trait.
pub trait MediaStream: Send + Sync {
    fn media(&self) -> MediaType;
    fn direction(&self) -> MediaDirection;
    fn set_direction(&self, direction: MediaDirection);
    fn set_format(&self, format: &PayloadFormat);
    fn set_connector(&self, connector: StreamConnector);
    fn set_target(&self, target: MediaStreamTarget);
    /// Pushes the remote party's quality limits into the encoder.
    fn update_quality_hints(&self, send: Option<&QualityPreset>, receive: Option<&QualityPreset>);
    fn local_ssrc(&self) -> Option<u32>;
    /// Last SSRC observed from the remote party, if any.
    fn remote_ssrc(&self) -> Option<u32>;
    fn close(&self);
}

/// The media engine behind the negotiation: devices, formats, streams
/// and key material.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// The default device for a media type, `None` when the machine has
    /// no such device.
    fn device(&self, media: MediaType) -> Option<MediaDevice>;

    /// Formats the local side can negotiate for a media type, optionally
    /// constrained by quality presets for video.
    fn supported_formats(
        &self,
        media: MediaType,
        send_preset: Option<&QualityPreset>,
        receive_preset: Option<&QualityPreset>,
    ) -> Vec<PayloadFormat>;

    /// Creates a stream for a negotiated content.
    async fn create_stream(&self, spec: StreamSpec) -> Result<Arc<dyn MediaStream>>;

    /// Certificate fingerprints to advertise for DTLS-SRTP.
    async fn dtls_fingerprints(&self, media: MediaType) -> Result<Vec<Fingerprint>>;

    /// Fresh SDES offers, one per enabled cipher, in cipher order.
    async fn sdes_offers(&self, media: MediaType, ciphers: &[String]) -> Result<Vec<CryptoAttribute>>;

    /// Picks the answer to a remote SDES offer: walks `ciphers` in order
    /// and returns our attribute for the first suite the remote offered,
    /// or `None` when no offered suite is enabled locally.
    async fn sdes_responder_select(
        &self,
        media: MediaType,
        remote: &[CryptoAttribute],
        ciphers: &[String],
    ) -> Result<Option<CryptoAttribute>>;

    /// Hello-hashes to advertise for ZRTP, one per supported version.
    async fn zrtp_hello_hashes(&self, media: MediaType) -> Result<Vec<ZrtpHash>>;

    /// Source metadata (SSRC, cname, msid) we advertise when sending.
    fn local_source(&self, media: MediaType) -> Option<SourceDescriptor>;
}

/// Capability lookups for the local and remote party.
#[async_trait]
pub trait FeatureDiscovery: Send + Sync {
    fn local_supports(&self, feature: &str) -> bool;

    /// Whether the remote party advertises a feature. Implementations
    /// should report `true` when the remote capability set is unknown,
    /// since absence of discovery data must not veto negotiation.
    async fn remote_supports(&self, feature: &str) -> bool;

    async fn mutually_supports(&self, feature: &str) -> bool {
        self.local_supports(feature) && self.remote_supports(feature).await
    }
}

/// Discovery stand-in that considers every feature supported.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveDiscovery;

#[async_trait]
impl FeatureDiscovery for PermissiveDiscovery {
    fn local_supports(&self, _feature: &str) -> bool {
        true
    }

    async fn remote_supports(&self, _feature: &str) -> bool {
        true
    }
}

/// What one other conference participant contributes, as seen by the
/// focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerMediaView {
    /// Whether the remote party of that leg initiated it.
    pub remote_is_initiator: bool,
    pub senders: Senders,
}

impl PeerMediaView {
    pub fn new(remote_is_initiator: bool, senders: Senders) -> Self {
        Self {
            remote_is_initiator,
            senders,
        }
    }

    /// Whether the remote party of that leg sends media towards us.
    pub fn remote_sends(&self) -> bool {
        // From our perspective the remote sending means we receive.
        self.senders
            .direction_for(!self.remote_is_initiator)
            .allows_receiving()
    }
}

/// Call-level context a leg negotiates under.
pub trait CallConference: Send + Sync {
    /// Whether the local party is the focus of a conference call.
    fn is_conference_focus(&self) -> bool;

    /// Whether the focus forwards RTP between participants for a media
    /// type instead of mixing it.
    fn rtp_translation_enabled(&self, media: MediaType) -> bool;

    /// Whether ZRTP may be advertised in signaling for this call.
    fn zrtp_signaling_enabled(&self) -> bool;

    /// What the other participants negotiated for one media type, empty
    /// outside conferences.
    fn peer_views(&self, media: MediaType) -> Vec<PeerMediaView>;
}

/// Plain two-party call context.
#[derive(Debug, Clone)]
pub struct DirectCall {
    zrtp_signaling: bool,
}

impl DirectCall {
    pub fn new() -> Self {
        Self {
            zrtp_signaling: true,
        }
    }

    pub fn without_zrtp_signaling(mut self) -> Self {
        self.zrtp_signaling = false;
        self
    }
}

impl Default for DirectCall {
    fn default() -> Self {
        Self::new()
    }
}

impl CallConference for DirectCall {
    fn is_conference_focus(&self) -> bool {
        false
    }

    fn rtp_translation_enabled(&self, _media: MediaType) -> bool {
        false
    }

    fn zrtp_signaling_enabled(&self) -> bool {
        self.zrtp_signaling
    }

    fn peer_views(&self, _media: MediaType) -> Vec<PeerMediaView> {
        Vec::new()
    }
}

/// Sends transport-info updates to the remote party while candidate
/// harvesting is still running.
#[async_trait]
pub trait TransportInfoSender: Send + Sync {
    async fn send_transport_info(&self, contents: Vec<ContentDescriptor>);
}
