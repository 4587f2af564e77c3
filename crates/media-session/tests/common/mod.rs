//! Shared mocks for driving the negotiation engine in tests.
//!
//! [`MockEngine`] plays the media stack, [`MockTransportFactory`] hands
//! out inspectable transport managers, and the fixture functions build
//! the remote contents a signaling layer would normally parse.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rjingle_media_session::content::{DTLS_SRTP_FEATURE, ICE_UDP_NAMESPACE, RAW_UDP_NAMESPACE};
use rjingle_media_session::prelude::*;
use rjingle_media_session::PeerMediaView;
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------
// Formats and devices

pub fn pcmu() -> PayloadFormat {
    PayloadFormat::new(0, "PCMU", 8000)
}

pub fn opus() -> PayloadFormat {
    PayloadFormat::new(111, "opus", 48000).with_channels(2)
}

pub fn g722() -> PayloadFormat {
    PayloadFormat::new(9, "G722", 8000)
}

pub fn vp8() -> PayloadFormat {
    PayloadFormat::new(96, "VP8", 90000)
}

pub fn vp8_with_imageattr() -> PayloadFormat {
    vp8().with_attribute("imageattr", "recv [x=640,y=480]")
}

pub fn audio_level_ext(id: u16) -> RtpExtension {
    RtpExtension::new(id, "urn:ietf:params:rtp-hdrext:ssrc-audio-level")
}

pub fn audio_device() -> MediaDevice {
    MediaDevice::new(MediaType::Audio, MediaDirection::SendReceive)
        .with_formats(vec![opus(), pcmu(), g722()])
        .with_extensions(vec![audio_level_ext(1)])
}

pub fn video_device() -> MediaDevice {
    MediaDevice::new(MediaType::Video, MediaDirection::SendReceive).with_formats(vec![vp8()])
}

// ---------------------------------------------------------------------
// Streams

#[derive(Debug, Clone)]
pub struct MockStreamState {
    pub direction: MediaDirection,
    pub format: PayloadFormat,
    pub connector: Option<StreamConnector>,
    pub target: Option<MediaStreamTarget>,
    pub remote_ssrc: Option<u32>,
    pub quality_updates: u32,
    pub closed: bool,
}

#[derive(Debug)]
pub struct MockStream {
    media: MediaType,
    local_ssrc: u32,
    pub state: Mutex<MockStreamState>,
}

impl MockStream {
    fn from_spec(spec: &StreamSpec, local_ssrc: u32) -> Self {
        Self {
            media: spec.media,
            local_ssrc,
            state: Mutex::new(MockStreamState {
                direction: spec.direction,
                format: spec.format.clone(),
                connector: spec.connector.clone(),
                target: spec.target.clone(),
                remote_ssrc: None,
                quality_updates: 0,
                closed: false,
            }),
        }
    }

    pub fn direction(&self) -> MediaDirection {
        self.state.lock().direction
    }

    pub fn format_name(&self) -> String {
        self.state.lock().format.name.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn set_remote_ssrc(&self, ssrc: u32) {
        self.state.lock().remote_ssrc = Some(ssrc);
    }
}

impl MediaStream for MockStream {
    fn media(&self) -> MediaType {
        self.media
    }

    fn direction(&self) -> MediaDirection {
        self.state.lock().direction
    }

    fn set_direction(&self, direction: MediaDirection) {
        self.state.lock().direction = direction;
    }

    fn set_format(&self, format: &PayloadFormat) {
        self.state.lock().format = format.clone();
    }

    fn set_connector(&self, connector: StreamConnector) {
        self.state.lock().connector = Some(connector);
    }

    fn set_target(&self, target: MediaStreamTarget) {
        self.state.lock().target = Some(target);
    }

    fn update_quality_hints(
        &self,
        _send: Option<&QualityPreset>,
        _receive: Option<&QualityPreset>,
    ) {
        self.state.lock().quality_updates += 1;
    }

    fn local_ssrc(&self) -> Option<u32> {
        Some(self.local_ssrc)
    }

    fn remote_ssrc(&self) -> Option<u32> {
        self.state.lock().remote_ssrc
    }

    fn close(&self) {
        self.state.lock().closed = true;
    }
}

// ---------------------------------------------------------------------
// Engine

pub struct MockEngine {
    devices: RwLock<HashMap<MediaType, MediaDevice>>,
    sources: RwLock<HashMap<MediaType, SourceDescriptor>>,
    dtls_enabled: bool,
    sdes_enabled: bool,
    zrtp_hashes: Vec<ZrtpHash>,
    pub streams: Mutex<Vec<Arc<MockStream>>>,
    next_ssrc: AtomicU32,
}

impl MockEngine {
    /// Audio and video devices, all encryption protocols available.
    pub fn new() -> Self {
        let mut devices = HashMap::new();
        devices.insert(MediaType::Audio, audio_device());
        devices.insert(MediaType::Video, video_device());
        Self {
            devices: RwLock::new(devices),
            sources: RwLock::new(HashMap::new()),
            dtls_enabled: true,
            sdes_enabled: true,
            zrtp_hashes: vec![ZrtpHash::new("1.10", "fedcba9876543210")],
            streams: Mutex::new(Vec::new()),
            next_ssrc: AtomicU32::new(0x1000),
        }
    }

    pub fn audio_only() -> Self {
        let engine = Self::new();
        engine.devices.write().remove(&MediaType::Video);
        engine
    }

    pub fn without_devices() -> Self {
        let engine = Self::new();
        engine.devices.write().clear();
        engine
    }

    pub fn with_device(self, device: MediaDevice) -> Self {
        self.devices.write().insert(device.media, device);
        self
    }

    pub fn with_source(self, media: MediaType, source: SourceDescriptor) -> Self {
        self.sources.write().insert(media, source);
        self
    }

    pub fn without_dtls(mut self) -> Self {
        self.dtls_enabled = false;
        self
    }

    pub fn without_sdes(mut self) -> Self {
        self.sdes_enabled = false;
        self
    }

    pub fn without_zrtp(mut self) -> Self {
        self.zrtp_hashes.clear();
        self
    }

    pub fn set_device_direction(&self, media: MediaType, direction: MediaDirection) {
        if let Some(device) = self.devices.write().get_mut(&media) {
            device.direction = direction;
        }
    }

    pub fn remove_device(&self, media: MediaType) {
        self.devices.write().remove(&media);
    }

    pub fn created_streams(&self) -> Vec<Arc<MockStream>> {
        self.streams.lock().clone()
    }

    pub fn stream(&self, media: MediaType) -> Arc<MockStream> {
        self.streams
            .lock()
            .iter()
            .rev()
            .find(|stream| MediaStream::media(stream.as_ref()) == media)
            .cloned()
            .expect("no stream created for media type")
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    fn device(&self, media: MediaType) -> Option<MediaDevice> {
        self.devices.read().get(&media).cloned()
    }

    fn supported_formats(
        &self,
        media: MediaType,
        _send_preset: Option<&QualityPreset>,
        _receive_preset: Option<&QualityPreset>,
    ) -> Vec<PayloadFormat> {
        self.devices
            .read()
            .get(&media)
            .map(|device| device.formats.clone())
            .unwrap_or_default()
    }

    async fn create_stream(&self, spec: StreamSpec) -> Result<Arc<dyn MediaStream>> {
        let ssrc = self.next_ssrc.fetch_add(1, Ordering::Relaxed);
        let stream = Arc::new(MockStream::from_spec(&spec, ssrc));
        self.streams.lock().push(Arc::clone(&stream));
        Ok(stream)
    }

    async fn dtls_fingerprints(&self, _media: MediaType) -> Result<Vec<Fingerprint>> {
        if !self.dtls_enabled {
            return Ok(Vec::new());
        }
        Ok(vec![Fingerprint::new(
            "sha-256",
            "02:1A:CC:54:27:AB:EB:9C:53:3F:3E:4B:65:2E:7D:46:3F:54:42:CD:54:F1:7A:03:A2:7D:F9:B0:7F:46:19:B2",
        )])
    }

    async fn sdes_offers(
        &self,
        _media: MediaType,
        ciphers: &[String],
    ) -> Result<Vec<CryptoAttribute>> {
        if !self.sdes_enabled {
            return Ok(Vec::new());
        }
        Ok(ciphers
            .iter()
            .enumerate()
            .map(|(i, suite)| CryptoAttribute::new(i as u32 + 1, suite.clone(), fresh_key()))
            .collect())
    }

    async fn sdes_responder_select(
        &self,
        _media: MediaType,
        remote: &[CryptoAttribute],
        ciphers: &[String],
    ) -> Result<Option<CryptoAttribute>> {
        if !self.sdes_enabled {
            return Ok(None);
        }
        for suite in ciphers {
            if let Some(theirs) = remote.iter().find(|offer| &offer.crypto_suite == suite) {
                return Ok(Some(CryptoAttribute::new(
                    theirs.tag,
                    suite.clone(),
                    fresh_key(),
                )));
            }
        }
        Ok(None)
    }

    async fn zrtp_hello_hashes(&self, _media: MediaType) -> Result<Vec<ZrtpHash>> {
        Ok(self.zrtp_hashes.clone())
    }

    fn local_source(&self, media: MediaType) -> Option<SourceDescriptor> {
        self.sources.read().get(&media).cloned()
    }
}

fn fresh_key() -> String {
    use base64::Engine as _;
    let material: [u8; 30] = rand::random();
    format!("inline:{}", base64::engine::general_purpose::STANDARD.encode(material))
}

// ---------------------------------------------------------------------
// Transport

#[derive(Debug, Default)]
pub struct TransportCalls {
    pub harvests: u32,
    /// Content counts of each connectivity round fed in.
    pub connectivity_rounds: Vec<usize>,
    pub connectivity_wrapups: u32,
    pub rtcp_mux: bool,
    pub removed_contents: Vec<String>,
    pub closed: bool,
}

pub struct MockTransportManager {
    kind: TransportKind,
    base_port: u16,
    with_targets: bool,
    pub calls: Mutex<TransportCalls>,
    harvested: Mutex<Option<Vec<ContentDescriptor>>>,
}

impl MockTransportManager {
    fn new(kind: TransportKind, with_targets: bool) -> Self {
        Self {
            kind,
            base_port: 10000,
            with_targets,
            calls: Mutex::new(TransportCalls::default()),
            harvested: Mutex::new(None),
        }
    }

    fn local_addr(&self, media: MediaType) -> SocketAddr {
        let offset = match media {
            MediaType::Audio => 0,
            MediaType::Video => 2,
            MediaType::Data => 4,
        };
        SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)),
            self.base_port + offset,
        )
    }

    fn remote_addr(&self, media: MediaType) -> SocketAddr {
        let offset = match media {
            MediaType::Audio => 0,
            MediaType::Video => 2,
            MediaType::Data => 4,
        };
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)), 7078 + offset)
    }
}

#[async_trait]
impl TransportManager for MockTransportManager {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn start_harvest(
        &self,
        _remote: Option<Vec<ContentDescriptor>>,
        local: Vec<ContentDescriptor>,
        sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> Result<()> {
        self.calls.lock().harvests += 1;
        let mut harvested = Vec::with_capacity(local.len());
        for content in local {
            let media = content.media();
            let addr = self.local_addr(media);
            let mut transport = TransportDescriptor::new(self.kind).with_candidate(
                CandidateDescriptor::new("h1", 1, addr.ip(), addr.port()).with_type("host"),
            );
            if self.kind == TransportKind::IceUdp {
                transport = transport.with_ufrag("ufrag", "pass");
            }
            harvested.push(content.with_transport(transport));
        }
        if let Some(sender) = sender {
            sender.send_transport_info(harvested.clone()).await;
        }
        *self.harvested.lock() = Some(harvested);
        Ok(())
    }

    async fn wrapup_harvest(&self) -> Result<Vec<ContentDescriptor>> {
        Ok(self.harvested.lock().clone().unwrap_or_default())
    }

    async fn start_connectivity(&self, remote: Vec<ContentDescriptor>) -> Result<bool> {
        self.calls.lock().connectivity_rounds.push(remote.len());
        Ok(self.kind == TransportKind::IceUdp)
    }

    async fn wrapup_connectivity(&self) -> Result<()> {
        self.calls.lock().connectivity_wrapups += 1;
        Ok(())
    }

    fn stream_connector(&self, media: MediaType) -> Result<StreamConnector> {
        let rtp = self.local_addr(media);
        let rtcp = SocketAddr::new(rtp.ip(), rtp.port() + 1);
        Ok(StreamConnector::new(rtp, Some(rtcp)))
    }

    fn stream_target(&self, media: MediaType) -> Option<MediaStreamTarget> {
        if !self.with_targets {
            return None;
        }
        let rtp = self.remote_addr(media);
        let rtcp = SocketAddr::new(rtp.ip(), rtp.port() + 1);
        Some(MediaStreamTarget::new(rtp, rtcp))
    }

    fn set_rtcp_mux(&self, rtcp_mux: bool) {
        self.calls.lock().rtcp_mux = rtcp_mux;
    }

    async fn remove_content(&self, name: &str) -> Result<()> {
        self.calls.lock().removed_contents.push(name.to_string());
        Ok(())
    }

    async fn close(&self) {
        self.calls.lock().closed = true;
    }
}

pub struct MockTransportFactory {
    with_targets: bool,
    pub created: Mutex<Vec<Arc<MockTransportManager>>>,
}

impl MockTransportFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            with_targets: true,
            created: Mutex::new(Vec::new()),
        })
    }

    /// Managers that never learn a stream target; contents must carry one.
    pub fn without_targets() -> Arc<Self> {
        Arc::new(Self {
            with_targets: false,
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn last_manager(&self) -> Arc<MockTransportManager> {
        self.created
            .lock()
            .last()
            .cloned()
            .expect("no transport manager was created")
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(&self, kind: TransportKind) -> Result<Arc<dyn TransportManager>> {
        let manager = Arc::new(MockTransportManager::new(kind, self.with_targets));
        self.created.lock().push(Arc::clone(&manager));
        Ok(manager)
    }
}

// ---------------------------------------------------------------------
// Discovery and conference

/// Discovery mock that supports everything except explicitly denied
/// features.
pub struct StaticDiscovery {
    local_denied: HashSet<String>,
    remote_denied: HashSet<String>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self {
            local_denied: HashSet::new(),
            remote_denied: HashSet::new(),
        }
    }

    pub fn deny_local(mut self, feature: &str) -> Self {
        self.local_denied.insert(feature.to_string());
        self
    }

    pub fn deny_remote(mut self, feature: &str) -> Self {
        self.remote_denied.insert(feature.to_string());
        self
    }

    pub fn without_remote_dtls() -> Self {
        Self::new().deny_remote(DTLS_SRTP_FEATURE)
    }

    pub fn raw_udp_only() -> Self {
        Self::new().deny_local(ICE_UDP_NAMESPACE)
    }
}

#[async_trait]
impl FeatureDiscovery for StaticDiscovery {
    fn local_supports(&self, feature: &str) -> bool {
        !self.local_denied.contains(feature)
    }

    async fn remote_supports(&self, feature: &str) -> bool {
        !self.remote_denied.contains(feature)
    }
}

/// Conference context with fixed answers.
pub struct StaticConference {
    pub focus: bool,
    pub translation: bool,
    pub zrtp_signaling: bool,
    pub views: HashMap<MediaType, Vec<PeerMediaView>>,
}

impl StaticConference {
    pub fn focus() -> Self {
        Self {
            focus: true,
            translation: false,
            zrtp_signaling: false,
            views: HashMap::new(),
        }
    }

    pub fn with_view(mut self, media: MediaType, view: PeerMediaView) -> Self {
        self.views.entry(media).or_default().push(view);
        self
    }
}

impl CallConference for StaticConference {
    fn is_conference_focus(&self) -> bool {
        self.focus
    }

    fn rtp_translation_enabled(&self, _media: MediaType) -> bool {
        self.translation
    }

    fn zrtp_signaling_enabled(&self) -> bool {
        self.zrtp_signaling
    }

    fn peer_views(&self, media: MediaType) -> Vec<PeerMediaView> {
        self.views.get(&media).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------
// Remote content fixtures

pub fn remote_ice_transport(media: MediaType) -> TransportDescriptor {
    let port = match media {
        MediaType::Audio => 7078,
        MediaType::Video => 7080,
        MediaType::Data => 7082,
    };
    TransportDescriptor::ice_udp()
        .with_ufrag("remoteufrag", "remotepass")
        .with_candidate(
            CandidateDescriptor::new("r1", 1, IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)), port)
                .with_type("host"),
        )
        .with_candidate(
            CandidateDescriptor::new(
                "r2",
                2,
                IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)),
                port + 1,
            )
            .with_type("host"),
        )
}

/// An audio content the way a remote initiator would offer it.
pub fn remote_audio_offer() -> ContentDescriptor {
    ContentDescriptor::builder("audio", MediaType::Audio)
        .creator(CreatorRole::Initiator)
        .senders(Senders::Both)
        .formats(vec![
            PayloadFormat::new(96, "opus", 48000).with_channels(2),
            PayloadFormat::new(0, "PCMU", 8000),
        ])
        .extensions(vec![audio_level_ext(3)])
        .transport(remote_ice_transport(MediaType::Audio))
        .build()
}

pub fn remote_video_offer() -> ContentDescriptor {
    ContentDescriptor::builder("video", MediaType::Video)
        .creator(CreatorRole::Initiator)
        .senders(Senders::Both)
        .formats(vec![PayloadFormat::new(98, "VP8", 90000)])
        .transport(remote_ice_transport(MediaType::Video))
        .build()
}

// ---------------------------------------------------------------------
// Handlers and events

pub fn responder(
    engine: Arc<MockEngine>,
    factory: Arc<MockTransportFactory>,
) -> MediaHandler {
    MediaHandler::builder(NegotiationRole::Responder)
        .with_engine(engine)
        .with_transport_factory(factory)
        .build()
        .expect("handler builds")
}

pub fn initiator(
    engine: Arc<MockEngine>,
    factory: Arc<MockTransportFactory>,
) -> MediaHandler {
    MediaHandler::builder(NegotiationRole::Initiator)
        .with_engine(engine)
        .with_transport_factory(factory)
        .build()
        .expect("handler builds")
}

/// Collects everything currently queued on the event channel.
pub fn drain_events(rx: &mut EventReceiver) -> Vec<NegotiationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
