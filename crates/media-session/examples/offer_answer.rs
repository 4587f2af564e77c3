//! Offer/Answer Walkthrough
//!
//! Runs both sides of a Jingle media negotiation in one process: a
//! caller builds an offer, a callee answers it and brings its streams
//! up, and the caller confirms the answer. The toy engine and transport
//! below stand in for the media stack and ICE agent an embedding
//! application would provide.
//!
//! Run with: cargo run --example offer_answer

use async_trait::async_trait;
use base64::Engine as _;
use parking_lot::Mutex;
use rjingle_media_session::prelude::*;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let caller = MediaHandler::builder(NegotiationRole::Initiator)
        .with_engine(Arc::new(DemoEngine::new("caller")))
        .with_transport_factory(Arc::new(DemoTransportFactory::new(20000)))
        .build()?;
    let callee = MediaHandler::builder(NegotiationRole::Responder)
        .with_engine(Arc::new(DemoEngine::new("callee")))
        .with_transport_factory(Arc::new(DemoTransportFactory::new(30000)))
        .build()?;

    let mut caller_events = caller.take_event_receiver().unwrap();
    let mut callee_events = callee.take_event_receiver().unwrap();

    // Caller side: build the offer, transports included.
    let offer = caller.create_content_list().await?;
    for content in &offer {
        info!(content = %content, "caller offers");
    }

    // Callee side: answer the offer and bring the streams up.
    callee.process_offer(offer, None).await?;
    let answer = callee.generate_session_accept().await?;
    for content in &answer {
        info!(content = %content, "callee accepts");
    }
    callee.start().await?;

    // Caller side: fold the answer in and start media.
    caller.process_answer(answer).await?;
    caller.start().await?;

    info!(
        caller_encryption = ?caller.selected_encryption(MediaType::Audio),
        callee_encryption = ?callee.selected_encryption(MediaType::Audio),
        caller_ssrc = ?caller.local_ssrc(MediaType::Audio),
        callee_ssrc = ?callee.local_ssrc(MediaType::Audio),
        "negotiation settled"
    );

    while let Ok(event) = caller_events.try_recv() {
        info!(?event, "caller event");
    }
    while let Ok(event) = callee_events.try_recv() {
        info!(?event, "callee event");
    }

    caller.close().await;
    callee.close().await;
    Ok(())
}

// ---------------------------------------------------------------------
// A minimal media engine

struct DemoStream {
    media: MediaType,
    ssrc: u32,
    direction: Mutex<MediaDirection>,
}

impl MediaStream for DemoStream {
    fn media(&self) -> MediaType {
        self.media
    }

    fn direction(&self) -> MediaDirection {
        *self.direction.lock()
    }

    fn set_direction(&self, direction: MediaDirection) {
        *self.direction.lock() = direction;
    }

    fn set_format(&self, format: &PayloadFormat) {
        info!(ssrc = self.ssrc, format = %format.name, "stream format set");
    }

    fn set_connector(&self, connector: StreamConnector) {
        info!(ssrc = self.ssrc, rtp = %connector.rtp, "stream bound");
    }

    fn set_target(&self, target: MediaStreamTarget) {
        info!(ssrc = self.ssrc, %target, "stream target set");
    }

    fn update_quality_hints(&self, _send: Option<&QualityPreset>, _receive: Option<&QualityPreset>) {}

    fn local_ssrc(&self) -> Option<u32> {
        Some(self.ssrc)
    }

    fn remote_ssrc(&self) -> Option<u32> {
        None
    }

    fn close(&self) {
        info!(ssrc = self.ssrc, "stream closed");
    }
}

struct DemoEngine {
    name: &'static str,
    next_ssrc: AtomicU32,
}

impl DemoEngine {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            next_ssrc: AtomicU32::new(rand::random::<u16>() as u32),
        }
    }
}

#[async_trait]
impl MediaEngine for DemoEngine {
    fn device(&self, media: MediaType) -> Option<MediaDevice> {
        match media {
            MediaType::Audio => Some(
                MediaDevice::new(MediaType::Audio, MediaDirection::SendReceive).with_formats(vec![
                    PayloadFormat::new(111, "opus", 48000).with_channels(2),
                    PayloadFormat::new(0, "PCMU", 8000),
                ]),
            ),
            _ => None,
        }
    }

    fn supported_formats(
        &self,
        media: MediaType,
        _send_preset: Option<&QualityPreset>,
        _receive_preset: Option<&QualityPreset>,
    ) -> Vec<PayloadFormat> {
        self.device(media).map(|d| d.formats).unwrap_or_default()
    }

    async fn create_stream(
        &self,
        spec: StreamSpec,
    ) -> Result<Arc<dyn MediaStream>> {
        let ssrc = self.next_ssrc.fetch_add(1, Ordering::Relaxed);
        info!(
            engine = self.name,
            content = %spec.content_name,
            format = %spec.format.name,
            master = spec.master,
            "creating stream"
        );
        Ok(Arc::new(DemoStream {
            media: spec.media,
            ssrc,
            direction: Mutex::new(spec.direction),
        }))
    }

    async fn dtls_fingerprints(
        &self,
        _media: MediaType,
    ) -> Result<Vec<Fingerprint>> {
        let digest: Vec<String> = (0..32)
            .map(|_| format!("{:02X}", rand::random::<u8>()))
            .collect();
        Ok(vec![Fingerprint::new("sha-256", digest.join(":"))])
    }

    async fn sdes_offers(
        &self,
        _media: MediaType,
        ciphers: &[String],
    ) -> Result<Vec<CryptoAttribute>> {
        Ok(ciphers
            .iter()
            .enumerate()
            .map(|(i, suite)| CryptoAttribute::new(i as u32 + 1, suite.clone(), demo_key()))
            .collect())
    }

    async fn sdes_responder_select(
        &self,
        _media: MediaType,
        remote: &[CryptoAttribute],
        ciphers: &[String],
    ) -> Result<Option<CryptoAttribute>> {
        for suite in ciphers {
            if let Some(theirs) = remote.iter().find(|offer| &offer.crypto_suite == suite) {
                return Ok(Some(CryptoAttribute::new(theirs.tag, suite.clone(), demo_key())));
            }
        }
        Ok(None)
    }

    async fn zrtp_hello_hashes(
        &self,
        _media: MediaType,
    ) -> Result<Vec<ZrtpHash>> {
        Ok(Vec::new())
    }

    fn local_source(&self, _media: MediaType) -> Option<SourceDescriptor> {
        Some(SourceDescriptor::new(0).with_parameter("cname", self.name))
    }
}

fn demo_key() -> String {
    let material: [u8; 30] = rand::random();
    format!(
        "inline:{}",
        base64::engine::general_purpose::STANDARD.encode(material)
    )
}

// ---------------------------------------------------------------------
// A transport that answers from a fixed local address

struct DemoTransportManager {
    kind: TransportKind,
    next_port: AtomicU16,
    remote: Mutex<Option<Vec<ContentDescriptor>>>,
    harvested: Mutex<Vec<ContentDescriptor>>,
}

#[async_trait]
impl TransportManager for DemoTransportManager {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn start_harvest(
        &self,
        remote: Option<Vec<ContentDescriptor>>,
        local: Vec<ContentDescriptor>,
        _sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> Result<()> {
        *self.remote.lock() = remote;
        let mut harvested = Vec::with_capacity(local.len());
        for content in local {
            let port = self.next_port.fetch_add(2, Ordering::Relaxed);
            let mut transport = TransportDescriptor::new(self.kind).with_candidate(
                CandidateDescriptor::new("h1", 1, local_ip(), port).with_type("host"),
            );
            if self.kind == TransportKind::IceUdp {
                transport = transport.with_ufrag(demo_token(4), demo_token(22));
            }
            harvested.push(content.with_transport(transport));
        }
        *self.harvested.lock() = harvested;
        Ok(())
    }

    async fn wrapup_harvest(&self) -> Result<Vec<ContentDescriptor>> {
        Ok(self.harvested.lock().clone())
    }

    async fn start_connectivity(
        &self,
        remote: Vec<ContentDescriptor>,
    ) -> Result<bool> {
        *self.remote.lock() = Some(remote);
        Ok(self.kind == TransportKind::IceUdp)
    }

    async fn wrapup_connectivity(&self) -> Result<()> {
        Ok(())
    }

    fn stream_connector(
        &self,
        _media: MediaType,
    ) -> Result<StreamConnector> {
        let rtp = SocketAddr::new(local_ip(), self.next_port.load(Ordering::Relaxed));
        Ok(StreamConnector::new(rtp, None))
    }

    fn stream_target(&self, media: MediaType) -> Option<MediaStreamTarget> {
        // Aim at the first candidate the remote party sent for this media
        // type, the way a real agent would after its checks concluded.
        let remote = self.remote.lock();
        let contents = remote.as_ref()?;
        let content = contents.iter().find(|c| c.media() == media)?;
        content.transport.as_ref()?.default_target()
    }

    fn set_rtcp_mux(&self, _rtcp_mux: bool) {}

    async fn remove_content(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

struct DemoTransportFactory {
    base_port: u16,
}

impl DemoTransportFactory {
    fn new(base_port: u16) -> Self {
        Self { base_port }
    }
}

#[async_trait]
impl TransportFactory for DemoTransportFactory {
    async fn create(
        &self,
        kind: TransportKind,
    ) -> Result<Arc<dyn TransportManager>> {
        Ok(Arc::new(DemoTransportManager {
            kind,
            next_port: AtomicU16::new(self.base_port),
            remote: Mutex::new(None),
            harvested: Mutex::new(Vec::new()),
        }))
    }
}

fn local_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn demo_token(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    (0..len)
        .map(|_| ALPHABET[rand::random::<usize>() % ALPHABET.len()] as char)
        .collect()
}
