//! The per-leg negotiation engine.
//!
//! A [`MediaHandler`] owns everything one call leg negotiates: the
//! content registry, the transport selector, the encryption negotiator
//! and the media streams. The signaling layer feeds it parsed contents
//! (offers, answers, content-modify updates) and ships out whatever the
//! handler produces; the handler never talks to the wire itself.
//!
//! Construction goes through [`MediaHandlerBuilder`], which wires the
//! internal event channel and hands the receiving end out once via
//! [`MediaHandler::take_event_receiver`].

mod answer;
mod hold;
mod offer;

use crate::capabilities::{
    CallConference, DirectCall, FeatureDiscovery, MediaDevice, MediaEngine, PermissiveDiscovery,
    TransportInfoSender,
};
use crate::config::AccountMediaConfig;
use crate::errors::{NegotiationError, Result};
use crate::events::{EventReceiver, EventSender, NegotiationEvent};
use crate::quality::QualityController;
use crate::registry::ContentRegistry;
use crate::security::{SecurityNegotiator, SrtpControlStore, SrtpKind};
use crate::streams::{ActiveStream, StreamSet};
use crate::transport::{TransportFactory, TransportManager, TransportSelector};
use crate::types::{LegId, NegotiationRole};
use parking_lot::{Mutex as SyncMutex, RwLock};
use rjingle_content_core::{ContentDescriptor, MediaDirection, MediaType, TransportKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Boolean negotiation state guarded by one lock.
#[derive(Debug, Clone, Copy, Default)]
struct HandlerFlags {
    locally_on_hold: bool,
    remotely_on_hold: bool,
    /// Set once a negotiated format carries an `imageattr` attribute.
    quality_controls_supported: bool,
    /// Whether we advertise desktop-sharing remote control on video offers.
    local_remote_control: bool,
}

/// Mutable state serialized across negotiation rounds.
struct NegotiationState {
    registry: ContentRegistry,
}

/// Negotiates and maintains the media of one call leg.
pub struct MediaHandler {
    leg_id: LegId,
    role: NegotiationRole,
    config: AccountMediaConfig,
    engine: Arc<dyn MediaEngine>,
    conference: Arc<dyn CallConference>,
    selector: TransportSelector,
    security: SecurityNegotiator,
    streams: StreamSet,
    quality: QualityController,
    state: Mutex<NegotiationState>,
    flags: RwLock<HandlerFlags>,
    /// Per-media user preference, seeded from the account configuration.
    preferences: RwLock<HashMap<MediaType, MediaDirection>>,
    events: EventSender,
    event_rx: SyncMutex<Option<EventReceiver>>,
}

impl MediaHandler {
    pub fn builder(role: NegotiationRole) -> MediaHandlerBuilder {
        MediaHandlerBuilder::new(role)
    }

    pub fn leg_id(&self) -> &LegId {
        &self.leg_id
    }

    pub fn role(&self) -> NegotiationRole {
        self.role
    }

    pub fn is_initiator(&self) -> bool {
        self.role.is_initiator()
    }

    pub fn config(&self) -> &AccountMediaConfig {
        &self.config
    }

    /// The transport selector of this leg.
    pub fn transport(&self) -> &TransportSelector {
        &self.selector
    }

    /// Kind of the transport manager currently serving this leg.
    pub fn transport_kind(&self) -> Option<TransportKind> {
        self.selector.current_kind()
    }

    /// Restricts and orders the transports this leg may pick from.
    pub fn set_supported_transports<'a, I>(&self, namespaces: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.selector.set_supported(namespaces);
    }

    /// Encryption controls negotiated so far.
    pub fn srtp_controls(&self) -> &SrtpControlStore {
        self.security.store()
    }

    /// The encryption protocol settled on for a media type, if any.
    pub fn selected_encryption(&self, media: MediaType) -> Option<SrtpKind> {
        self.security.store().selected_kind(media)
    }

    /// Encryption protocols negotiation has settled on so far this call,
    /// in the order they were first seen.
    pub fn advertised_encryptions(&self) -> Vec<SrtpKind> {
        self.security.store().advertised_kinds()
    }

    pub fn streams(&self) -> &StreamSet {
        &self.streams
    }

    /// Streams currently alive on this leg, master stream first.
    pub fn active_streams(&self) -> Vec<ActiveStream> {
        self.streams.active()
    }

    /// Last SSRC the remote party was seen sending with.
    pub fn remote_ssrc(&self, media: MediaType) -> Option<u32> {
        self.streams.get(media).and_then(|stream| stream.remote_ssrc())
    }

    pub fn local_ssrc(&self, media: MediaType) -> Option<u32> {
        self.streams.get(media).and_then(|stream| stream.local_ssrc())
    }

    /// Remote quality hints, available once the remote side declared
    /// `imageattr` support.
    pub fn quality_control(&self) -> Option<&QualityController> {
        self.flags.read().quality_controls_supported.then_some(&self.quality)
    }

    pub fn quality_controls_supported(&self) -> bool {
        self.flags.read().quality_controls_supported
    }

    /// Forces the quality-control capability, for remote parties known to
    /// support it without declaring `imageattr`.
    pub fn set_quality_controls_supported(&self, supported: bool) {
        self.flags.write().quality_controls_supported = supported;
    }

    /// Overrides the user preference for one media type, e.g. when the
    /// camera is switched off mid-call.
    pub fn set_media_preference(&self, media: MediaType, direction: MediaDirection) {
        self.preferences.write().insert(media, direction);
    }

    /// Whether we offer desktop-sharing remote control on video contents.
    pub fn set_local_remote_control_support(&self, supported: bool) {
        self.flags.write().local_remote_control = supported;
    }

    /// Contents we declared, in declaration order.
    pub async fn local_contents(&self) -> Vec<ContentDescriptor> {
        self.state.lock().await.registry.locals()
    }

    /// Contents the remote party declared, in declaration order.
    pub async fn remote_contents(&self) -> Vec<ContentDescriptor> {
        self.state.lock().await.registry.remotes()
    }

    pub async fn local_content(&self, name: &str) -> Option<ContentDescriptor> {
        self.state.lock().await.registry.local(name).cloned()
    }

    pub async fn remote_content(&self, name: &str) -> Option<ContentDescriptor> {
        self.state.lock().await.registry.remote(name).cloned()
    }

    /// First local content carrying the given media type.
    pub async fn local_content_by_media(&self, media: MediaType) -> Option<ContentDescriptor> {
        self.state.lock().await.registry.local_by_media(media).cloned()
    }

    /// First remote content carrying the given media type.
    pub async fn remote_content_by_media(&self, media: MediaType) -> Option<ContentDescriptor> {
        self.state.lock().await.registry.remote_by_media(media).cloned()
    }

    /// Hands out the event stream. Subsequent calls return `None`.
    pub fn take_event_receiver(&self) -> Option<EventReceiver> {
        self.event_rx.lock().take()
    }

    /// Wraps up connectivity establishment and points the streams at the
    /// addresses the transport settled on.
    ///
    /// Call this once signaling is complete on both sides.
    pub async fn start(&self) -> Result<()> {
        let manager = self.selector.manager(self.role).await?;
        manager.wrapup_connectivity().await?;
        for active in self.streams.active() {
            let connector = manager.stream_connector(active.media)?;
            active.stream.set_connector(connector);
            if let Some(target) = manager.stream_target(active.media) {
                active.stream.set_target(target);
            }
        }
        info!(leg = %self.leg_id, "media started");
        Ok(())
    }

    /// Tears the leg down: streams, transport and key material.
    pub async fn close(&self) {
        self.streams.close_all();
        self.selector.close().await;
        self.security.store().clear();
        let mut state = self.state.lock().await;
        let remote_control_active = state
            .registry
            .remotes()
            .iter()
            .any(|content| content.remote_control);
        state.registry.clear();
        drop(state);
        if remote_control_active {
            self.emit(NegotiationEvent::RemoteControlRevoked);
        }
        info!(leg = %self.leg_id, "media handler closed");
    }

    fn user_preference(&self, media: MediaType) -> MediaDirection {
        self.preferences
            .read()
            .get(&media)
            .copied()
            .unwrap_or_else(|| self.config.user_preference(media))
    }

    fn active_device(&self, media: MediaType) -> Option<MediaDevice> {
        self.engine.device(media).filter(|device| device.is_active())
    }

    fn emit(&self, event: NegotiationEvent) {
        // Send failures mean nobody listens anymore, which is fine.
        let _ = self.events.send(event);
    }

    /// Runs candidate harvesting for `local` and returns the contents
    /// with their transports filled in.
    ///
    /// `remote` carries the offer we answer, `None` when we are the ones
    /// offering. A trickle `sender` is only meaningful while answering.
    async fn harvest_candidates(
        &self,
        remote: Option<Vec<ContentDescriptor>>,
        local: Vec<ContentDescriptor>,
        sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> Result<Vec<ContentDescriptor>> {
        if remote.is_none() && sender.is_some() {
            return Err(NegotiationError::internal(
                "transport-info cannot be trickled while making an offer",
            ));
        }
        let manager = self.transport_manager().await?;
        let started = Instant::now();
        manager.start_harvest(remote, local, sender).await?;
        debug!(
            leg = %self.leg_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "candidate harvest finished"
        );
        let mut harvested = manager.wrapup_harvest().await?;
        self.security.attach_dtls_to_transports(&mut harvested).await?;
        Ok(harvested)
    }

    async fn transport_manager(&self) -> Result<Arc<dyn TransportManager>> {
        self.selector.manager(self.role).await
    }
}

impl fmt::Debug for MediaHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandler")
            .field("leg_id", &self.leg_id)
            .field("role", &self.role)
            .field("transport", &self.selector.current_kind())
            .finish_non_exhaustive()
    }
}

/// Picks the master stream within one negotiation round.
///
/// A lone content is always master; with several, audio anchors the key
/// material. At most one content per round wins.
fn claim_master(master_set: &mut bool, total: usize, media: MediaType) -> bool {
    if *master_set {
        return false;
    }
    let master = total <= 1 || media == MediaType::Audio;
    if master {
        *master_set = true;
    }
    master
}

/// Builder for [`MediaHandler`].
///
/// A media engine and a transport factory are mandatory; everything else
/// has a sensible two-party default.
pub struct MediaHandlerBuilder {
    role: NegotiationRole,
    config: AccountMediaConfig,
    engine: Option<Arc<dyn MediaEngine>>,
    factory: Option<Arc<dyn TransportFactory>>,
    conference: Arc<dyn CallConference>,
    discovery: Arc<dyn FeatureDiscovery>,
    transport_wait: Option<Duration>,
}

impl MediaHandlerBuilder {
    pub fn new(role: NegotiationRole) -> Self {
        Self {
            role,
            config: AccountMediaConfig::default(),
            engine: None,
            factory: None,
            conference: Arc::new(DirectCall::new()),
            discovery: Arc::new(PermissiveDiscovery),
            transport_wait: None,
        }
    }

    pub fn with_config(mut self, config: AccountMediaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_conference(mut self, conference: Arc<dyn CallConference>) -> Self {
        self.conference = conference;
        self
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn FeatureDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    /// Bounds how long a responder waits for the offer to fix the transport.
    pub fn with_transport_wait(mut self, bound: Duration) -> Self {
        self.transport_wait = Some(bound);
        self
    }

    pub fn build(self) -> Result<MediaHandler> {
        let engine = self
            .engine
            .ok_or_else(|| NegotiationError::internal("media handler needs a media engine"))?;
        let factory = self
            .factory
            .ok_or_else(|| NegotiationError::internal("media handler needs a transport factory"))?;

        let (events, event_rx) = mpsc::unbounded_channel();
        let mut selector =
            TransportSelector::new(factory, Arc::clone(&self.discovery), events.clone());
        if let Some(bound) = self.transport_wait {
            selector = selector.with_wait_bound(bound);
        }
        let security = SecurityNegotiator::new(
            self.role,
            self.config.clone(),
            Arc::clone(&engine),
            Arc::clone(&self.discovery),
            Arc::clone(&self.conference),
            events.clone(),
        );
        let preferences = MediaType::ALL
            .iter()
            .map(|&media| (media, self.config.user_preference(media)))
            .collect();

        Ok(MediaHandler {
            leg_id: LegId::new(),
            role: self.role,
            config: self.config,
            engine,
            conference: self.conference,
            selector,
            security,
            streams: StreamSet::new(events.clone()),
            quality: QualityController::new(),
            state: Mutex::new(NegotiationState {
                registry: ContentRegistry::new(),
            }),
            flags: RwLock::new(HandlerFlags::default()),
            preferences: RwLock::new(preferences),
            events,
            event_rx: SyncMutex::new(Some(event_rx)),
        })
    }
}

impl fmt::Debug for MediaHandlerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandlerBuilder")
            .field("role", &self.role)
            .field("has_engine", &self.engine.is_some())
            .field("has_factory", &self.factory.is_some())
            .finish_non_exhaustive()
    }
}
