//! Encryption negotiation across DTLS-SRTP, SDES and ZRTP.
//!
//! Offers advertise every enabled protocol; answers pick exactly one by
//! walking the configured priority order and keeping the first protocol
//! the remote party can do. Selecting a protocol evicts the others for
//! that media type, so at most one control per media is ever live once a
//! round completes.

mod dtls;
mod sdes;
mod zrtp;

use crate::capabilities::{CallConference, FeatureDiscovery, MediaEngine};
use crate::config::AccountMediaConfig;
use crate::errors::Result;
use crate::events::{EventSender, NegotiationEvent};
use crate::types::NegotiationRole;
use dashmap::DashMap;
use parking_lot::Mutex;
use rjingle_content_core::{ContentDescriptor, CryptoAttribute, DtlsSetup, Fingerprint, MediaType, ZrtpHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The SRTP key negotiation protocols this stack can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SrtpKind {
    DtlsSrtp,
    Sdes,
    Zrtp,
}

impl SrtpKind {
    pub const ALL: [SrtpKind; 3] = [SrtpKind::DtlsSrtp, SrtpKind::Sdes, SrtpKind::Zrtp];

    pub fn as_str(self) -> &'static str {
        match self {
            SrtpKind::DtlsSrtp => "dtls-srtp",
            SrtpKind::Sdes => "sdes",
            SrtpKind::Zrtp => "zrtp",
        }
    }
}

impl fmt::Display for SrtpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negotiation state of a DTLS-SRTP control.
#[derive(Debug, Clone, PartialEq)]
pub struct DtlsControl {
    /// Our setup role, fixed by the session role for the whole call.
    pub setup: DtlsSetup,
    /// Fingerprints the remote party advertised, empty until they did.
    pub remote_fingerprints: Vec<Fingerprint>,
    /// Whether the remote transport multiplexes RTCP.
    pub rtcp_mux: bool,
}

impl Default for DtlsControl {
    fn default() -> Self {
        Self {
            setup: DtlsSetup::ActPass,
            remote_fingerprints: Vec::new(),
            rtcp_mux: false,
        }
    }
}

/// Negotiation state of an SDES control.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SdesControl {
    /// Cipher suites we may negotiate, in preference order.
    pub enabled_ciphers: Vec<String>,
    /// The crypto attributes we put into our offer.
    pub local_offers: Vec<CryptoAttribute>,
    /// The attribute the round settled on, once it did.
    pub selected: Option<CryptoAttribute>,
}

/// Negotiation state of a ZRTP control.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZrtpControl {
    /// Hello-hashes we advertise, one per supported protocol version.
    pub hello_hashes: Vec<ZrtpHash>,
    /// Whether the remote party advertised ZRTP in signaling.
    pub remote_capable: bool,
}

/// Per-protocol negotiation state for one media type.
#[derive(Debug, Clone, PartialEq)]
pub enum SrtpControl {
    Dtls(DtlsControl),
    Sdes(SdesControl),
    Zrtp(ZrtpControl),
}

impl SrtpControl {
    pub fn kind(&self) -> SrtpKind {
        match self {
            SrtpControl::Dtls(_) => SrtpKind::DtlsSrtp,
            SrtpControl::Sdes(_) => SrtpKind::Sdes,
            SrtpControl::Zrtp(_) => SrtpKind::Zrtp,
        }
    }

    pub fn into_dtls(self) -> Option<DtlsControl> {
        match self {
            SrtpControl::Dtls(control) => Some(control),
            _ => None,
        }
    }

    pub fn into_sdes(self) -> Option<SdesControl> {
        match self {
            SrtpControl::Sdes(control) => Some(control),
            _ => None,
        }
    }

    pub fn into_zrtp(self) -> Option<ZrtpControl> {
        match self {
            SrtpControl::Zrtp(control) => Some(control),
            _ => None,
        }
    }
}

/// All live SRTP controls of a leg, keyed by media type and protocol.
///
/// Lookups return clones; writers replace a control wholesale. Closing a
/// control mid-round is safe since readers never hold a reference into
/// the map.
pub struct SrtpControlStore {
    controls: DashMap<(MediaType, SrtpKind), SrtpControl>,
    selected: DashMap<MediaType, SrtpKind>,
    /// Protocols both sides have proven they can do, in first-seen order.
    advertised: Mutex<Vec<SrtpKind>>,
    events: EventSender,
}

impl SrtpControlStore {
    pub(crate) fn new(events: EventSender) -> Self {
        Self {
            controls: DashMap::new(),
            selected: DashMap::new(),
            advertised: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn get(&self, media: MediaType, kind: SrtpKind) -> Option<SrtpControl> {
        self.controls.get(&(media, kind)).map(|entry| entry.clone())
    }

    pub fn contains(&self, media: MediaType, kind: SrtpKind) -> bool {
        self.controls.contains_key(&(media, kind))
    }

    /// The protocol a completed round settled on for a media type.
    pub fn selected_kind(&self, media: MediaType) -> Option<SrtpKind> {
        self.selected.get(&media).map(|entry| *entry)
    }

    /// Protocols every negotiation round so far has settled on, in the
    /// order they were first seen. Survives content removal; a removed
    /// content does not unlearn what the remote party can do.
    pub fn advertised_kinds(&self) -> Vec<SrtpKind> {
        self.advertised.lock().clone()
    }

    pub(crate) fn note_advertised(&self, kind: SrtpKind) {
        let mut advertised = self.advertised.lock();
        if !advertised.contains(&kind) {
            advertised.push(kind);
        }
    }

    pub(crate) fn insert(&self, media: MediaType, control: SrtpControl) {
        self.controls.insert((media, control.kind()), control);
    }

    /// Marks a protocol as the winner for a media type and evicts the
    /// other protocols. Emits [`NegotiationEvent::EncryptionSelected`]
    /// when the winner actually changed.
    pub(crate) fn select(&self, media: MediaType, kind: SrtpKind) {
        for other in SrtpKind::ALL {
            if other != kind {
                self.controls.remove(&(media, other));
            }
        }
        let previous = self.selected.insert(media, kind);
        if previous != Some(kind) {
            debug!(%media, protocol = %kind, "encryption protocol selected");
            let _ = self
                .events
                .send(NegotiationEvent::EncryptionSelected { media, protocol: kind });
        }
    }

    /// Drops a control that can no longer be negotiated. Emits
    /// [`NegotiationEvent::SecurityNegotiationFailed`] only when a
    /// control was actually present.
    pub(crate) fn discard(&self, media: MediaType, kind: SrtpKind, reason: &str) -> bool {
        if self.controls.remove(&(media, kind)).is_none() {
            return false;
        }
        self.selected.remove_if(&media, |_, selected| *selected == kind);
        debug!(%media, protocol = %kind, reason, "encryption protocol abandoned");
        let _ = self.events.send(NegotiationEvent::SecurityNegotiationFailed {
            media,
            protocol: kind,
            reason: reason.to_string(),
        });
        true
    }

    /// Silently drops every control of a media type, for content removal.
    pub(crate) fn remove_media(&self, media: MediaType) {
        for kind in SrtpKind::ALL {
            self.controls.remove(&(media, kind));
        }
        self.selected.remove(&media);
    }

    pub(crate) fn clear(&self) {
        self.controls.clear();
        self.selected.clear();
        self.advertised.lock().clear();
    }
}

impl fmt::Debug for SrtpControlStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrtpControlStore")
            .field("controls", &self.controls.len())
            .field("selected", &self.selected.len())
            .finish()
    }
}

/// Drives encryption negotiation for one leg.
///
/// The offer path advertises every enabled protocol. The answer and
/// confirmation paths walk [`AccountMediaConfig::encryption_priority`]
/// and stop at the first protocol both sides can do.
pub struct SecurityNegotiator {
    role: NegotiationRole,
    config: AccountMediaConfig,
    engine: Arc<dyn MediaEngine>,
    discovery: Arc<dyn FeatureDiscovery>,
    conference: Arc<dyn CallConference>,
    store: SrtpControlStore,
}

impl SecurityNegotiator {
    pub(crate) fn new(
        role: NegotiationRole,
        config: AccountMediaConfig,
        engine: Arc<dyn MediaEngine>,
        discovery: Arc<dyn FeatureDiscovery>,
        conference: Arc<dyn CallConference>,
        events: EventSender,
    ) -> Self {
        Self {
            role,
            config,
            engine,
            discovery,
            conference,
            store: SrtpControlStore::new(events),
        }
    }

    pub fn store(&self) -> &SrtpControlStore {
        &self.store
    }

    /// Advertises every enabled protocol on an outgoing offer content.
    pub(crate) async fn describe_for_offer(
        &self,
        media: MediaType,
        content: &mut ContentDescriptor,
    ) -> Result<()> {
        if !self.config.default_encryption {
            return Ok(());
        }
        for kind in self.config.encryption_priority.clone() {
            match kind {
                SrtpKind::DtlsSrtp => {
                    self.offer_dtls(media).await?;
                }
                SrtpKind::Sdes => {
                    self.offer_sdes(media, content).await?;
                }
                SrtpKind::Zrtp => {
                    self.offer_zrtp(media, content).await?;
                }
            }
        }
        Ok(())
    }

    /// Picks one protocol while answering a remote offer and attaches the
    /// matching advertisement to the outgoing answer content.
    pub(crate) async fn select_for_answer(
        &self,
        media: MediaType,
        local: &mut ContentDescriptor,
        remote: &ContentDescriptor,
    ) -> Result<()> {
        if !self.config.default_encryption {
            return Ok(());
        }
        for kind in self.config.encryption_priority.clone() {
            let picked = match kind {
                SrtpKind::DtlsSrtp => self.answer_dtls(media, remote)?,
                SrtpKind::Sdes => self.answer_sdes(media, local, remote).await?,
                SrtpKind::Zrtp => self.answer_zrtp(media, local, remote).await?,
            };
            if picked {
                self.store.note_advertised(kind);
                self.store.select(media, kind);
                return Ok(());
            }
        }
        Ok(())
    }

    /// Confirms what the remote answer settled on, as the offering side.
    pub(crate) fn process_remote_answer(
        &self,
        media: MediaType,
        remote: &ContentDescriptor,
    ) -> Result<()> {
        if !self.config.default_encryption {
            return Ok(());
        }
        for kind in self.config.encryption_priority.clone() {
            let confirmed = match kind {
                SrtpKind::DtlsSrtp => self.confirm_dtls(media, remote)?,
                SrtpKind::Sdes => self.confirm_sdes(media, remote)?,
                SrtpKind::Zrtp => self.confirm_zrtp(media, remote)?,
            };
            if confirmed {
                self.store.note_advertised(kind);
                self.store.select(media, kind);
                return Ok(());
            }
        }
        // Nothing we advertised came back. DTLS and SDES cannot proceed
        // without a signaled confirmation. The ZRTP control stays alive
        // since its key agreement continues in-band over RTP.
        self.store
            .discard(media, SrtpKind::DtlsSrtp, "answer carried no fingerprint");
        self.store
            .discard(media, SrtpKind::Sdes, "answer carried no crypto attribute");
        Ok(())
    }
}

impl fmt::Debug for SecurityNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityNegotiator")
            .field("role", &self.role)
            .field("store", &self.store)
            .finish()
    }
}
