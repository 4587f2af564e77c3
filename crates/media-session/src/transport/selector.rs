//! Picks and installs the transport manager for a leg.

use super::{TransportFactory, TransportManager, TransportSlot};
use crate::capabilities::FeatureDiscovery;
use crate::errors::{NegotiationError, Result};
use crate::events::{EventSender, NegotiationEvent};
use crate::types::NegotiationRole;
use parking_lot::RwLock;
use rjingle_content_core::TransportKind;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How long the answering side waits for the offer to fix the transport.
pub const DEFAULT_TRANSPORT_WAIT: Duration = Duration::from_secs(5);

/// Chooses between the available transport implementations and manages
/// the one in use.
///
/// The offering side picks a transport itself, from the explicitly
/// configured list when one was set and from capability discovery
/// otherwise. The answering side never picks; it waits for
/// [`TransportSelector::set_from_namespace`] to be fed from the incoming
/// offer.
pub struct TransportSelector {
    factory: Arc<dyn TransportFactory>,
    discovery: Arc<dyn FeatureDiscovery>,
    slot: TransportSlot,
    /// Explicitly configured transports, most preferred first.
    supported: RwLock<Option<Vec<TransportKind>>>,
    wait_bound: Duration,
    events: EventSender,
}

impl TransportSelector {
    pub(crate) fn new(
        factory: Arc<dyn TransportFactory>,
        discovery: Arc<dyn FeatureDiscovery>,
        events: EventSender,
    ) -> Self {
        Self {
            factory,
            discovery,
            slot: TransportSlot::new(),
            supported: RwLock::new(None),
            wait_bound: DEFAULT_TRANSPORT_WAIT,
            events,
        }
    }

    pub(crate) fn with_wait_bound(mut self, bound: Duration) -> Self {
        self.wait_bound = bound;
        self
    }

    /// The manager currently installed, if any.
    pub fn current(&self) -> Option<Arc<dyn TransportManager>> {
        self.slot.current()
    }

    pub fn current_kind(&self) -> Option<TransportKind> {
        self.current().map(|manager| manager.kind())
    }

    /// Restricts transport selection to the given namespaces.
    ///
    /// Unknown namespaces are dropped with a warning and the recognized
    /// rest is ordered ICE before raw UDP regardless of input order. A
    /// list without a single recognized namespace leaves the previous
    /// restriction in place.
    pub fn set_supported<'a, I>(&self, namespaces: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut kinds: Vec<TransportKind> = Vec::new();
        for namespace in namespaces {
            match TransportKind::from_namespace(namespace) {
                Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
                Some(_) => {}
                None => warn!(namespace, "ignoring unsupported transport namespace"),
            }
        }
        if kinds.is_empty() {
            return;
        }
        kinds.sort_by_key(|kind| {
            TransportKind::PREFERRED_ORDER
                .iter()
                .position(|preferred| preferred == kind)
        });
        *self.supported.write() = Some(kinds);
    }

    /// The manager for this leg, installing one first when allowed.
    ///
    /// The answering side waits [`Self::wait_bound`] for the offer to fix
    /// the transport and fails with
    /// [`NegotiationError::TransportManagerUnset`] when it never does.
    pub async fn manager(&self, role: NegotiationRole) -> Result<Arc<dyn TransportManager>> {
        if let Some(current) = self.slot.current() {
            return Ok(current);
        }
        match role {
            NegotiationRole::Responder => {
                self.slot
                    .wait(self.wait_bound)
                    .await
                    .ok_or(NegotiationError::TransportManagerUnset {
                        waited_ms: self.wait_bound.as_millis() as u64,
                    })
            }
            NegotiationRole::Initiator => {
                let kind = self.pick_kind().await?;
                self.install(kind).await
            }
        }
    }

    /// Derives and installs the manager from an offered transport
    /// namespace. Installing the kind already in place is a no-op; a
    /// different kind replaces and closes the previous instance.
    pub async fn set_from_namespace(&self, namespace: &str) -> Result<()> {
        let kind = TransportKind::from_namespace(namespace).ok_or_else(|| {
            NegotiationError::UnsupportedTransport {
                namespace: namespace.to_string(),
            }
        })?;
        if !self.discovery.local_supports(kind.namespace()) {
            return Err(NegotiationError::UnsupportedTransport {
                namespace: namespace.to_string(),
            });
        }
        if let Some(current) = self.slot.current() {
            if current.kind() == kind {
                return Ok(());
            }
        }
        self.install(kind).await?;
        Ok(())
    }

    /// Shuts down the installed manager, if any.
    pub async fn close(&self) {
        if let Some(manager) = self.slot.clear() {
            manager.close().await;
        }
    }

    async fn pick_kind(&self) -> Result<TransportKind> {
        let configured = self.supported.read().clone();
        if let Some(kind) = configured.and_then(|kinds| kinds.first().copied()) {
            return Ok(kind);
        }
        for kind in TransportKind::PREFERRED_ORDER {
            if self.discovery.mutually_supports(kind.namespace()).await {
                return Ok(kind);
            }
        }
        Err(NegotiationError::NoSupportedTransport)
    }

    async fn install(&self, kind: TransportKind) -> Result<Arc<dyn TransportManager>> {
        let manager = self.factory.create(kind).await?;
        if let Some(previous) = self.slot.set(manager.clone()) {
            debug!(old = %previous.kind(), new = %kind, "replacing transport manager");
            previous.close().await;
        } else {
            debug!(%kind, "transport manager installed");
        }
        let _ = self.events.send(NegotiationEvent::TransportSelected { kind });
        Ok(manager)
    }
}

impl fmt::Debug for TransportSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSelector")
            .field("current", &self.current_kind())
            .field("supported", &*self.supported.read())
            .field("wait_bound", &self.wait_bound)
            .finish()
    }
}
