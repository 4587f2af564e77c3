//! DTLS-SRTP negotiation.
//!
//! DTLS advertises through fingerprints on the transport element, not
//! through the description's encryption element. Fingerprints are only
//! stamped onto transports after candidate harvesting, once transports
//! exist, see [`SecurityNegotiator::attach_dtls_to_transports`].

use super::{SecurityNegotiator, SrtpControl, SrtpKind};
use crate::errors::Result;
use crate::types::NegotiationRole;
use rjingle_content_core::{ContentDescriptor, DtlsSetup, MediaType, DTLS_SRTP_FEATURE};
use tracing::debug;

impl SecurityNegotiator {
    /// The initiator of the session waits for the handshake, the
    /// responder opens it.
    fn local_dtls_setup(&self) -> DtlsSetup {
        match self.role {
            NegotiationRole::Initiator => DtlsSetup::Passive,
            NegotiationRole::Responder => DtlsSetup::Active,
        }
    }

    /// Offer path. The remote capability set is consulted since a DTLS
    /// handshake against a party that never advertised the feature would
    /// just stall.
    pub(super) async fn offer_dtls(&self, media: MediaType) -> Result<bool> {
        if !self.config.is_protocol_enabled(SrtpKind::DtlsSrtp) {
            return Ok(false);
        }
        if !self.discovery.remote_supports(DTLS_SRTP_FEATURE).await {
            debug!(%media, "peer does not advertise dtls-srtp, not offering it");
            return Ok(false);
        }
        let mut control = self
            .store
            .get(media, SrtpKind::DtlsSrtp)
            .and_then(SrtpControl::into_dtls)
            .unwrap_or_default();
        control.setup = self.local_dtls_setup();
        self.store.insert(media, SrtpControl::Dtls(control));
        Ok(true)
    }

    /// Answer path. The remote offer must carry at least one fingerprint;
    /// its presence doubles as the capability proof.
    pub(super) fn answer_dtls(&self, media: MediaType, remote: &ContentDescriptor) -> Result<bool> {
        if !self.config.is_protocol_enabled(SrtpKind::DtlsSrtp) {
            return Ok(false);
        }
        let Some(transport) = remote.transport.as_ref() else {
            return Ok(false);
        };
        if transport.fingerprints.is_empty() {
            return Ok(false);
        }
        let mut control = self
            .store
            .get(media, SrtpKind::DtlsSrtp)
            .and_then(SrtpControl::into_dtls)
            .unwrap_or_default();
        control.setup = self.local_dtls_setup();
        control.remote_fingerprints = transport.fingerprints.clone();
        control.rtcp_mux = transport.rtcp_mux;
        self.store.insert(media, SrtpControl::Dtls(control));
        Ok(true)
    }

    /// Confirmation path. Only a control we offered may confirm; an
    /// answer cannot introduce DTLS on its own.
    pub(super) fn confirm_dtls(&self, media: MediaType, remote: &ContentDescriptor) -> Result<bool> {
        if !self.config.is_protocol_enabled(SrtpKind::DtlsSrtp) {
            return Ok(false);
        }
        let Some(transport) = remote.transport.as_ref() else {
            return Ok(false);
        };
        if transport.fingerprints.is_empty() {
            return Ok(false);
        }
        let Some(mut control) = self
            .store
            .get(media, SrtpKind::DtlsSrtp)
            .and_then(SrtpControl::into_dtls)
        else {
            return Ok(false);
        };
        control.remote_fingerprints = transport.fingerprints.clone();
        control.rtcp_mux = transport.rtcp_mux;
        self.store.insert(media, SrtpControl::Dtls(control));
        Ok(true)
    }

    /// Stamps our fingerprints onto every harvested transport whose media
    /// type still has a live DTLS control.
    pub(crate) async fn attach_dtls_to_transports(
        &self,
        contents: &mut [ContentDescriptor],
    ) -> Result<()> {
        for content in contents.iter_mut() {
            let media = content.media();
            let Some(control) = self
                .store
                .get(media, SrtpKind::DtlsSrtp)
                .and_then(SrtpControl::into_dtls)
            else {
                continue;
            };
            let Some(transport) = content.transport.as_mut() else {
                continue;
            };
            let mut fingerprints = self.engine.dtls_fingerprints(media).await?;
            for fingerprint in &mut fingerprints {
                fingerprint.setup = Some(control.setup);
            }
            transport.fingerprints = fingerprints;
        }
        Ok(())
    }
}
