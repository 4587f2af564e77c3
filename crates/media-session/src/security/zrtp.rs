//! ZRTP hello-hash signaling.
//!
//! ZRTP agrees on keys in-band over RTP; signaling only carries the
//! hello-hash so the peers can authenticate the in-band exchange. That is
//! why an unanswered ZRTP advertisement is not torn down the way DTLS and
//! SDES are.

use super::{SecurityNegotiator, SrtpControl, SrtpKind};
use crate::errors::Result;
use rjingle_content_core::{ContentDescriptor, EncryptionDescriptor, MediaType};

fn advertises_zrtp(content: &ContentDescriptor) -> bool {
    content
        .description
        .encryption
        .as_ref()
        .is_some_and(|encryption| encryption.zrtp_hashes.iter().any(|h| !h.hash.is_empty()))
}

impl SecurityNegotiator {
    fn zrtp_enabled(&self) -> bool {
        self.config.is_protocol_enabled(SrtpKind::Zrtp) && self.conference.zrtp_signaling_enabled()
    }

    /// Offer path: advertise our hello-hashes without knowing whether the
    /// remote party does ZRTP at all.
    pub(super) async fn offer_zrtp(
        &self,
        media: MediaType,
        content: &mut ContentDescriptor,
    ) -> Result<bool> {
        if !self.zrtp_enabled() {
            return Ok(false);
        }
        let hashes: Vec<_> = self
            .engine
            .zrtp_hello_hashes(media)
            .await?
            .into_iter()
            .filter(|h| !h.hash.is_empty())
            .collect();
        if hashes.is_empty() {
            return Ok(false);
        }
        let mut control = self
            .store
            .get(media, SrtpKind::Zrtp)
            .and_then(SrtpControl::into_zrtp)
            .unwrap_or_default();
        control.hello_hashes = hashes.clone();
        self.store.insert(media, SrtpControl::Zrtp(control));

        content
            .description
            .encryption
            .get_or_insert_with(EncryptionDescriptor::new)
            .zrtp_hashes
            .extend(hashes);
        Ok(true)
    }

    /// Answer path: strict, we only advertise back when the offer did.
    pub(super) async fn answer_zrtp(
        &self,
        media: MediaType,
        local: &mut ContentDescriptor,
        remote: &ContentDescriptor,
    ) -> Result<bool> {
        if !self.zrtp_enabled() {
            return Ok(false);
        }
        if !advertises_zrtp(remote) {
            return Ok(false);
        }
        let hashes: Vec<_> = self
            .engine
            .zrtp_hello_hashes(media)
            .await?
            .into_iter()
            .filter(|h| !h.hash.is_empty())
            .collect();
        if hashes.is_empty() {
            return Ok(false);
        }
        let mut control = self
            .store
            .get(media, SrtpKind::Zrtp)
            .and_then(SrtpControl::into_zrtp)
            .unwrap_or_default();
        control.hello_hashes = hashes.clone();
        control.remote_capable = true;
        self.store.insert(media, SrtpControl::Zrtp(control));

        local
            .description
            .encryption
            .get_or_insert_with(EncryptionDescriptor::new)
            .zrtp_hashes
            .extend(hashes);
        Ok(true)
    }

    /// Confirmation path: the answer echoing a hello-hash settles the
    /// round on ZRTP.
    pub(super) fn confirm_zrtp(&self, media: MediaType, remote: &ContentDescriptor) -> Result<bool> {
        if !self.zrtp_enabled() {
            return Ok(false);
        }
        let Some(mut control) = self
            .store
            .get(media, SrtpKind::Zrtp)
            .and_then(SrtpControl::into_zrtp)
        else {
            return Ok(false);
        };
        if !advertises_zrtp(remote) {
            return Ok(false);
        }
        control.remote_capable = true;
        self.store.insert(media, SrtpControl::Zrtp(control));
        Ok(true)
    }
}
