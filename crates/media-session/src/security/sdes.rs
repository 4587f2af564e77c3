//! SDES (RFC 4568) negotiation.

use super::{SecurityNegotiator, SrtpControl, SrtpKind};
use crate::errors::Result;
use rjingle_content_core::{ContentDescriptor, EncryptionDescriptor, MediaType};
use tracing::warn;

impl SecurityNegotiator {
    /// Offer path: one crypto attribute per enabled cipher suite goes
    /// onto the outgoing description, unconditionally.
    pub(super) async fn offer_sdes(
        &self,
        media: MediaType,
        content: &mut ContentDescriptor,
    ) -> Result<bool> {
        if !self.config.is_protocol_enabled(SrtpKind::Sdes) {
            return Ok(false);
        }
        let ciphers = self.config.sdes_cipher_suites.clone();
        let offers = self.engine.sdes_offers(media, &ciphers).await?;
        if offers.is_empty() {
            return Ok(false);
        }
        let mut control = self
            .store
            .get(media, SrtpKind::Sdes)
            .and_then(SrtpControl::into_sdes)
            .unwrap_or_default();
        control.enabled_ciphers = ciphers;
        control.local_offers = offers.clone();
        control.selected = None;
        self.store.insert(media, SrtpControl::Sdes(control));

        let encryption = content
            .description
            .encryption
            .get_or_insert_with(EncryptionDescriptor::new);
        encryption.cryptos.extend(offers);
        Ok(true)
    }

    /// Answer path: pick one of the offered crypto attributes by our
    /// cipher preference and echo our side of it.
    pub(super) async fn answer_sdes(
        &self,
        media: MediaType,
        local: &mut ContentDescriptor,
        remote: &ContentDescriptor,
    ) -> Result<bool> {
        if !self.config.is_protocol_enabled(SrtpKind::Sdes) {
            return Ok(false);
        }
        let Some(remote_encryption) = remote.description.encryption.as_ref() else {
            return Ok(false);
        };
        if remote_encryption.cryptos.is_empty() {
            return Ok(false);
        }
        let ciphers = self.config.sdes_cipher_suites.clone();
        let answer = self
            .engine
            .sdes_responder_select(media, &remote_encryption.cryptos, &ciphers)
            .await?;
        let Some(answer) = answer else {
            warn!(%media, "Received unsupported sdes crypto attribute");
            self.store
                .discard(media, SrtpKind::Sdes, "no mutually supported crypto suite");
            return Ok(false);
        };
        let mut control = self
            .store
            .get(media, SrtpKind::Sdes)
            .and_then(SrtpControl::into_sdes)
            .unwrap_or_default();
        control.enabled_ciphers = ciphers;
        control.selected = Some(answer.clone());
        self.store.insert(media, SrtpControl::Sdes(control));

        local
            .description
            .encryption
            .get_or_insert_with(EncryptionDescriptor::new)
            .cryptos
            .push(answer);
        Ok(true)
    }

    /// Confirmation path: the answer must echo exactly one of the
    /// attributes we offered, identified by tag and suite.
    pub(super) fn confirm_sdes(&self, media: MediaType, remote: &ContentDescriptor) -> Result<bool> {
        if !self.config.is_protocol_enabled(SrtpKind::Sdes) {
            return Ok(false);
        }
        let Some(mut control) = self
            .store
            .get(media, SrtpKind::Sdes)
            .and_then(SrtpControl::into_sdes)
        else {
            return Ok(false);
        };
        let Some(choice) = remote
            .description
            .encryption
            .as_ref()
            .and_then(|encryption| encryption.cryptos.first())
        else {
            return Ok(false);
        };
        let offered = control
            .local_offers
            .iter()
            .any(|offer| offer.tag == choice.tag && offer.crypto_suite == choice.crypto_suite);
        if !offered {
            warn!(%media, "Received unsupported sdes crypto attribute");
            self.store.discard(
                media,
                SrtpKind::Sdes,
                "answer selected a crypto attribute we did not offer",
            );
            return Ok(false);
        }
        control.selected = Some(choice.clone());
        self.store.insert(media, SrtpControl::Sdes(control));
        Ok(true)
    }
}
