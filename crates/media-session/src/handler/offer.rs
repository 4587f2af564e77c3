//! Offer construction.
//!
//! Turns the locally available devices into Jingle contents, applying
//! user preferences, hold state and conference rules, then harvests
//! transport candidates for them.

use super::MediaHandler;
use crate::errors::{NegotiationError, Result};
use rjingle_content_core::{
    ContentDescriptor, CreatorRole, MediaDirection, MediaType, PayloadFormat, RtpExtension,
    Senders,
};
use tracing::debug;

impl MediaHandler {
    /// Describes every active device as an offer content and harvests
    /// transport candidates for the lot.
    ///
    /// Receive-only media is left out entirely; an audio-only call must
    /// not offer video.
    pub async fn create_content_list(&self) -> Result<Vec<ContentDescriptor>> {
        let mut state = self.state.lock().await;
        let mut contents = Vec::new();

        for media in MediaType::ALL {
            let Some(device) = self.active_device(media) else {
                continue;
            };
            let mut direction = device.direction;
            // A translating conference focus forwards video it never captures.
            if !(media == MediaType::Video && self.conference.rtp_translation_enabled(media)) {
                direction = direction.and(self.user_preference(media));
            }
            if self.flags.read().locally_on_hold {
                direction = direction.and(MediaDirection::SendOnly);
            }
            if direction == MediaDirection::ReceiveOnly {
                direction = MediaDirection::Inactive;
            }
            if direction == MediaDirection::Inactive {
                continue;
            }

            let formats = self.engine.supported_formats(media, None, None);
            if formats.is_empty() {
                continue;
            }
            let mut content =
                self.build_offer_content(media, formats, direction, device.extensions);
            self.security.describe_for_offer(media, &mut content).await?;
            if media == MediaType::Video && self.flags.read().local_remote_control {
                content.remote_control = true;
            }
            debug!(leg = %self.leg_id, %media, %direction, "described local media for offer");
            state.registry.upsert_local(content.clone());
            contents.push(content);
        }

        if contents.is_empty() {
            return Err(NegotiationError::NoActiveDevices);
        }

        let harvested = self.harvest_candidates(None, contents, None).await?;
        for content in &harvested {
            state.registry.upsert_local(content.clone());
        }
        Ok(harvested)
    }

    /// Like [`create_content_list`](Self::create_content_list) but for a
    /// single media type, used when adding a content to a running session.
    pub async fn create_content_list_for(
        &self,
        media: MediaType,
    ) -> Result<Vec<ContentDescriptor>> {
        let mut state = self.state.lock().await;
        let mut contents = Vec::new();

        if let Some(content) = self.describe_media(media).await? {
            state.registry.upsert_local(content.clone());
            contents.push(content);
        }
        if contents.is_empty() {
            return Err(NegotiationError::NoActiveDevices);
        }

        let harvested = self.harvest_candidates(None, contents, None).await?;
        for content in &harvested {
            state.registry.upsert_local(content.clone());
        }
        Ok(harvested)
    }

    /// Describes a single media type without harvesting transports, for
    /// callers that assemble the session update themselves.
    pub async fn create_content_for_media(
        &self,
        media: MediaType,
    ) -> Result<Option<ContentDescriptor>> {
        let mut state = self.state.lock().await;
        let content = self.describe_media(media).await?;
        if let Some(content) = &content {
            state.registry.upsert_local(content.clone());
        }
        Ok(content)
    }

    /// Describes the active device of one media type as an offer content.
    ///
    /// Unlike the full-offer path this honors conference fan-out (we may
    /// have to send on behalf of other participants) and the quality
    /// presets the remote party announced.
    async fn describe_media(&self, media: MediaType) -> Result<Option<ContentDescriptor>> {
        let Some(device) = self.active_device(media) else {
            return Ok(None);
        };
        let mut direction = device.direction;
        if !(media == MediaType::Video && self.conference.rtp_translation_enabled(media)) {
            direction = direction.and(self.user_preference(media));
        }
        if self.conference.is_conference_focus() {
            let forwards_for_someone = self
                .conference
                .peer_views(media)
                .iter()
                .any(|view| view.remote_sends());
            if forwards_for_someone {
                direction = direction.or(MediaDirection::SendOnly);
            }
        }
        if self.flags.read().locally_on_hold {
            direction = direction.and(MediaDirection::SendOnly);
        }
        if direction == MediaDirection::Inactive {
            return Ok(None);
        }

        let send = self.quality.remote_receive();
        let receive = self.quality.remote_send_max();
        let formats = self
            .engine
            .supported_formats(media, send.as_ref(), receive.as_ref());
        if formats.is_empty() {
            return Ok(None);
        }
        let mut content = self.build_offer_content(media, formats, direction, device.extensions);
        self.security.describe_for_offer(media, &mut content).await?;
        Ok(Some(content))
    }

    fn build_offer_content(
        &self,
        media: MediaType,
        formats: Vec<PayloadFormat>,
        direction: MediaDirection,
        extensions: Vec<RtpExtension>,
    ) -> ContentDescriptor {
        let senders = Senders::from_direction(direction, self.role.is_initiator());
        ContentDescriptor::builder(media.as_str(), media)
            .creator(CreatorRole::Initiator)
            .senders(senders)
            .formats(formats)
            .extensions(extensions)
            .build()
    }
}
