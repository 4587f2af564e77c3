//! Answer processing and re-negotiation.
//!
//! The responder half: turning a remote offer into an answer, wrapping
//! that answer up for session-accept, and digesting the remote answer or
//! later content updates on the offering side.

use super::{claim_master, MediaHandler};
use crate::capabilities::{StreamSpec, TransportInfoSender};
use crate::errors::{NegotiationError, Result};
use crate::events::NegotiationEvent;
use rjingle_content_core::{
    intersect_extensions, intersect_formats, ContentDescriptor, MediaDirection, MediaType, Senders,
    SourceDescriptor,
};
use std::sync::Arc;
use tracing::{debug, warn};

impl MediaHandler {
    /// Processes a remote offer and prepares our answer contents.
    ///
    /// Candidate harvesting runs to completion before this returns, with
    /// fresh candidates trickled through `info_sender` if one is given,
    /// and connectivity establishment towards the offered candidates is
    /// already started. The finished answer is fetched afterwards via
    /// [`generate_session_accept`](Self::generate_session_accept).
    pub async fn process_offer(
        &self,
        offer: Vec<ContentDescriptor>,
        info_sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut answer = Vec::with_capacity(offer.len());

        for content in &offer {
            state.registry.upsert_remote(content.clone());

            let media = content.media();
            let device = self.active_device(media);
            let mut dev_direction = device
                .as_ref()
                .map(|dev| dev.direction)
                .unwrap_or(MediaDirection::Inactive);
            dev_direction = dev_direction.and(self.user_preference(media));

            let remote_direction = content.senders.direction_for(!self.role.is_initiator());
            let direction = dev_direction.direction_for_answer(remote_direction);

            let local_formats = match &device {
                Some(_) => self.engine.supported_formats(media, None, None),
                None => Vec::new(),
            };
            let mutual_formats = intersect_formats(&local_formats, &content.description.formats);
            let local_extensions = device
                .as_ref()
                .map(|dev| dev.extensions.clone())
                .unwrap_or_default();
            let extensions =
                intersect_extensions(&local_extensions, &content.description.extensions);

            let Some(transport) = content.transport.as_ref() else {
                return Err(NegotiationError::illegal(format!(
                    "content '{}' carries no transport",
                    content.name
                )));
            };
            // The offer may omit candidates and trickle them through
            // transport-info instead, so an absent target is not a dead
            // content. A target on port zero is.
            let target = transport.default_target();
            let target_unusable = matches!(&target, Some(t) if t.rtp.port() == 0);

            // The offer fixes the transport for the whole session.
            self.selector.set_from_namespace(&transport.namespace).await?;
            if transport.rtcp_mux {
                if let Some(manager) = self.selector.current() {
                    manager.set_rtcp_mux(true);
                }
            }

            if mutual_formats.is_empty()
                || dev_direction == MediaDirection::Inactive
                || target_unusable
            {
                debug!(leg = %self.leg_id, %media, "skipping offered content we cannot serve");
                self.streams.close_stream(media);
                continue;
            }

            let senders = Senders::from_direction(direction, self.role.is_initiator());
            let mut ours = ContentDescriptor::builder(content.name.clone(), media)
                .creator(content.creator)
                .senders(senders)
                .formats(mutual_formats)
                .extensions(extensions)
                .build();

            self.security.select_for_answer(media, &mut ours, content).await?;

            // The remote party asked for a desktop sharing session, signal
            // that we can handle its input events.
            if content.remote_control {
                ours.remote_control = true;
            }

            state.registry.upsert_local(ours.clone());
            answer.push(ours);
        }

        if answer.is_empty() {
            return Err(NegotiationError::illegal(
                "offer contained no media formats or no valid media descriptions",
            ));
        }

        let harvested = self.harvest_candidates(Some(offer.clone()), answer, info_sender).await?;
        for content in &harvested {
            state.registry.upsert_local(content.clone());
        }

        // Start connectivity establishment before we even ring to keep the
        // post-pickup delay short. Waiting for it to finish here could
        // deadlock: a controlling ICE agent may hold its nomination back
        // until it sees our session-accept.
        let manager = self.transport_manager().await?;
        manager.start_connectivity(offer).await?;
        Ok(())
    }

    /// Finalizes the answer prepared by [`process_offer`](Self::process_offer)
    /// and brings up the streams for it.
    ///
    /// Returns the contents to send in the session-accept.
    pub async fn generate_session_accept(&self) -> Result<Vec<ContentDescriptor>> {
        let manager = self.transport_manager().await?;
        let mut state = self.state.lock().await;
        let mut accept = state.registry.locals();

        let mut master_set = false;
        let total = accept.len();
        for content in &mut accept {
            let media = content.media();
            let connector = manager.stream_connector(media)?;
            let Some(device) = self.active_device(media) else {
                continue;
            };
            let target = manager.stream_target(media);

            let mut direction = content.senders.direction_for(self.role.is_initiator());
            // Accepting video while able to capture upgrades the answer to
            // sendrecv so the remote party knows to expect our picture.
            if media == MediaType::Video
                && (self.user_preference(media).allows_sending()
                    || self.conference.rtp_translation_enabled(media))
                && device.direction.allows_sending()
            {
                direction = MediaDirection::SendReceive;
                content.senders = Senders::Both;
            } else if media == MediaType::Audio && !self.user_preference(media).allows_sending() {
                direction = MediaDirection::ReceiveOnly;
            }

            let their = state.registry.remote(&content.name).cloned().ok_or_else(|| {
                NegotiationError::internal(format!("no remote content named '{}'", content.name))
            })?;
            let local_formats = self.engine.supported_formats(media, None, None);
            let mutual = intersect_formats(&local_formats, &their.description.formats);
            let Some(format) = mutual.into_iter().next() else {
                return Err(NegotiationError::illegal("no matching codec"));
            };

            if format.image_attr().is_some() {
                self.flags.write().quality_controls_supported = true;
            }
            let master = claim_master(&mut master_set, total, media);

            let spec = StreamSpec {
                content_name: content.name.clone(),
                media,
                format,
                connector: Some(connector),
                target,
                direction,
                extensions: content.description.extensions.clone(),
                master,
            };
            let stream = self.streams.init_stream(&self.engine, spec).await?;

            if direction.allows_sending() {
                if let Some(ssrc) = stream.local_ssrc() {
                    let mut source = self
                        .engine
                        .local_source(media)
                        .unwrap_or_else(|| SourceDescriptor::new(ssrc));
                    source.ssrc = ssrc;
                    content.description.ssrc = Some(ssrc);
                    content.description.sources = vec![source];
                }
            }
        }

        for content in &accept {
            state.registry.upsert_local(content.clone());
        }
        Ok(accept)
    }

    /// Processes the remote session-accept on the offering side.
    pub async fn process_answer(&self, answer: Vec<ContentDescriptor>) -> Result<()> {
        // The accept usually carries the remote candidates inline.
        self.process_transport_info(answer.clone()).await?;

        let mut state = self.state.lock().await;
        let mut master_set = false;
        let total = answer.len();
        for content in answer {
            state.registry.upsert_remote(content.clone());
            let master = claim_master(&mut master_set, total, content.media());
            self.process_content(&content, false, master).await?;
        }
        Ok(())
    }

    /// Feeds remote transport details into connectivity establishment.
    pub async fn process_transport_info(&self, contents: Vec<ContentDescriptor>) -> Result<()> {
        let manager = self.transport_manager().await?;
        manager.start_connectivity(contents).await?;
        Ok(())
    }

    /// Re-runs content processing for everything the remote party has
    /// declared, e.g. after the remote hold state changed.
    pub async fn reinit_all_contents(&self) -> Result<()> {
        let state = self.state.lock().await;
        let remotes = state.registry.remotes();

        let mut master_set = false;
        let total = remotes.len();
        for content in remotes {
            let master = claim_master(&mut master_set, total, content.media());
            self.process_content(&content, false, master).await?;
        }
        Ok(())
    }

    /// Applies a content-modify update to a single remote content.
    ///
    /// With `modify` set the update replaces the stored content wholesale;
    /// otherwise only its senders attribute is merged in.
    pub async fn reinit_content(
        &self,
        name: &str,
        content: ContentDescriptor,
        modify: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.registry.remote(name).cloned() else {
            warn!(leg = %self.leg_id, name, "content-modify for a content we never saw");
            return Ok(());
        };

        let updated = if modify {
            if stored.remote_control && !content.remote_control {
                self.emit(NegotiationEvent::RemoteControlRevoked);
            }
            content
        } else {
            let senders = content.senders;
            stored.with_senders(senders)
        };

        self.process_content(&updated, modify, false).await?;
        state.registry.upsert_remote(updated);
        Ok(())
    }

    /// Removes a content from the session, closing its stream and telling
    /// the transport to let go of its channels.
    pub async fn remove_content(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let had_remote_control = state
            .registry
            .remote(name)
            .is_some_and(|content| content.remote_control);

        if let Some(media) = state.registry.remove(name) {
            self.streams.close_stream(media);
            self.security.store().remove_media(media);
            if had_remote_control {
                self.emit(NegotiationEvent::RemoteControlRevoked);
            }
        }
        // Only an already selected transport can hold resources for the
        // content; never wait for one just to clean up.
        if let Some(manager) = self.selector.current() {
            manager.remove_content(name).await?;
        }
        Ok(())
    }

    /// Digests one remote content and (re)configures the matching stream.
    ///
    /// `modify` marks a content-modify round, which re-applies the remote
    /// quality hints to a running video stream.
    async fn process_content(
        &self,
        content: &ContentDescriptor,
        modify: bool,
        master: bool,
    ) -> Result<()> {
        let media = content.media();
        let manager = self.transport_manager().await?;

        // Transport knowledge beats whatever the content claims.
        let target = manager
            .stream_target(media)
            .or_else(|| content.transport.as_ref().and_then(|t| t.default_target()));
        let Some(target) = target.filter(|t| t.rtp.port() != 0) else {
            self.streams.close_stream(media);
            return Ok(());
        };

        let Some(device) = self.active_device(media) else {
            self.streams.close_stream(media);
            return Ok(());
        };
        let dev_direction = device.direction.and(self.user_preference(media));

        if content.description.formats.is_empty() {
            return Err(NegotiationError::illegal(
                "remote description carries no formats",
            ));
        }

        self.security.process_remote_answer(media, content)?;

        let connector = manager.stream_connector(media)?;

        let mut remote_direction = content.senders.direction_for(!self.role.is_initiator());
        if self.conference.is_conference_focus() {
            // As the focus we keep receiving from every leg that feeds the
            // mix, even when this content alone would not have us receive.
            for view in self.conference.peer_views(media) {
                if view.remote_sends() {
                    remote_direction = remote_direction.or(MediaDirection::SendOnly);
                }
            }
        }
        let direction = dev_direction.direction_for_answer(remote_direction);

        let extensions =
            intersect_extensions(&device.extensions, &content.description.extensions);

        let mut local_formats = self.engine.supported_formats(media, None, None);
        if media == MediaType::Video && modify {
            let send = self.quality.remote_receive();
            let receive = self.quality.remote_send_max();
            if let Some(stream) = self.streams.get(media) {
                stream.update_quality_hints(send.as_ref(), receive.as_ref());
            }
            local_formats = self
                .engine
                .supported_formats(media, send.as_ref(), receive.as_ref());
        }

        let mutual = intersect_formats(&local_formats, &content.description.formats);
        let Some(format) = mutual.into_iter().next() else {
            return Err(NegotiationError::illegal("no matching codec"));
        };
        if format.image_attr().is_some() {
            self.flags.write().quality_controls_supported = true;
        }

        let spec = StreamSpec {
            content_name: content.name.clone(),
            media,
            format,
            connector: Some(connector),
            target: Some(target),
            direction,
            extensions,
            master,
        };
        self.streams.init_stream(&self.engine, spec).await?;
        Ok(())
    }
}
