//! Bookkeeping of the live media streams of a leg.

use crate::capabilities::{MediaEngine, MediaStream, StreamSpec};
use crate::errors::Result;
use crate::events::{EventSender, NegotiationEvent};
use dashmap::DashMap;
use rjingle_content_core::MediaType;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A live stream together with the content line it serves.
#[derive(Clone)]
pub struct ActiveStream {
    pub content_name: String,
    pub media: MediaType,
    pub master: bool,
    pub stream: Arc<dyn MediaStream>,
}

impl fmt::Debug for ActiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveStream")
            .field("content_name", &self.content_name)
            .field("media", &self.media)
            .field("master", &self.master)
            .finish()
    }
}

struct StreamEntry {
    content_name: String,
    master: bool,
    stream: Arc<dyn MediaStream>,
}

/// At most one stream per media type, reconfigured in place across
/// re-negotiation rounds.
pub struct StreamSet {
    streams: DashMap<MediaType, StreamEntry>,
    events: EventSender,
}

impl StreamSet {
    pub(crate) fn new(events: EventSender) -> Self {
        Self {
            streams: DashMap::new(),
            events,
        }
    }

    /// Creates the stream for a negotiated content, or reconfigures the
    /// existing one when a round re-negotiated the same media type.
    pub(crate) async fn init_stream(
        &self,
        engine: &Arc<dyn MediaEngine>,
        spec: StreamSpec,
    ) -> Result<Arc<dyn MediaStream>> {
        if let Some(mut entry) = self.streams.get_mut(&spec.media) {
            debug!(media = %spec.media, content = %spec.content_name, "reconfiguring stream");
            let stream = entry.stream.clone();
            stream.set_format(&spec.format);
            if let Some(connector) = spec.connector {
                stream.set_connector(connector);
            }
            if let Some(target) = spec.target {
                stream.set_target(target);
            }
            stream.set_direction(spec.direction);
            entry.content_name = spec.content_name.clone();
            entry.master = spec.master;
            return Ok(stream);
        }

        let media = spec.media;
        let content_name = spec.content_name.clone();
        let master = spec.master;
        debug!(%media, content = %content_name, master, "creating stream");
        let stream = engine.create_stream(spec).await?;
        self.streams.insert(
            media,
            StreamEntry {
                content_name: content_name.clone(),
                master,
                stream: stream.clone(),
            },
        );
        let _ = self.events.send(NegotiationEvent::StreamCreated {
            content: content_name,
            media,
            master,
        });
        Ok(stream)
    }

    pub fn get(&self, media: MediaType) -> Option<Arc<dyn MediaStream>> {
        self.streams.get(&media).map(|entry| entry.stream.clone())
    }

    pub fn has(&self, media: MediaType) -> bool {
        self.streams.contains_key(&media)
    }

    /// Snapshot of the live streams, master stream first.
    pub fn active(&self) -> Vec<ActiveStream> {
        let mut streams: Vec<ActiveStream> = self
            .streams
            .iter()
            .map(|entry| ActiveStream {
                content_name: entry.content_name.clone(),
                media: *entry.key(),
                master: entry.master,
                stream: entry.stream.clone(),
            })
            .collect();
        streams.sort_by_key(|stream| !stream.master);
        streams
    }

    /// Closes the stream of a media type. Closing an absent stream is a
    /// no-op.
    pub(crate) fn close_stream(&self, media: MediaType) {
        if let Some((_, entry)) = self.streams.remove(&media) {
            entry.stream.close();
            debug!(%media, content = %entry.content_name, "stream closed");
            let _ = self.events.send(NegotiationEvent::StreamClosed { media });
        }
    }

    /// Closes the stream serving a content line, when one does.
    pub(crate) fn close_for_content(&self, name: &str) {
        let media = self
            .streams
            .iter()
            .find(|entry| entry.content_name == name)
            .map(|entry| *entry.key());
        if let Some(media) = media {
            self.close_stream(media);
        }
    }

    pub(crate) fn close_all(&self) {
        let media: Vec<MediaType> = self.streams.iter().map(|entry| *entry.key()).collect();
        for media in media {
            self.close_stream(media);
        }
    }
}

impl fmt::Debug for StreamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSet")
            .field("streams", &self.streams.len())
            .finish()
    }
}
