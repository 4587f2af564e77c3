//! Transport manager selection and lifecycle.
//!
//! A leg runs exactly one transport manager at a time. The offering side
//! decides which implementation that is; the answering side derives it
//! from the transport namespace of the incoming offer. Since offers are
//! processed on a different task than the one that asks for the manager,
//! the slot underneath is a watch channel and lookups on the answering
//! side block for a bounded time, see [`TransportSlot::wait`].

mod selector;
mod slot;

pub use selector::{TransportSelector, DEFAULT_TRANSPORT_WAIT};
pub use slot::TransportSlot;

use crate::capabilities::{StreamConnector, TransportInfoSender};
use crate::errors::Result;
use async_trait::async_trait;
use rjingle_content_core::{ContentDescriptor, MediaStreamTarget, MediaType, TransportKind};
use std::sync::Arc;

/// One Jingle transport implementation, e.g. ICE-UDP or raw UDP.
///
/// Candidate harvesting and connectivity establishment both run in two
/// phases. The start phase kicks the work off and may already trickle
/// candidates through the [`TransportInfoSender`]; the wrapup phase
/// blocks until the work is done and yields the result.
#[async_trait]
pub trait TransportManager: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Begins gathering candidates for the given local contents. On the
    /// answering side `remote` carries the offered contents so the
    /// implementation can pair up with them.
    async fn start_harvest(
        &self,
        remote: Option<Vec<ContentDescriptor>>,
        local: Vec<ContentDescriptor>,
        sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> Result<()>;

    /// Waits for harvesting to finish and returns the local contents with
    /// their transport elements filled in.
    async fn wrapup_harvest(&self) -> Result<Vec<ContentDescriptor>>;

    /// Feeds remote transport details in and begins connectivity checks.
    /// Returns whether establishment actually started; raw UDP has no
    /// checks to run and reports `false`.
    async fn start_connectivity(&self, remote: Vec<ContentDescriptor>) -> Result<bool>;

    /// Waits for connectivity establishment to settle.
    async fn wrapup_connectivity(&self) -> Result<()>;

    /// Local sockets to bind a media stream to.
    fn stream_connector(&self, media: MediaType) -> Result<StreamConnector>;

    /// Remote addresses a media stream should send to, `None` while the
    /// transport has not settled on them.
    fn stream_target(&self, media: MediaType) -> Option<MediaStreamTarget>;

    fn set_rtcp_mux(&self, rtcp_mux: bool);

    /// Releases per-content resources when a content is removed.
    async fn remove_content(&self, name: &str) -> Result<()>;

    async fn close(&self);
}

/// Creates transport manager instances for a leg.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self, kind: TransportKind) -> Result<Arc<dyn TransportManager>>;
}
