//! # rjingle-media-session
//!
//! The media negotiation engine of one Jingle call leg: builds offers
//! from the locally available devices, answers remote offers, confirms
//! remote answers, and keeps streams, transports and SRTP key material
//! in step across re-negotiations, holds and content updates.
//!
//! The engine is deliberately wire-free. A signaling layer parses its
//! protocol into [`ContentDescriptor`](rjingle_content_core::ContentDescriptor)s,
//! drives a [`MediaHandler`] with them and ships the handler's output
//! back out. Sockets, codecs and key material live behind the
//! [`MediaEngine`] and [`TransportManager`] seams.
//!
//! ## Typical responder flow
//!
//! ```no_run
//! # use rjingle_media_session::prelude::*;
//! # use std::sync::Arc;
//! # async fn run(engine: Arc<dyn MediaEngine>, factory: Arc<dyn TransportFactory>,
//! #              offer: Vec<rjingle_content_core::ContentDescriptor>) -> Result<()> {
//! let handler = MediaHandler::builder(NegotiationRole::Responder)
//!     .with_engine(engine)
//!     .with_transport_factory(factory)
//!     .build()?;
//!
//! handler.process_offer(offer, None).await?;
//! let accept = handler.generate_session_accept().await?;
//! // ... send the accept, wait for signaling to settle ...
//! handler.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod capabilities;
pub mod config;
pub mod errors;
pub mod events;
pub mod handler;
pub mod quality;
pub mod registry;
pub mod security;
pub mod streams;
pub mod transport;
pub mod types;

/// The content vocabulary this engine negotiates over.
pub use rjingle_content_core as content;

pub use capabilities::{
    CallConference, DirectCall, FeatureDiscovery, MediaDevice, MediaEngine, MediaStream,
    PeerMediaView, PermissiveDiscovery, StreamConnector, StreamSpec, TransportInfoSender,
};
pub use config::{AccountMediaConfig, DEFAULT_SDES_CIPHER_SUITES};
pub use errors::{NegotiationError, Result};
pub use events::{EventReceiver, EventSender, NegotiationEvent};
pub use handler::{MediaHandler, MediaHandlerBuilder};
pub use quality::{QualityController, QualityPreset};
pub use registry::ContentRegistry;
pub use security::{
    DtlsControl, SdesControl, SecurityNegotiator, SrtpControl, SrtpControlStore, SrtpKind,
    ZrtpControl,
};
pub use streams::{ActiveStream, StreamSet};
pub use transport::{
    TransportFactory, TransportManager, TransportSelector, TransportSlot, DEFAULT_TRANSPORT_WAIT,
};
pub use types::{LegId, NegotiationRole};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::capabilities::{
        CallConference, DirectCall, FeatureDiscovery, MediaDevice, MediaEngine, MediaStream,
        PermissiveDiscovery, StreamConnector, StreamSpec, TransportInfoSender,
    };
    pub use crate::config::AccountMediaConfig;
    pub use crate::errors::{NegotiationError, Result};
    pub use crate::events::{EventReceiver, NegotiationEvent};
    pub use crate::handler::{MediaHandler, MediaHandlerBuilder};
    pub use crate::quality::{QualityController, QualityPreset};
    pub use crate::security::SrtpKind;
    pub use crate::transport::{TransportFactory, TransportManager};
    pub use crate::types::{LegId, NegotiationRole};
    pub use rjingle_content_core::prelude::*;
}
