//! Content descriptors: the unit of Jingle media negotiation.

use crate::direction::MediaDirection;
use crate::encryption::EncryptionDescriptor;
use crate::extension::RtpExtension;
use crate::format::PayloadFormat;
use crate::media::MediaType;
use crate::transport::TransportDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which party created a content line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatorRole {
    Initiator,
    Responder,
}

impl fmt::Display for CreatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatorRole::Initiator => f.write_str("initiator"),
            CreatorRole::Responder => f.write_str("responder"),
        }
    }
}

/// The `senders` attribute of a content: which parties send media.
///
/// Unlike [`MediaDirection`] this is perspective-free; converting between
/// the two requires knowing whose point of view the direction is taken
/// from, hence the `initiator_perspective` arguments below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Senders {
    /// Both parties send. The wire default when the attribute is absent.
    #[default]
    Both,
    /// Only the session initiator sends.
    Initiator,
    /// Only the session responder sends.
    Responder,
    /// Neither party sends.
    None,
}

impl Senders {
    /// The direction these senders describe, from the initiator's point of
    /// view when `initiator_perspective` is true, the responder's otherwise.
    pub fn direction_for(self, initiator_perspective: bool) -> MediaDirection {
        match self {
            Senders::Both => MediaDirection::SendReceive,
            Senders::None => MediaDirection::Inactive,
            Senders::Initiator => {
                if initiator_perspective {
                    MediaDirection::SendOnly
                } else {
                    MediaDirection::ReceiveOnly
                }
            }
            Senders::Responder => {
                if initiator_perspective {
                    MediaDirection::ReceiveOnly
                } else {
                    MediaDirection::SendOnly
                }
            }
        }
    }

    /// The senders value declaring `direction`, where the direction is
    /// taken from the initiator's point of view when `initiator_perspective`
    /// is true.
    pub fn from_direction(direction: MediaDirection, initiator_perspective: bool) -> Senders {
        match direction {
            MediaDirection::SendReceive => Senders::Both,
            MediaDirection::Inactive => Senders::None,
            MediaDirection::SendOnly => {
                if initiator_perspective {
                    Senders::Initiator
                } else {
                    Senders::Responder
                }
            }
            MediaDirection::ReceiveOnly => {
                if initiator_perspective {
                    Senders::Responder
                } else {
                    Senders::Initiator
                }
            }
        }
    }
}

impl fmt::Display for Senders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Senders::Both => "both",
            Senders::Initiator => "initiator",
            Senders::Responder => "responder",
            Senders::None => "none",
        };
        f.write_str(s)
    }
}

/// An advertised media source (XEP-0339): SSRC plus labels such as cname
/// and msid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub ssrc: u32,
    /// Source parameters in declaration order.
    pub parameters: Vec<(String, String)>,
}

impl SourceDescriptor {
    pub fn new(ssrc: u32) -> Self {
        Self { ssrc, parameters: Vec::new() }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }
}

/// The RTP description of a content line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpDescription {
    pub media: MediaType,
    /// Payload formats in preference order.
    pub formats: Vec<PayloadFormat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<RtpExtension>,
    /// SDES and ZRTP advertisements, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionDescriptor>,
    /// SSRC the declaring party will send with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssrc: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceDescriptor>,
}

impl RtpDescription {
    pub fn new(media: MediaType) -> Self {
        Self {
            media,
            formats: Vec::new(),
            extensions: Vec::new(),
            encryption: None,
            ssrc: None,
            sources: Vec::new(),
        }
    }
}

/// One content line of an offer, answer or content-modify.
///
/// Descriptors are immutable values: negotiation replaces a stored
/// descriptor wholesale instead of mutating it in place, so a reader never
/// observes a half-updated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDescriptor {
    /// Content name, unique within the session.
    pub name: String,
    pub creator: CreatorRole,
    pub senders: Senders,
    pub description: RtpDescription,
    /// Proposed transport; may be absent until candidates are known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportDescriptor>,
    /// Remote-control marker used by desktop sharing over video.
    #[serde(default)]
    pub remote_control: bool,
}

impl ContentDescriptor {
    pub fn builder(name: impl Into<String>, media: MediaType) -> ContentBuilder {
        ContentBuilder::new(name, media)
    }

    pub fn media(&self) -> MediaType {
        self.description.media
    }

    /// Copy with another senders value.
    pub fn with_senders(mut self, senders: Senders) -> Self {
        self.senders = senders;
        self
    }

    /// Copy with another transport element.
    pub fn with_transport(mut self, transport: TransportDescriptor) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Copy with the given encryption element on the description.
    pub fn with_encryption(mut self, encryption: EncryptionDescriptor) -> Self {
        self.description.encryption = Some(encryption);
        self
    }

    /// Copy advertising the given SSRC and source metadata.
    pub fn with_source(mut self, source: SourceDescriptor) -> Self {
        self.description.ssrc = Some(source.ssrc);
        self.description.sources.push(source);
        self
    }
}

impl fmt::Display for ContentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "content '{}' ({}, senders={}, {} formats)",
            self.name,
            self.description.media,
            self.senders,
            self.description.formats.len()
        )
    }
}

/// Builder assembling a [`ContentDescriptor`].
#[derive(Debug, Clone)]
pub struct ContentBuilder {
    name: String,
    creator: CreatorRole,
    senders: Senders,
    description: RtpDescription,
    transport: Option<TransportDescriptor>,
    remote_control: bool,
}

impl ContentBuilder {
    pub fn new(name: impl Into<String>, media: MediaType) -> Self {
        Self {
            name: name.into(),
            creator: CreatorRole::Initiator,
            senders: Senders::Both,
            description: RtpDescription::new(media),
            transport: None,
            remote_control: false,
        }
    }

    pub fn creator(mut self, creator: CreatorRole) -> Self {
        self.creator = creator;
        self
    }

    pub fn senders(mut self, senders: Senders) -> Self {
        self.senders = senders;
        self
    }

    pub fn formats(mut self, formats: Vec<PayloadFormat>) -> Self {
        self.description.formats = formats;
        self
    }

    pub fn format(mut self, format: PayloadFormat) -> Self {
        self.description.formats.push(format);
        self
    }

    pub fn extensions(mut self, extensions: Vec<RtpExtension>) -> Self {
        self.description.extensions = extensions;
        self
    }

    pub fn encryption(mut self, encryption: Option<EncryptionDescriptor>) -> Self {
        self.description.encryption = encryption;
        self
    }

    pub fn transport(mut self, transport: TransportDescriptor) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn remote_control(mut self, remote_control: bool) -> Self {
        self.remote_control = remote_control;
        self
    }

    pub fn build(self) -> ContentDescriptor {
        ContentDescriptor {
            name: self.name,
            creator: self.creator,
            senders: self.senders,
            description: self.description,
            transport: self.transport,
            remote_control: self.remote_control,
        }
    }
}
