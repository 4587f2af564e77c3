//! Per-account media negotiation settings.

use crate::security::SrtpKind;
use rjingle_content_core::{MediaDirection, MediaType};
use serde::{Deserialize, Serialize};

/// Default SDES crypto suites, most preferred first.
pub const DEFAULT_SDES_CIPHER_SUITES: &[&str] =
    &["AES_CM_128_HMAC_SHA1_80", "AES_CM_128_HMAC_SHA1_32"];

/// Account-level settings driving offer construction and answer policy.
///
/// The values here are the negotiation-time snapshot of an account's
/// configuration; runtime toggles such as enabling local video live on
/// the handler itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMediaConfig {
    /// Master switch for encrypted media. When off, no encryption is
    /// offered and none is accepted.
    pub default_encryption: bool,
    /// Enabled encryption protocols in descending preference order.
    pub encryption_priority: Vec<SrtpKind>,
    /// Enabled SDES crypto suites in descending preference order.
    pub sdes_cipher_suites: Vec<String>,
    /// Initial direction preference for audio.
    pub audio_direction: MediaDirection,
    /// Initial direction preference for video. Receive-only by default:
    /// an offer only carries video once the user enables sending it.
    pub video_direction: MediaDirection,
    /// Initial direction preference for data.
    pub data_direction: MediaDirection,
}

impl Default for AccountMediaConfig {
    fn default() -> Self {
        Self {
            default_encryption: true,
            encryption_priority: vec![SrtpKind::DtlsSrtp, SrtpKind::Sdes, SrtpKind::Zrtp],
            sdes_cipher_suites: DEFAULT_SDES_CIPHER_SUITES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            audio_direction: MediaDirection::SendReceive,
            video_direction: MediaDirection::ReceiveOnly,
            data_direction: MediaDirection::SendReceive,
        }
    }
}

impl AccountMediaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_encryption(mut self, enabled: bool) -> Self {
        self.default_encryption = enabled;
        self
    }

    pub fn with_encryption_priority(mut self, priority: Vec<SrtpKind>) -> Self {
        self.encryption_priority = priority;
        self
    }

    /// Parses a comma-separated cipher suite list, as stored in account
    /// properties.
    pub fn with_sdes_cipher_csv(mut self, csv: &str) -> Self {
        self.sdes_cipher_suites = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn with_direction(mut self, media: MediaType, direction: MediaDirection) -> Self {
        match media {
            MediaType::Audio => self.audio_direction = direction,
            MediaType::Video => self.video_direction = direction,
            MediaType::Data => self.data_direction = direction,
        }
        self
    }

    /// The user's direction preference for a media type.
    pub fn user_preference(&self, media: MediaType) -> MediaDirection {
        match media {
            MediaType::Audio => self.audio_direction,
            MediaType::Video => self.video_direction,
            MediaType::Data => self.data_direction,
        }
    }

    /// Whether an encryption protocol may be negotiated at all.
    pub fn is_protocol_enabled(&self, kind: SrtpKind) -> bool {
        self.default_encryption && self.encryption_priority.contains(&kind)
    }

    /// Enabled protocols in preference order.
    pub fn enabled_protocols(&self) -> impl Iterator<Item = SrtpKind> + '_ {
        self.encryption_priority
            .iter()
            .copied()
            .filter(move |_| self.default_encryption)
    }
}
