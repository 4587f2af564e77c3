//! Encryption advertisements carried on a content description.
//!
//! SDES crypto attributes and ZRTP hello-hashes live here. DTLS-SRTP
//! advertises through transport-level fingerprints instead, see
//! [`crate::transport::Fingerprint`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// One SDES crypto attribute (RFC 4568).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoAttribute {
    /// Attribute tag; answers echo the tag of the chosen offer line.
    pub tag: u32,
    /// Crypto suite name, e.g. "AES_CM_128_HMAC_SHA1_80".
    pub crypto_suite: String,
    /// Key parameters, typically "inline:" followed by base64 key material.
    pub key_params: String,
    /// Optional session parameters.
    pub session_params: Option<String>,
}

impl CryptoAttribute {
    pub fn new(tag: u32, crypto_suite: impl Into<String>, key_params: impl Into<String>) -> Self {
        Self {
            tag,
            crypto_suite: crypto_suite.into(),
            key_params: key_params.into(),
            session_params: None,
        }
    }
}

impl fmt::Display for CryptoAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.tag, self.crypto_suite, self.key_params)?;
        if let Some(session_params) = &self.session_params {
            write!(f, " {session_params}")?;
        }
        Ok(())
    }
}

/// A ZRTP hello-hash advertisement for one protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZrtpHash {
    /// ZRTP protocol version, e.g. "1.10".
    pub version: String,
    /// Hex digest of the Hello message.
    pub hash: String,
}

impl ZrtpHash {
    pub fn new(version: impl Into<String>, hash: impl Into<String>) -> Self {
        Self { version: version.into(), hash: hash.into() }
    }
}

/// The encryption element of a content description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionDescriptor {
    /// Whether the declaring party requires encryption.
    pub required: bool,
    /// SDES crypto attribute lines, in preference order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cryptos: Vec<CryptoAttribute>,
    /// ZRTP hello-hashes, one per supported protocol version.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zrtp_hashes: Vec<ZrtpHash>,
}

impl EncryptionDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_crypto(mut self, crypto: CryptoAttribute) -> Self {
        self.cryptos.push(crypto);
        self
    }

    pub fn with_zrtp_hash(mut self, hash: ZrtpHash) -> Self {
        self.zrtp_hashes.push(hash);
        self
    }

    /// Whether the declaring party advertised ZRTP support.
    pub fn is_zrtp_capable(&self) -> bool {
        !self.zrtp_hashes.is_empty()
    }

    /// Whether this element advertises anything at all.
    pub fn is_empty(&self) -> bool {
        self.cryptos.is_empty() && self.zrtp_hashes.is_empty()
    }

    /// Merges another element's advertisements into this one.
    pub fn merge(&mut self, other: EncryptionDescriptor) {
        self.required |= other.required;
        self.cryptos.extend(other.cryptos);
        self.zrtp_hashes.extend(other.zrtp_hashes);
    }
}
