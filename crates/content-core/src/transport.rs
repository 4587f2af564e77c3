//! Transport descriptors: candidates, DTLS fingerprints and rtcp-mux.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// XML namespace of the ICE-UDP Jingle transport (XEP-0176).
pub const ICE_UDP_NAMESPACE: &str = "urn:xmpp:jingle:transports:ice-udp:1";
/// XML namespace of the raw UDP Jingle transport (XEP-0177).
pub const RAW_UDP_NAMESPACE: &str = "urn:xmpp:jingle:transports:raw-udp:1";
/// Discovery feature advertised by parties able to do DTLS-SRTP.
pub const DTLS_SRTP_FEATURE: &str = "urn:xmpp:jingle:apps:dtls:0";

/// Candidate component carrying RTP.
pub const COMPONENT_RTP: u16 = 1;
/// Candidate component carrying RTCP.
pub const COMPONENT_RTCP: u16 = 2;

/// The transport implementations this stack can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    IceUdp,
    RawUdp,
}

impl TransportKind {
    /// Kinds in local preference order: ICE first, raw UDP as fallback.
    pub const PREFERRED_ORDER: [TransportKind; 2] = [TransportKind::IceUdp, TransportKind::RawUdp];

    pub fn namespace(self) -> &'static str {
        match self {
            TransportKind::IceUdp => ICE_UDP_NAMESPACE,
            TransportKind::RawUdp => RAW_UDP_NAMESPACE,
        }
    }

    /// Maps a Jingle transport namespace to a kind, `None` if unsupported.
    pub fn from_namespace(namespace: &str) -> Option<TransportKind> {
        match namespace {
            ICE_UDP_NAMESPACE => Some(TransportKind::IceUdp),
            RAW_UDP_NAMESPACE => Some(TransportKind::RawUdp),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::IceUdp => f.write_str("ice-udp"),
            TransportKind::RawUdp => f.write_str("raw-udp"),
        }
    }
}

/// DTLS setup role carried alongside a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtlsSetup {
    /// We initiate the DTLS handshake.
    Active,
    /// We wait for the remote party to initiate.
    Passive,
    /// Either role is acceptable.
    ActPass,
}

impl fmt::Display for DtlsSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DtlsSetup::Active => f.write_str("active"),
            DtlsSetup::Passive => f.write_str("passive"),
            DtlsSetup::ActPass => f.write_str("actpass"),
        }
    }
}

/// A DTLS certificate fingerprint on a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Hash function name, e.g. "sha-256".
    pub hash_function: String,
    /// Colon-separated hex digest.
    pub value: String,
    /// Setup role, when declared.
    pub setup: Option<DtlsSetup>,
}

impl Fingerprint {
    pub fn new(hash_function: impl Into<String>, value: impl Into<String>) -> Self {
        Self { hash_function: hash_function.into(), value: value.into(), setup: None }
    }

    pub fn with_setup(mut self, setup: DtlsSetup) -> Self {
        self.setup = Some(setup);
        self
    }
}

/// One transport candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescriptor {
    pub id: String,
    pub foundation: String,
    /// Component this candidate serves, [`COMPONENT_RTP`] or [`COMPONENT_RTCP`].
    pub component: u16,
    pub address: IpAddr,
    pub port: u16,
    /// Transport protocol, normally "udp".
    pub protocol: String,
    pub priority: u32,
    /// Candidate type: "host", "srflx", "prflx" or "relay".
    pub candidate_type: String,
    pub generation: u32,
}

impl CandidateDescriptor {
    pub fn new(id: impl Into<String>, component: u16, address: IpAddr, port: u16) -> Self {
        Self {
            id: id.into(),
            foundation: "1".to_string(),
            component,
            address,
            port,
            protocol: "udp".to_string(),
            priority: 0,
            candidate_type: "host".to_string(),
            generation: 0,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, candidate_type: impl Into<String>) -> Self {
        self.candidate_type = candidate_type.into();
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Remote addresses a media stream should send to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStreamTarget {
    pub rtp: SocketAddr,
    pub rtcp: SocketAddr,
}

impl MediaStreamTarget {
    pub fn new(rtp: SocketAddr, rtcp: SocketAddr) -> Self {
        Self { rtp, rtcp }
    }

    /// Target with RTCP on the conventional next port.
    pub fn from_rtp(rtp: SocketAddr) -> Self {
        let rtcp_port = rtp.port().checked_add(1).unwrap_or(rtp.port());
        Self { rtp, rtcp: SocketAddr::new(rtp.ip(), rtcp_port) }
    }
}

impl fmt::Display for MediaStreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rtp={} rtcp={}", self.rtp, self.rtcp)
    }
}

/// The transport element of a content: namespace plus everything the
/// transport implementation put on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportDescriptor {
    /// Jingle transport namespace.
    pub namespace: String,
    /// ICE username fragment.
    pub ufrag: Option<String>,
    /// ICE password.
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<CandidateDescriptor>,
    /// DTLS fingerprints, first entry preferred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fingerprints: Vec<Fingerprint>,
    /// Whether RTCP is multiplexed on the RTP port.
    #[serde(default)]
    pub rtcp_mux: bool,
}

impl TransportDescriptor {
    pub fn new(kind: TransportKind) -> Self {
        Self {
            namespace: kind.namespace().to_string(),
            ufrag: None,
            password: None,
            candidates: Vec::new(),
            fingerprints: Vec::new(),
            rtcp_mux: false,
        }
    }

    pub fn ice_udp() -> Self {
        Self::new(TransportKind::IceUdp)
    }

    pub fn raw_udp() -> Self {
        Self::new(TransportKind::RawUdp)
    }

    /// The kind this namespace maps to, `None` for foreign namespaces.
    pub fn kind(&self) -> Option<TransportKind> {
        TransportKind::from_namespace(&self.namespace)
    }

    pub fn with_ufrag(mut self, ufrag: impl Into<String>, password: impl Into<String>) -> Self {
        self.ufrag = Some(ufrag.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_candidate(mut self, candidate: CandidateDescriptor) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprints.push(fingerprint);
        self
    }

    pub fn with_rtcp_mux(mut self, rtcp_mux: bool) -> Self {
        self.rtcp_mux = rtcp_mux;
        self
    }

    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Extracts the default send target from the candidate list.
    ///
    /// Picks the highest-priority candidate per component; when no RTCP
    /// component was offered the RTP port plus one is assumed. Returns
    /// `None` when no RTP candidate is present, which is legal for ICE
    /// transports that trickle candidates later.
    pub fn default_target(&self) -> Option<MediaStreamTarget> {
        let best = |component: u16| {
            self.candidates
                .iter()
                .filter(|c| c.component == component)
                .max_by_key(|c| c.priority)
        };
        let rtp = best(COMPONENT_RTP)?.socket_addr();
        match best(COMPONENT_RTCP) {
            Some(rtcp) => Some(MediaStreamTarget::new(rtp, rtcp.socket_addr())),
            None => Some(MediaStreamTarget::from_rtp(rtp)),
        }
    }
}
