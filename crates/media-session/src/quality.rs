//! Video quality presets exchanged during negotiation.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A resolution and frame rate a party is willing to send or receive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityPreset {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f32,
}

impl QualityPreset {
    pub const LOW: QualityPreset = QualityPreset::new(320, 240, 15.0);
    pub const STANDARD: QualityPreset = QualityPreset::new(640, 480, 30.0);
    pub const HIGH: QualityPreset = QualityPreset::new(1280, 720, 30.0);

    pub const fn new(width: u32, height: u32, frame_rate: f32) -> Self {
        Self {
            width,
            height,
            frame_rate,
        }
    }

    /// Pixel count, used to order presets by resolution.
    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

#[derive(Debug, Default)]
struct QualityState {
    remote_receive: Option<QualityPreset>,
    remote_send_max: Option<QualityPreset>,
}

/// Tracks the remote party's advertised video quality limits.
///
/// The remote receive preset is what the peer asked us to send; the send
/// max preset caps what the peer will ever send us. Both feed back into
/// format selection when a content is created or re-negotiated.
#[derive(Debug, Default)]
pub struct QualityController {
    state: RwLock<QualityState>,
}

impl QualityController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote_receive(&self) -> Option<QualityPreset> {
        self.state.read().remote_receive
    }

    pub fn remote_send_max(&self) -> Option<QualityPreset> {
        self.state.read().remote_send_max
    }

    pub fn set_remote_receive(&self, preset: Option<QualityPreset>) {
        self.state.write().remote_receive = preset;
    }

    pub fn set_remote_send_max(&self, preset: Option<QualityPreset>) {
        self.state.write().remote_send_max = preset;
    }
}
