//! Hold and resume.
//!
//! Holding never tears streams down, it only narrows their direction;
//! resuming widens it back to what device, user preference and the
//! remote party allow.

use super::MediaHandler;
use crate::events::NegotiationEvent;
use crate::registry::ContentRegistry;
use crate::streams::ActiveStream;
use rjingle_content_core::MediaDirection;
use tracing::debug;

impl MediaHandler {
    pub fn is_locally_on_hold(&self) -> bool {
        self.flags.read().locally_on_hold
    }

    pub fn is_remotely_on_hold(&self) -> bool {
        self.flags.read().remotely_on_hold
    }

    /// Puts the leg on hold locally or takes it off again.
    ///
    /// On hold we stop playing out but keep sending, so the remote party
    /// can hear hold music if the embedding application injects any.
    pub async fn set_locally_on_hold(&self, on_hold: bool) {
        let changed = {
            let mut flags = self.flags.write();
            let changed = flags.locally_on_hold != on_hold;
            flags.locally_on_hold = on_hold;
            changed
        };

        let state = self.state.lock().await;
        for active in self.streams.active() {
            let direction = if on_hold {
                active.stream.direction().and(MediaDirection::SendOnly)
            } else {
                self.post_hold_direction(&active, &state.registry)
            };
            debug!(leg = %self.leg_id, media = %active.media, %direction, "local hold change");
            active.stream.set_direction(direction);
        }
        drop(state);

        if changed {
            self.emit(NegotiationEvent::HoldStateChanged {
                remote: false,
                on_hold,
            });
        }
    }

    /// Acts on the remote party putting us on or off hold.
    pub async fn set_remotely_on_hold(&self, on_hold: bool) {
        let changed = {
            let mut flags = self.flags.write();
            let changed = flags.remotely_on_hold != on_hold;
            flags.remotely_on_hold = on_hold;
            changed
        };

        let state = self.state.lock().await;
        for active in self.streams.active() {
            let current = active.stream.direction();
            let direction = if on_hold {
                // In conferences we go inactive so nobody forwards the
                // remote party's hold music to everyone else.
                if self.conference.is_conference_focus() {
                    MediaDirection::Inactive
                } else {
                    current.and(MediaDirection::ReceiveOnly)
                }
            } else if current.allows_sending() {
                // Still sending, so the hold never actually narrowed it.
                current
            } else {
                self.post_hold_direction(&active, &state.registry)
            };
            debug!(leg = %self.leg_id, media = %active.media, %direction, "remote hold change");
            active.stream.set_direction(direction);
        }
        drop(state);

        if changed {
            self.emit(NegotiationEvent::HoldStateChanged {
                remote: true,
                on_hold,
            });
        }
    }

    /// Direction a held stream goes back to once reactivated.
    ///
    /// Recomputed from what the remote party last asked for, the user
    /// preference, our own hold state and what the device can do, in that
    /// order. Each step only narrows, so the order is load-bearing.
    fn post_hold_direction(
        &self,
        active: &ActiveStream,
        registry: &ContentRegistry,
    ) -> MediaDirection {
        let Some(stored) = registry.remote(&active.content_name) else {
            return active.stream.direction();
        };
        let mut direction = stored.senders.direction_for(self.role.is_initiator());
        direction = direction.and(self.user_preference(active.media));
        if self.flags.read().locally_on_hold {
            direction = direction.and(MediaDirection::SendOnly);
        }
        let device_direction = self
            .engine
            .device(active.media)
            .map(|device| device.direction)
            .unwrap_or(MediaDirection::Inactive);
        direction.and(device_direction)
    }
}
