// ==============================================================================
// telemetry.rs — READ-ONLY TELEMETRY + TRANSITION EVENTS
// ==============================================================================
// Frames are plain copies of published state. Events fire once per
// transition (drift start/end, boost on/depleted); observe() queues them
// while the tick runs and flush() delivers them in order after publish.
// Subscribers hold an mpsc receiver and leave with unsubscribe(id) or by
// dropping the receiver.
// ==============================================================================

use std::collections::VecDeque;

use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::dynamics::VehicleState;
use crate::simulation::VehicleHandle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryFrame {
    pub handle: VehicleHandle,
    pub speed: f32,
    pub slip_angle: f32,
    pub drifting: bool,
    pub boost_active: bool,
    pub boost_charge: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "vehicle", rename_all = "snake_case")]
pub enum TelemetryEvent {
    DriftStarted(VehicleHandle),
    DriftEnded(VehicleHandle),
    BoostActivated(VehicleHandle),
    BoostDepleted(VehicleHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
pub struct TelemetryBus {
    subscribers: Vec<(SubscriptionId, UnboundedSender<TelemetryEvent>)>,
    pending: VecDeque<TelemetryEvent>,
    next_id: u64,
}

impl TelemetryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, UnboundedReceiver<TelemetryEvent>) {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = unbounded_channel();
        self.subscribers.push((id, tx));
        (id, rx)
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue the events implied by one vehicle going from `prev` to `next`.
    pub fn observe(&mut self, handle: VehicleHandle, prev: &VehicleState, next: &VehicleState) {
        if !prev.drifting && next.drifting {
            self.pending.push_back(TelemetryEvent::DriftStarted(handle));
        } else if prev.drifting && !next.drifting {
            self.pending.push_back(TelemetryEvent::DriftEnded(handle));
        }

        if !prev.boost_active && next.boost_active {
            self.pending.push_back(TelemetryEvent::BoostActivated(handle));
        } else if prev.boost_active && !next.boost_active {
            self.pending.push_back(TelemetryEvent::BoostDepleted(handle));
        }
    }

    /// Deliver queued events FIFO. Subscribers whose receiver is gone are
    /// dropped.
    pub fn flush(&mut self) {
        while let Some(event) = self.pending.pop_front() {
            debug!(?event, "telemetry");
            self.subscribers.retain(|(_, tx)| tx.send(event).is_ok());
        }
    }
}
