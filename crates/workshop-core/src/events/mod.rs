//! Event System
//!
//! Per-tick event buffer filled by the engine and drained into the logger.

pub mod logger;

pub use logger::EventLogger;

use bevy_ecs::prelude::*;
use uuid::Uuid;

use workshop_events::{EventDetail, SimTimestamp, WorkEvent};

use crate::components::thing::ThingId;
use crate::components::worker::WorkerId;

/// Resource: Events generated during the current tick
#[derive(Resource, Debug, Default)]
pub struct TickEvents {
    events: Vec<WorkEvent>,
    next_event_id: u64,
    timestamp: SimTimestamp,
}

impl TickEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp subsequent events with this tick
    pub fn set_tick(&mut self, tick: u64) {
        self.timestamp = SimTimestamp::from_tick(tick);
    }

    pub fn timestamp(&self) -> SimTimestamp {
        self.timestamp
    }

    pub fn generate_id(&mut self) -> String {
        let id = format!("evt_{:08}", self.next_event_id);
        self.next_event_id += 1;
        id
    }

    /// Build and queue an event for the current tick
    pub fn emit(
        &mut self,
        order_id: Option<Uuid>,
        worker: WorkerId,
        target: ThingId,
        detail: EventDetail,
    ) {
        let id = self.generate_id();
        let event = WorkEvent::new(id, self.timestamp, order_id, worker.0, target.0, detail);
        self.events.push(event);
    }

    pub fn events(&self) -> &[WorkEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<WorkEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workshop_events::EventType;

    #[test]
    fn test_emit_stamps_tick_and_ids() {
        let mut events = TickEvents::new();
        events.set_tick(120);
        events.emit(None, WorkerId(1), ThingId(4), EventDetail::Completed);
        events.emit(None, WorkerId(1), ThingId(4), EventDetail::Completed);

        let drained = events.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].event_id, "evt_00000000");
        assert_eq!(drained[1].event_id, "evt_00000001");
        assert_eq!(drained[0].timestamp.tick, 120);
        assert_eq!(drained[0].event_type, EventType::Completed);
        assert_eq!(drained[0].target_id, 4);
        assert!(events.is_empty());
    }
}
