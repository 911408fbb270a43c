//! Event Types
//!
//! Records emitted by the work-order engine, one line each in the JSONL log.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Quality, SimTimestamp};

/// Primary event type categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Assigned,
    Denied,
    ResourcesPlaced,
    LaborStarted,
    QualityRolled,
    Replaced,
    Completed,
    Aborted,
}

impl EventType {
    /// Returns all event type variants.
    pub fn all() -> &'static [EventType] {
        &[
            EventType::Assigned,
            EventType::Denied,
            EventType::ResourcesPlaced,
            EventType::LaborStarted,
            EventType::QualityRolled,
            EventType::Replaced,
            EventType::Completed,
            EventType::Aborted,
        ]
    }

    /// Terminal events close the lifecycle of an order.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventType::Completed | EventType::Aborted)
    }
}

/// User-facing severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Positive,
    Neutral,
    Negative,
}

/// Band the random draw landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollBand {
    Success,
    Neutral,
    Failure,
}

impl RollBand {
    pub fn severity(&self) -> Severity {
        match self {
            RollBand::Success => Severity::Positive,
            RollBand::Neutral => Severity::Neutral,
            RollBand::Failure => Severity::Negative,
        }
    }
}

/// Event-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetail {
    Assigned {
        intent: String,
        /// Resource units reserved for the order, by resource kind
        reserved: Vec<(String, u32)>,
    },
    Denied {
        intent: String,
        reason: String,
    },
    ResourcesPlaced {
        resource: String,
        count: u32,
    },
    LaborStarted {
        total_work: f32,
    },
    QualityRolled {
        band: RollBand,
        from: Quality,
        to: Quality,
        success_chance: f32,
        fail_chance: f32,
        roll: f32,
    },
    Replaced {
        new_thing: u64,
        new_def: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        refunded: Vec<(String, u32)>,
    },
    Completed,
    Aborted {
        reason: String,
        designation_kept: bool,
    },
}

impl EventDetail {
    pub fn event_type(&self) -> EventType {
        match self {
            EventDetail::Assigned { .. } => EventType::Assigned,
            EventDetail::Denied { .. } => EventType::Denied,
            EventDetail::ResourcesPlaced { .. } => EventType::ResourcesPlaced,
            EventDetail::LaborStarted { .. } => EventType::LaborStarted,
            EventDetail::QualityRolled { .. } => EventType::QualityRolled,
            EventDetail::Replaced { .. } => EventType::Replaced,
            EventDetail::Completed => EventType::Completed,
            EventDetail::Aborted { .. } => EventType::Aborted,
        }
    }
}

/// A single engine event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkEvent {
    /// Unique identifier (e.g., "evt_00000042")
    pub event_id: String,
    pub timestamp: SimTimestamp,
    pub event_type: EventType,
    /// Work order this event belongs to; absent for denials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    pub worker_id: u64,
    pub target_id: u64,
    pub detail: EventDetail,
}

impl WorkEvent {
    pub fn new(
        event_id: impl Into<String>,
        timestamp: SimTimestamp,
        order_id: Option<Uuid>,
        worker_id: u64,
        target_id: u64,
        detail: EventDetail,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            timestamp,
            event_type: detail.event_type(),
            order_id,
            worker_id,
            target_id,
            detail,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.event_type.is_terminal()
    }
}
