//! Work Order
//!
//! Plain data describing one assigned task. Everything here serializes so a
//! running order can be saved and picked up again from its current phase.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::components::defs::ResourceCount;
use crate::components::thing::{Position, ThingId};
use crate::components::worker::WorkerId;
use crate::systems::designation::IntentKind;
use crate::systems::ledger::ReservationToken;

/// Reserved units still to be picked up from one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaulRequest {
    pub token: ReservationToken,
    pub remaining: u32,
}

impl HaulRequest {
    pub fn new(token: ReservationToken) -> Self {
        let remaining = token.count;
        Self { token, remaining }
    }

    pub fn resource(&self) -> &str {
        &self.token.resource
    }
}

/// Resources set down next to the work site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedResource {
    pub resource: String,
    pub count: u32,
    pub position: Position,
}

/// Sub-step of the gathering phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatherStep {
    /// Walk to the item that is being reworked
    FetchItem,
    /// Carry the item to the workstation
    CarryItem,
    /// Walk to the stack at the front of the haul queue and pick up
    ToStack,
    /// Bring the carried load to the work site
    Deliver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Gathering {
        step: GatherStep,
    },
    Traveling,
    Laboring {
        total_work: f32,
        work_remaining: f32,
    },
    Finalizing,
    Completed,
    Aborted {
        reason: AbortReason,
    },
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Aborted { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Gathering { .. } => "gathering",
            Phase::Traveling => "traveling",
            Phase::Laboring { .. } => "laboring",
            Phase::Finalizing => "finalizing",
            Phase::Completed => "completed",
            Phase::Aborted { .. } => "aborted",
        }
    }
}

/// Why an order stopped before completing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AbortReason {
    #[error("a reserved resource was lost")]
    ResourceLost,
    #[error("the work site became unavailable")]
    TargetUnavailable,
    #[error("cancelled")]
    Cancelled,
    #[error("data integrity: {0}")]
    DataIntegrity(String),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl AbortReason {
    /// Whether the designation stays for another attempt. Bad data will not
    /// fix itself, so those designations are cleared.
    pub fn keeps_designation(&self) -> bool {
        !matches!(self, AbortReason::DataIntegrity(_))
    }

    /// Unexpected aborts that are surfaced as errors
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AbortReason::DataIntegrity(_) | AbortReason::InvariantViolation(_)
        )
    }
}

/// Units this order reserved, released back and consumed from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderAccounting {
    pub reserved: u64,
    pub released: u64,
    pub consumed: u64,
}

impl OrderAccounting {
    pub fn is_balanced(&self) -> bool {
        self.reserved == self.released + self.consumed
    }
}

impl fmt::Display for OrderAccounting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reserved {} released {} consumed {}",
            self.reserved, self.released, self.consumed
        )
    }
}

/// One task bound to a worker and a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: Uuid,
    pub worker: WorkerId,
    pub target: ThingId,
    pub intent: IntentKind,
    /// Workstation labor happens at, for crafted targets
    pub workstation: Option<ThingId>,
    pub requirements: Vec<ResourceCount>,
    pub haul_queue: Vec<HaulRequest>,
    /// Load currently in the worker's hands
    pub carried: Option<ResourceCount>,
    pub placed: Vec<PlacedResource>,
    /// The item has been set down at the workstation
    pub item_delivered: bool,
    pub phase: Phase,
    pub accounting: OrderAccounting,
    /// Tick the order was created
    pub created_tick: u64,
}

impl WorkOrder {
    /// Build an order from reservations already taken out for it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        worker: WorkerId,
        target: ThingId,
        intent: IntentKind,
        workstation: Option<ThingId>,
        requirements: Vec<ResourceCount>,
        tokens: Vec<ReservationToken>,
        created_tick: u64,
    ) -> Self {
        let accounting = OrderAccounting {
            reserved: tokens.iter().map(|t| u64::from(t.count)).sum(),
            ..Default::default()
        };
        let haul_queue: Vec<HaulRequest> = tokens.into_iter().map(HaulRequest::new).collect();

        let phase = if workstation.is_some() {
            Phase::Gathering {
                step: GatherStep::FetchItem,
            }
        } else if !haul_queue.is_empty() {
            Phase::Gathering {
                step: GatherStep::ToStack,
            }
        } else {
            Phase::Traveling
        };

        Self {
            id,
            worker,
            target,
            intent,
            workstation,
            requirements,
            haul_queue,
            carried: None,
            placed: Vec::new(),
            item_delivered: false,
            phase,
            accounting,
            created_tick,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Where labor happens: the workstation for crafted targets, else the target
    pub fn work_site(&self) -> ThingId {
        self.workstation.unwrap_or(self.target)
    }

    /// Units placed so far, summed per resource kind
    pub fn placed_total(&self, resource: &str) -> u32 {
        self.placed
            .iter()
            .filter(|p| p.resource == resource)
            .map(|p| p.count)
            .sum()
    }

    /// Record a drop, merging with an earlier drop of the same kind on the same cell.
    pub fn record_placed(&mut self, resource: &str, count: u32, position: Position) {
        if let Some(existing) = self
            .placed
            .iter_mut()
            .find(|p| p.resource == resource && p.position == position)
        {
            existing.count += count;
            return;
        }
        self.placed.push(PlacedResource {
            resource: resource.to_string(),
            count,
            position,
        });
    }

    pub fn reserved_by_resource(&self) -> Vec<(String, u32)> {
        let mut totals: Vec<(String, u32)> = Vec::new();
        for request in &self.haul_queue {
            match totals.iter_mut().find(|(r, _)| r == request.resource()) {
                Some((_, count)) => *count += request.token.count,
                None => totals.push((request.resource().to_string(), request.token.count)),
            }
        }
        totals
    }
}
