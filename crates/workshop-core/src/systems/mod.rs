//! Engine Systems
//!
//! The resource ledger, requirement resolution, designations, work orders,
//! outcome rolls and the per-tick schedule that ties them together.

pub mod designation;
pub mod ledger;
pub mod order;
pub mod outcome;
pub mod requirement;
pub mod schedule;

pub use designation::{
    DesignationEntry, DesignationError, DesignationRegistry, IntentGroup, IntentKind,
    QualityVariant, Toggled,
};
pub use ledger::{
    LedgerError, LedgerTotals, ReservationToken, ResourceLedger, ResourceStack, StackId, StackPick,
};
pub use order::{
    try_assign, AbortReason, DeniedReason, ModifyStrategy, Phase, TaskStateMachine, WorkContext,
    WorkOrder,
};
pub use outcome::{classify, OutcomeEngine, OutcomeError, RollChances, RollOutcome};
pub use requirement::RequirementResolver;
pub use schedule::{
    advance_clock, assign_work_orders, build_schedule, flush_events, tick_work_orders,
    ActiveOrders,
};
