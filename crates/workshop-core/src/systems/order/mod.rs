//! Work orders: data, per-intent strategies, the phase machine and assignment.

pub mod assign;
pub mod intent;
pub mod machine;
pub mod work_order;

pub use assign::{try_assign, DeniedReason};
pub use intent::{DowngradeStrategy, ModifyStrategy, QualityStrategy, UpgradeStrategy};
pub use machine::{TaskStateMachine, WorkContext};
pub use work_order::{
    AbortReason, GatherStep, HaulRequest, OrderAccounting, Phase, PlacedResource, WorkOrder,
};
