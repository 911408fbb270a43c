//! Scheduling Systems
//!
//! The per-tick loop of the headless runner: advance the clock, hand idle
//! workers new orders, step every running order, then flush events.

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use crate::components::worker::WorkerId;
use crate::components::world::SimWorld;
use crate::config::Tuning;
use crate::events::{EventLogger, TickEvents};
use crate::systems::designation::DesignationRegistry;
use crate::systems::ledger::ResourceLedger;
use crate::systems::order::{try_assign, Phase, TaskStateMachine, WorkContext, WorkOrder};
use crate::SimRng;

/// Resource: Running orders, at most one per worker, plus finished ones
#[derive(Resource, Debug, Default)]
pub struct ActiveOrders {
    running: BTreeMap<WorkerId, TaskStateMachine>,
    finished: Vec<WorkOrder>,
    denied: u64,
}

impl ActiveOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self, worker: WorkerId) -> bool {
        self.running.contains_key(&worker)
    }

    /// Start running a restored or freshly assigned order.
    /// Returns false if the worker already has one.
    pub fn insert(&mut self, order: WorkOrder) -> bool {
        if self.is_busy(order.worker) {
            return false;
        }
        self.running.insert(order.worker, TaskStateMachine::new(order));
        true
    }

    pub fn get(&self, worker: WorkerId) -> Option<&TaskStateMachine> {
        self.running.get(&worker)
    }

    pub fn running(&self) -> impl Iterator<Item = &TaskStateMachine> {
        self.running.values()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn finished(&self) -> &[WorkOrder] {
        &self.finished
    }

    pub fn completed_count(&self) -> usize {
        self.finished
            .iter()
            .filter(|o| o.phase == Phase::Completed)
            .count()
    }

    pub fn aborted_count(&self) -> usize {
        self.finished.len() - self.completed_count()
    }

    pub fn denied_count(&self) -> u64 {
        self.denied
    }

    /// Running orders as plain data, for saving
    pub fn snapshot(&self) -> Vec<WorkOrder> {
        self.running.values().map(|m| m.order().clone()).collect()
    }
}

/// Move the clock forward and stamp this tick's events with it.
pub fn advance_clock(mut world: ResMut<SimWorld>, mut events: ResMut<TickEvents>) {
    world.advance_tick();
    events.set_tick(world.current_tick);
}

/// Offer outstanding designations to idle workers every assignment interval.
pub fn assign_work_orders(
    mut world: ResMut<SimWorld>,
    ledger: Res<ResourceLedger>,
    designations: Res<DesignationRegistry>,
    tuning: Res<Tuning>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<TickEvents>,
    mut orders: ResMut<ActiveOrders>,
) {
    let interval = tuning.simulation.assign_interval.max(1);
    if world.current_tick.saturating_sub(1) % interval != 0 {
        return;
    }

    let idle: Vec<WorkerId> = world
        .worker_ids()
        .into_iter()
        .filter(|w| !orders.is_busy(*w))
        .collect();

    let mut ctx = WorkContext {
        world: &mut *world,
        ledger: &*ledger,
        designations: &*designations,
        tuning: &*tuning,
        rng: &mut rng.0,
        events: &mut *events,
    };

    for worker in idle {
        for entry in ctx.designations.unclaimed() {
            match try_assign(&mut ctx, &entry, worker) {
                Ok(order) => {
                    orders.insert(order);
                    break;
                }
                Err(_) => orders.denied += 1,
            }
        }
    }
}

/// Step every running order once and retire the ones that finished.
pub fn tick_work_orders(
    mut world: ResMut<SimWorld>,
    ledger: Res<ResourceLedger>,
    designations: Res<DesignationRegistry>,
    tuning: Res<Tuning>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<TickEvents>,
    mut orders: ResMut<ActiveOrders>,
) {
    let mut ctx = WorkContext {
        world: &mut *world,
        ledger: &*ledger,
        designations: &*designations,
        tuning: &*tuning,
        rng: &mut rng.0,
        events: &mut *events,
    };

    let orders = &mut *orders;
    for machine in orders.running.values_mut() {
        machine.tick(&mut ctx);
    }

    let done: Vec<WorkerId> = orders
        .running
        .iter()
        .filter(|(_, m)| m.is_terminal())
        .map(|(w, _)| *w)
        .collect();
    for worker in done {
        if let Some(machine) = orders.running.remove(&worker) {
            orders.finished.push(machine.into_order());
        }
    }
}

/// Write this tick's events to the log.
pub fn flush_events(mut events: ResMut<TickEvents>, mut logger: ResMut<EventLogger>) {
    let batch = events.drain();
    if batch.is_empty() {
        return;
    }
    if let Err(e) = logger.log_batch(&batch) {
        tracing::warn!("failed to write events: {}", e);
    }
}

/// The full per-tick schedule.
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            advance_clock,
            assign_work_orders,
            tick_work_orders,
            flush_events,
        )
            .chain(),
    );
    schedule
}
