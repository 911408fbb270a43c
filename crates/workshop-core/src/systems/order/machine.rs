//! Task State Machine
//!
//! Drives one [`WorkOrder`] through gathering, travel, labor and
//! finalization, one step per tick. All state lives on the order, so a
//! machine can be rebuilt from a restored order at any point.

use rand::RngCore;

use workshop_events::{EventDetail, Severity};

use crate::components::defs::{ResourceCount, ThingDef};
use crate::components::quality::quality_created_by_skill;
use crate::components::thing::{Position, Thing, ThingId};
use crate::components::worker::{StatKind, WorkerId};
use crate::config::Tuning;
use crate::environment::{Destination, WorldAccess};
use crate::events::TickEvents;
use crate::systems::designation::{DesignationRegistry, IntentKind};
use crate::systems::ledger::{LedgerError, ResourceLedger};
use crate::systems::outcome::OutcomeEngine;

use super::work_order::{AbortReason, GatherStep, HaulRequest, Phase, WorkOrder};

/// Everything an order touches outside itself during a tick.
pub struct WorkContext<'a, W: WorldAccess + ?Sized> {
    pub world: &'a mut W,
    pub ledger: &'a ResourceLedger,
    pub designations: &'a DesignationRegistry,
    pub tuning: &'a Tuning,
    pub rng: &'a mut dyn RngCore,
    pub events: &'a mut TickEvents,
}

type StepResult = Result<(), AbortReason>;

#[derive(Debug, Clone)]
pub struct TaskStateMachine {
    order: WorkOrder,
}

impl TaskStateMachine {
    pub fn new(order: WorkOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &WorkOrder {
        &self.order
    }

    pub fn into_order(self) -> WorkOrder {
        self.order
    }

    pub fn phase(&self) -> &Phase {
        &self.order.phase
    }

    pub fn worker(&self) -> WorkerId {
        self.order.worker
    }

    pub fn is_terminal(&self) -> bool {
        self.order.is_terminal()
    }

    /// Advance one step. Does nothing once the order is terminal.
    pub fn tick<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>) {
        if self.is_terminal() {
            return;
        }
        if let Err(reason) = self.step(ctx) {
            self.abort(ctx, reason);
        }
    }

    /// Abort from whatever phase the order is in, releasing its reservations.
    pub fn cancel<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>) {
        if !self.is_terminal() {
            self.abort(ctx, AbortReason::Cancelled);
        }
    }

    fn step<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>) -> StepResult {
        self.check_still_wanted(ctx)?;

        match self.order.phase.clone() {
            Phase::Gathering { step } => self.gather(ctx, step),
            Phase::Traveling => self.travel(ctx),
            Phase::Laboring {
                total_work,
                work_remaining,
            } => self.labor(ctx, total_work, work_remaining),
            Phase::Finalizing => self.finalize(ctx),
            Phase::Completed | Phase::Aborted { .. } => Ok(()),
        }
    }

    /// The designation must still exist and belong to this worker, and the
    /// worker must still exist.
    fn check_still_wanted<W: WorldAccess + ?Sized>(&self, ctx: &WorkContext<'_, W>) -> StepResult {
        let order = &self.order;
        if ctx.world.worker(order.worker).is_none() {
            return Err(AbortReason::Cancelled);
        }
        match ctx.designations.get(order.target, order.intent) {
            Some(entry) if entry.claimed_by.map_or(true, |w| w == order.worker) => Ok(()),
            _ => Err(AbortReason::Cancelled),
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!(
            order = %self.order.id,
            from = self.order.phase.name(),
            to = phase.name(),
            "phase transition"
        );
        self.order.phase = phase;
    }

    fn gather<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>, step: GatherStep) -> StepResult {
        let worker = self.order.worker;
        let target = self.order.target;

        match step {
            GatherStep::FetchItem => {
                ensure_available(&*ctx.world, target, worker)?;
                if ctx.world.travel_to(worker, Destination::Thing(target)) {
                    self.set_phase(Phase::Gathering {
                        step: GatherStep::CarryItem,
                    });
                }
                Ok(())
            }
            GatherStep::CarryItem => {
                let site = self.order.work_site();
                ensure_available(&*ctx.world, site, worker)?;
                if ctx.world.thing(target).is_none() {
                    return Err(AbortReason::TargetUnavailable);
                }
                let cell = reachable_placement(&*ctx.world, site, worker)?;
                if ctx.world.travel_to(worker, Destination::Cell(cell)) {
                    ctx.world.move_thing(target, cell);
                    self.order.item_delivered = true;
                    tracing::debug!(order = %self.order.id, %target, %cell, "item set down at workstation");
                    self.after_delivery();
                }
                Ok(())
            }
            GatherStep::ToStack => self.visit_stack(ctx),
            GatherStep::Deliver => self.deliver(ctx),
        }
    }

    fn after_delivery(&mut self) {
        let next = if self.order.haul_queue.is_empty() {
            Phase::Traveling
        } else {
            Phase::Gathering {
                step: GatherStep::ToStack,
            }
        };
        self.set_phase(next);
    }

    fn visit_stack<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>) -> StepResult {
        let worker = self.order.worker;
        let Some(front) = self.order.haul_queue.first().cloned() else {
            if self.order.carried.is_some() {
                self.set_phase(Phase::Gathering {
                    step: GatherStep::Deliver,
                });
            } else {
                self.after_delivery();
            }
            return Ok(());
        };

        // A different kind is in hand: drop it off before starting a new load.
        if let Some(load) = &self.order.carried {
            if load.resource != front.resource() {
                self.set_phase(Phase::Gathering {
                    step: GatherStep::Deliver,
                });
                return Ok(());
            }
        }

        let stack = ctx
            .ledger
            .stack(front.token.stack)
            .filter(|s| !s.forbidden)
            .ok_or(AbortReason::ResourceLost)?;
        if !ctx.world.can_reach(worker, stack.position) {
            return Err(AbortReason::ResourceLost);
        }
        if !ctx.world.travel_to(worker, Destination::Cell(stack.position)) {
            return Ok(());
        }

        let capacity = carry_capacity(&*ctx.world, worker, front.resource());
        let in_hand = self.order.carried.as_ref().map_or(0, |c| c.count);
        let take = front.remaining.min(capacity.saturating_sub(in_hand));
        let picked = self.pick_up(ctx, &front, take)?;
        let resource = front.resource().to_string();
        let carried = in_hand + picked;

        if let Some(request) = self.order.haul_queue.first_mut() {
            request.remaining -= picked;
            if request.remaining == 0 {
                self.order.haul_queue.remove(0);
            }
        }
        tracing::debug!(
            order = %self.order.id,
            stack = %front.token.stack,
            %resource,
            picked,
            carried,
            capacity,
            "picked up"
        );

        // Fill the remaining capacity from other stacks of the same kind
        // before walking back.
        if carried < capacity {
            if let Some(i) = self
                .order
                .haul_queue
                .iter()
                .position(|r| r.resource() == resource)
            {
                let next = self.order.haul_queue.remove(i);
                self.order.haul_queue.insert(0, next);
                return Ok(());
            }
        }

        self.set_phase(Phase::Gathering {
            step: GatherStep::Deliver,
        });
        Ok(())
    }

    fn pick_up<W: WorldAccess + ?Sized>(
        &mut self,
        ctx: &mut WorkContext<'_, W>,
        request: &HaulRequest,
        count: u32,
    ) -> Result<u32, AbortReason> {
        if count == 0 {
            return Ok(0);
        }
        let picked = match ctx.ledger.withdraw(&request.token, count) {
            Ok(picked) => picked,
            Err(LedgerError::UnknownStack(_)) => return Err(AbortReason::ResourceLost),
            Err(e) => return Err(AbortReason::InvariantViolation(e.to_string())),
        };
        self.order.accounting.consumed += u64::from(picked);
        match &mut self.order.carried {
            Some(load) => load.count += picked,
            None => self.order.carried = Some(ResourceCount::new(request.resource(), picked)),
        }
        Ok(picked)
    }

    fn deliver<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>) -> StepResult {
        let worker = self.order.worker;
        let site = self.order.work_site();
        ensure_available(&*ctx.world, site, worker)?;

        let Some(load) = self.order.carried.clone() else {
            self.after_delivery();
            return Ok(());
        };
        let cell = reachable_placement(&*ctx.world, site, worker)?;
        if !ctx.world.travel_to(worker, Destination::Cell(cell)) {
            return Ok(());
        }

        self.order.record_placed(&load.resource, load.count, cell);
        self.order.carried = None;
        ctx.events.emit(
            Some(self.order.id),
            worker,
            self.order.target,
            EventDetail::ResourcesPlaced {
                resource: load.resource.clone(),
                count: load.count,
            },
        );
        tracing::debug!(order = %self.order.id, resource = %load.resource, count = load.count, "delivered");
        self.after_delivery();
        Ok(())
    }

    fn travel<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>) -> StepResult {
        let worker = self.order.worker;
        let site = self.order.work_site();
        ensure_available(&*ctx.world, site, worker)?;
        if site != self.order.target {
            ensure_available(&*ctx.world, self.order.target, worker)?;
        }
        if !ctx.world.travel_to(worker, Destination::Thing(site)) {
            return Ok(());
        }

        let total_work = self.total_work(&*ctx.world, ctx.tuning);
        self.set_phase(Phase::Laboring {
            total_work,
            work_remaining: total_work,
        });
        ctx.events.emit(
            Some(self.order.id),
            worker,
            self.order.target,
            EventDetail::LaborStarted { total_work },
        );
        Ok(())
    }

    /// Work needed, fixed when labor starts
    fn total_work<W: WorldAccess + ?Sized>(&self, world: &W, tuning: &Tuning) -> f32 {
        if self.order.intent.at_workstation() {
            world.thing_stat(self.order.target, StatKind::WorkToMake)
        } else {
            world
                .thing_stat(self.order.target, StatKind::WorkToBuild)
                .clamp(tuning.labor.min_build_work, tuning.labor.max_build_work)
        }
    }

    fn labor<W: WorldAccess + ?Sized>(
        &mut self,
        ctx: &mut WorkContext<'_, W>,
        total_work: f32,
        work_remaining: f32,
    ) -> StepResult {
        let worker = self.order.worker;
        let intent = self.order.intent;
        ensure_available(&*ctx.world, self.order.work_site(), worker)?;
        if self.order.workstation.is_some() {
            ensure_available(&*ctx.world, self.order.target, worker)?;
        }

        let labor = &ctx.tuning.labor;
        let progress = ctx.world.worker_stat(worker, intent.speed_stat()) * labor.speed_multiplier;
        let learned = labor.learn_per_tick * ctx.world.worker_stat(worker, StatKind::LearningFactor);
        if learned > 0.0 {
            ctx.world.grant_experience(worker, intent.skill(), learned);
        }

        let work_remaining = work_remaining - progress;
        if work_remaining <= 0.0 {
            self.set_phase(Phase::Finalizing);
        } else {
            self.order.phase = Phase::Laboring {
                total_work,
                work_remaining,
            };
        }
        Ok(())
    }

    fn finalize<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>) -> StepResult {
        let target = self.order.target;
        let thing = ctx
            .world
            .thing(target)
            .cloned()
            .ok_or(AbortReason::TargetUnavailable)?;
        let def = ctx
            .world
            .defs()
            .get(&thing.def_name)
            .cloned()
            .ok_or_else(|| {
                AbortReason::DataIntegrity(format!("definition {} is missing", thing.def_name))
            })?;

        match self.order.intent {
            IntentKind::IncreaseQuality(_) => self.improve(ctx, &thing)?,
            IntentKind::Upgrade | IntentKind::Downgrade => self.replace(ctx, &thing, &def)?,
        }

        ctx.designations.remove(target, self.order.intent);
        ctx.events.emit(
            Some(self.order.id),
            self.order.worker,
            target,
            EventDetail::Completed,
        );
        tracing::info!(
            order = %self.order.id,
            worker = %self.order.worker,
            %target,
            intent = %self.order.intent,
            "work order completed"
        );
        self.enter_terminal(Phase::Completed);
        Ok(())
    }

    /// Placed resources are used up by the work.
    fn consume_placed(&mut self) {
        let placed = std::mem::take(&mut self.order.placed);
        let units: u32 = placed.iter().map(|p| p.count).sum();
        if units > 0 {
            tracing::debug!(order = %self.order.id, units, "placed resources consumed");
        }
    }

    fn improve<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>, thing: &Thing) -> StepResult {
        // Read before anything is consumed so a bad thing is left untouched.
        let quality = thing.quality.ok_or_else(|| {
            AbortReason::DataIntegrity(format!("quality of {} cannot be read", thing.id))
        })?;
        if quality.is_ceiling() {
            return Err(AbortReason::DataIntegrity(format!("{} is already legendary", thing.id)));
        }

        // The roll checks everything before it writes, so a failure leaves
        // the thing and the placed resources as they were.
        let engine = OutcomeEngine::new(ctx.tuning.quality.clone());
        let outcome = engine
            .roll(
                &mut *ctx.world,
                self.order.worker,
                thing.id,
                self.order.intent.skill(),
                &mut *ctx.rng,
            )
            .map_err(|e| AbortReason::DataIntegrity(e.to_string()))?;
        self.consume_placed();

        ctx.events.emit(
            Some(self.order.id),
            self.order.worker,
            thing.id,
            EventDetail::QualityRolled {
                band: outcome.band,
                from: outcome.from,
                to: outcome.to,
                success_chance: outcome.chances.success,
                fail_chance: outcome.chances.fail,
                roll: outcome.roll,
            },
        );
        Ok(())
    }

    fn replace<W: WorldAccess + ?Sized>(
        &mut self,
        ctx: &mut WorkContext<'_, W>,
        thing: &Thing,
        def: &ThingDef,
    ) -> StepResult {
        let worker = self.order.worker;
        let strategy = self.order.intent.strategy();
        let new_def_name = strategy
            .replacement_def(def)
            .ok_or_else(|| {
                AbortReason::DataIntegrity(format!("{} has no {} link", def.def_name, self.order.intent))
            })?
            .to_string();
        let new_def = ctx.world.defs().get(&new_def_name).cloned().ok_or_else(|| {
            AbortReason::DataIntegrity(format!("replacement definition {new_def_name} is missing"))
        })?;

        // Spawn while the original still stands. Nothing below can fail.
        let position = thing.position;
        let replacement = ctx
            .world
            .spawn_replacement(&new_def_name, thing.stuff.as_deref(), position, thing.rotation)
            .ok_or_else(|| AbortReason::DataIntegrity(format!("could not spawn {new_def_name}")))?;
        ctx.world.destroy_thing(thing.id);
        self.consume_placed();

        if new_def.has_task_queue && !thing.task_queue.is_empty() {
            ctx.world.set_task_queue(replacement, thing.task_queue.clone());
        }
        if new_def.connects_to_power {
            let connected = ctx.world.connect_to_grid(replacement);
            tracing::debug!(%replacement, connected, "grid connection");
        }
        if new_def.has_quality {
            let skill = ctx.world.skill_level(worker, self.order.intent.skill());
            let quality = quality_created_by_skill(skill, &mut *ctx.rng);
            ctx.world.write_quality(replacement, quality);
        }

        let refunds = strategy.refunded_resources(def);
        for refund in &refunds {
            if refund.count > 0 {
                ctx.ledger.add_stack(refund.resource.clone(), refund.count, position);
            }
        }

        let name = ctx
            .world
            .worker(worker)
            .map(|w| w.name.clone())
            .unwrap_or_else(|| worker.to_string());
        let new_label = ctx
            .world
            .thing(replacement)
            .map(|t| t.label())
            .unwrap_or_else(|| new_def_name.clone());
        let verb = match self.order.intent {
            IntentKind::Downgrade => "downgraded",
            _ => "upgraded",
        };
        let message = format!("{name} {verb} {} into {new_label}", thing.label());
        ctx.world.report_outcome(worker, &message, Severity::Positive);

        ctx.events.emit(
            Some(self.order.id),
            worker,
            thing.id,
            EventDetail::Replaced {
                new_thing: replacement.0,
                new_def: new_def_name,
                refunded: refunds.iter().map(|r| (r.resource.clone(), r.count)).collect(),
            },
        );
        Ok(())
    }

    fn abort<W: WorldAccess + ?Sized>(&mut self, ctx: &mut WorkContext<'_, W>, reason: AbortReason) {
        let worker = self.order.worker;
        let target = self.order.target;

        for request in std::mem::take(&mut self.order.haul_queue) {
            self.order.accounting.released += u64::from(ctx.ledger.release(&request.token));
        }

        // Whatever has been picked up stays in the world as loose stacks.
        let drop_at = ctx
            .world
            .worker(worker)
            .map(|w| w.position)
            .or_else(|| ctx.world.thing(target).map(|t| t.position))
            .unwrap_or_default();
        if let Some(load) = self.order.carried.take() {
            ctx.ledger.add_stack(load.resource, load.count, drop_at);
        }
        for placed in std::mem::take(&mut self.order.placed) {
            ctx.ledger.add_stack(placed.resource, placed.count, placed.position);
        }

        let designation_kept = reason.keeps_designation();
        if designation_kept {
            ctx.designations.unclaim(target, self.order.intent, worker);
        } else {
            ctx.designations.remove(target, self.order.intent);
        }

        if reason.is_fatal() {
            tracing::error!(order = %self.order.id, %worker, %target, %reason, "work order aborted");
        } else {
            tracing::warn!(order = %self.order.id, %worker, %target, %reason, "work order aborted");
        }
        ctx.events.emit(
            Some(self.order.id),
            worker,
            target,
            EventDetail::Aborted {
                reason: reason.to_string(),
                designation_kept,
            },
        );
        self.enter_terminal(Phase::Aborted { reason });
    }

    fn enter_terminal(&mut self, phase: Phase) {
        let accounting = self.order.accounting;
        if !accounting.is_balanced() {
            tracing::error!(
                order = %self.order.id,
                %accounting,
                "reservation accounting does not balance"
            );
        }
        self.set_phase(phase);
    }
}

fn ensure_available<W: WorldAccess + ?Sized>(world: &W, thing: ThingId, worker: WorkerId) -> StepResult {
    if world.status(thing, worker).is_available() {
        Ok(())
    } else {
        Err(AbortReason::TargetUnavailable)
    }
}

fn reachable_placement<W: WorldAccess + ?Sized>(
    world: &W,
    site: ThingId,
    worker: WorkerId,
) -> Result<Position, AbortReason> {
    world
        .placement_cell(site)
        .filter(|cell| world.can_reach(worker, *cell))
        .ok_or(AbortReason::TargetUnavailable)
}

/// Units of `resource` the worker can hold in one trip
fn carry_capacity<W: WorldAccess + ?Sized>(world: &W, worker: WorkerId, resource: &str) -> u32 {
    let hands = world.worker(worker).map_or(0, |w| w.carry_capacity);
    hands.min(world.defs().stack_limit(resource)).max(1)
}
