//! Work Assignment
//!
//! Matches a pending designation to a worker. Every check that can fail
//! runs before anything is reserved, and reservations taken for an order
//! that is then denied are handed straight back.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use workshop_events::EventDetail;

use crate::components::defs::ResourceCount;
use crate::components::thing::{Position, ThingId};
use crate::components::worker::{WorkType, WorkerId};
use crate::environment::WorldAccess;
use crate::systems::designation::{DesignationEntry, DesignationError, IntentKind};
use crate::systems::ledger::ReservationToken;
use crate::systems::requirement::RequirementResolver;

use super::machine::WorkContext;
use super::work_order::WorkOrder;

/// Why a worker was not given an order. `Display` is the short player message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DeniedReason {
    #[error("not enough {0}")]
    InsufficientResources(String),
    #[error("not assigned to {0}")]
    WorkTypeNotAssigned(WorkType),
    #[error("incapable of {0}")]
    WorkTypeDisabled(WorkType),
    #[error("no usable workstation")]
    NoSuitableWorkstation,
    #[error("target is unavailable")]
    TargetUnavailable,
    #[error("someone else is working on it")]
    AlreadyClaimed,
    #[error("quality cannot be increased")]
    NoQualityPath,
    #[error("no longer designated")]
    NoDesignation,
}

/// Try to create an order for `entry` carried out by `worker`.
///
/// On success the resources are reserved and the designation is claimed.
/// A denial leaves the ledger and the registry as they were.
pub fn try_assign<W: WorldAccess + ?Sized>(
    ctx: &mut WorkContext<'_, W>,
    entry: &DesignationEntry,
    worker: WorkerId,
) -> Result<WorkOrder, DeniedReason> {
    match build_order(ctx, entry, worker) {
        Ok(order) => {
            tracing::info!(
                order = %order.id,
                %worker,
                target = %entry.target,
                intent = %entry.intent,
                "work order assigned"
            );
            ctx.events.emit(
                Some(order.id),
                worker,
                entry.target,
                EventDetail::Assigned {
                    intent: entry.intent.to_string(),
                    reserved: order.reserved_by_resource(),
                },
            );
            Ok(order)
        }
        Err(reason) => {
            tracing::debug!(%worker, target = %entry.target, intent = %entry.intent, %reason, "assignment denied");
            ctx.events.emit(
                None,
                worker,
                entry.target,
                EventDetail::Denied {
                    intent: entry.intent.to_string(),
                    reason: reason.to_string(),
                },
            );
            Err(reason)
        }
    }
}

fn build_order<W: WorldAccess + ?Sized>(
    ctx: &mut WorkContext<'_, W>,
    entry: &DesignationEntry,
    worker: WorkerId,
) -> Result<WorkOrder, DeniedReason> {
    let target = entry.target;
    let intent = entry.intent;
    let work_type = intent.work_type();

    match ctx.designations.get(target, intent) {
        None => return Err(DeniedReason::NoDesignation),
        Some(current) if current.claimed_by.is_some_and(|w| w != worker) => {
            return Err(DeniedReason::AlreadyClaimed)
        }
        Some(_) => {}
    }

    let world = &*ctx.world;
    let actor = world
        .worker(worker)
        .ok_or(DeniedReason::WorkTypeNotAssigned(work_type))?;
    if !world.status(target, worker).is_available() {
        return Err(DeniedReason::TargetUnavailable);
    }
    if actor.priority(work_type) == 0 {
        return Err(if actor.is_disabled(work_type) {
            DeniedReason::WorkTypeDisabled(work_type)
        } else {
            DeniedReason::WorkTypeNotAssigned(work_type)
        });
    }

    let thing = world.thing(target).ok_or(DeniedReason::TargetUnavailable)?;
    let def = world
        .defs()
        .get(&thing.def_name)
        .ok_or(DeniedReason::TargetUnavailable)?;

    let workstation = if intent.at_workstation() {
        Some(nearest_workstation(world, worker, actor.position, &def.recipe_users)?)
    } else {
        None
    };

    let resolver = RequirementResolver::new(ctx.tuning.quality.material_scalars);
    let no_path = match intent {
        IntentKind::IncreaseQuality(_) => DeniedReason::NoQualityPath,
        IntentKind::Upgrade | IntentKind::Downgrade => DeniedReason::TargetUnavailable,
    };
    let requirements = intent
        .strategy()
        .additional_resources(def, thing, &resolver)
        .ok_or(no_path)?;

    let site = workstation.unwrap_or(target);
    let near = world.thing(site).map(|t| t.position).unwrap_or(thing.position);
    let tokens = reserve_all(ctx, worker, &requirements, near)?;

    if let Err(e) = ctx.designations.claim(target, intent, worker) {
        release_all(ctx, &tokens);
        return Err(match e {
            DesignationError::Claimed { .. } => DeniedReason::AlreadyClaimed,
            _ => DeniedReason::NoDesignation,
        });
    }

    let id = uuid::Builder::from_random_bytes(ctx.rng.gen()).into_uuid();
    Ok(WorkOrder::new(
        id,
        worker,
        target,
        intent,
        workstation,
        requirements,
        tokens,
        ctx.events.timestamp().tick,
    ))
}

/// Nearest usable workstation able to craft the item, first found on ties.
fn nearest_workstation<W: WorldAccess + ?Sized>(
    world: &W,
    worker: WorkerId,
    from: Position,
    recipe_users: &[String],
) -> Result<ThingId, DeniedReason> {
    recipe_users
        .iter()
        .flat_map(|def_name| world.things_of_def(def_name))
        .filter(|id| world.status(*id, worker).is_available())
        .filter_map(|id| world.thing(id).map(|t| (id, t.position.manhattan(&from))))
        .min_by_key(|(_, distance)| *distance)
        .map(|(id, _)| id)
        .ok_or(DeniedReason::NoSuitableWorkstation)
}

fn reserve_all<W: WorldAccess + ?Sized>(
    ctx: &WorkContext<'_, W>,
    worker: WorkerId,
    requirements: &[ResourceCount],
    near: Position,
) -> Result<Vec<ReservationToken>, DeniedReason> {
    let mut tokens = Vec::new();
    for requirement in requirements.iter().filter(|r| r.count > 0) {
        let world = &*ctx.world;
        let claimed = ctx.ledger.claim(&requirement.resource, requirement.count, near, |stack| {
            world.can_reach(worker, stack.position)
        });
        match claimed {
            Ok(mut claimed) => tokens.append(&mut claimed),
            Err(_) => {
                release_all(ctx, &tokens);
                return Err(DeniedReason::InsufficientResources(requirement.resource.clone()));
            }
        }
    }
    Ok(tokens)
}

fn release_all<W: WorldAccess + ?Sized>(ctx: &WorkContext<'_, W>, tokens: &[ReservationToken]) {
    for token in tokens {
        ctx.ledger.release(token);
    }
}
