//! Designation Registry
//!
//! Pending player intents keyed by target. Shared by the scheduler and every
//! running work order, so all access goes through one lock.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::components::defs::ThingCategory;
use crate::components::thing::{Faction, ThingId};
use crate::components::worker::{SkillKind, StatKind, WorkType, WorkerId};
use crate::environment::WorldAccess;
use crate::systems::order::intent::{
    DowngradeStrategy, ModifyStrategy, QualityStrategy, UpgradeStrategy,
};

/// Which kind of thing a quality increase works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityVariant {
    Building,
    Apparel,
    Art,
    Item,
}

impl QualityVariant {
    /// The variant that applies to things of `category`, if any
    pub fn for_category(category: ThingCategory) -> Option<Self> {
        match category {
            ThingCategory::Building | ThingCategory::Workstation => Some(QualityVariant::Building),
            ThingCategory::Apparel => Some(QualityVariant::Apparel),
            ThingCategory::Art => Some(QualityVariant::Art),
            ThingCategory::Weapon | ThingCategory::Item => Some(QualityVariant::Item),
            ThingCategory::Resource => None,
        }
    }
}

/// What the player wants done to a thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Upgrade,
    Downgrade,
    IncreaseQuality(QualityVariant),
}

/// Intents in the same group cannot coexist on one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntentGroup {
    Modify,
    Quality,
}

impl IntentKind {
    pub fn group(&self) -> IntentGroup {
        match self {
            IntentKind::Upgrade | IntentKind::Downgrade => IntentGroup::Modify,
            IntentKind::IncreaseQuality(_) => IntentGroup::Quality,
        }
    }

    pub fn work_type(&self) -> WorkType {
        match self {
            IntentKind::Upgrade
            | IntentKind::Downgrade
            | IntentKind::IncreaseQuality(QualityVariant::Building) => WorkType::Construction,
            IntentKind::IncreaseQuality(_) => WorkType::Crafting,
        }
    }

    /// Skill trained by the labor and used for the quality roll
    pub fn skill(&self) -> SkillKind {
        match self {
            IntentKind::Upgrade
            | IntentKind::Downgrade
            | IntentKind::IncreaseQuality(QualityVariant::Building) => SkillKind::Construction,
            IntentKind::IncreaseQuality(QualityVariant::Art) => SkillKind::Artistic,
            IntentKind::IncreaseQuality(_) => SkillKind::Crafting,
        }
    }

    /// Worker stat that drives labor progress
    pub fn speed_stat(&self) -> StatKind {
        match self.work_type() {
            WorkType::Construction => StatKind::ConstructionSpeed,
            WorkType::Crafting => StatKind::WorkSpeedGlobal,
        }
    }

    /// Labor happens at a workstation instead of at the target
    pub fn at_workstation(&self) -> bool {
        self.work_type() == WorkType::Crafting
    }

    pub fn strategy(&self) -> &'static dyn ModifyStrategy {
        match self {
            IntentKind::Upgrade => &UpgradeStrategy,
            IntentKind::Downgrade => &DowngradeStrategy,
            IntentKind::IncreaseQuality(_) => &QualityStrategy,
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentKind::Upgrade => f.write_str("upgrade"),
            IntentKind::Downgrade => f.write_str("downgrade"),
            IntentKind::IncreaseQuality(QualityVariant::Building) => f.write_str("increase building quality"),
            IntentKind::IncreaseQuality(QualityVariant::Apparel) => f.write_str("increase apparel quality"),
            IntentKind::IncreaseQuality(QualityVariant::Art) => f.write_str("increase art quality"),
            IntentKind::IncreaseQuality(QualityVariant::Item) => f.write_str("increase item quality"),
        }
    }
}

/// A pending intent on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignationEntry {
    pub target: ThingId,
    pub intent: IntentKind,
    /// Worker currently running an order for this entry
    pub claimed_by: Option<WorkerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DesignationError {
    #[error("{target} already has a pending {existing}")]
    Conflict { target: ThingId, existing: IntentKind },
    #[error("{target} cannot be designated for {intent}: {why}")]
    Ineligible {
        target: ThingId,
        intent: IntentKind,
        why: &'static str,
    },
    #[error("{intent} needs research \"{project}\" first")]
    ResearchLocked { intent: IntentKind, project: String },
    #[error("no {intent} designation on {target}")]
    Missing { target: ThingId, intent: IntentKind },
    #[error("{target} is already being worked on by {worker}")]
    Claimed { target: ThingId, worker: WorkerId },
}

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// Resource: Pending intents, one per (target, exclusivity group)
#[derive(Resource, Debug, Default)]
pub struct DesignationRegistry {
    entries: Mutex<BTreeMap<(ThingId, IntentGroup), DesignationEntry>>,
}

impl DesignationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<(ThingId, IntentGroup), DesignationEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an intent without checking the target. Fails if the group is taken.
    pub fn designate(&self, target: ThingId, intent: IntentKind) -> Result<(), DesignationError> {
        let mut entries = self.lock();
        let key = (target, intent.group());
        if let Some(existing) = entries.get(&key) {
            return Err(DesignationError::Conflict {
                target,
                existing: existing.intent,
            });
        }
        entries.insert(
            key,
            DesignationEntry {
                target,
                intent,
                claimed_by: None,
            },
        );
        tracing::debug!(%target, %intent, "designated");
        Ok(())
    }

    /// Record an intent after checking the target can take it.
    pub fn designate_checked<W: WorldAccess + ?Sized>(
        &self,
        world: &W,
        target: ThingId,
        intent: IntentKind,
    ) -> Result<(), DesignationError> {
        check_eligible(world, target, intent)?;
        self.designate(target, intent)
    }

    /// Remove an identical designation if one exists, otherwise add it.
    pub fn toggle<W: WorldAccess + ?Sized>(
        &self,
        world: &W,
        target: ThingId,
        intent: IntentKind,
    ) -> Result<Toggled, DesignationError> {
        if self.remove(target, intent) {
            return Ok(Toggled::Removed);
        }
        self.designate_checked(world, target, intent)?;
        Ok(Toggled::Added)
    }

    /// Remove the designation for this exact intent. Returns whether one was removed.
    pub fn remove(&self, target: ThingId, intent: IntentKind) -> bool {
        let mut entries = self.lock();
        let key = (target, intent.group());
        match entries.get(&key) {
            Some(entry) if entry.intent == intent => {
                entries.remove(&key);
                tracing::debug!(%target, %intent, "designation cleared");
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, target: ThingId, intent: IntentKind) -> bool {
        self.get(target, intent).is_some()
    }

    pub fn get(&self, target: ThingId, intent: IntentKind) -> Option<DesignationEntry> {
        self.lock()
            .get(&(target, intent.group()))
            .filter(|e| e.intent == intent)
            .cloned()
    }

    /// Every pending entry, ordered by target then group
    pub fn outstanding(&self) -> Vec<DesignationEntry> {
        self.lock().values().cloned().collect()
    }

    /// Entries no worker is currently running
    pub fn unclaimed(&self) -> Vec<DesignationEntry> {
        self.lock()
            .values()
            .filter(|e| e.claimed_by.is_none())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Bind the designation to a worker. Re-claiming by the same worker is allowed.
    pub fn claim(
        &self,
        target: ThingId,
        intent: IntentKind,
        worker: WorkerId,
    ) -> Result<(), DesignationError> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(&(target, intent.group()))
            .filter(|e| e.intent == intent)
            .ok_or(DesignationError::Missing { target, intent })?;
        match entry.claimed_by {
            Some(other) if other != worker => Err(DesignationError::Claimed {
                target,
                worker: other,
            }),
            _ => {
                entry.claimed_by = Some(worker);
                Ok(())
            }
        }
    }

    /// Drop a worker's claim so the entry can be picked up again.
    pub fn unclaim(&self, target: ThingId, intent: IntentKind, worker: WorkerId) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(&(target, intent.group())) {
            if entry.intent == intent && entry.claimed_by == Some(worker) {
                entry.claimed_by = None;
            }
        }
    }
}

fn check_eligible<W: WorldAccess + ?Sized>(
    world: &W,
    target: ThingId,
    intent: IntentKind,
) -> Result<(), DesignationError> {
    let ineligible = |why| DesignationError::Ineligible {
        target,
        intent,
        why,
    };
    let thing = world.thing(target).ok_or_else(|| ineligible("it no longer exists"))?;
    if thing.faction != Faction::Player {
        return Err(ineligible("it is not owned by the player"));
    }
    let def = world
        .defs()
        .get(&thing.def_name)
        .ok_or_else(|| ineligible("its definition is missing"))?;

    match intent {
        IntentKind::Upgrade => {
            let link = def.upgrade.as_ref().ok_or_else(|| ineligible("it has no upgrade"))?;
            if let Some(project) = &link.research_prerequisite {
                if !world.is_research_complete(project) {
                    return Err(DesignationError::ResearchLocked {
                        intent,
                        project: project.clone(),
                    });
                }
            }
        }
        IntentKind::Downgrade => {
            if def.downgrade.is_none() {
                return Err(ineligible("it has no downgrade"));
            }
        }
        IntentKind::IncreaseQuality(variant) => {
            if QualityVariant::for_category(def.category) != Some(variant) {
                return Err(ineligible("wrong kind of thing"));
            }
            match thing.quality {
                None => return Err(ineligible("it has no quality")),
                Some(q) if q.is_ceiling() => return Err(ineligible("it is already legendary")),
                Some(_) => {}
            }
        }
    }
    Ok(())
}
