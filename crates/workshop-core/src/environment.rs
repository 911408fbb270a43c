//! World Interface
//!
//! The narrow surface through which the engine observes and mutates the
//! surrounding simulation. Movement, rendering and storage live behind it.

use workshop_events::Severity;

use crate::components::defs::{DefDatabase, ThingDef};
use crate::components::quality::Quality;
use crate::components::thing::{Position, Rotation, Thing, ThingId};
use crate::components::worker::{SkillKind, StatKind, Worker, WorkerId};

/// Where a worker is asked to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Thing(ThingId),
    Cell(Position),
}

/// Whether a thing can currently be worked on by a given worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThingStatus {
    Available,
    Destroyed,
    Forbidden,
    Burning,
    Unreachable,
}

impl ThingStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, ThingStatus::Available)
    }
}

/// Operations the engine needs from the world it runs in.
pub trait WorldAccess {
    fn defs(&self) -> &DefDatabase;

    fn thing(&self, id: ThingId) -> Option<&Thing>;

    fn worker(&self, id: WorkerId) -> Option<&Worker>;

    /// Ids of every live thing with the given def, in spawn order
    fn things_of_def(&self, def_name: &str) -> Vec<ThingId>;

    fn can_reach(&self, worker: WorkerId, position: Position) -> bool;

    /// Advance the worker toward the destination. Returns true once touching it.
    fn travel_to(&mut self, worker: WorkerId, destination: Destination) -> bool;

    fn write_quality(&mut self, thing: ThingId, quality: Quality);

    fn set_hit_points(&mut self, thing: ThingId, hit_points: i32);

    /// Create a new thing of `def_name` at the given spot. `None` if the def is unknown.
    fn spawn_replacement(
        &mut self,
        def_name: &str,
        stuff: Option<&str>,
        position: Position,
        rotation: Rotation,
    ) -> Option<ThingId>;

    /// Remove a thing from the world. Returns false if it was already gone.
    fn destroy_thing(&mut self, thing: ThingId) -> bool;

    /// Set a thing down at a new cell (used when hauling an item to a workstation)
    fn move_thing(&mut self, thing: ThingId, position: Position);

    fn set_task_queue(&mut self, thing: ThingId, tasks: Vec<String>);

    /// Hook the thing up to adjacent power infrastructure. Returns true if connected.
    fn connect_to_grid(&mut self, thing: ThingId) -> bool;

    fn grant_experience(&mut self, worker: WorkerId, skill: SkillKind, amount: f32);

    /// Fire-and-forget notification for the player.
    fn report_outcome(&mut self, worker: WorkerId, message: &str, severity: Severity);

    fn is_research_complete(&self, project: &str) -> bool;

    /// Cell next to `site` where hauled resources are set down
    fn placement_cell(&self, site: ThingId) -> Option<Position>;

    fn thing_def(&self, id: ThingId) -> Option<&ThingDef> {
        self.thing(id).and_then(|t| self.defs().get(&t.def_name))
    }

    /// `None` when the thing is gone or carries no readable quality
    fn read_quality(&self, id: ThingId) -> Option<Quality> {
        self.thing(id).and_then(|t| t.quality)
    }

    fn thing_stat(&self, id: ThingId, stat: StatKind) -> f32 {
        match (self.thing_def(id), stat) {
            (Some(def), StatKind::WorkToBuild) => def.work_to_build,
            (Some(def), StatKind::WorkToMake) => def.work_to_make,
            _ => 0.0,
        }
    }

    fn worker_stat(&self, worker: WorkerId, stat: StatKind) -> f32 {
        self.worker(worker).map(|w| w.stat(stat)).unwrap_or(0.0)
    }

    fn skill_level(&self, worker: WorkerId, skill: SkillKind) -> u32 {
        self.worker(worker).map(|w| w.skill_level(skill)).unwrap_or(0)
    }

    fn status(&self, id: ThingId, worker: WorkerId) -> ThingStatus {
        let Some(thing) = self.thing(id) else {
            return ThingStatus::Destroyed;
        };
        if thing.forbidden {
            ThingStatus::Forbidden
        } else if thing.burning {
            ThingStatus::Burning
        } else if !self.can_reach(worker, thing.position) {
            ThingStatus::Unreachable
        } else {
            ThingStatus::Available
        }
    }
}
