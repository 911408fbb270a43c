//! World Components
//!
//! In-memory world used by the headless runner and the tests. Implements
//! [`WorldAccess`] with grid movement, reachability and power conduits.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use workshop_events::Severity;

use crate::components::defs::DefDatabase;
use crate::components::quality::Quality;
use crate::components::thing::{Position, Rotation, Thing, ThingId};
use crate::components::worker::{SkillKind, Worker, WorkerId};
use crate::environment::{Destination, WorldAccess};

/// A message shown to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub tick: u64,
    pub worker: WorkerId,
    pub message: String,
    pub severity: Severity,
}

/// Resource: Current state of the world
#[derive(Resource, Debug, Default)]
pub struct SimWorld {
    /// Current simulation tick
    pub current_tick: u64,
    defs: DefDatabase,
    things: BTreeMap<ThingId, Thing>,
    workers: BTreeMap<WorkerId, Worker>,
    /// Cells no worker can path to
    blocked: HashSet<Position>,
    /// Cells carrying power conduits
    conduits: HashSet<Position>,
    completed_research: HashSet<String>,
    notifications: Vec<Notification>,
    next_thing_id: u64,
}

impl SimWorld {
    pub fn new(defs: DefDatabase) -> Self {
        Self {
            defs,
            next_thing_id: 1,
            ..Default::default()
        }
    }

    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    pub fn defs_mut(&mut self) -> &mut DefDatabase {
        &mut self.defs
    }

    /// Allocate an id for a thing that is about to be spawned
    pub fn next_id(&mut self) -> ThingId {
        let id = ThingId(self.next_thing_id.max(1));
        self.next_thing_id = id.0 + 1;
        id
    }

    /// Insert a thing. Ids handed out later never collide with it.
    pub fn add_thing(&mut self, thing: Thing) -> ThingId {
        let id = thing.id;
        self.next_thing_id = self.next_thing_id.max(id.0 + 1);
        self.things.insert(id, thing);
        id
    }

    pub fn add_worker(&mut self, worker: Worker) -> WorkerId {
        let id = worker.id;
        self.workers.insert(id, worker);
        id
    }

    pub fn thing_mut(&mut self, id: ThingId) -> Option<&mut Thing> {
        self.things.get_mut(&id)
    }

    pub fn worker_mut(&mut self, id: WorkerId) -> Option<&mut Worker> {
        self.workers.get_mut(&id)
    }

    pub fn workers(&self) -> impl Iterator<Item = &Worker> {
        self.workers.values()
    }

    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.workers.keys().copied().collect()
    }

    pub fn things(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }

    pub fn set_forbidden(&mut self, id: ThingId, forbidden: bool) {
        if let Some(thing) = self.things.get_mut(&id) {
            thing.forbidden = forbidden;
        }
    }

    pub fn set_burning(&mut self, id: ThingId, burning: bool) {
        if let Some(thing) = self.things.get_mut(&id) {
            thing.burning = burning;
        }
    }

    pub fn block_cell(&mut self, position: Position) {
        self.blocked.insert(position);
    }

    pub fn unblock_cell(&mut self, position: Position) {
        self.blocked.remove(&position);
    }

    pub fn add_conduit(&mut self, position: Position) {
        self.conduits.insert(position);
    }

    pub fn complete_research(&mut self, project: impl Into<String>) {
        self.completed_research.insert(project.into());
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn destination_position(&self, destination: Destination) -> Option<Position> {
        match destination {
            Destination::Thing(id) => self.things.get(&id).map(|t| t.position),
            Destination::Cell(position) => Some(position),
        }
    }
}

impl WorldAccess for SimWorld {
    fn defs(&self) -> &DefDatabase {
        &self.defs
    }

    fn thing(&self, id: ThingId) -> Option<&Thing> {
        self.things.get(&id)
    }

    fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.workers.get(&id)
    }

    fn things_of_def(&self, def_name: &str) -> Vec<ThingId> {
        self.things
            .values()
            .filter(|t| t.def_name == def_name)
            .map(|t| t.id)
            .collect()
    }

    fn can_reach(&self, worker: WorkerId, position: Position) -> bool {
        self.workers.contains_key(&worker) && !self.blocked.contains(&position)
    }

    fn travel_to(&mut self, worker: WorkerId, destination: Destination) -> bool {
        let Some(goal) = self.destination_position(destination) else {
            return false;
        };
        if !self.can_reach(worker, goal) {
            return false;
        }
        let Some(actor) = self.workers.get_mut(&worker) else {
            return false;
        };

        for _ in 0..actor.move_speed.max(1) {
            if actor.position.is_touching(&goal) {
                break;
            }
            actor.position = actor.position.step_toward(&goal);
        }
        actor.position.is_touching(&goal)
    }

    fn write_quality(&mut self, thing: ThingId, quality: Quality) {
        if let Some(thing) = self.things.get_mut(&thing) {
            thing.quality = Some(quality);
        }
    }

    fn set_hit_points(&mut self, thing: ThingId, hit_points: i32) {
        if let Some(thing) = self.things.get_mut(&thing) {
            thing.hit_points = hit_points;
        }
    }

    fn spawn_replacement(
        &mut self,
        def_name: &str,
        stuff: Option<&str>,
        position: Position,
        rotation: Rotation,
    ) -> Option<ThingId> {
        let def = self.defs.get(def_name)?.clone();
        let id = self.next_id();
        let mut thing = Thing::new(id, def_name, position)
            .with_rotation(rotation)
            .with_hit_points(def.max_hit_points);
        if def.made_from_stuff {
            thing.stuff = stuff.map(str::to_string);
        }
        self.things.insert(id, thing);
        Some(id)
    }

    fn destroy_thing(&mut self, thing: ThingId) -> bool {
        self.things.remove(&thing).is_some()
    }

    fn move_thing(&mut self, thing: ThingId, position: Position) {
        if let Some(thing) = self.things.get_mut(&thing) {
            thing.position = position;
        }
    }

    fn set_task_queue(&mut self, thing: ThingId, tasks: Vec<String>) {
        if let Some(thing) = self.things.get_mut(&thing) {
            thing.task_queue = tasks;
        }
    }

    fn connect_to_grid(&mut self, thing: ThingId) -> bool {
        let Some(thing) = self.things.get_mut(&thing) else {
            return false;
        };
        let connected = self.conduits.iter().any(|c| c.is_touching(&thing.position));
        thing.grid_connected = connected;
        connected
    }

    fn grant_experience(&mut self, worker: WorkerId, skill: SkillKind, amount: f32) {
        if let Some(worker) = self.workers.get_mut(&worker) {
            worker.skills.entry(skill).or_default().learn(amount);
        }
    }

    fn report_outcome(&mut self, worker: WorkerId, message: &str, severity: Severity) {
        tracing::info!(%worker, ?severity, "{}", message);
        self.notifications.push(Notification {
            tick: self.current_tick,
            worker,
            message: message.to_string(),
            severity,
        });
    }

    fn is_research_complete(&self, project: &str) -> bool {
        self.completed_research.contains(project)
    }

    fn placement_cell(&self, site: ThingId) -> Option<Position> {
        self.things
            .get(&site)
            .map(|t| Position::new(t.position.x, t.position.z - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::defs::{ThingCategory, ThingDef};
    use crate::environment::ThingStatus;

    fn world_with_door() -> (SimWorld, ThingId, WorkerId) {
        let mut defs = DefDatabase::new();
        let mut door = ThingDef::new("door", ThingCategory::Building);
        door.made_from_stuff = true;
        door.max_hit_points = 160;
        defs.register(door);

        let mut world = SimWorld::new(defs);
        let id = world.next_id();
        let door = world.add_thing(Thing::new(id, "door", Position::new(5, 0)).with_stuff("wood"));
        let worker = world.add_worker(Worker::new(WorkerId(1), "Ada", Position::new(0, 0)));
        (world, door, worker)
    }

    #[test]
    fn test_travel_takes_multiple_ticks() {
        let (mut world, door, worker) = world_with_door();
        let mut ticks = 0;
        while !world.travel_to(worker, Destination::Thing(door)) {
            ticks += 1;
            assert!(ticks < 10, "worker never arrived");
        }
        assert_eq!(ticks, 3);
        assert_eq!(world.worker(worker).unwrap().position, Position::new(4, 0));
    }

    #[test]
    fn test_blocked_target_is_unreachable() {
        let (mut world, door, worker) = world_with_door();
        world.block_cell(Position::new(5, 0));
        assert_eq!(world.status(door, worker), ThingStatus::Unreachable);
        assert!(!world.travel_to(worker, Destination::Thing(door)));
    }

    #[test]
    fn test_status_reports_forbidden_and_destroyed() {
        let (mut world, door, worker) = world_with_door();
        world.set_forbidden(door, true);
        assert_eq!(world.status(door, worker), ThingStatus::Forbidden);
        world.destroy_thing(door);
        assert_eq!(world.status(door, worker), ThingStatus::Destroyed);
    }

    #[test]
    fn test_spawn_keeps_stuff_only_for_stuff_defs() {
        let (mut world, _, _) = world_with_door();
        world.defs_mut().register(ThingDef::new("autodoor", ThingCategory::Building));
        let plain = world
            .spawn_replacement("autodoor", Some("wood"), Position::new(1, 1), Rotation::East)
            .unwrap();
        assert_eq!(world.thing(plain).unwrap().stuff, None);
        assert_eq!(world.thing(plain).unwrap().rotation, Rotation::East);

        let stuffed = world
            .spawn_replacement("door", Some("steel"), Position::new(2, 2), Rotation::North)
            .unwrap();
        assert_eq!(world.thing(stuffed).unwrap().stuff.as_deref(), Some("steel"));
        assert_eq!(world.thing(stuffed).unwrap().hit_points, 160);

        assert!(world
            .spawn_replacement("unknown", None, Position::default(), Rotation::North)
            .is_none());
    }

    #[test]
    fn test_grid_connection_needs_adjacent_conduit() {
        let (mut world, door, _) = world_with_door();
        assert!(!world.connect_to_grid(door));
        world.add_conduit(Position::new(5, 1));
        assert!(world.connect_to_grid(door));
        assert!(world.thing(door).unwrap().grid_connected);
    }

    #[test]
    fn test_experience_levels_skill() {
        let (mut world, _, worker) = world_with_door();
        world.grant_experience(worker, SkillKind::Crafting, 1500.0);
        assert_eq!(world.skill_level(worker, SkillKind::Crafting), 1);
    }
}
