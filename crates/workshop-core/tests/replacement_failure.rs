//! Finalize against a world that refuses to spawn replacements
//!
//! The order must abort with the original thing untouched and every
//! hauled unit back in the ledger.

mod common;

use common::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use workshop_core::config::Tuning;
use workshop_core::events::TickEvents;
use workshop_core::systems::{
    try_assign, AbortReason, DesignationRegistry, IntentKind, Phase, ResourceLedger, TaskStateMachine,
    WorkContext,
};
use workshop_core::{
    DefDatabase, Destination, Position, Quality, Rotation, SimWorld, SkillKind, Thing, ThingId, Worker,
    WorkerId, WorldAccess,
};
use workshop_events::Severity;

/// Delegates to a `SimWorld` but never manages to spawn anything.
struct NoSpawnWorld(SimWorld);

impl WorldAccess for NoSpawnWorld {
    fn defs(&self) -> &DefDatabase {
        self.0.defs()
    }

    fn thing(&self, id: ThingId) -> Option<&Thing> {
        self.0.thing(id)
    }

    fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.0.worker(id)
    }

    fn things_of_def(&self, def_name: &str) -> Vec<ThingId> {
        self.0.things_of_def(def_name)
    }

    fn can_reach(&self, worker: WorkerId, position: Position) -> bool {
        self.0.can_reach(worker, position)
    }

    fn travel_to(&mut self, worker: WorkerId, destination: Destination) -> bool {
        self.0.travel_to(worker, destination)
    }

    fn write_quality(&mut self, thing: ThingId, quality: Quality) {
        self.0.write_quality(thing, quality)
    }

    fn set_hit_points(&mut self, thing: ThingId, hit_points: i32) {
        self.0.set_hit_points(thing, hit_points)
    }

    fn spawn_replacement(
        &mut self,
        _def_name: &str,
        _stuff: Option<&str>,
        _position: Position,
        _rotation: Rotation,
    ) -> Option<ThingId> {
        None
    }

    fn destroy_thing(&mut self, thing: ThingId) -> bool {
        self.0.destroy_thing(thing)
    }

    fn move_thing(&mut self, thing: ThingId, position: Position) {
        self.0.move_thing(thing, position)
    }

    fn set_task_queue(&mut self, thing: ThingId, tasks: Vec<String>) {
        self.0.set_task_queue(thing, tasks)
    }

    fn connect_to_grid(&mut self, thing: ThingId) -> bool {
        self.0.connect_to_grid(thing)
    }

    fn grant_experience(&mut self, worker: WorkerId, skill: SkillKind, amount: f32) {
        self.0.grant_experience(worker, skill, amount)
    }

    fn report_outcome(&mut self, worker: WorkerId, message: &str, severity: Severity) {
        self.0.report_outcome(worker, message, severity)
    }

    fn is_research_complete(&self, project: &str) -> bool {
        self.0.is_research_complete(project)
    }

    fn placement_cell(&self, site: ThingId) -> Option<Position> {
        self.0.placement_cell(site)
    }
}

struct Rig {
    world: NoSpawnWorld,
    ledger: ResourceLedger,
    designations: DesignationRegistry,
    tuning: Tuning,
    rng: SmallRng,
    events: TickEvents,
}

impl Rig {
    fn new() -> Self {
        Self {
            world: NoSpawnWorld(small_base()),
            ledger: ResourceLedger::new(),
            designations: DesignationRegistry::new(),
            tuning: Tuning::default(),
            rng: SmallRng::seed_from_u64(7),
            events: TickEvents::new(),
        }
    }

    fn ctx(&mut self) -> WorkContext<'_, NoSpawnWorld> {
        WorkContext {
            world: &mut self.world,
            ledger: &self.ledger,
            designations: &self.designations,
            tuning: &self.tuning,
            rng: &mut self.rng,
            events: &mut self.events,
        }
    }

    fn run(&mut self, machine: &mut TaskStateMachine, max_ticks: u32) {
        for _ in 0..max_ticks {
            if machine.is_terminal() {
                return;
            }
            self.world.0.advance_tick();
            self.events.set_tick(self.world.0.current_tick);
            machine.tick(&mut self.ctx());
        }
        panic!("order still {} after {max_ticks} ticks", machine.phase().name());
    }
}

#[test]
fn test_failed_spawn_leaves_target_and_returns_resources() {
    let mut rig = Rig::new();
    stock(&rig.ledger);

    rig.designations.designate(DOOR, IntentKind::Upgrade).unwrap();
    let entry = rig.designations.get(DOOR, IntentKind::Upgrade).unwrap();
    let order = try_assign(&mut rig.ctx(), &entry, ADA).unwrap();

    let mut machine = TaskStateMachine::new(order);
    rig.run(&mut machine, 5_000);

    let order = machine.into_order();
    assert!(
        matches!(order.phase, Phase::Aborted { reason: AbortReason::DataIntegrity(_) }),
        "unexpected phase {:?}",
        order.phase
    );
    assert!(order.accounting.is_balanced());
    assert!(order.placed.is_empty());

    // The door is still standing, exactly as it was before the labor.
    let door = rig.world.thing(DOOR).expect("door destroyed by a failed upgrade");
    assert_eq!(door.def_name, "door");
    assert_eq!(door.quality, Some(Quality::Normal));
    assert_eq!(door.hit_points, 150);
    assert_eq!(rig.world.things_of_def("autodoor"), vec![AUTODOOR]);

    // Hauled steel and components are back on the floor, nothing lost.
    assert_eq!(rig.ledger.total("steel"), 75);
    assert_eq!(rig.ledger.total("component"), 25);
    assert_eq!(rig.ledger.outstanding_reservations(), 0);

    assert!(rig.designations.get(DOOR, IntentKind::Upgrade).is_none());
}

#[test]
fn test_failed_spawn_on_downgrade_keeps_refund_back() {
    let mut rig = Rig::new();

    rig.designations.designate(AUTODOOR, IntentKind::Downgrade).unwrap();
    let entry = rig.designations.get(AUTODOOR, IntentKind::Downgrade).unwrap();
    let order = try_assign(&mut rig.ctx(), &entry, BRAM).unwrap();

    let mut machine = TaskStateMachine::new(order);
    rig.run(&mut machine, 5_000);

    assert!(matches!(
        machine.phase(),
        Phase::Aborted { reason: AbortReason::DataIntegrity(_) }
    ));
    assert!(rig.world.thing(AUTODOOR).is_some());
    assert!(rig.world.things_of_def("door").contains(&DOOR));
    assert_eq!(rig.world.things_of_def("door").len(), 1);
    assert_eq!(rig.ledger.total("component"), 0);
}
