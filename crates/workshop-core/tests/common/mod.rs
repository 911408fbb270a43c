//! Shared fixtures for the integration tests

#![allow(dead_code)]

use rand::rngs::SmallRng;
use rand::SeedableRng;

use workshop_core::config::Tuning;
use workshop_core::events::TickEvents;
use workshop_core::setup::create_def_database;
use workshop_core::systems::{DesignationRegistry, ResourceLedger, TaskStateMachine, WorkContext};
use workshop_core::{Position, Quality, SimWorld, SkillKind, Thing, ThingId, WorkType, Worker, WorkerId};

pub const ADA: WorkerId = WorkerId(1);
pub const BRAM: WorkerId = WorkerId(2);
pub const DOOR: ThingId = ThingId(10);
pub const AUTODOOR: ThingId = ThingId(11);
pub const ARMCHAIR: ThingId = ThingId(12);
pub const PARKA: ThingId = ThingId(13);
pub const BENCH: ThingId = ThingId(14);

/// Everything an order needs, owned in one place.
pub struct Harness {
    pub world: SimWorld,
    pub ledger: ResourceLedger,
    pub designations: DesignationRegistry,
    pub tuning: Tuning,
    pub rng: SmallRng,
    pub events: TickEvents,
}

impl Harness {
    pub fn new(world: SimWorld) -> Self {
        Self {
            world,
            ledger: ResourceLedger::new(),
            designations: DesignationRegistry::new(),
            tuning: Tuning::default(),
            rng: SmallRng::seed_from_u64(42),
            events: TickEvents::new(),
        }
    }

    pub fn ctx(&mut self) -> WorkContext<'_, SimWorld> {
        WorkContext {
            world: &mut self.world,
            ledger: &self.ledger,
            designations: &self.designations,
            tuning: &self.tuning,
            rng: &mut self.rng,
            events: &mut self.events,
        }
    }

    /// Tick once, advancing the clock first.
    pub fn step(&mut self, machine: &mut TaskStateMachine) {
        self.world.advance_tick();
        self.events.set_tick(self.world.current_tick);
        machine.tick(&mut self.ctx());
    }

    /// Tick until the order finishes. Returns the ticks taken.
    pub fn run(&mut self, machine: &mut TaskStateMachine, max_ticks: u32) -> u32 {
        for taken in 0..max_ticks {
            if machine.is_terminal() {
                return taken;
            }
            self.step(machine);
        }
        panic!("order still {} after {max_ticks} ticks", machine.phase().name());
    }

    /// Tick until `done` holds for the order, without finishing it.
    pub fn run_until(
        &mut self,
        machine: &mut TaskStateMachine,
        max_ticks: u32,
        done: impl Fn(&TaskStateMachine) -> bool,
    ) {
        for _ in 0..max_ticks {
            if done(machine) {
                return;
            }
            self.step(machine);
        }
        panic!("condition not reached, order is {}", machine.phase().name());
    }
}

pub fn builder(id: WorkerId, name: &str, position: Position) -> Worker {
    Worker::new(id, name, position)
        .with_skill(SkillKind::Construction, 10)
        .with_skill(SkillKind::Crafting, 10)
        .with_skill(SkillKind::Artistic, 10)
        .with_priority(WorkType::Construction, 3)
        .with_priority(WorkType::Crafting, 3)
}

/// Two workers, a wooden door, an autodoor, an armchair and a parka
/// with a tailoring bench.
pub fn small_base() -> SimWorld {
    let mut world = SimWorld::new(create_def_database());
    world.complete_research("electricity");
    world.add_worker(builder(ADA, "Ada", Position::new(0, 0)));
    world.add_worker(builder(BRAM, "Bram", Position::new(0, 1)));

    world.add_thing(
        Thing::new(DOOR, "door", Position::new(6, 0))
            .with_stuff("wood")
            .with_quality(Quality::Normal)
            .with_hit_points(150),
    );
    world.add_thing(
        Thing::new(AUTODOOR, "autodoor", Position::new(8, 4))
            .with_stuff("steel")
            .with_quality(Quality::Good)
            .with_hit_points(160),
    );
    world.add_thing(
        Thing::new(ARMCHAIR, "armchair", Position::new(4, 6))
            .with_stuff("wood")
            .with_quality(Quality::Poor)
            .with_hit_points(100),
    );
    world.add_thing(
        Thing::new(PARKA, "parka", Position::new(3, 3))
            .with_stuff("cloth")
            .with_quality(Quality::Normal)
            .with_hit_points(150),
    );
    world.add_thing(Thing::new(BENCH, "tailoring_bench", Position::new(10, 2)));
    world
}

/// Stocks steel, component, wood and cloth near the origin.
pub fn stock(ledger: &ResourceLedger) {
    ledger.add_stack("steel", 75, Position::new(2, 0));
    ledger.add_stack("component", 25, Position::new(3, 0));
    ledger.add_stack("wood", 75, Position::new(0, 3));
    ledger.add_stack("cloth", 75, Position::new(1, 4));
}
