//! World Setup
//!
//! Demo base creation and ECS world initialization.

pub mod workshop;

pub use workshop::*;

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::Tuning;
use crate::events::{EventLogger, TickEvents};
use crate::systems::schedule::ActiveOrders;
use crate::SimRng;

/// Insert every resource the schedule needs into a fresh ECS world.
pub fn init_world(workshop: Workshop, tuning: Tuning, seed: u64, logger: EventLogger) -> World {
    let mut world = World::new();
    world.insert_resource(workshop.world);
    world.insert_resource(workshop.ledger);
    world.insert_resource(workshop.designations);
    world.insert_resource(tuning);
    world.insert_resource(SimRng(SmallRng::seed_from_u64(seed)));
    world.insert_resource(TickEvents::new());
    world.insert_resource(ActiveOrders::new());
    world.insert_resource(logger);
    world
}
