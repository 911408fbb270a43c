//! Workshop Simulation Engine Library
//!
//! Work-order lifecycle engine: designations are matched to workers, who
//! gather reserved resources, labor at the target and apply an upgrade,
//! downgrade or quality roll when done.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

pub mod components;
pub mod config;
pub mod environment;
pub mod events;
pub mod setup;
pub mod systems;

pub use components::*;

pub use config::{ConfigError, Tuning};
pub use environment::{Destination, ThingStatus, WorldAccess};
pub use setup::{create_workshop, init_world, Workshop};

/// Seeded random number generator resource
#[derive(Resource)]
pub struct SimRng(pub SmallRng);
