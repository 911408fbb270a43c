//! World Components
//!
//! Things, definitions, workers and the in-memory world that holds them.

pub mod defs;
pub mod quality;
pub mod thing;
pub mod worker;
pub mod world;

pub use defs::*;
pub use quality::*;
pub use thing::*;
pub use worker::*;
pub use world::*;
