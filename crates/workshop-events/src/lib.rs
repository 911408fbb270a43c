//! Shared event and value types for the workshop simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! The engine emits [`WorkEvent`]s; downstream tools only need this crate
//! to read the JSONL event stream back.

pub mod event;
pub mod quality;
pub mod timestamp;

pub use timestamp::{SimTimestamp, TICKS_PER_DAY, TICKS_PER_HOUR};

pub use quality::Quality;

pub use event::*;
