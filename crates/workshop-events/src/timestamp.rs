//! Simulation Timestamp Types
//!
//! Tick counter plus a human-readable colony clock.
//!
//! # Example
//!
//! ```
//! use workshop_events::SimTimestamp;
//!
//! let ts = SimTimestamp::from_tick(62_500);
//! assert_eq!(ts.tick, 62_500);
//! assert_eq!(ts.clock(), "day_2.hour_01");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Number of ticks per simulated day.
pub const TICKS_PER_DAY: u64 = 60_000;

/// Number of ticks per simulated hour.
pub const TICKS_PER_HOUR: u64 = TICKS_PER_DAY / 24;

/// A point in simulation time.
///
/// Serializes as `{"tick": N, "clock": "day_D.hour_HH"}`. The clock is derived
/// from the tick and only exists for people reading the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SimTimestamp {
    /// Monotonically increasing simulation tick.
    pub tick: u64,
}

impl SimTimestamp {
    pub fn from_tick(tick: u64) -> Self {
        Self { tick }
    }

    /// Timestamp for the start of the simulation.
    pub fn start() -> Self {
        Self { tick: 0 }
    }

    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Day number, starting at 1.
    pub fn day(&self) -> u64 {
        self.tick / TICKS_PER_DAY + 1
    }

    /// Hour of the day, 0..24.
    pub fn hour(&self) -> u8 {
        ((self.tick % TICKS_PER_DAY) / TICKS_PER_HOUR) as u8
    }

    pub fn clock(&self) -> String {
        format!("day_{}.hour_{:02}", self.day(), self.hour())
    }
}

impl fmt::Display for SimTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (tick {})", self.clock(), self.tick)
    }
}

#[derive(Serialize, Deserialize)]
struct TimestampRepr {
    tick: u64,
    #[serde(default)]
    clock: Option<String>,
}

impl Serialize for SimTimestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        TimestampRepr {
            tick: self.tick,
            clock: Some(self.clock()),
        }
        .serialize(serializer)
    }
}

// The clock is redundant on input; only the tick is authoritative.
impl<'de> Deserialize<'de> for SimTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = TimestampRepr::deserialize(deserializer)?;
        Ok(Self { tick: repr.tick })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_at_start() {
        let ts = SimTimestamp::start();
        assert_eq!(ts.day(), 1);
        assert_eq!(ts.hour(), 0);
        assert_eq!(ts.clock(), "day_1.hour_00");
    }

    #[test]
    fn test_clock_rolls_over_days() {
        let ts = SimTimestamp::from_tick(TICKS_PER_DAY * 2 + TICKS_PER_HOUR * 13 + 5);
        assert_eq!(ts.day(), 3);
        assert_eq!(ts.hour(), 13);
    }

    #[test]
    fn test_serialization_includes_clock() {
        let ts = SimTimestamp::from_tick(62_500);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, r#"{"tick":62500,"clock":"day_2.hour_01"}"#);
    }

    #[test]
    fn test_deserialization_ignores_stale_clock() {
        let json = r#"{"tick":10,"clock":"day_9.hour_09"}"#;
        let ts: SimTimestamp = serde_json::from_str(json).unwrap();
        assert_eq!(ts.tick, 10);
        assert_eq!(ts.clock(), "day_1.hour_00");
    }
}
