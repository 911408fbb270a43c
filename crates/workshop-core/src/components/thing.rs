//! Thing Components
//!
//! Identity, placement and mutable state of objects in the world.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::components::quality::Quality;

/// Stable identity of a thing (building, item, workstation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThingId(pub u64);

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thing_{:04}", self.0)
    }
}

/// Grid cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn manhattan(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }

    /// Touching means the same or an orthogonally adjacent cell.
    pub fn is_touching(&self, other: &Position) -> bool {
        self.manhattan(other) <= 1
    }

    /// One step toward `goal`, x axis first.
    pub fn step_toward(&self, goal: &Position) -> Position {
        if self.x != goal.x {
            Position::new(self.x + (goal.x - self.x).signum(), self.z)
        } else if self.z != goal.z {
            Position::new(self.x, self.z + (goal.z - self.z).signum())
        } else {
            *self
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    North,
    East,
    South,
    West,
}

/// Who owns a thing. Only player things can be designated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    #[default]
    Player,
    Neutral,
}

/// A concrete object in the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing {
    pub id: ThingId,
    /// Definition name, looked up in the def database
    pub def_name: String,
    /// Material the thing is made from, if any
    pub stuff: Option<String>,
    /// `None` when the def has no quality or the data is corrupt
    pub quality: Option<Quality>,
    pub hit_points: i32,
    pub position: Position,
    pub rotation: Rotation,
    pub faction: Faction,
    pub forbidden: bool,
    pub burning: bool,
    /// Pending production tasks held by workstations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_queue: Vec<String>,
    /// Set when the thing has been connected to a power grid
    #[serde(default)]
    pub grid_connected: bool,
}

impl Thing {
    pub fn new(id: ThingId, def_name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            def_name: def_name.into(),
            stuff: None,
            quality: None,
            hit_points: 100,
            position,
            rotation: Rotation::North,
            faction: Faction::Player,
            forbidden: false,
            burning: false,
            task_queue: Vec::new(),
            grid_connected: false,
        }
    }

    pub fn with_stuff(mut self, stuff: impl Into<String>) -> Self {
        self.stuff = Some(stuff.into());
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_hit_points(mut self, hit_points: i32) -> Self {
        self.hit_points = hit_points;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_task_queue(mut self, tasks: Vec<String>) -> Self {
        self.task_queue = tasks;
        self
    }

    /// Label like "steel door (good)".
    pub fn label(&self) -> String {
        let base = match &self.stuff {
            Some(stuff) => format!("{} {}", stuff, self.def_name),
            None => self.def_name.clone(),
        };
        match self.quality {
            Some(quality) => format!("{} ({})", base, quality),
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_and_touching() {
        let a = Position::new(0, 0);
        let b = Position::new(3, -4);
        assert_eq!(a.manhattan(&b), 7);
        assert!(a.is_touching(&Position::new(0, 1)));
        assert!(!a.is_touching(&Position::new(1, 1)));
    }

    #[test]
    fn test_step_toward_reaches_goal() {
        let goal = Position::new(2, -1);
        let mut pos = Position::new(0, 0);
        for _ in 0..3 {
            pos = pos.step_toward(&goal);
        }
        assert_eq!(pos, goal);
        assert_eq!(pos.step_toward(&goal), goal);
    }

    #[test]
    fn test_label() {
        let door = Thing::new(ThingId(1), "door", Position::default())
            .with_stuff("steel")
            .with_quality(Quality::Good);
        assert_eq!(door.label(), "steel door (good)");
    }
}
