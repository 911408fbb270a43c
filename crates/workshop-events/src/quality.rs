//! Quality Ladder
//!
//! The fixed seven-rung quality scale shared by the engine and event readers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality tier of a thing. Ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Awful,
    Poor,
    Normal,
    Good,
    Excellent,
    Masterwork,
    Legendary,
}

impl Quality {
    /// Every tier in ascending order.
    pub const ALL: [Quality; 7] = [
        Quality::Awful,
        Quality::Poor,
        Quality::Normal,
        Quality::Good,
        Quality::Excellent,
        Quality::Masterwork,
        Quality::Legendary,
    ];

    /// Position on the ladder, Awful = 0.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The next tier up, or `None` at Legendary.
    pub fn step_up(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// The next tier down, or `None` at Awful.
    pub fn step_down(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn is_ceiling(self) -> bool {
        self == Quality::Legendary
    }

    pub fn is_floor(self) -> bool {
        self == Quality::Awful
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Awful => "awful",
            Quality::Poor => "poor",
            Quality::Normal => "normal",
            Quality::Good => "good",
            Quality::Excellent => "excellent",
            Quality::Masterwork => "masterwork",
            Quality::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
