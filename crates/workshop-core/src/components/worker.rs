//! Worker Components
//!
//! Skills, work settings and stats of the actors that carry out work orders.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::components::thing::Position;

/// Experience needed per skill level.
pub const XP_PER_LEVEL: f32 = 1000.0;

/// Highest reachable skill level.
pub const MAX_SKILL_LEVEL: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker_{:03}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Construction,
    Crafting,
    Artistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Construction,
    Crafting,
}

impl WorkType {
    pub fn gerund(&self) -> &'static str {
        match self {
            WorkType::Construction => "constructing",
            WorkType::Crafting => "crafting",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gerund())
    }
}

/// Stats looked up through the world interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Work needed to build a thing in place
    WorkToBuild,
    /// Work needed to craft a thing at a workstation
    WorkToMake,
    ConstructionSpeed,
    WorkSpeedGlobal,
    LearningFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkillRecord {
    pub level: u32,
    /// Experience accumulated toward the next level
    pub xp: f32,
}

impl SkillRecord {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(MAX_SKILL_LEVEL),
            xp: 0.0,
        }
    }

    /// Add experience, levelling up every `XP_PER_LEVEL`. Returns levels gained.
    pub fn learn(&mut self, amount: f32) -> u32 {
        if amount <= 0.0 {
            return 0;
        }
        self.xp += amount;
        let mut gained = 0;
        while self.xp >= XP_PER_LEVEL {
            self.xp -= XP_PER_LEVEL;
            if self.level < MAX_SKILL_LEVEL {
                self.level += 1;
                gained += 1;
            }
        }
        gained
    }
}

/// An actor that can be bound to one work order at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub position: Position,
    pub skills: HashMap<SkillKind, SkillRecord>,
    /// Priority per work type; 0 means not assigned
    pub work_priorities: HashMap<WorkType, u8>,
    /// Work types this worker is incapable of
    pub disabled_work: HashSet<WorkType>,
    /// Units of a single resource kind carried per trip
    pub carry_capacity: u32,
    /// Cells moved per tick
    pub move_speed: u32,
    pub construction_speed: f32,
    pub work_speed_global: f32,
    pub learning_factor: f32,
}

impl Worker {
    pub fn new(id: WorkerId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            skills: HashMap::new(),
            work_priorities: HashMap::new(),
            disabled_work: HashSet::new(),
            carry_capacity: 75,
            move_speed: 1,
            construction_speed: 1.0,
            work_speed_global: 1.0,
            learning_factor: 1.0,
        }
    }

    pub fn with_skill(mut self, skill: SkillKind, level: u32) -> Self {
        self.skills.insert(skill, SkillRecord::new(level));
        self
    }

    pub fn with_priority(mut self, work_type: WorkType, priority: u8) -> Self {
        self.work_priorities.insert(work_type, priority);
        self
    }

    pub fn with_disabled(mut self, work_type: WorkType) -> Self {
        self.disabled_work.insert(work_type);
        self.work_priorities.remove(&work_type);
        self
    }

    pub fn with_carry_capacity(mut self, capacity: u32) -> Self {
        self.carry_capacity = capacity;
        self
    }

    pub fn skill_level(&self, skill: SkillKind) -> u32 {
        self.skills.get(&skill).map(|s| s.level).unwrap_or(0)
    }

    pub fn priority(&self, work_type: WorkType) -> u8 {
        if self.disabled_work.contains(&work_type) {
            return 0;
        }
        self.work_priorities.get(&work_type).copied().unwrap_or(0)
    }

    pub fn is_disabled(&self, work_type: WorkType) -> bool {
        self.disabled_work.contains(&work_type)
    }

    pub fn stat(&self, stat: StatKind) -> f32 {
        match stat {
            StatKind::ConstructionSpeed => self.construction_speed,
            StatKind::WorkSpeedGlobal => self.work_speed_global,
            StatKind::LearningFactor => self.learning_factor,
            StatKind::WorkToBuild | StatKind::WorkToMake => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_learning_levels_up() {
        let mut record = SkillRecord::new(4);
        assert_eq!(record.learn(2500.0), 2);
        assert_eq!(record.level, 6);
        assert!((record.xp - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_skill_level_is_capped() {
        let mut record = SkillRecord::new(MAX_SKILL_LEVEL);
        assert_eq!(record.learn(5000.0), 0);
        assert_eq!(record.level, MAX_SKILL_LEVEL);
        assert_eq!(SkillRecord::new(99).level, MAX_SKILL_LEVEL);
    }

    #[test]
    fn test_disabled_work_has_no_priority() {
        let worker = Worker::new(WorkerId(1), "Ada", Position::default())
            .with_priority(WorkType::Crafting, 3)
            .with_disabled(WorkType::Construction);
        assert_eq!(worker.priority(WorkType::Crafting), 3);
        assert_eq!(worker.priority(WorkType::Construction), 0);
        assert!(worker.is_disabled(WorkType::Construction));
    }

    #[test]
    fn test_missing_skill_reads_zero() {
        let worker = Worker::new(WorkerId(2), "Bo", Position::default());
        assert_eq!(worker.skill_level(SkillKind::Artistic), 0);
    }
}
