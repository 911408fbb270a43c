//! Configuration System
//!
//! Loads tuning parameters from tuning.toml for easy adjustment without recompiling.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::components::quality::Quality;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize tuning: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration structure
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default)]
    pub quality: QualityTuning,
    #[serde(default)]
    pub labor: LaborTuning,
    #[serde(default)]
    pub simulation: SimulationTuning,
}

/// One value per tier that can still be raised. Legendary has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityTable {
    pub awful: f32,
    pub poor: f32,
    pub normal: f32,
    pub good: f32,
    pub excellent: f32,
    pub masterwork: f32,
}

impl QualityTable {
    pub fn get(&self, quality: Quality) -> Option<f32> {
        match quality {
            Quality::Awful => Some(self.awful),
            Quality::Poor => Some(self.poor),
            Quality::Normal => Some(self.normal),
            Quality::Good => Some(self.good),
            Quality::Excellent => Some(self.excellent),
            Quality::Masterwork => Some(self.masterwork),
            Quality::Legendary => None,
        }
    }

    pub fn set(&mut self, quality: Quality, value: f32) {
        match quality {
            Quality::Awful => self.awful = value,
            Quality::Poor => self.poor = value,
            Quality::Normal => self.normal = value,
            Quality::Good => self.good = value,
            Quality::Excellent => self.excellent = value,
            Quality::Masterwork => self.masterwork = value,
            Quality::Legendary => {}
        }
    }
}

/// Quality roll and material parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityTuning {
    /// Base chance to raise quality from each tier at the normalizer skill level
    pub success_chances: QualityTable,
    /// Base chance to drop quality from each tier
    pub fail_chances: QualityTable,
    /// Fraction of the original material cost needed to work from each tier
    pub material_scalars: QualityTable,
    /// Skill level at which the success table applies unscaled
    pub skill_level_normalizer: f32,
    pub skill_ceiling: f32,
    /// Extra failure chance at skill 0, shrinking linearly to 0 at the ceiling
    pub fail_skill_weight: f32,
    /// Fraction of max durability restored or lost on neutral/failure
    pub durability_step: f32,
    pub success_xp_per_tier: f32,
    pub neutral_xp_per_tier: f32,
    pub failure_xp_per_tier: f32,
}

impl Default for QualityTuning {
    fn default() -> Self {
        Self {
            success_chances: QualityTable {
                awful: 0.95,
                poor: 0.9,
                normal: 0.85,
                good: 0.6,
                excellent: 0.25,
                masterwork: 0.15,
            },
            fail_chances: QualityTable {
                awful: 0.0,
                poor: 0.02,
                normal: 0.07,
                good: 0.12,
                excellent: 0.19,
                masterwork: 0.25,
            },
            material_scalars: QualityTable {
                awful: 0.2,
                poor: 0.6,
                normal: 0.9,
                good: 1.25,
                excellent: 2.0,
                masterwork: 3.0,
            },
            skill_level_normalizer: 14.0,
            skill_ceiling: 20.0,
            fail_skill_weight: 0.15,
            durability_step: 0.1,
            success_xp_per_tier: 80.0,
            neutral_xp_per_tier: 50.0,
            failure_xp_per_tier: 40.0,
        }
    }
}

/// Labor phase parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborTuning {
    /// Work removed per tick is the worker's speed stat times this
    pub speed_multiplier: f32,
    /// Skill experience per labor tick before the learning factor
    pub learn_per_tick: f32,
    pub min_build_work: f32,
    pub max_build_work: f32,
}

impl Default for LaborTuning {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.3,
            learn_per_tick: 0.08,
            min_build_work: 20.0,
            max_build_work: 3000.0,
        }
    }
}

/// Headless runner parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationTuning {
    pub default_ticks: u64,
    pub default_seed: u64,
    pub workers: usize,
    /// Ticks between attempts to hand idle workers new orders
    pub assign_interval: u64,
}

impl Default for SimulationTuning {
    fn default() -> Self {
        Self {
            default_ticks: 5000,
            default_seed: 42,
            workers: 3,
            assign_interval: 250,
        }
    }
}

impl Tuning {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_TUNING_PATH));
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", path.display(), e);
            Self::default()
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_tables() {
        let tuning = Tuning::default();
        assert_eq!(tuning.quality.success_chances.get(Quality::Normal), Some(0.85));
        assert_eq!(tuning.quality.fail_chances.get(Quality::Awful), Some(0.0));
        assert_eq!(tuning.quality.material_scalars.get(Quality::Poor), Some(0.6));
        assert_eq!(tuning.quality.material_scalars.get(Quality::Legendary), None);
        assert_eq!(tuning.labor.speed_multiplier, 1.3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let tuning = Tuning::from_str(
            r#"
            [quality]
            skill_level_normalizer = 20.0

            [labor]
            speed_multiplier = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(tuning.quality.skill_level_normalizer, 20.0);
        assert_eq!(tuning.quality.skill_ceiling, 20.0);
        assert_eq!(tuning.quality.success_chances.get(Quality::Good), Some(0.6));
        assert_eq!(tuning.labor.speed_multiplier, 2.0);
        assert_eq!(tuning.labor.max_build_work, 3000.0);
        assert_eq!(tuning.simulation.default_seed, 42);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut tuning = Tuning::default();
        tuning.quality.success_chances.set(Quality::Excellent, 0.4);
        let text = tuning.to_toml().unwrap();
        let parsed = Tuning::from_str(&text).unwrap();
        assert_eq!(parsed.quality.success_chances.get(Quality::Excellent), Some(0.4));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let err = Tuning::from_str("[quality\nbroken").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[simulation]\ndefault_ticks = 12").unwrap();
        let tuning = Tuning::from_file(file.path()).unwrap();
        assert_eq!(tuning.simulation.default_ticks, 12);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let tuning = Tuning::load_or_default(Some(&dir.path().join("absent.toml")));
        assert_eq!(tuning.simulation.workers, 3);
    }
}
