//! Outcome Engine
//!
//! Rolls the result of a finished quality increase and applies it to the
//! target: quality step, durability change and experience.

use rand::{Rng, RngCore};
use thiserror::Error;

use workshop_events::RollBand;

use crate::components::quality::Quality;
use crate::components::thing::ThingId;
use crate::components::worker::{SkillKind, WorkerId};
use crate::config::QualityTuning;
use crate::environment::WorldAccess;

/// Probabilities for one roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollChances {
    pub success: f32,
    pub fail: f32,
}

impl RollChances {
    /// Success chance for display, clamped to [0, 1]
    pub fn display_success(&self) -> f32 {
        self.success.clamp(0.0, 1.0)
    }
}

/// What a roll did to the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollOutcome {
    pub band: RollBand,
    pub from: Quality,
    pub to: Quality,
    pub chances: RollChances,
    pub roll: f32,
    pub hit_points: i32,
    pub experience: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutcomeError {
    #[error("quality of {0} cannot be read")]
    QualityUnreadable(ThingId),
    #[error("definition of {0} is missing")]
    MissingDef(ThingId),
    #[error("{0} is already legendary")]
    AtCeiling(ThingId),
}

/// Pick the band for draw `r`. The success band is checked first, so with a
/// zero fail chance everything outside it is neutral.
pub fn classify(chances: RollChances, r: f32) -> RollBand {
    if r < chances.success {
        RollBand::Success
    } else if r < chances.success + chances.fail {
        RollBand::Failure
    } else {
        RollBand::Neutral
    }
}

#[derive(Debug, Clone)]
pub struct OutcomeEngine {
    tuning: QualityTuning,
}

impl OutcomeEngine {
    pub fn new(tuning: QualityTuning) -> Self {
        Self { tuning }
    }

    /// Chances for working on a `quality` thing at `skill_level`. `None` at Legendary.
    pub fn chances(&self, quality: Quality, skill_level: u32) -> Option<RollChances> {
        let t = &self.tuning;
        let skill = skill_level as f32;
        let success = t.success_chances.get(quality)? * (skill / t.skill_level_normalizer.max(f32::EPSILON));
        let fail = if quality.is_floor() {
            0.0
        } else {
            let ceiling = t.skill_ceiling.max(f32::EPSILON);
            t.fail_chances.get(quality)? + ((ceiling - skill) / ceiling) * t.fail_skill_weight
        };
        Some(RollChances { success, fail })
    }

    /// Draw from `rng` and apply the result.
    pub fn roll<W: WorldAccess + ?Sized>(
        &self,
        world: &mut W,
        worker: WorkerId,
        target: ThingId,
        skill: SkillKind,
        rng: &mut dyn RngCore,
    ) -> Result<RollOutcome, OutcomeError> {
        let r: f32 = rng.gen();
        self.apply(world, worker, target, skill, r)
    }

    /// Apply the outcome for a known draw `r`.
    ///
    /// Nothing is written to the world unless every read succeeds.
    pub fn apply<W: WorldAccess + ?Sized>(
        &self,
        world: &mut W,
        worker: WorkerId,
        target: ThingId,
        skill: SkillKind,
        r: f32,
    ) -> Result<RollOutcome, OutcomeError> {
        let from = world
            .read_quality(target)
            .ok_or(OutcomeError::QualityUnreadable(target))?;
        let max_hp = world
            .thing_def(target)
            .map(|d| d.max_hit_points)
            .ok_or(OutcomeError::MissingDef(target))?;
        let hit_points = world.thing(target).map(|t| t.hit_points).unwrap_or(max_hp);
        let chances = self
            .chances(from, world.skill_level(worker, skill))
            .ok_or(OutcomeError::AtCeiling(target))?;

        let band = classify(chances, r);
        let step = (max_hp as f32 * self.tuning.durability_step).round() as i32;
        let tier = from.index() as f32;
        let (to, new_hp, experience) = match band {
            RollBand::Success => (
                from.step_up().unwrap_or(from),
                max_hp,
                tier * self.tuning.success_xp_per_tier,
            ),
            RollBand::Failure => (
                from.step_down().unwrap_or(from),
                (hit_points - step).clamp(1, max_hp.max(1)),
                tier * self.tuning.failure_xp_per_tier,
            ),
            RollBand::Neutral => (
                from,
                (hit_points + step).min(max_hp),
                tier * self.tuning.neutral_xp_per_tier,
            ),
        };

        let label = world.thing(target).map(|t| t.label()).unwrap_or_default();
        let name = world
            .worker(worker)
            .map(|w| w.name.clone())
            .unwrap_or_else(|| worker.to_string());

        if to != from {
            world.write_quality(target, to);
        }
        world.set_hit_points(target, new_hp);
        if experience > 0.0 {
            world.grant_experience(worker, skill, experience);
        }

        let percent = (chances.display_success() * 100.0).round();
        let message = match band {
            RollBand::Success => format!("{name} improved {label} to {to} ({percent}% chance)"),
            RollBand::Failure => format!("{name} damaged {label}, now {to} ({percent}% chance)"),
            RollBand::Neutral => format!("{name} could not improve {label} ({percent}% chance)"),
        };
        world.report_outcome(worker, &message, band.severity());

        tracing::debug!(%target, ?band, %from, %to, r, "quality rolled");
        Ok(RollOutcome {
            band,
            from,
            to,
            chances,
            roll: r,
            hit_points: new_hp,
            experience,
        })
    }
}

impl Default for OutcomeEngine {
    fn default() -> Self {
        Self::new(QualityTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::defs::{DefDatabase, ThingCategory, ThingDef};
    use crate::components::thing::{Position, Thing};
    use crate::components::worker::Worker;
    use crate::components::world::SimWorld;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use workshop_events::Severity;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn world(quality: Quality, skill: u32) -> (SimWorld, WorkerId, ThingId) {
        let mut defs = DefDatabase::new();
        let mut chair = ThingDef::new("armchair", ThingCategory::Building);
        chair.made_from_stuff = true;
        chair.max_hit_points = 100;
        defs.register(chair);
        let mut world = SimWorld::new(defs);
        let worker = world.add_worker(
            Worker::new(WorkerId(1), "Ada", Position::new(0, 0))
                .with_skill(SkillKind::Construction, skill),
        );
        let chair = world.add_thing(
            Thing::new(ThingId(1), "armchair", Position::new(1, 0))
                .with_stuff("wood")
                .with_quality(quality)
                .with_hit_points(50),
        );
        (world, worker, chair)
    }

    #[test]
    fn test_band_order() {
        let chances = RollChances {
            success: 0.3,
            fail: 0.2,
        };
        assert_eq!(classify(chances, 0.25), RollBand::Success);
        assert_eq!(classify(chances, 0.45), RollBand::Failure);
        assert_eq!(classify(chances, 0.9), RollBand::Neutral);
        assert_eq!(classify(chances, 0.3), RollBand::Failure);
        assert_eq!(classify(chances, 0.5), RollBand::Neutral);
    }

    #[test]
    fn test_normal_at_normalizer_skill() {
        let engine = OutcomeEngine::default();
        let chances = engine.chances(Quality::Normal, 14).unwrap();
        assert!(close(chances.success, 0.85));
        assert!(close(chances.fail, 0.115));
        assert_eq!(classify(chances, 0.5), RollBand::Success);
    }

    #[test]
    fn test_awful_never_fails() {
        let engine = OutcomeEngine::default();
        let chances = engine.chances(Quality::Awful, 0).unwrap();
        assert_eq!(chances.fail, 0.0);
        assert_eq!(chances.success, 0.0);
        assert_eq!(classify(chances, 0.0), RollBand::Neutral);
    }

    #[test]
    fn test_legendary_has_no_chances() {
        assert!(OutcomeEngine::default().chances(Quality::Legendary, 20).is_none());
    }

    #[test]
    fn test_success_raises_and_repairs() {
        let (mut world, worker, chair) = world(Quality::Normal, 14);
        let outcome = OutcomeEngine::default()
            .apply(&mut world, worker, chair, SkillKind::Construction, 0.5)
            .unwrap();
        assert_eq!(outcome.band, RollBand::Success);
        assert_eq!(world.read_quality(chair), Some(Quality::Good));
        assert_eq!(world.thing(chair).unwrap().hit_points, 100);
        assert!(close(outcome.experience, 160.0));
        assert_eq!(world.notifications()[0].severity, Severity::Positive);
        assert!(world.notifications()[0].message.contains("85%"));
    }

    #[test]
    fn test_failure_lowers_and_damages() {
        let (mut world, worker, chair) = world(Quality::Good, 0);
        let outcome = OutcomeEngine::default()
            .apply(&mut world, worker, chair, SkillKind::Construction, 0.01)
            .unwrap();
        assert_eq!(outcome.band, RollBand::Failure);
        assert_eq!(world.read_quality(chair), Some(Quality::Normal));
        assert_eq!(world.thing(chair).unwrap().hit_points, 40);
        assert!(close(outcome.experience, 120.0));
    }

    #[test]
    fn test_neutral_maintains() {
        let (mut world, worker, chair) = world(Quality::Poor, 10);
        let outcome = OutcomeEngine::default()
            .apply(&mut world, worker, chair, SkillKind::Construction, 0.99)
            .unwrap();
        assert_eq!(outcome.band, RollBand::Neutral);
        assert_eq!(world.read_quality(chair), Some(Quality::Poor));
        assert_eq!(world.thing(chair).unwrap().hit_points, 60);
        assert_eq!(world.notifications()[0].severity, Severity::Neutral);
    }

    #[test]
    fn test_unreadable_quality_mutates_nothing() {
        let (mut world, worker, chair) = world(Quality::Normal, 14);
        world.thing_mut(chair).unwrap().quality = None;
        let err = OutcomeEngine::default()
            .apply(&mut world, worker, chair, SkillKind::Construction, 0.5)
            .unwrap_err();
        assert_eq!(err, OutcomeError::QualityUnreadable(chair));
        assert_eq!(world.thing(chair).unwrap().hit_points, 50);
        assert!(world.notifications().is_empty());
    }

    #[test]
    fn test_roll_is_deterministic_for_seed() {
        let run = |seed| {
            let (mut world, worker, chair) = world(Quality::Normal, 8);
            let mut rng = SmallRng::seed_from_u64(seed);
            OutcomeEngine::default()
                .roll(&mut world, worker, chair, SkillKind::Construction, &mut rng)
                .unwrap()
        };
        assert_eq!(run(7), run(7));
    }
}
