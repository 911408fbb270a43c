//! Quality Components
//!
//! Re-exports the shared quality ladder and adds creation-time quality.

use rand::Rng;

pub use workshop_events::Quality;

/// Quality a worker of the given skill level produces when building something new.
///
/// The skill picks a centre tier; a draw then shifts it one step down (20%) or
/// up (10%). Legendary is never produced this way.
pub fn quality_created_by_skill<R: Rng + ?Sized>(skill_level: u32, rng: &mut R) -> Quality {
    let centre = match skill_level {
        0..=2 => Quality::Awful,
        3..=5 => Quality::Poor,
        6..=9 => Quality::Normal,
        10..=13 => Quality::Good,
        14..=17 => Quality::Excellent,
        _ => Quality::Masterwork,
    };

    let roll: f32 = rng.gen();
    let shifted = if roll < 0.2 {
        centre.step_down()
    } else if roll >= 0.9 {
        centre.step_up()
    } else {
        Some(centre)
    };

    match shifted {
        Some(Quality::Legendary) | None => centre,
        Some(quality) => quality,
    }
}
