//! Requirement Resolution
//!
//! Works out how much material raising a thing's quality by one tier costs.

use crate::components::defs::{ResourceCount, ThingDef};
use crate::components::quality::Quality;
use crate::components::thing::Thing;
use crate::config::QualityTable;

/// Computes quality-increase material costs from a tier scalar table.
#[derive(Debug, Clone)]
pub struct RequirementResolver {
    material_scalars: QualityTable,
}

impl RequirementResolver {
    pub fn new(material_scalars: QualityTable) -> Self {
        Self { material_scalars }
    }

    /// Material needed to attempt the next quality tier of `thing`.
    ///
    /// `None` when the thing is not made from a material, its quality cannot be
    /// read, or it is already Legendary.
    pub fn resolve(&self, def: &ThingDef, thing: &Thing) -> Option<ResourceCount> {
        let quality = thing.quality?;
        if quality.is_ceiling() {
            return None;
        }
        let stuff = thing.stuff.as_deref().filter(|_| def.made_from_stuff)?;

        let (resource, base) = base_cost(def, stuff)?;
        let scalar = self.material_scalars.get(quality)?;
        let quantity = scaled_quantity(base, def.bulk_multiplier(), scalar);

        Some(ResourceCount::new(resource, quantity))
    }

    /// Scalar for a tier, exposed for UI previews
    pub fn scalar(&self, quality: Quality) -> Option<f32> {
        self.material_scalars.get(quality)
    }
}

/// Largest single entry of the cost list (first on ties), or the stuff cost.
fn base_cost<'a>(def: &'a ThingDef, stuff: &'a str) -> Option<(&'a str, u32)> {
    if def.cost_list.is_empty() {
        return Some((stuff, def.cost_stuff_count));
    }

    let mut best: Option<&ResourceCount> = None;
    for entry in &def.cost_list {
        if best.map_or(true, |b| entry.count > b.count) {
            best = Some(entry);
        }
    }
    best.map(|b| (b.resource.as_str(), b.count))
}

/// `ceil(base * bulk * scalar)`, never below 1.
///
/// The product is computed in f64 and nudged down by a small epsilon before
/// rounding up, so `10 * 0.6` lands on 6 instead of 7 from float noise.
pub fn scaled_quantity(base: u32, bulk: u32, scalar: f32) -> u32 {
    let raw = f64::from(base) * f64::from(bulk.max(1)) * f64::from(scalar);
    let rounded = (raw - 1e-4).ceil();
    if rounded < 1.0 {
        1
    } else {
        rounded as u32
    }
}
