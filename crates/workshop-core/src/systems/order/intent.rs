//! Per-intent behavior of a work order.
//!
//! One order type runs every intent; what differs is which def the target
//! becomes, what is hauled in beforehand and what is dropped afterwards.

use crate::components::defs::{ModificationDef, ResourceCount, ThingDef};
use crate::components::thing::Thing;
use crate::systems::requirement::RequirementResolver;

pub trait ModifyStrategy: Sync {
    /// Def the target is replaced by. `None` means the target is worked in place.
    fn replacement_def<'a>(&self, def: &'a ThingDef) -> Option<&'a str>;

    /// Resources to gather before labor. `None` when the target has no path.
    fn additional_resources(
        &self,
        def: &ThingDef,
        thing: &Thing,
        resolver: &RequirementResolver,
    ) -> Option<Vec<ResourceCount>>;

    /// Resources dropped at the target once the work is done.
    fn refunded_resources(&self, def: &ThingDef) -> Vec<ResourceCount>;
}

pub struct UpgradeStrategy;

pub struct DowngradeStrategy;

pub struct QualityStrategy;

fn linked_resources(link: Option<&ModificationDef>) -> Option<Vec<ResourceCount>> {
    link.map(|l| {
        l.additional_resources
            .iter()
            .filter(|r| r.count > 0)
            .cloned()
            .collect()
    })
}

impl ModifyStrategy for UpgradeStrategy {
    fn replacement_def<'a>(&self, def: &'a ThingDef) -> Option<&'a str> {
        def.upgrade.as_ref().map(|l| l.linked_def.as_str())
    }

    fn additional_resources(
        &self,
        def: &ThingDef,
        _thing: &Thing,
        _resolver: &RequirementResolver,
    ) -> Option<Vec<ResourceCount>> {
        linked_resources(def.upgrade.as_ref())
    }

    fn refunded_resources(&self, def: &ThingDef) -> Vec<ResourceCount> {
        def.upgrade
            .as_ref()
            .map(|l| l.refunded_resources.clone())
            .unwrap_or_default()
    }
}

impl ModifyStrategy for DowngradeStrategy {
    fn replacement_def<'a>(&self, def: &'a ThingDef) -> Option<&'a str> {
        def.downgrade.as_ref().map(|l| l.linked_def.as_str())
    }

    fn additional_resources(
        &self,
        def: &ThingDef,
        _thing: &Thing,
        _resolver: &RequirementResolver,
    ) -> Option<Vec<ResourceCount>> {
        linked_resources(def.downgrade.as_ref())
    }

    fn refunded_resources(&self, def: &ThingDef) -> Vec<ResourceCount> {
        def.downgrade
            .as_ref()
            .map(|l| l.refunded_resources.clone())
            .unwrap_or_default()
    }
}

impl ModifyStrategy for QualityStrategy {
    fn replacement_def<'a>(&self, _def: &'a ThingDef) -> Option<&'a str> {
        None
    }

    fn additional_resources(
        &self,
        def: &ThingDef,
        thing: &Thing,
        resolver: &RequirementResolver,
    ) -> Option<Vec<ResourceCount>> {
        resolver.resolve(def, thing).map(|r| vec![r])
    }

    fn refunded_resources(&self, _def: &ThingDef) -> Vec<ResourceCount> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::defs::ThingCategory;
    use crate::components::quality::Quality;
    use crate::components::thing::{Position, ThingId};
    use crate::config::QualityTuning;

    fn door() -> ThingDef {
        let mut def = ThingDef::new("autodoor", ThingCategory::Building);
        def.downgrade = Some(ModificationDef {
            linked_def: "door".into(),
            refunded_resources: vec![ResourceCount::new("component", 2)],
            ..Default::default()
        });
        def
    }

    #[test]
    fn test_downgrade_links_and_refunds() {
        let def = door();
        let thing = Thing::new(ThingId(1), "autodoor", Position::default());
        let resolver = RequirementResolver::new(QualityTuning::default().material_scalars);

        assert_eq!(DowngradeStrategy.replacement_def(&def), Some("door"));
        assert_eq!(
            DowngradeStrategy.additional_resources(&def, &thing, &resolver),
            Some(vec![])
        );
        assert_eq!(
            DowngradeStrategy.refunded_resources(&def),
            vec![ResourceCount::new("component", 2)]
        );
        assert_eq!(UpgradeStrategy.replacement_def(&def), None);
        assert_eq!(UpgradeStrategy.additional_resources(&def, &thing, &resolver), None);
    }

    #[test]
    fn test_quality_works_in_place() {
        let mut def = ThingDef::new("armchair", ThingCategory::Building);
        def.made_from_stuff = true;
        def.cost_stuff_count = 10;
        let thing = Thing::new(ThingId(1), "armchair", Position::default())
            .with_stuff("wood")
            .with_quality(Quality::Poor);
        let resolver = RequirementResolver::new(QualityTuning::default().material_scalars);

        assert_eq!(QualityStrategy.replacement_def(&def), None);
        assert_eq!(
            QualityStrategy.additional_resources(&def, &thing, &resolver),
            Some(vec![ResourceCount::new("wood", 6)])
        );
        assert!(QualityStrategy.refunded_resources(&def).is_empty());
    }
}
