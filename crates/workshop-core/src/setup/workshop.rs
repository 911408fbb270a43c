//! Workshop Setup
//!
//! Builds the demo base: definitions, buildings, items, stockpiles, workers
//! and a first round of designations.

use crate::components::defs::{DefDatabase, ModificationDef, ResourceCount, ThingCategory, ThingDef};
use crate::components::quality::Quality;
use crate::components::thing::{Position, Rotation, Thing, ThingId};
use crate::components::worker::{SkillKind, WorkType, Worker, WorkerId};
use crate::components::world::SimWorld;
use crate::systems::designation::{DesignationRegistry, IntentKind, QualityVariant};
use crate::systems::ledger::ResourceLedger;

const WORKER_NAMES: [&str; 6] = ["Ada", "Bram", "Cora", "Dov", "Esme", "Finn"];

/// Shared state produced by the setup, ready to be inserted as resources.
#[derive(Debug)]
pub struct Workshop {
    pub world: SimWorld,
    pub ledger: ResourceLedger,
    pub designations: DesignationRegistry,
}

/// Definitions used by the demo base
pub fn create_def_database() -> DefDatabase {
    let mut defs = DefDatabase::new();

    for (name, limit) in [("steel", 75), ("wood", 75), ("cloth", 75), ("marble", 75), ("component", 25)] {
        defs.register(ThingDef::resource(name, limit));
    }

    // === STOVES ===
    let mut fueled = ThingDef::new("fueled_stove", ThingCategory::Workstation);
    fueled.cost_list = vec![ResourceCount::new("steel", 80)];
    fueled.work_to_build = 1000.0;
    fueled.has_task_queue = true;
    fueled.upgrade = Some(ModificationDef {
        linked_def: "electric_stove".into(),
        additional_resources: vec![ResourceCount::new("component", 3)],
        refunded_resources: Vec::new(),
        research_prerequisite: Some("electricity".into()),
    });
    defs.register(fueled);

    let mut electric = ThingDef::new("electric_stove", ThingCategory::Workstation);
    electric.cost_list = vec![ResourceCount::new("steel", 80), ResourceCount::new("component", 3)];
    electric.work_to_build = 1200.0;
    electric.has_task_queue = true;
    electric.connects_to_power = true;
    electric.downgrade = Some(ModificationDef {
        linked_def: "fueled_stove".into(),
        refunded_resources: vec![ResourceCount::new("component", 3)],
        ..Default::default()
    });
    defs.register(electric);

    // === DOORS ===
    let mut door = ThingDef::new("door", ThingCategory::Building);
    door.made_from_stuff = true;
    door.cost_stuff_count = 25;
    door.work_to_build = 850.0;
    door.max_hit_points = 160;
    door.has_quality = true;
    door.upgrade = Some(ModificationDef {
        linked_def: "autodoor".into(),
        additional_resources: vec![ResourceCount::new("steel", 40), ResourceCount::new("component", 2)],
        ..Default::default()
    });
    defs.register(door);

    let mut autodoor = ThingDef::new("autodoor", ThingCategory::Building);
    autodoor.made_from_stuff = true;
    autodoor.cost_stuff_count = 25;
    autodoor.work_to_build = 1100.0;
    autodoor.max_hit_points = 160;
    autodoor.has_quality = true;
    autodoor.connects_to_power = true;
    autodoor.downgrade = Some(ModificationDef {
        linked_def: "door".into(),
        refunded_resources: vec![ResourceCount::new("component", 2)],
        ..Default::default()
    });
    defs.register(autodoor);

    // === FURNITURE ===
    let mut armchair = ThingDef::new("armchair", ThingCategory::Building);
    armchair.made_from_stuff = true;
    armchair.cost_stuff_count = 110;
    armchair.work_to_build = 2500.0;
    armchair.max_hit_points = 140;
    armchair.has_quality = true;
    defs.register(armchair);

    // === CRAFTING ===
    let mut bench = ThingDef::new("tailoring_bench", ThingCategory::Workstation);
    bench.cost_list = vec![ResourceCount::new("steel", 50), ResourceCount::new("wood", 75)];
    bench.work_to_build = 2000.0;
    bench.has_task_queue = true;
    defs.register(bench);

    let mut parka = ThingDef::new("parka", ThingCategory::Apparel);
    parka.made_from_stuff = true;
    parka.cost_stuff_count = 80;
    parka.recipe_users = vec!["tailoring_bench".into()];
    parka.work_to_make = 1800.0;
    parka.max_hit_points = 200;
    parka.has_quality = true;
    defs.register(parka);

    let mut table = ThingDef::new("sculpting_table", ThingCategory::Workstation);
    table.cost_list = vec![ResourceCount::new("wood", 60)];
    table.work_to_build = 1500.0;
    defs.register(table);

    let mut sculpture = ThingDef::new("small_sculpture", ThingCategory::Art);
    sculpture.made_from_stuff = true;
    sculpture.cost_stuff_count = 50;
    sculpture.recipe_users = vec!["sculpting_table".into()];
    sculpture.work_to_make = 1500.0;
    sculpture.max_hit_points = 90;
    sculpture.has_quality = true;
    defs.register(sculpture);

    defs
}

/// Create the demo base with `worker_count` workers (capped at six)
pub fn create_workshop(worker_count: usize) -> Workshop {
    let mut world = SimWorld::new(create_def_database());
    world.complete_research("electricity");

    world.add_thing(
        Thing::new(ThingId(1), "fueled_stove", Position::new(10, 5))
            .with_rotation(Rotation::South)
            .with_task_queue(vec!["simple meal x4".into(), "pemmican x10".into()]),
    );
    world.add_conduit(Position::new(11, 5));
    world.add_thing(
        Thing::new(ThingId(2), "door", Position::new(4, 10))
            .with_stuff("wood")
            .with_quality(Quality::Normal)
            .with_hit_points(140),
    );
    world.add_thing(
        Thing::new(ThingId(3), "autodoor", Position::new(6, 10))
            .with_stuff("steel")
            .with_quality(Quality::Good)
            .with_hit_points(160),
    );
    world.add_thing(
        Thing::new(ThingId(4), "armchair", Position::new(12, 12))
            .with_stuff("wood")
            .with_quality(Quality::Poor)
            .with_hit_points(120),
    );
    world.add_thing(Thing::new(ThingId(5), "tailoring_bench", Position::new(20, 4)));
    world.add_thing(
        Thing::new(ThingId(6), "parka", Position::new(15, 2))
            .with_stuff("cloth")
            .with_quality(Quality::Normal)
            .with_hit_points(180),
    );
    world.add_thing(Thing::new(ThingId(7), "sculpting_table", Position::new(22, 10)));
    world.add_thing(
        Thing::new(ThingId(8), "small_sculpture", Position::new(18, 12))
            .with_stuff("marble")
            .with_quality(Quality::Awful)
            .with_hit_points(90),
    );

    for i in 0..worker_count.min(WORKER_NAMES.len()) {
        let step = i as u32;
        let mut worker = Worker::new(WorkerId(i as u64 + 1), WORKER_NAMES[i], Position::new(2 + i as i32, 3))
            .with_skill(SkillKind::Construction, (8 + step * 3).min(20))
            .with_skill(SkillKind::Crafting, (6 + step * 2).min(20))
            .with_skill(SkillKind::Artistic, (4 + step * 4).min(20))
            .with_priority(WorkType::Construction, 3)
            .with_priority(WorkType::Crafting, 2);
        // Every third worker cannot craft at all
        if i % 3 == 2 {
            worker = worker.with_disabled(WorkType::Crafting);
        }
        world.add_worker(worker);
    }

    let ledger = create_stockpiles();
    let designations = DesignationRegistry::new();
    designate_demo_work(&world, &designations);

    Workshop {
        world,
        ledger,
        designations,
    }
}

/// Stockpile zone along the west edge of the base
pub fn create_stockpiles() -> ResourceLedger {
    let ledger = ResourceLedger::new();
    ledger.add_stack("steel", 75, Position::new(0, 0));
    ledger.add_stack("steel", 75, Position::new(1, 0));
    ledger.add_stack("steel", 40, Position::new(2, 0));
    ledger.add_stack("wood", 75, Position::new(0, 2));
    ledger.add_stack("wood", 75, Position::new(1, 2));
    ledger.add_stack("component", 25, Position::new(0, 4));
    ledger.add_stack("cloth", 75, Position::new(0, 6));
    ledger.add_stack("cloth", 75, Position::new(1, 6));
    ledger.add_stack("marble", 75, Position::new(0, 8));
    ledger
}

fn designate_demo_work(world: &SimWorld, designations: &DesignationRegistry) {
    let plan = [
        (ThingId(1), IntentKind::Upgrade),
        (ThingId(2), IntentKind::Upgrade),
        (ThingId(3), IntentKind::Downgrade),
        (ThingId(4), IntentKind::IncreaseQuality(QualityVariant::Building)),
        (ThingId(6), IntentKind::IncreaseQuality(QualityVariant::Apparel)),
        (ThingId(8), IntentKind::IncreaseQuality(QualityVariant::Art)),
    ];
    for (target, intent) in plan {
        if let Err(e) = designations.designate_checked(world, target, intent) {
            tracing::warn!("demo designation skipped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::WorldAccess;

    #[test]
    fn test_workshop_creation() {
        let workshop = create_workshop(3);
        assert_eq!(workshop.world.workers().count(), 3);
        assert_eq!(workshop.world.things().count(), 8);
        assert_eq!(workshop.designations.len(), 6);
        assert_eq!(workshop.ledger.total("steel"), 190);
    }

    #[test]
    fn test_worker_count_is_capped() {
        let workshop = create_workshop(50);
        assert_eq!(workshop.world.workers().count(), WORKER_NAMES.len());
    }

    #[test]
    fn test_every_link_resolves() {
        let defs = create_def_database();
        let world = SimWorld::new(defs.clone());
        for name in ["fueled_stove", "electric_stove", "door", "autodoor"] {
            let def = world.defs().get(name).unwrap();
            for link in [&def.upgrade, &def.downgrade].into_iter().flatten() {
                assert!(defs.contains(&link.linked_def), "{name} links to missing def");
            }
        }
    }
}
