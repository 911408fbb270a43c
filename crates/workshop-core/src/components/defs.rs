//! Thing Definitions
//!
//! Static, data-driven descriptions of what kinds of things exist and how
//! they can be modified.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A resource kind and an amount of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceCount {
    pub resource: String,
    pub count: u32,
}

impl ResourceCount {
    pub fn new(resource: impl Into<String>, count: u32) -> Self {
        Self {
            resource: resource.into(),
            count,
        }
    }
}

/// Broad category, which decides how quality work is done on a thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThingCategory {
    Building,
    Workstation,
    Apparel,
    Weapon,
    Art,
    Item,
    Resource,
}

/// Link from one def to its upgraded or downgraded counterpart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModificationDef {
    /// Def the thing turns into
    pub linked_def: String,
    /// Extra resources hauled in before labor starts
    #[serde(default)]
    pub additional_resources: Vec<ResourceCount>,
    /// Resources dropped after the replacement is placed
    #[serde(default)]
    pub refunded_resources: Vec<ResourceCount>,
    /// Research that must be finished before the modification can be designated
    #[serde(default)]
    pub research_prerequisite: Option<String>,
}

/// Definition of a kind of thing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingDef {
    pub def_name: String,
    pub category: ThingCategory,
    #[serde(default)]
    pub made_from_stuff: bool,
    /// Stuff units needed to build one, when made from stuff
    #[serde(default)]
    pub cost_stuff_count: u32,
    /// Fixed construction cost, when not made from stuff
    #[serde(default)]
    pub cost_list: Vec<ResourceCount>,
    /// Number of units a single craft produces; 0 or 1 means unbatched
    #[serde(default)]
    pub bulk_recipe_count: u32,
    /// Workstation defs that can craft (and therefore rework) this thing
    #[serde(default)]
    pub recipe_users: Vec<String>,
    #[serde(default)]
    pub work_to_build: f32,
    #[serde(default)]
    pub work_to_make: f32,
    pub max_hit_points: i32,
    #[serde(default)]
    pub has_quality: bool,
    /// Workstations keep a production task queue
    #[serde(default)]
    pub has_task_queue: bool,
    #[serde(default)]
    pub connects_to_power: bool,
    /// Most units that can be carried or stacked at once
    #[serde(default = "default_stack_limit")]
    pub stack_limit: u32,
    #[serde(default)]
    pub upgrade: Option<ModificationDef>,
    #[serde(default)]
    pub downgrade: Option<ModificationDef>,
}

fn default_stack_limit() -> u32 {
    75
}

impl ThingDef {
    pub fn new(def_name: impl Into<String>, category: ThingCategory) -> Self {
        Self {
            def_name: def_name.into(),
            category,
            made_from_stuff: false,
            cost_stuff_count: 0,
            cost_list: Vec::new(),
            bulk_recipe_count: 0,
            recipe_users: Vec::new(),
            work_to_build: 0.0,
            work_to_make: 0.0,
            max_hit_points: 100,
            has_quality: false,
            has_task_queue: false,
            connects_to_power: false,
            stack_limit: default_stack_limit(),
            upgrade: None,
            downgrade: None,
        }
    }

    /// Raw resource def: stacks up to `stack_limit`.
    pub fn resource(def_name: impl Into<String>, stack_limit: u32) -> Self {
        Self {
            stack_limit,
            ..Self::new(def_name, ThingCategory::Resource)
        }
    }

    /// Whether quality work on this def happens at a workstation rather than in place.
    pub fn is_crafted(&self) -> bool {
        matches!(
            self.category,
            ThingCategory::Apparel | ThingCategory::Weapon | ThingCategory::Art | ThingCategory::Item
        )
    }

    /// Bulk multiplier applied to material requirements.
    pub fn bulk_multiplier(&self) -> u32 {
        self.bulk_recipe_count.max(1)
    }
}

/// Resource: Registry of all thing definitions
#[derive(Resource, Debug, Default, Clone)]
pub struct DefDatabase {
    defs: HashMap<String, ThingDef>,
}

impl DefDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any previous one with the same name
    pub fn register(&mut self, def: ThingDef) {
        self.defs.insert(def.def_name.clone(), def);
    }

    pub fn get(&self, def_name: &str) -> Option<&ThingDef> {
        self.defs.get(def_name)
    }

    pub fn contains(&self, def_name: &str) -> bool {
        self.defs.contains_key(def_name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Stack limit for a resource kind, falling back to the default for unknown kinds
    pub fn stack_limit(&self, resource: &str) -> u32 {
        self.get(resource)
            .map(|def| def.stack_limit)
            .unwrap_or_else(default_stack_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_multiplier_floor() {
        let mut def = ThingDef::new("arrow", ThingCategory::Item);
        assert_eq!(def.bulk_multiplier(), 1);
        def.bulk_recipe_count = 10;
        assert_eq!(def.bulk_multiplier(), 10);
    }

    #[test]
    fn test_crafted_categories() {
        assert!(ThingDef::new("parka", ThingCategory::Apparel).is_crafted());
        assert!(ThingDef::new("statue", ThingCategory::Art).is_crafted());
        assert!(!ThingDef::new("door", ThingCategory::Building).is_crafted());
        assert!(!ThingDef::new("stove", ThingCategory::Workstation).is_crafted());
    }

    #[test]
    fn test_stack_limit_lookup() {
        let mut db = DefDatabase::new();
        db.register(ThingDef::resource("steel", 75));
        db.register(ThingDef::resource("component", 25));
        assert_eq!(db.stack_limit("component"), 25);
        assert_eq!(db.stack_limit("unknown"), 75);
    }

    #[test]
    fn test_modification_def_from_toml() {
        let def: ModificationDef = toml::from_str(
            r#"
            linked_def = "electric_stove"
            research_prerequisite = "electricity"
            additional_resources = [{ resource = "component", count = 2 }]
            "#,
        )
        .unwrap();
        assert_eq!(def.linked_def, "electric_stove");
        assert_eq!(def.additional_resources, vec![ResourceCount::new("component", 2)]);
        assert!(def.refunded_resources.is_empty());
    }
}
