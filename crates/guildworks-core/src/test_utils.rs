//! Shared builders for tests: a small but complete economy with a plain
//! production chain (grain -> flour -> bread) and a composite chain
//! (ore -> iron/copper).

use crate::fixed::{Fixed64, f64_to_fixed64 as fx};
use crate::registry::{RecipeEntry, Registry, RegistryBuilder};
use crate::research::ResearchLedger;
use crate::world::{WorldConfig, WorldState};

/// Build the canonical test registry.
///
/// Resources: grain, flour, bread, ore (composite), iron, copper.
/// Recipes: grow_grain (instant, free), mill_flour, bake_bread, smelt_iron.
/// Buildings: farm, mill, bakery, smelter.
pub fn test_registry() -> Registry {
    let mut b = RegistryBuilder::new();

    let grain = b.register_resource("grain", fx(1000.0), fx(500.0), fx(5000.0));
    let flour = b.register_resource("flour", fx(1500.0), fx(300.0), fx(3000.0));
    let bread = b.register_resource("bread", fx(2500.0), fx(200.0), fx(2000.0));
    let ore = b.register_resource("ore", fx(2000.0), fx(300.0), fx(3000.0));
    let iron = b.register_resource("iron", fx(3500.0), fx(150.0), fx(1500.0));
    let copper = b.register_resource("copper", fx(3000.0), fx(150.0), fx(1500.0));
    b.set_resource_yields("ore", vec![iron, copper]).unwrap();

    let grow_grain = b.register_recipe(
        "grow_grain",
        vec![],
        RecipeEntry {
            resource: grain,
            amount: fx(4.0),
        },
        Fixed64::ZERO,
        Fixed64::ZERO,
    );
    let mill_flour = b.register_recipe(
        "mill_flour",
        vec![RecipeEntry {
            resource: grain,
            amount: fx(2.0),
        }],
        RecipeEntry {
            resource: flour,
            amount: fx(1.0),
        },
        fx(3.0),
        fx(10.0),
    );
    let bake_bread = b.register_recipe(
        "bake_bread",
        vec![RecipeEntry {
            resource: flour,
            amount: fx(2.0),
        }],
        RecipeEntry {
            resource: bread,
            amount: fx(1.0),
        },
        fx(4.0),
        fx(25.0),
    );
    let smelt_iron = b.register_recipe(
        "smelt_iron",
        vec![RecipeEntry {
            resource: ore,
            amount: fx(2.0),
        }],
        RecipeEntry {
            resource: iron,
            amount: fx(1.0),
        },
        fx(5.0),
        fx(35.0),
    );

    b.register_building("farm", vec![grow_grain], fx(100.0));
    b.register_building("mill", vec![mill_flour], fx(250.0));
    b.register_building("bakery", vec![bake_bread], fx(500.0));
    b.register_building("smelter", vec![smelt_iron], fx(600.0));

    b.build().expect("test registry must build")
}

/// A research ledger with every recipe in the registry unlocked.
pub fn researched_ledger(registry: &Registry) -> ResearchLedger {
    let mut ledger = ResearchLedger::new();
    ledger.accrue(fx(1_000_000.0));
    for recipe in registry.recipe_ids() {
        ledger.research(registry, recipe);
    }
    ledger
}

/// The standard test world config: deterministic seed, unit work rate.
pub fn test_config() -> WorldConfig {
    WorldConfig {
        starting_balance: fx(500.0),
        base_work: fx(1.0),
        research_per_researcher: fx(1.0),
        tech_base_cost: fx(50.0),
        seed: 1701,
    }
}

/// A fresh world over the test registry.
pub fn test_world() -> WorldState {
    WorldState::new(test_registry(), test_config())
}

/// A world with a built, researched, selected, and activated mill, running
/// at exactly one mill cycle per tick (base work 3).
pub fn world_with_mill() -> WorldState {
    let mut config = test_config();
    config.base_work = fx(3.0);
    let mut world = WorldState::new(test_registry(), config);

    let mill = world.registry().building_id("mill").unwrap();
    assert!(world.build(mill));
    world.research.accrue(fx(100.0));
    assert!(world.research_recipe("mill_flour"));
    assert!(world.select_recipe(mill, "mill_flour"));
    assert!(world.activate(mill));
    world
}
