//! Resolution pipeline: turns parsed data files into a frozen core
//! [`Registry`] and a [`WorldConfig`], validating every name reference.

use crate::loader::DataLoadError;
use crate::schema::{ConfigData, GameData};
use guildworks_core::fixed::f64_to_fixed64 as fx;
use guildworks_core::registry::{RecipeEntry, Registry, RegistryBuilder};
use guildworks_core::world::WorldConfig;
use std::collections::HashSet;

impl GameData {
    /// Resolve name references and build the immutable registry.
    ///
    /// Registration order follows file order, so ids are stable across runs
    /// of the same data set.
    pub fn resolve(&self) -> Result<Registry, DataLoadError> {
        let mut builder = RegistryBuilder::new();

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.name.as_str()) {
                return Err(DataLoadError::DuplicateName {
                    name: resource.name.clone(),
                    kind: "resource",
                });
            }
            builder.register_resource(
                &resource.name,
                fx(resource.equilibrium),
                fx(resource.initial_local_supply),
                fx(resource.initial_global_supply),
            );
        }

        // Yields may reference resources declared later, so they resolve in
        // a second pass.
        for resource in &self.resources {
            if resource.yields.is_empty() {
                continue;
            }
            let mut yields = Vec::with_capacity(resource.yields.len());
            for name in &resource.yields {
                yields.push(builder.resource_id(name).ok_or_else(|| {
                    DataLoadError::UnresolvedRef {
                        name: name.clone(),
                        expected_kind: "resource",
                    }
                })?);
            }
            builder
                .set_resource_yields(&resource.name, yields)
                .map_err(DataLoadError::Registry)?;
        }

        let mut seen = HashSet::new();
        for recipe in &self.recipes {
            if !seen.insert(recipe.name.as_str()) {
                return Err(DataLoadError::DuplicateName {
                    name: recipe.name.clone(),
                    kind: "recipe",
                });
            }
            let inputs = recipe
                .inputs
                .iter()
                .map(|(name, amount)| {
                    Ok(RecipeEntry {
                        resource: builder.resource_id(name).ok_or_else(|| {
                            DataLoadError::UnresolvedRef {
                                name: name.clone(),
                                expected_kind: "resource",
                            }
                        })?,
                        amount: fx(*amount),
                    })
                })
                .collect::<Result<Vec<_>, DataLoadError>>()?;
            let output = RecipeEntry {
                resource: builder.resource_id(&recipe.output.0).ok_or_else(|| {
                    DataLoadError::UnresolvedRef {
                        name: recipe.output.0.clone(),
                        expected_kind: "resource",
                    }
                })?,
                amount: fx(recipe.output.1),
            };
            builder.register_recipe(
                &recipe.name,
                inputs,
                output,
                fx(recipe.work),
                fx(recipe.research_cost),
            );
        }

        let mut seen = HashSet::new();
        for building in &self.buildings {
            if !seen.insert(building.name.as_str()) {
                return Err(DataLoadError::DuplicateName {
                    name: building.name.clone(),
                    kind: "building",
                });
            }
            let recipes = building
                .recipes
                .iter()
                .map(|name| {
                    builder
                        .recipe_id(name)
                        .ok_or_else(|| DataLoadError::UnresolvedRef {
                            name: name.clone(),
                            expected_kind: "recipe",
                        })
                })
                .collect::<Result<Vec<_>, DataLoadError>>()?;
            builder.register_building(&building.name, recipes, fx(building.cost));
        }

        builder.build().map_err(DataLoadError::Registry)
    }
}

impl ConfigData {
    /// Convert the file config into the core world config.
    pub fn to_world_config(&self) -> WorldConfig {
        WorldConfig {
            starting_balance: fx(self.starting_balance),
            base_work: fx(self.base_work),
            research_per_researcher: fx(self.research_per_researcher),
            tech_base_cost: fx(self.tech_base_cost),
            seed: self.seed,
        }
    }
}
