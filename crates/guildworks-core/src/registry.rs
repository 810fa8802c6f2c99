use crate::fixed::Fixed64;
use crate::id::{BuildingTypeId, RecipeId, ResourceId};
use std::collections::HashMap;

/// A resource kind definition: market constants plus the optional composite
/// yield list.
#[derive(Debug, Clone)]
pub struct ResourceDef {
    pub name: String,
    /// Market equilibrium constant. Price = equilibrium / max(supply, 1).
    pub equilibrium: Fixed64,
    /// Local market supply at world creation (and after a local reset).
    pub initial_local_supply: Fixed64,
    /// Global market supply at world creation. Never reset during play.
    pub initial_global_supply: Fixed64,
    /// For composite resources: the resource kinds a batch of this resource
    /// can yield when refined. Empty for plain resources.
    pub yields: Vec<ResourceId>,
}

impl ResourceDef {
    /// Composite resources track FIFO batches with per-batch yield
    /// compositions.
    pub fn is_composite(&self) -> bool {
        !self.yields.is_empty()
    }
}

/// A recipe input or output entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecipeEntry {
    pub resource: ResourceId,
    pub amount: Fixed64,
}

/// A production recipe definition.
#[derive(Debug, Clone)]
pub struct RecipeDef {
    pub name: String,
    /// Inputs consumed when a cycle starts, in declaration order.
    pub inputs: Vec<RecipeEntry>,
    pub output: RecipeEntry,
    /// Work units needed to complete one cycle. Zero means instant: the
    /// recipe produces at most once per tick.
    pub work_amount: Fixed64,
    /// Research points required to unlock this recipe.
    pub research_cost: Fixed64,
}

/// A building type definition.
#[derive(Debug, Clone)]
pub struct BuildingTypeDef {
    pub name: String,
    /// Candidate recipes a facility of this type may select from.
    pub recipes: Vec<RecipeId>,
    /// Money cost to construct; also the base of both upgrade cost curves.
    pub base_cost: Fixed64,
}

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    resources: Vec<ResourceDef>,
    resource_name_to_id: HashMap<String, ResourceId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    buildings: Vec<BuildingTypeDef>,
    building_name_to_id: HashMap<String, BuildingTypeId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a resource kind. Returns its ID.
    pub fn register_resource(
        &mut self,
        name: &str,
        equilibrium: Fixed64,
        initial_local_supply: Fixed64,
        initial_global_supply: Fixed64,
    ) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(ResourceDef {
            name: name.to_string(),
            equilibrium,
            initial_local_supply,
            initial_global_supply,
            yields: Vec::new(),
        });
        self.resource_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register a recipe. Returns its ID.
    pub fn register_recipe(
        &mut self,
        name: &str,
        inputs: Vec<RecipeEntry>,
        output: RecipeEntry,
        work_amount: Fixed64,
        research_cost: Fixed64,
    ) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            name: name.to_string(),
            inputs,
            output,
            work_amount,
            research_cost,
        });
        self.recipe_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register a building type. Returns its ID.
    pub fn register_building(
        &mut self,
        name: &str,
        recipes: Vec<RecipeId>,
        base_cost: Fixed64,
    ) -> BuildingTypeId {
        let id = BuildingTypeId(self.buildings.len() as u32);
        self.buildings.push(BuildingTypeDef {
            name: name.to_string(),
            recipes,
            base_cost,
        });
        self.building_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 2: Declare the yield list of a composite resource. Yields may
    /// reference resources registered after the composite itself.
    pub fn set_resource_yields(
        &mut self,
        name: &str,
        yields: Vec<ResourceId>,
    ) -> Result<(), RegistryError> {
        let id = self
            .resource_name_to_id
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        self.resources[id.0 as usize].yields = yields;
        Ok(())
    }

    /// Phase 2: Mutate an existing recipe by name. Scenario tests use this to
    /// override work amounts before the registry is frozen.
    pub fn mutate_recipe<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut RecipeDef),
    {
        let id = self
            .recipe_name_to_id
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        f(&mut self.recipes[id.0 as usize]);
        Ok(())
    }

    /// Phase 2: Mutate an existing building type by name.
    pub fn mutate_building<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut BuildingTypeDef),
    {
        let id = self
            .building_name_to_id
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        f(&mut self.buildings[id.0 as usize]);
        Ok(())
    }

    /// Lookup resource ID by name.
    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_name_to_id.get(name).copied()
    }

    /// Lookup recipe ID by name.
    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    /// Lookup building type ID by name.
    pub fn building_id(&self, name: &str) -> Option<BuildingTypeId> {
        self.building_name_to_id.get(name).copied()
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let resource_count = self.resources.len();

        for recipe in &self.recipes {
            for entry in recipe.inputs.iter().chain(std::iter::once(&recipe.output)) {
                if entry.resource.0 as usize >= resource_count {
                    return Err(RegistryError::InvalidResourceRef(entry.resource));
                }
            }
        }

        for resource in &self.resources {
            for y in &resource.yields {
                if y.0 as usize >= resource_count {
                    return Err(RegistryError::InvalidResourceRef(*y));
                }
            }
        }

        for building in &self.buildings {
            for r in &building.recipes {
                if r.0 as usize >= self.recipes.len() {
                    return Err(RegistryError::InvalidRecipeRef(*r));
                }
            }
        }

        Ok(Registry {
            resources: self.resources,
            resource_name_to_id: self.resource_name_to_id,
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
            buildings: self.buildings,
            building_name_to_id: self.building_name_to_id,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Registry {
    resources: Vec<ResourceDef>,
    resource_name_to_id: HashMap<String, ResourceId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    buildings: Vec<BuildingTypeDef>,
    building_name_to_id: HashMap<String, BuildingTypeId>,
}

impl Registry {
    pub fn get_resource(&self, id: ResourceId) -> Option<&ResourceDef> {
        self.resources.get(id.0 as usize)
    }

    pub fn get_recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn get_building(&self, id: BuildingTypeId) -> Option<&BuildingTypeDef> {
        self.buildings.get(id.0 as usize)
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_name_to_id.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    pub fn building_id(&self, name: &str) -> Option<BuildingTypeId> {
        self.building_name_to_id.get(name).copied()
    }

    /// Find the recipe producing a given resource, if any. When several
    /// recipes share an output the lowest-numbered one wins.
    pub fn recipe_for_output(&self, resource: ResourceId) -> Option<RecipeId> {
        self.recipes
            .iter()
            .position(|r| r.output.resource == resource)
            .map(|i| RecipeId(i as u32))
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    /// All resource kinds in registration order. The simulation always
    /// iterates resources through this, never through map key order.
    pub fn resource_ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        (0..self.resources.len() as u32).map(ResourceId)
    }

    /// All building types in registration order.
    pub fn building_type_ids(&self) -> impl Iterator<Item = BuildingTypeId> + '_ {
        (0..self.buildings.len() as u32).map(BuildingTypeId)
    }

    /// All recipes in registration order.
    pub fn recipe_ids(&self) -> impl Iterator<Item = RecipeId> + '_ {
        (0..self.recipes.len() as u32).map(RecipeId)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid resource reference: {0:?}")]
    InvalidResourceRef(ResourceId),
    #[error("invalid recipe reference: {0:?}")]
    InvalidRecipeRef(RecipeId),
}
