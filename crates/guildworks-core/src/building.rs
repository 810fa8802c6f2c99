//! The production facility state machine.
//!
//! A building selects one recipe from its type's candidate list, and each
//! tick converts work into progress on that recipe. Inputs are paid when a
//! cycle *starts* (pay-at-start), so a building with unmet inputs stalls at
//! exactly zero progress and resumes the moment stock arrives, with no
//! catch-up tick. A completed cycle rolls into the next one only while work
//! remains in the current tick, which is what keeps the algorithm from
//! pre-consuming inputs for a cycle it cannot advance.

use crate::fixed::{Fixed64, pow_int};
use crate::id::{BuildingTypeId, RecipeId, ResourceId};
use crate::inventory::Inventory;
use crate::registry::{BuildingTypeDef, RecipeDef, Registry};
use crate::research::ResearchLedger;
use crate::rng::SimRng;
use crate::technology::TechLedger;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cost growth factor per upgrade level (both curves).
const COST_GROWTH: f64 = 1.5;

/// Structural failures during an advance. These indicate a world whose
/// registry and buildings disagree; the tick orchestrator records them and
/// carries on with the remaining buildings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildingError {
    #[error("unknown recipe: {0:?}")]
    UnknownRecipe(RecipeId),
    #[error("unknown resource: {0:?}")]
    UnknownResource(ResourceId),
}

/// What one advance call did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdvanceOutcome {
    /// Completed production cycles this tick.
    pub cycles_completed: u32,
    /// Total output added to the inventory this tick.
    pub produced: Fixed64,
    /// Quality of the last completed cycle, if any.
    pub quality: Option<Fixed64>,
    /// True when the building wanted to start a cycle but inputs were
    /// missing. Progress is exactly zero in this state.
    pub stalled: bool,
}

/// The outcome of an upgrade attempt. No partial mutation on failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeResult {
    pub success: bool,
    /// The cost that was (or would have been) charged.
    pub cost: Fixed64,
    /// The multiplier or quality after the attempt.
    pub new_value: Fixed64,
    /// The upgrade level after the attempt.
    pub level: u32,
}

/// A constructed production facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub building_type: BuildingTypeId,
    /// Candidate recipes, fixed by the building type.
    pub recipes: Vec<RecipeId>,
    pub active_recipe: Option<RecipeId>,
    pub active: bool,
    /// Accumulated work per recipe, always in [0, work_amount) at rest.
    progress: HashMap<RecipeId, Fixed64>,
    /// Average input quality captured when the current cycle consumed its
    /// inputs, per recipe.
    cycle_input_quality: HashMap<RecipeId, Fixed64>,
    /// Composite yield multiplier captured at cycle start, per recipe.
    cycle_yield: HashMap<RecipeId, Fixed64>,
    pub production_multiplier: Fixed64,
    pub production_upgrade_level: u32,
    pub production_quality: Fixed64,
    pub quality_upgrade_level: u32,
    /// Construction cost; the base of both upgrade cost curves.
    pub production_start_cost: Fixed64,
}

impl Building {
    pub fn new(building_type: BuildingTypeId, def: &BuildingTypeDef) -> Self {
        Self {
            building_type,
            recipes: def.recipes.clone(),
            active_recipe: None,
            active: false,
            progress: HashMap::new(),
            cycle_input_quality: HashMap::new(),
            cycle_yield: HashMap::new(),
            production_multiplier: Fixed64::from_num(1),
            production_upgrade_level: 0,
            production_quality: Fixed64::from_num(1),
            quality_upgrade_level: 0,
            production_start_cost: def.base_cost,
        }
    }

    /// Select a recipe. Succeeds only when it is one of this building type's
    /// candidates AND is research-unlocked.
    pub fn select_recipe(&mut self, recipe: RecipeId, research: &ResearchLedger) -> bool {
        if !self.recipes.contains(&recipe) || !research.is_researched(recipe) {
            return false;
        }
        self.active_recipe = Some(recipe);
        true
    }

    /// Permit advancing. Requires a selected, still-researched recipe.
    pub fn activate(&mut self, research: &ResearchLedger) -> bool {
        match self.active_recipe {
            Some(recipe) if research.is_researched(recipe) => {
                self.active = true;
                true
            }
            _ => false,
        }
    }

    /// Always succeeds.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Current progress on a recipe.
    pub fn progress(&self, recipe: RecipeId) -> Fixed64 {
        self.progress.get(&recipe).copied().unwrap_or(Fixed64::ZERO)
    }

    // -----------------------------------------------------------------------
    // Upgrades
    // -----------------------------------------------------------------------

    /// Cost of the next rate upgrade: `ceil(base * 1.5^level)`.
    pub fn rate_upgrade_cost(&self) -> Fixed64 {
        upgrade_cost(self.production_start_cost, self.production_upgrade_level)
    }

    /// Cost of the next quality upgrade: same curve, separate level counter.
    pub fn quality_upgrade_cost(&self) -> Fixed64 {
        upgrade_cost(self.production_start_cost, self.quality_upgrade_level)
    }

    /// Apply a rate upgrade: the multiplier gains `0.2 * 0.9^old_level`, a
    /// diminishing geometric increment (the multiplier approaches 3.0
    /// asymptotically). The caller has already charged the cost.
    pub(crate) fn apply_rate_upgrade(&mut self) -> (Fixed64, u32) {
        let increment = rate_increment(self.production_upgrade_level);
        self.production_multiplier += increment;
        self.production_upgrade_level += 1;
        (self.production_multiplier, self.production_upgrade_level)
    }

    /// Apply a quality upgrade: the ceiling gains a logistic-shaped
    /// increment that grows over the early levels and saturates below 1.
    pub(crate) fn apply_quality_upgrade(&mut self) -> (Fixed64, u32) {
        let increment = quality_increment(self.quality_upgrade_level);
        self.production_quality += increment;
        self.quality_upgrade_level += 1;
        (self.production_quality, self.quality_upgrade_level)
    }

    // -----------------------------------------------------------------------
    // Advancing
    // -----------------------------------------------------------------------

    /// Advance production by one tick's worth of work.
    ///
    /// `work = base_work * global_multiplier * production_multiplier` is
    /// poured into the active recipe. Cycles start by paying their inputs,
    /// complete by adding output at the capped quality, and chain within a
    /// tick only while work remains. Instant recipes (zero work amount)
    /// produce at most once per tick.
    pub fn advance(
        &mut self,
        inventory: &mut Inventory,
        base_work: Fixed64,
        global_multiplier: Fixed64,
        registry: &Registry,
        tech: &TechLedger,
        rng: &mut SimRng,
    ) -> Result<AdvanceOutcome, BuildingError> {
        let mut outcome = AdvanceOutcome::default();
        if !self.active {
            return Ok(outcome);
        }
        let Some(recipe_id) = self.active_recipe else {
            return Ok(outcome);
        };
        let recipe = registry
            .get_recipe(recipe_id)
            .ok_or(BuildingError::UnknownRecipe(recipe_id))?;

        let work_to_add = base_work
            .saturating_mul(global_multiplier)
            .saturating_mul(self.production_multiplier);
        let mut remaining = work_to_add;
        let mut progress = self.progress(recipe_id);
        let instant = recipe.work_amount == Fixed64::ZERO;

        loop {
            // Start a new cycle: pay inputs up front.
            if progress == Fixed64::ZERO && (remaining > Fixed64::ZERO || instant) {
                if !inputs_available(inventory, recipe) {
                    outcome.stalled = true;
                    break;
                }
                let start = consume_inputs(inventory, recipe, registry, rng)?;
                self.cycle_input_quality.insert(recipe_id, start.avg_quality);
                self.cycle_yield.insert(recipe_id, start.yield_multiplier);
            }

            if instant {
                self.complete_cycle(inventory, recipe_id, recipe, tech, &mut outcome);
                progress = Fixed64::ZERO;
                break;
            }

            let applied = remaining.min(recipe.work_amount - progress);
            progress += applied;
            remaining -= applied;

            if progress >= recipe.work_amount {
                self.complete_cycle(inventory, recipe_id, recipe, tech, &mut outcome);
                progress = Fixed64::ZERO;
                // Only roll into another cycle while work remains; stopping
                // here is what prevents pre-paying a cycle that cannot
                // advance this tick.
                if remaining > Fixed64::ZERO {
                    continue;
                }
            }
            break;
        }

        self.progress.insert(recipe_id, progress);
        Ok(outcome)
    }

    fn complete_cycle(
        &mut self,
        inventory: &mut Inventory,
        recipe_id: RecipeId,
        recipe: &RecipeDef,
        tech: &TechLedger,
        outcome: &mut AdvanceOutcome,
    ) {
        let avg_input = self
            .cycle_input_quality
            .remove(&recipe_id)
            .unwrap_or_else(|| Fixed64::from_num(1));
        let yield_multiplier = self
            .cycle_yield
            .remove(&recipe_id)
            .unwrap_or_else(|| Fixed64::from_num(1));

        let tech_cap = Fixed64::from_num(tech.level(recipe.output.resource));
        let quality = self
            .production_quality
            .min(tech_cap)
            .min(avg_input + Fixed64::from_num(1));

        let amount = recipe.output.amount.saturating_mul(yield_multiplier);
        inventory.add(recipe.output.resource, amount, quality);

        outcome.cycles_completed += 1;
        outcome.produced += amount;
        outcome.quality = Some(quality);
    }

    /// Diagnostic: active, needs inputs, zero progress, and cannot afford
    /// them. Not a state transition.
    pub fn is_stalled(&self, inventory: &Inventory, registry: &Registry) -> bool {
        if !self.active {
            return false;
        }
        let Some(recipe_id) = self.active_recipe else {
            return false;
        };
        let Some(recipe) = registry.get_recipe(recipe_id) else {
            return false;
        };
        if recipe.inputs.is_empty() {
            return false;
        }
        self.progress(recipe_id) == Fixed64::ZERO && !inputs_available(inventory, recipe)
    }
}

/// `ceil(base * 1.5^level)`.
fn upgrade_cost(base: Fixed64, level: u32) -> Fixed64 {
    base.saturating_mul(pow_int(Fixed64::from_num(COST_GROWTH), level))
        .ceil()
}

/// Rate multiplier increment: `0.2 * 0.9^level`, a decaying geometric
/// series summing to 2.0 above the baseline multiplier of 1.
pub fn rate_increment(level: u32) -> Fixed64 {
    Fixed64::from_num(0.2).saturating_mul(pow_int(Fixed64::from_num(0.9), level))
}

/// Quality ceiling increment: `1 / (1 + 1.5^(4 - level))`, a logistic curve
/// in the upgrade level. Increments grow through the early levels (0.165,
/// 0.229, 0.308, 0.4, 0.5, ...) and saturate toward 1 without reaching it.
pub fn quality_increment(level: u32) -> Fixed64 {
    let one = Fixed64::from_num(1);
    let growth = Fixed64::from_num(COST_GROWTH);
    if level <= 4 {
        one / (one + pow_int(growth, 4 - level))
    } else {
        let p = pow_int(growth, level - 4);
        p / (p + one)
    }
}

fn inputs_available(inventory: &Inventory, recipe: &RecipeDef) -> bool {
    recipe
        .inputs
        .iter()
        .all(|entry| inventory.has(entry.resource, entry.amount))
}

struct CycleStart {
    avg_quality: Fixed64,
    yield_multiplier: Fixed64,
}

/// Consume a cycle's inputs. Plain inputs are removed at stock quality;
/// composite inputs drain the batch store, contributing their batch quality
/// and the batch's yield multiplier for the recipe's output resource.
fn consume_inputs(
    inventory: &mut Inventory,
    recipe: &RecipeDef,
    registry: &Registry,
    rng: &mut SimRng,
) -> Result<CycleStart, BuildingError> {
    let one = Fixed64::from_num(1);
    if recipe.inputs.is_empty() {
        return Ok(CycleStart {
            avg_quality: one,
            yield_multiplier: one,
        });
    }

    let mut quality_sum = Fixed64::ZERO;
    let mut yield_multiplier = one;

    for entry in &recipe.inputs {
        let def = registry
            .get_resource(entry.resource)
            .ok_or(BuildingError::UnknownResource(entry.resource))?;

        if def.is_composite() {
            match inventory.remove_batch(entry.resource, entry.amount, registry, rng) {
                Some(batch) => {
                    // Single-batch drain may come up short; the remainder is
                    // taken from stock at average quality.
                    if batch.amount < entry.amount {
                        inventory.remove(entry.resource, entry.amount - batch.amount);
                    }
                    quality_sum += batch.quality;
                    if let Some(m) = batch
                        .composition
                        .as_ref()
                        .and_then(|c| c.get(&recipe.output.resource))
                    {
                        yield_multiplier = *m;
                    }
                }
                None => {
                    quality_sum += inventory.quality(entry.resource);
                    inventory.remove(entry.resource, entry.amount);
                }
            }
        } else {
            quality_sum += inventory.quality(entry.resource);
            inventory.remove(entry.resource, entry.amount);
        }
    }

    let count = Fixed64::from_num(recipe.inputs.len() as u32);
    Ok(CycleStart {
        avg_quality: quality_sum / count,
        yield_multiplier,
    })
}
