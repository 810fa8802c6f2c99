//! Research ledger: accrued research points and the set of unlocked recipes.
//!
//! A recipe must be unlocked here before any building can select or run it.
//! The ledger is cleared by a full game reset, never by prestige-only
//! bookkeeping.

use crate::fixed::Fixed64;
use crate::id::RecipeId;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchLedger {
    points: Fixed64,
    unlocked: HashSet<RecipeId>,
}

impl ResearchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add research points (from researcher headcount each tick).
    /// Non-positive accruals are ignored.
    pub fn accrue(&mut self, points: Fixed64) {
        if points > Fixed64::ZERO {
            self.points = self.points.saturating_add(points);
        }
    }

    /// Currently available research points.
    pub fn points(&self) -> Fixed64 {
        self.points
    }

    /// Attempt to unlock a recipe. Fails without state change when the
    /// recipe is already unlocked, unknown, or unaffordable. The research
    /// cost is clamped at zero, so a free recipe deducts nothing.
    pub fn research(&mut self, registry: &Registry, recipe: RecipeId) -> bool {
        if self.unlocked.contains(&recipe) {
            return false;
        }
        let Some(def) = registry.get_recipe(recipe) else {
            return false;
        };
        let cost = def.research_cost.max(Fixed64::ZERO);
        if self.points < cost {
            return false;
        }
        self.points -= cost;
        self.unlocked.insert(recipe);
        true
    }

    /// Pure membership query.
    pub fn is_researched(&self, recipe: RecipeId) -> bool {
        self.unlocked.contains(&recipe)
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }

    /// Clear unlocks and zero the point balance. Called by game reset only.
    pub fn reset(&mut self) {
        self.unlocked.clear();
        self.points = Fixed64::ZERO;
    }
}
