//! Data-driven achievement checks, evaluated once per tick as the final
//! pipeline phase.
//!
//! Conditions are plain serializable predicates over a read-only view of
//! the world; rewards are applied by the world after evaluation. An
//! achievement unlocks at most once and stays unlocked across game resets.

use crate::fixed::{Days, Fixed64};
use crate::id::{AchievementId, ResourceId};
use crate::inventory::Inventory;
use crate::technology::TechLedger;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A predicate over the achievement view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    BalanceAtLeast(Fixed64),
    DayAtLeast(Days),
    /// Lifetime inventory total for a resource. Never satisfied on ticks
    /// run without an inventory.
    LifetimeProducedAtLeast {
        resource: ResourceId,
        amount: Fixed64,
    },
    TechLevelAtLeast { resource: ResourceId, level: u32 },
}

/// What unlocking grants. Applied once by the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reward {
    None,
    /// Scales the market price of a resource permanently.
    PriceMultiplier { resource: ResourceId, factor: Fixed64 },
    /// Adds to the world's global production multiplier permanently.
    GlobalMultiplier { bonus: Fixed64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementDef {
    pub id: AchievementId,
    pub name: String,
    pub condition: Condition,
    pub reward: Reward,
}

/// Read-only view the conditions are checked against.
#[derive(Debug, Clone, Copy)]
pub struct AchievementView<'a> {
    pub day: Days,
    pub balance: Fixed64,
    pub tech: &'a TechLedger,
    pub inventory: Option<&'a Inventory>,
}

impl Condition {
    pub fn is_met(&self, view: &AchievementView<'_>) -> bool {
        match *self {
            Condition::BalanceAtLeast(threshold) => view.balance >= threshold,
            Condition::DayAtLeast(day) => view.day >= day,
            Condition::LifetimeProducedAtLeast { resource, amount } => view
                .inventory
                .map(|inv| inv.lifetime_total(resource) >= amount)
                .unwrap_or(false),
            Condition::TechLevelAtLeast { resource, level } => {
                view.tech.level(resource) >= level
            }
        }
    }
}

/// Registered achievements plus their unlock state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AchievementSet {
    defs: Vec<AchievementDef>,
    unlocked: HashSet<AchievementId>,
}

impl AchievementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an achievement. Returns false on a duplicate id.
    pub fn register(&mut self, def: AchievementDef) -> bool {
        if self.defs.iter().any(|d| d.id == def.id) {
            return false;
        }
        self.defs.push(def);
        true
    }

    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        self.unlocked.contains(&id)
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }

    /// Check every locked achievement against the view, in registration
    /// order. Newly unlocked achievements are returned with their rewards
    /// for the world to apply.
    pub fn evaluate(&mut self, view: &AchievementView<'_>) -> Vec<(AchievementId, Reward)> {
        let mut newly = Vec::new();
        for def in &self.defs {
            if self.unlocked.contains(&def.id) {
                continue;
            }
            if def.condition.is_met(view) {
                self.unlocked.insert(def.id);
                newly.push((def.id, def.reward));
            }
        }
        newly
    }
}
