//! Technology ledger: per-resource integer levels that cap achievable
//! output quality.
//!
//! This is the permanent progression axis: levels survive every game reset
//! and are only raised, never lowered, during normal play.

use crate::fixed::{Fixed64, pow_int};
use crate::id::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cost growth factor per technology level.
const COST_GROWTH: f64 = 1.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechLedger {
    levels: HashMap<ResourceId, u32>,
    base_cost: Fixed64,
}

impl TechLedger {
    pub fn new(base_cost: Fixed64) -> Self {
        Self {
            levels: HashMap::new(),
            base_cost,
        }
    }

    /// Current level for a resource. Every resource starts at level 1.
    pub fn level(&self, resource: ResourceId) -> u32 {
        self.levels.get(&resource).copied().unwrap_or(1)
    }

    /// Set a level directly (save restore, admin tooling).
    pub fn set_level(&mut self, resource: ResourceId, level: u32) {
        self.levels.insert(resource, level);
    }

    /// Money cost of the next level: `ceil(base_cost * 1.5^level)`.
    pub fn upgrade_cost(&self, resource: ResourceId) -> Fixed64 {
        self.base_cost
            .saturating_mul(pow_int(Fixed64::from_num(COST_GROWTH), self.level(resource)))
            .ceil()
    }

    /// Raise the level by one. Payment is the caller's responsibility; the
    /// world checks the balance against [`Self::upgrade_cost`] first.
    pub(crate) fn advance_level(&mut self, resource: ResourceId) -> u32 {
        let next = self.level(resource) + 1;
        self.levels.insert(resource, next);
        next
    }
}
