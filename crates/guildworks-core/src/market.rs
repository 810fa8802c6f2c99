//! Two-tier market: per resource, an independent local and global pool.
//!
//! Local pools belong to the current run and are restored to their initial
//! supplies on game reset. Global pools are permanent and shared across
//! resets; only tests ever reset them.

use crate::fixed::Fixed64;
use crate::id::ResourceId;
use crate::inventory::Inventory;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Quantity-weighted average of two qualities. Returns 1.0 when both
/// quantities are zero so an empty mix has the baseline quality.
pub fn mix_quality(qty_a: Fixed64, qual_a: Fixed64, qty_b: Fixed64, qual_b: Fixed64) -> Fixed64 {
    let total = qty_a + qty_b;
    if total <= Fixed64::ZERO {
        return Fixed64::from_num(1);
    }
    (qty_a * qual_a + qty_b * qual_b) / total
}

/// One market pool: a supply level and its running quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub supply: Fixed64,
    pub quality: Fixed64,
}

impl Pool {
    fn new(supply: Fixed64) -> Self {
        Self {
            supply,
            quality: Fixed64::from_num(1),
        }
    }

    /// Fold `amount` units of `quality` into this pool.
    fn absorb(&mut self, amount: Fixed64, quality: Fixed64) {
        self.quality = mix_quality(self.supply, self.quality, amount, quality);
        self.supply += amount;
    }
}

/// Local and global pool for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub local: Pool,
    pub global: Pool,
}

/// The outcome of a completed sale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleOutcome {
    pub amount: Fixed64,
    pub revenue: Fixed64,
    pub quality: Fixed64,
}

/// The outcome of a completed purchase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurchaseOutcome {
    pub amount: Fixed64,
    pub cost: Fixed64,
    pub quality: Fixed64,
}

/// Market state for every registered resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    entries: HashMap<ResourceId, MarketEntry>,
    /// Price scale factors applied on top of the equilibrium formula,
    /// e.g. from achievement rewards. Defaults to 1.
    price_modifiers: HashMap<ResourceId, Fixed64>,
}

impl Market {
    /// Create market pools for every resource in the registry, at their
    /// initial supplies and baseline quality.
    pub fn new(registry: &Registry) -> Self {
        let mut entries = HashMap::new();
        for id in registry.resource_ids() {
            if let Some(def) = registry.get_resource(id) {
                entries.insert(
                    id,
                    MarketEntry {
                        local: Pool::new(def.initial_local_supply),
                        global: Pool::new(def.initial_global_supply),
                    },
                );
            }
        }
        Self {
            entries,
            price_modifiers: HashMap::new(),
        }
    }

    pub fn entry(&self, resource: ResourceId) -> Option<&MarketEntry> {
        self.entries.get(&resource)
    }

    pub(crate) fn entry_mut(&mut self, resource: ResourceId) -> Option<&mut MarketEntry> {
        self.entries.get_mut(&resource)
    }

    fn modifier(&self, resource: ResourceId) -> Fixed64 {
        self.price_modifiers
            .get(&resource)
            .copied()
            .unwrap_or_else(|| Fixed64::from_num(1))
    }

    /// Scale the price of a resource by `factor` (compounds with previous
    /// modifiers). Achievement rewards feed through here.
    pub fn scale_price_modifier(&mut self, resource: ResourceId, factor: Fixed64) {
        let current = self.modifier(resource);
        self.price_modifiers
            .insert(resource, current.saturating_mul(factor));
    }

    fn price_of(&self, registry: &Registry, resource: ResourceId, pool: &Pool) -> Fixed64 {
        let Some(def) = registry.get_resource(resource) else {
            return Fixed64::ZERO;
        };
        let denom = pool.supply.max(Fixed64::from_num(1));
        self.modifier(resource).saturating_mul(def.equilibrium) / denom
    }

    /// Current local price: equilibrium / max(supply, 1), scaled by the
    /// resource's price modifier. Strictly decreasing in supply.
    pub fn local_price(&self, registry: &Registry, resource: ResourceId) -> Option<Fixed64> {
        let entry = self.entries.get(&resource)?;
        Some(self.price_of(registry, resource, &entry.local))
    }

    /// Current global price.
    pub fn global_price(&self, registry: &Registry, resource: ResourceId) -> Option<Fixed64> {
        let entry = self.entries.get(&resource)?;
        Some(self.price_of(registry, resource, &entry.global))
    }

    /// Sell `amount` units out of the inventory into the local pool.
    ///
    /// Revenue is computed at the price *before* the sold supply lands, the
    /// sold quality is mixed into the local pool, and the caller credits the
    /// returned revenue. `None` (and no mutation) when the amount is not
    /// positive or the inventory cannot cover it.
    pub fn sell(
        &mut self,
        registry: &Registry,
        inventory: &mut Inventory,
        resource: ResourceId,
        amount: Fixed64,
    ) -> Option<SaleOutcome> {
        if amount <= Fixed64::ZERO {
            return None;
        }
        if inventory.amount(resource) < amount {
            return None;
        }
        let price = self.local_price(registry, resource)?;
        let quality = inventory.quality(resource);
        if !inventory.remove(resource, amount) {
            return None;
        }
        let entry = self.entries.get_mut(&resource)?;
        entry.local.absorb(amount, quality);
        Some(SaleOutcome {
            amount,
            revenue: price.saturating_mul(amount),
            quality,
        })
    }

    /// Buy `amount` units out of the local pool into the inventory.
    ///
    /// Cost is computed at the price *before* the supply leaves; the bought
    /// stock arrives at the pool's current quality, and withdrawal leaves
    /// the pool quality unchanged. The caller debits the returned cost.
    /// `None` (and no mutation) when the amount is not positive or the pool
    /// cannot cover it.
    pub fn buy(
        &mut self,
        registry: &Registry,
        inventory: &mut Inventory,
        resource: ResourceId,
        amount: Fixed64,
    ) -> Option<PurchaseOutcome> {
        if amount <= Fixed64::ZERO {
            return None;
        }
        let price = self.local_price(registry, resource)?;
        let entry = self.entries.get_mut(&resource)?;
        if entry.local.supply < amount {
            return None;
        }
        let quality = entry.local.quality;
        entry.local.supply -= amount;
        inventory.add(resource, amount, quality);
        Some(PurchaseOutcome {
            amount,
            cost: price.saturating_mul(amount),
            quality,
        })
    }

    /// Unattended selling: sell `min(available - min_keep, max_sell)` when
    /// that is positive, otherwise nothing.
    pub fn auto_sell(
        &mut self,
        registry: &Registry,
        inventory: &mut Inventory,
        resource: ResourceId,
        min_keep: Fixed64,
        max_sell: Option<Fixed64>,
    ) -> Option<SaleOutcome> {
        let mut to_sell = inventory.amount(resource) - min_keep;
        if let Some(cap) = max_sell {
            to_sell = to_sell.min(cap);
        }
        if to_sell <= Fixed64::ZERO {
            return None;
        }
        self.sell(registry, inventory, resource, to_sell)
    }

    /// Direct injection into the local pool (admin/test). Negative amounts
    /// drain supply down to zero without touching quality.
    pub fn add_to_local(&mut self, resource: ResourceId, amount: Fixed64, quality: Fixed64) -> bool {
        let Some(entry) = self.entries.get_mut(&resource) else {
            return false;
        };
        if amount > Fixed64::ZERO {
            entry.local.absorb(amount, quality);
        } else {
            entry.local.supply = (entry.local.supply + amount).max(Fixed64::ZERO);
        }
        true
    }

    /// Direct injection into the global pool (admin/test).
    pub fn add_to_global(&mut self, resource: ResourceId, amount: Fixed64, quality: Fixed64) -> bool {
        let Some(entry) = self.entries.get_mut(&resource) else {
            return false;
        };
        if amount > Fixed64::ZERO {
            entry.global.absorb(amount, quality);
        } else {
            entry.global.supply = (entry.global.supply + amount).max(Fixed64::ZERO);
        }
        true
    }

    /// Restore every local pool to its initial supply and baseline quality.
    /// Part of game reset. Global pools are untouched.
    pub fn reset_local(&mut self, registry: &Registry) {
        for id in registry.resource_ids() {
            if let (Some(entry), Some(def)) = (self.entries.get_mut(&id), registry.get_resource(id))
            {
                entry.local = Pool::new(def.initial_local_supply);
            }
        }
    }

    /// Restore every global pool to its initial supply. Test-only: normal
    /// play never resets global state.
    pub fn reset_global(&mut self, registry: &Registry) {
        for id in registry.resource_ids() {
            if let (Some(entry), Some(def)) = (self.entries.get_mut(&id), registry.get_resource(id))
            {
                entry.global = Pool::new(def.initial_global_supply);
            }
        }
    }
}
