//! Player inventory: per-resource stock with running quality and lifetime
//! totals, plus a FIFO batch overlay for composite resources.
//!
//! Stock amounts are the single source of truth; batches annotate composite
//! stock with per-batch quality and yield composition. The two can diverge
//! when stock is granted directly (bypassing `add_batch`) -- removal then
//! synthesizes a batch with a freshly randomized composition.

use crate::fixed::Fixed64;
use crate::id::{BatchId, ResourceId};
use crate::market::mix_quality;
use crate::registry::{Registry, ResourceDef};
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Per-resource stock record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub amount: Fixed64,
    pub quality: Fixed64,
    /// Total ever added. Monotonically non-decreasing; feeds achievement
    /// checks.
    pub lifetime_total: Fixed64,
}

impl Stock {
    fn empty() -> Self {
        Self {
            amount: Fixed64::ZERO,
            quality: Fixed64::from_num(1),
            lifetime_total: Fixed64::ZERO,
        }
    }
}

/// A discrete quantity of a composite resource with its own quality and
/// yield composition (yield resource -> yield multiplier), consumed FIFO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub resource: ResourceId,
    pub amount: Fixed64,
    pub quality: Fixed64,
    pub composition: Option<BTreeMap<ResourceId, Fixed64>>,
}

/// The inventory. Owned by the host and passed into core operations
/// explicitly; the simulation never holds a reference to it between ticks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    stocks: HashMap<ResourceId, Stock>,
    batches: HashMap<ResourceId, VecDeque<Batch>>,
    next_batch_id: u64,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stock amount. Zero for unknown resources.
    pub fn amount(&self, resource: ResourceId) -> Fixed64 {
        self.stocks
            .get(&resource)
            .map(|s| s.amount)
            .unwrap_or(Fixed64::ZERO)
    }

    /// Current running quality. Baseline 1 for unknown resources.
    pub fn quality(&self, resource: ResourceId) -> Fixed64 {
        self.stocks
            .get(&resource)
            .map(|s| s.quality)
            .unwrap_or_else(|| Fixed64::from_num(1))
    }

    /// Total amount ever added for this resource.
    pub fn lifetime_total(&self, resource: ResourceId) -> Fixed64 {
        self.stocks
            .get(&resource)
            .map(|s| s.lifetime_total)
            .unwrap_or(Fixed64::ZERO)
    }

    /// Whether at least `amount` is in stock.
    pub fn has(&self, resource: ResourceId, amount: Fixed64) -> bool {
        self.amount(resource) >= amount
    }

    /// Add stock, mixing the incoming quality into the running quality by
    /// quantity-weighted average. Amounts <= 0 are a no-op.
    pub fn add(&mut self, resource: ResourceId, amount: Fixed64, quality: Fixed64) {
        if amount <= Fixed64::ZERO {
            return;
        }
        let stock = self.stocks.entry(resource).or_insert_with(Stock::empty);
        stock.quality = mix_quality(stock.amount, stock.quality, amount, quality);
        stock.amount += amount;
        stock.lifetime_total += amount;
    }

    /// Remove stock. Fails (returns false, no change) when `amount` exceeds
    /// the current stock or is not positive. Removal is assumed to be at
    /// average quality, so the remaining quality is unchanged.
    pub fn remove(&mut self, resource: ResourceId, amount: Fixed64) -> bool {
        if amount <= Fixed64::ZERO {
            return false;
        }
        match self.stocks.get_mut(&resource) {
            Some(stock) if stock.amount >= amount => {
                stock.amount -= amount;
                true
            }
            _ => false,
        }
    }

    /// Add stock AND track it as a FIFO batch carrying its own quality and
    /// an optional yield composition.
    pub fn add_batch(
        &mut self,
        resource: ResourceId,
        amount: Fixed64,
        quality: Fixed64,
        composition: Option<BTreeMap<ResourceId, Fixed64>>,
    ) -> Option<BatchId> {
        if amount <= Fixed64::ZERO {
            return None;
        }
        self.add(resource, amount, quality);
        let id = BatchId(self.next_batch_id);
        self.next_batch_id += 1;
        self.batches.entry(resource).or_default().push_back(Batch {
            id,
            resource,
            amount,
            quality,
            composition,
        });
        Some(id)
    }

    /// Consume up to `amount` from the oldest batch of a resource.
    ///
    /// FIFO with single-batch drain: when the oldest batch holds less than
    /// requested, the returned batch reflects only what that batch held --
    /// the request is never split across batches. When stock exists but no
    /// batch is tracked, a batch is synthesized with a composition drawn
    /// from the registry's yield list via the injected RNG.
    ///
    /// Stock is decremented by the drained amount; `None` means nothing was
    /// drained.
    pub fn remove_batch(
        &mut self,
        resource: ResourceId,
        amount: Fixed64,
        registry: &Registry,
        rng: &mut SimRng,
    ) -> Option<Batch> {
        if amount <= Fixed64::ZERO {
            return None;
        }
        let stock_amount = self.amount(resource);
        if stock_amount <= Fixed64::ZERO {
            return None;
        }
        let stock_quality = self.quality(resource);
        let def = registry.get_resource(resource)?;

        let queue = self.batches.entry(resource).or_default();
        let drained_batch = match queue.front_mut() {
            Some(front) => {
                let drained = front.amount.min(amount).min(stock_amount);
                front.amount -= drained;
                let out = Batch {
                    id: front.id,
                    resource,
                    amount: drained,
                    quality: front.quality,
                    composition: front.composition.clone(),
                };
                if front.amount <= Fixed64::ZERO {
                    queue.pop_front();
                }
                out
            }
            None => {
                let id = BatchId(self.next_batch_id);
                self.next_batch_id += 1;
                Batch {
                    id,
                    resource,
                    amount: amount.min(stock_amount),
                    quality: stock_quality,
                    composition: synthesize_composition(def, rng),
                }
            }
        };

        if let Some(stock) = self.stocks.get_mut(&resource) {
            stock.amount -= drained_batch.amount;
        }
        Some(drained_batch)
    }

    /// Number of tracked batches for a resource.
    pub fn batch_count(&self, resource: ResourceId) -> usize {
        self.batches.get(&resource).map(|q| q.len()).unwrap_or(0)
    }

    /// Drop all stock and batches. Lifetime totals go too: a cleared
    /// inventory is a fresh inventory.
    pub fn clear(&mut self) {
        self.stocks.clear();
        self.batches.clear();
    }
}

/// Draw a composition for a composite resource: every candidate yield gets a
/// multiplier uniform in [0.5, 1.5). Plain resources get no composition.
fn synthesize_composition(
    def: &ResourceDef,
    rng: &mut SimRng,
) -> Option<BTreeMap<ResourceId, Fixed64>> {
    if def.yields.is_empty() {
        return None;
    }
    let lo = Fixed64::from_num(0.5);
    let hi = Fixed64::from_num(1.5);
    let mut composition = BTreeMap::new();
    for &y in &def.yields {
        composition.insert(y, rng.range(lo, hi));
    }
    Some(composition)
}
