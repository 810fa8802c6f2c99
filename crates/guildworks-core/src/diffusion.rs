//! Inter-market diffusion: resources drift between the local and global
//! pools toward the cheaper side's price, conserving mass exactly.
//!
//! Flow is driven by the price ratio. A locally expensive resource (scarce
//! local supply) pulls stock in from the global pool; a locally cheap one
//! bleeds stock out to the global pool. Flow magnitude scales with the
//! resource's initial local supply, so thin markets drift slowly.

use crate::fixed::Fixed64;
use crate::id::ResourceId;
use crate::market::{Market, mix_quality};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};

/// Which pool receives the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowDirection {
    /// Goods move global -> local. Amounts are positive.
    ToLocal,
    /// Goods move local -> global. Amounts are negative.
    ToGlobal,
}

/// One diffusion step for one resource. Produced by [`compute`] as a
/// read-only preview and by [`apply`] with the actually transferred amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffusionInfo {
    pub resource: ResourceId,
    /// `None` when prices are equal or either price is zero.
    pub direction: Option<FlowDirection>,
    /// Signed transfer: positive toward local, negative toward global.
    pub amount: Fixed64,
    pub local_price: Fixed64,
    pub global_price: Fixed64,
}

/// Compute the next diffusion step for a resource without applying it.
pub fn compute(market: &Market, registry: &Registry, resource: ResourceId) -> Option<DiffusionInfo> {
    let local_price = market.local_price(registry, resource)?;
    let global_price = market.global_price(registry, resource)?;
    let def = registry.get_resource(resource)?;

    let mut info = DiffusionInfo {
        resource,
        direction: None,
        amount: Fixed64::ZERO,
        local_price,
        global_price,
    };

    if local_price <= Fixed64::ZERO || global_price <= Fixed64::ZERO {
        return Some(info);
    }

    let ratio = local_price / global_price;
    let base = def.initial_local_supply / Fixed64::from_num(1000);
    let one = Fixed64::from_num(1);

    if local_price > global_price {
        info.direction = Some(FlowDirection::ToLocal);
        info.amount = (ratio - one) * base;
    } else if local_price < global_price {
        info.direction = Some(FlowDirection::ToGlobal);
        info.amount = -((one - ratio) * base);
    }
    Some(info)
}

/// Compute and apply one diffusion step: move the flow between the pools
/// with equal and opposite supply deltas, and pull the receiving pool's
/// quality toward the source pool's, weighted by the transferred quantity.
///
/// The transfer is clamped to the source pool's supply so neither pool goes
/// negative; the returned info carries the clamped amount.
pub fn apply(
    market: &mut Market,
    registry: &Registry,
    resource: ResourceId,
) -> Option<DiffusionInfo> {
    let mut info = compute(market, registry, resource)?;
    let entry = market.entry_mut(resource)?;

    match info.direction {
        Some(FlowDirection::ToLocal) => {
            let moved = info.amount.min(entry.global.supply).max(Fixed64::ZERO);
            entry.local.quality = mix_quality(
                entry.local.supply,
                entry.local.quality,
                moved,
                entry.global.quality,
            );
            entry.local.supply += moved;
            entry.global.supply -= moved;
            info.amount = moved;
        }
        Some(FlowDirection::ToGlobal) => {
            let moved = (-info.amount).min(entry.local.supply).max(Fixed64::ZERO);
            entry.global.quality = mix_quality(
                entry.global.supply,
                entry.global.quality,
                moved,
                entry.local.quality,
            );
            entry.global.supply += moved;
            entry.local.supply -= moved;
            info.amount = -moved;
        }
        None => {}
    }
    Some(info)
}
