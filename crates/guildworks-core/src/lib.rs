//! Guildworks Core -- the simulation engine of an incremental
//! production-and-trade game.
//!
//! Production facilities convert inputs into outputs over discrete ticks,
//! gated by research and technology, feeding a two-tier (local/global)
//! market with price formation, quality propagation, and mass-conserving
//! inter-market diffusion. Everything is deterministic: quantities are
//! Q32.32 fixed-point, the only randomness (batch compositions) flows
//! through a seeded [`rng::SimRng`], and ticks are bit-for-bit reproducible.
//!
//! # Six-Phase Tick Pipeline
//!
//! Each call to [`world::WorldState::tick`] increments the day counter and
//! then runs, in order:
//!
//! 1. **Research** -- accrue research points from researcher headcount.
//! 2. **Production** -- advance every built facility; failures are recorded
//!    on the report, never fatal.
//! 3. **AutoSell** -- sell surplus stock for every resource with a rule.
//! 4. **Diffusion** -- drift supply between the local and global pools.
//! 5. **Hooks** -- notify registered tick hooks.
//! 6. **Achievements** -- evaluate unlock conditions, apply rewards.
//!
//! The order is data ([`world::TICK_PHASES`]), not a hardcoded sequence.
//!
//! # Key Types
//!
//! - [`world::WorldState`] -- the explicit state aggregate and tick
//!   orchestrator. Owned by the host; no global singletons.
//! - [`registry::Registry`] -- immutable definitions of resources, recipes,
//!   and building types (frozen at startup).
//! - [`building::Building`] -- the pay-at-start production state machine.
//! - [`inventory::Inventory`] -- per-resource stock plus the FIFO batch
//!   store for composite resources.
//! - [`market::Market`] -- local and global pools with price formation.
//! - [`diffusion`] -- price-differential flow between the pools.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod achievement;
pub mod building;
pub mod diffusion;
pub mod event;
pub mod fixed;
pub mod id;
pub mod inventory;
pub mod ledger;
pub mod market;
pub mod registry;
pub mod research;
pub mod rng;
pub mod technology;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
