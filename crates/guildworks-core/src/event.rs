//! Typed simulation events, collected onto each tick's report.
//!
//! Tick hooks and UI layers consume these instead of poking at world
//! internals mid-tick. All events carry the day they occurred.

use crate::diffusion::FlowDirection;
use crate::fixed::{Days, Fixed64};
use crate::id::{AchievementId, BuildingTypeId, RecipeId, ResourceId};
use serde::{Deserialize, Serialize};

/// A simulation event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A building finished at least one production cycle this tick.
    Produced {
        building: BuildingTypeId,
        resource: ResourceId,
        cycles: u32,
        amount: Fixed64,
        quality: Fixed64,
        day: Days,
    },
    /// A building wanted to start a cycle but its inputs were missing.
    Stalled {
        building: BuildingTypeId,
        recipe: RecipeId,
        day: Days,
    },
    /// Stock was sold into the local market (manual or auto-sell).
    Sold {
        resource: ResourceId,
        amount: Fixed64,
        revenue: Fixed64,
        day: Days,
    },
    /// Diffusion moved stock between the pools.
    Diffused {
        resource: ResourceId,
        direction: FlowDirection,
        amount: Fixed64,
        day: Days,
    },
    /// An achievement check passed for the first time.
    AchievementUnlocked { achievement: AchievementId, day: Days },
}

/// Discriminant tag for event types, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Produced,
    Stalled,
    Sold,
    Diffused,
    AchievementUnlocked,
}

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Produced { .. } => EventKind::Produced,
            Event::Stalled { .. } => EventKind::Stalled,
            Event::Sold { .. } => EventKind::Sold,
            Event::Diffused { .. } => EventKind::Diffused,
            Event::AchievementUnlocked { .. } => EventKind::AchievementUnlocked,
        }
    }
}
