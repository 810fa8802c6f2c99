//! Append-only transaction log for every money movement.
//!
//! The log survives game resets by design: the prestige entry written during
//! a reset lands in the same log as the run it closes out.

use crate::fixed::{Days, Fixed64};
use crate::id::{BuildingTypeId, ResourceId};
use serde::{Deserialize, Serialize};

/// What a transaction was for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransactionKind {
    BuildingPurchased { building: BuildingTypeId },
    Sale { resource: ResourceId, amount: Fixed64 },
    Purchase { resource: ResourceId, amount: Fixed64 },
    TechUpgrade { resource: ResourceId, level: u32 },
    RateUpgrade { building: BuildingTypeId, level: u32 },
    QualityUpgrade { building: BuildingTypeId, level: u32 },
    /// Written at game reset; `bonus` is the permanent multiplier gain.
    PrestigeReset { bonus: Fixed64 },
}

/// One money movement. `delta` is signed: income positive, spending
/// negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub day: Days,
    pub delta: Fixed64,
    pub kind: TransactionKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, day: Days, delta: Fixed64, kind: TransactionKind) {
        self.entries.push(Transaction { day, delta, kind });
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Net of all recorded deltas.
    pub fn net_total(&self) -> Fixed64 {
        self.entries
            .iter()
            .fold(Fixed64::ZERO, |acc, t| acc.saturating_add(t.delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64 as fx;

    #[test]
    fn records_in_order() {
        let mut log = TransactionLog::new();
        log.record(
            1,
            fx(-100.0),
            TransactionKind::BuildingPurchased {
                building: BuildingTypeId(0),
            },
        );
        log.record(
            2,
            fx(40.0),
            TransactionKind::Sale {
                resource: ResourceId(0),
                amount: fx(10.0),
            },
        );
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].day, 1);
        assert_eq!(log.entries()[1].day, 2);
        assert_eq!(log.net_total(), fx(-60.0));
    }

    #[test]
    fn empty_log() {
        let log = TransactionLog::new();
        assert!(log.is_empty());
        assert_eq!(log.net_total(), Fixed64::ZERO);
    }
}
