//! Merging of independent simulated days.

use crate::engine::{RunResult, Snapshot};
use crate::model::PerKind;
use serde::{Deserialize, Serialize};

/// Per-day values kept for display after merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub capacity: f64,
    pub n_players: usize,
    pub happiness_sum: u64,
    pub dropouts: PerKind<usize>,
    pub snapshots: Vec<Snapshot>,
}

impl DaySummary {
    pub fn avg_happiness(&self) -> Option<f64> {
        if self.n_players == 0 {
            return None;
        }
        Some(self.happiness_sum as f64 / self.n_players as f64)
    }

    pub fn n_dropouts(&self) -> usize {
        self.dropouts.iter().map(|(_, &n)| n).sum()
    }
}

/// Combined results of any number of days.
///
/// Counters are summed and lists are concatenated, so [`Aggregate::merge`] is
/// associative, and commutative up to the order of list elements.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub n_days: usize,
    pub n_players: usize,
    pub happiness_sum: u64,
    pub happiness: PerKind<Vec<u8>>,
    pub dropouts: PerKind<usize>,
    pub days: Vec<DaySummary>,
}

impl Aggregate {
    pub fn merge(mut self, other: Aggregate) -> Aggregate {
        self.n_days += other.n_days;
        self.n_players += other.n_players;
        self.happiness_sum += other.happiness_sum;
        for (kind, vals) in other.happiness.iter() {
            self.happiness[kind].extend_from_slice(vals);
            self.dropouts[kind] += other.dropouts[kind];
        }
        self.days.extend(other.days);
        self
    }

    pub fn n_dropouts(&self) -> usize {
        self.dropouts.iter().map(|(_, &n)| n).sum()
    }

    /// Mean terminal happiness over every player of every day.
    pub fn avg_happiness(&self) -> Option<f64> {
        if self.n_players == 0 {
            return None;
        }
        Some(self.happiness_sum as f64 / self.n_players as f64)
    }
}

impl From<RunResult> for Aggregate {
    fn from(result: RunResult) -> Self {
        let happiness_sum = result.happiness_sum();
        let day = DaySummary {
            capacity: result.capacity,
            n_players: result.n_players,
            happiness_sum,
            dropouts: result.dropouts.clone(),
            snapshots: result.snapshots,
        };
        Self {
            n_days: 1,
            n_players: result.n_players,
            happiness_sum,
            happiness: result.happiness,
            dropouts: result.dropouts,
            days: vec![day],
        }
    }
}
