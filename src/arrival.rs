//! Player arrival process.

use crate::config::{ArrivalConfig, BehaviorConfig};
use crate::model::PlayerKind;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::{Bernoulli, Normal, weighted::WeightedIndex};

/// Per-minute arrival sampler for one simulated day.
///
/// Holds the distributions built from the configuration so that a day does
/// not rebuild them every minute.
pub struct Arrivals {
    base_rate: f64,
    peak_rate: f64,
    peak_minute: f64,
    spread: f64,
    noise_dist: Normal<f64>,
    burst_dist: Bernoulli,
    admit_dist: Bernoulli,
    kind_dist: WeightedIndex<f64>,
}

impl Arrivals {
    pub fn new(
        arrival: &ArrivalConfig,
        behavior: &BehaviorConfig,
        length_minutes: usize,
        num_servers: usize,
    ) -> Result<Self> {
        let weights: Vec<f64> = PlayerKind::ALL
            .iter()
            .map(|&kind| behavior.weights[kind])
            .collect();
        Ok(Self {
            base_rate: arrival.base_rate,
            peak_rate: arrival.peak_rate,
            peak_minute: arrival.peak_minute(length_minutes),
            spread: arrival.spread,
            noise_dist: Normal::new(0.0, arrival.std_dev)
                .context("failed to build arrival noise distribution")?,
            burst_dist: Bernoulli::new(arrival.burst_prob)
                .context("failed to build burst distribution")?,
            admit_dist: Bernoulli::new(1.0 / num_servers as f64)
                .context("failed to build admission distribution")?,
            kind_dist: WeightedIndex::new(&weights).context("failed to build kind distribution")?,
        })
    }

    /// Expected number of arrivals at `minute`: a single Gaussian bump over the day.
    pub fn expected_rate(&self, minute: usize) -> f64 {
        let offset = minute as f64 - self.peak_minute;
        self.base_rate
            + (self.peak_rate - self.base_rate)
                * (-offset.powi(2) / (2.0 * self.spread.powi(2))).exp()
    }

    /// Number of players admitted to this server at `minute`.
    pub fn spawn_count<R: Rng + ?Sized>(&self, minute: usize, rng: &mut R) -> usize {
        if !self.burst_dist.sample(rng) {
            return 0;
        }

        // Truncated toward zero.
        let rate = self.expected_rate(minute) + self.noise_dist.sample(rng);
        let candidates = rate.abs() as usize;

        (0..candidates)
            .filter(|_| self.admit_dist.sample(rng))
            .count()
    }

    /// Draw the kind of a newly admitted player.
    pub fn pick_kind<R: Rng + ?Sized>(&self, rng: &mut R) -> PlayerKind {
        PlayerKind::ALL[self.kind_dist.sample(rng)]
    }
}
