//! Server load model.

use crate::config::ServerConfig;
use rand::prelude::*;

/// Latency never drops below this value (ms).
pub const MIN_LATENCY: f64 = 20.0;
/// Latency of an idle server before the floor is applied (ms).
pub const BASE_LATENCY: f64 = 40.0;
/// Active players per extra millisecond of latency.
pub const PLAYERS_PER_MS: f64 = 5.0;

/// Per-minute probability of a transient latency spike.
pub const SPIKE_PROB: f64 = 0.01;
pub const SPIKE_MIN: u32 = 100;
pub const SPIKE_MAX: u32 = 300;

/// Deterministic latency for `active_count` players.
pub fn base_latency(active_count: usize) -> f64 {
    (BASE_LATENCY + active_count as f64 / PLAYERS_PER_MS).max(MIN_LATENCY)
}

/// Latency for the current minute, including an occasional spike.
pub fn latency<R: Rng + ?Sized>(active_count: usize, rng: &mut R) -> f64 {
    let mut latency = base_latency(active_count);
    if rng.random_bool(SPIKE_PROB) {
        latency += rng.random_range(SPIKE_MIN..=SPIKE_MAX) as f64;
    }
    latency
}

pub fn is_overloaded(active_count: usize, capacity: f64) -> bool {
    active_count as f64 > capacity
}

/// Mutable server state of one simulated day.
#[derive(Debug, Clone)]
pub struct Server {
    capacity: f64,
    autoscaling: Option<f64>,
}

impl Server {
    pub fn new(cfg: &ServerConfig) -> Self {
        Self {
            capacity: cfg.capacity,
            autoscaling: cfg.autoscaling.then_some(cfg.autoscaling_step),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Check `active_count` against the capacity, scaling up afterwards if enabled.
    ///
    /// The returned flag always refers to the capacity before scaling.
    pub fn observe(&mut self, active_count: usize) -> bool {
        let overloaded = is_overloaded(active_count, self.capacity);
        if overloaded {
            if let Some(step) = self.autoscaling {
                self.capacity += step;
            }
        }
        overloaded
    }
}
