use crate::arrival::Arrivals;
use crate::config::{Config, SessionConfig};
use crate::model::{PerKind, Player, PlayerKind};
use crate::server::{self, Server};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Occupancy and latency sampled at the end of a check interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Minute index the snapshot was taken at.
    pub minute: usize,
    /// Number of active players after the minute was processed.
    pub n_active: usize,
    /// Latency of that minute (ms).
    pub latency: f64,
}

/// Outcome of one simulated day.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Total number of players created during the day.
    pub n_players: usize,
    /// Terminal happiness of every player, by kind.
    pub happiness: PerKind<Vec<u8>>,
    /// Number of rage quits, by kind.
    pub dropouts: PerKind<usize>,
    /// Snapshots taken every check interval.
    pub snapshots: Vec<Snapshot>,
    /// Server capacity at the end of the day.
    pub capacity: f64,
}

impl RunResult {
    /// Total number of rage quits.
    pub fn n_dropouts(&self) -> usize {
        self.dropouts.iter().map(|(_, &n)| n).sum()
    }

    /// Sum of every terminal happiness value.
    pub fn happiness_sum(&self) -> u64 {
        self.happiness
            .iter()
            .flat_map(|(_, vals)| vals.iter())
            .map(|&val| val as u64)
            .sum()
    }

    /// Mean terminal happiness, or `None` if no player joined.
    pub fn avg_happiness(&self) -> Option<f64> {
        if self.n_players == 0 {
            return None;
        }
        Some(self.happiness_sum() as f64 / self.n_players as f64)
    }

    fn record(&mut self, player: &Player) {
        let kind = player.kind();
        self.happiness[kind].push(player.happiness());
        if player.is_rage_quit() {
            self.dropouts[kind] += 1;
        }
    }
}

/// Simulation engine for a single day.
///
/// Holds the day's configuration, the active players and the random number
/// generator. Every random draw of the day goes through `rng`.
pub struct Engine {
    length_minutes: usize,
    check_interval: usize,
    arrivals: Arrivals,
    session_dists: PerKind<Normal<f64>>,
    server: Server,
    players: Vec<Player>,
    result: RunResult,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` for a day described by `cfg`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid. Nothing is
    /// simulated in that case.
    pub fn new(cfg: &Config, rng: ChaCha12Rng) -> Result<Self> {
        cfg.day.validate().context("invalid day config")?;
        cfg.server.validate().context("invalid server config")?;
        cfg.arrival.validate().context("invalid arrival config")?;
        cfg.behavior.validate().context("invalid behavior config")?;

        let arrivals = Arrivals::new(
            &cfg.arrival,
            &cfg.behavior,
            cfg.day.length_minutes,
            cfg.server.num_servers,
        )
        .context("failed to construct arrivals")?;

        let sessions = &cfg.behavior.sessions;
        let session_dists = PerKind {
            idler: session_dist(PlayerKind::Idler, &sessions.idler)?,
            casual: session_dist(PlayerKind::Casual, &sessions.casual)?,
            pro: session_dist(PlayerKind::Pro, &sessions.pro)?,
        };

        Ok(Self {
            length_minutes: cfg.day.length_minutes,
            check_interval: cfg.day.check_interval,
            arrivals,
            session_dists,
            server: Server::new(&cfg.server),
            players: Vec::new(),
            result: RunResult {
                snapshots: Vec::with_capacity(cfg.day.length_minutes / cfg.day.check_interval),
                ..RunResult::default()
            },
            rng,
        })
    }

    /// Simulate the whole day and return its result.
    pub fn run(mut self) -> RunResult {
        for minute in 0..self.length_minutes {
            self.perform_minute(minute);
        }

        // Everyone still online logs off at the end of the day.
        for player in self.players.drain(..) {
            self.result.record(&player);
        }

        self.result.capacity = self.server.capacity();

        log::debug!(
            "day finished: {} players, dropouts {:?}",
            self.result.n_players,
            self.result.dropouts
        );

        self.result
    }

    fn perform_minute(&mut self, minute: usize) {
        // Conditions are set by the players online before this minute's arrivals.
        let n_active = self.players.len();
        let is_overloaded = self.server.observe(n_active);
        let latency = server::latency(n_active, &mut self.rng);

        self.spawn_players(minute);

        for player in &mut self.players {
            player.tick(is_overloaded, latency, &mut self.rng);
        }

        let result = &mut self.result;
        self.players.retain(|player| {
            if player.is_active() {
                return true;
            }
            result.record(player);
            false
        });

        if (minute + 1) % self.check_interval == 0 {
            let snapshot = Snapshot {
                minute,
                n_active: self.players.len(),
                latency,
            };
            log::trace!("{snapshot:?}");
            self.result.snapshots.push(snapshot);
        }
    }

    fn spawn_players(&mut self, minute: usize) {
        let n_new = self.arrivals.spawn_count(minute, &mut self.rng);
        for _ in 0..n_new {
            let kind = self.arrivals.pick_kind(&mut self.rng);
            let player = Player::new(kind, &self.session_dists[kind], &mut self.rng);
            self.players.push(player);
        }
        self.result.n_players += n_new;
    }
}

fn session_dist(kind: PlayerKind, session: &SessionConfig) -> Result<Normal<f64>> {
    Normal::new(session.mean, session.std_dev)
        .with_context(|| format!("failed to build {kind} session distribution"))
}

/// Simulate one day described by `cfg` using the random stream `rng`.
pub fn simulate_day(cfg: &Config, rng: ChaCha12Rng) -> Result<RunResult> {
    let engine = Engine::new(cfg, rng).context("failed to construct engine")?;
    Ok(engine.run())
}

/// Random stream of day `day_idx` within a batch seeded with `seed`.
pub fn day_rng(seed: u64, day_idx: usize) -> ChaCha12Rng {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    rng.set_stream(day_idx as u64);
    rng
}
