//! Player agents and their behavior types.

use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Index, IndexMut},
};

/// Upper bound of the happiness score.
pub const MAX_HAPPINESS: u8 = 100;

/// Latency (ms) at or above which an overloaded server frustrates players.
pub const FRUSTRATING_LATENCY: f64 = 100.0;

/// Quit propensity gained per minute of overload with high latency.
pub const QUIT_PROPENSITY_GAIN: f64 = 0.01;
/// Quit propensity lost per minute without frustrating conditions.
pub const QUIT_PROPENSITY_DECAY: f64 = 0.02;

/// Behavioral archetype of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Idler,
    Casual,
    Pro,
}

impl PlayerKind {
    pub const ALL: [PlayerKind; 3] = [PlayerKind::Idler, PlayerKind::Casual, PlayerKind::Pro];

    pub fn name(self) -> &'static str {
        match self {
            PlayerKind::Idler => "idler",
            PlayerKind::Casual => "casual",
            PlayerKind::Pro => "pro",
        }
    }
}

impl fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per [`PlayerKind`].
///
/// The set of kinds is closed, so per-kind counters and lists live in a
/// fixed record instead of a map keyed by name.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerKind<T> {
    pub idler: T,
    pub casual: T,
    pub pro: T,
}

impl<T> PerKind<T> {
    pub fn from_fn<F: FnMut(PlayerKind) -> T>(mut f: F) -> Self {
        Self {
            idler: f(PlayerKind::Idler),
            casual: f(PlayerKind::Casual),
            pro: f(PlayerKind::Pro),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerKind, &T)> {
        PlayerKind::ALL.into_iter().map(move |kind| (kind, &self[kind]))
    }

    pub fn map<U, F: FnMut(PlayerKind, &T) -> U>(&self, mut f: F) -> PerKind<U> {
        PerKind::from_fn(|kind| f(kind, &self[kind]))
    }
}

impl<T> Index<PlayerKind> for PerKind<T> {
    type Output = T;

    fn index(&self, kind: PlayerKind) -> &T {
        match kind {
            PlayerKind::Idler => &self.idler,
            PlayerKind::Casual => &self.casual,
            PlayerKind::Pro => &self.pro,
        }
    }
}

impl<T> IndexMut<PlayerKind> for PerKind<T> {
    fn index_mut(&mut self, kind: PlayerKind) -> &mut T {
        match kind {
            PlayerKind::Idler => &mut self.idler,
            PlayerKind::Casual => &mut self.casual,
            PlayerKind::Pro => &mut self.pro,
        }
    }
}

/// Simulated player.
///
/// A player is active while it has session minutes left. Rage quitting ends
/// the session immediately and zeroes the happiness for good.
#[derive(Debug, Clone)]
pub struct Player {
    kind: PlayerKind,
    remaining_minutes: u32,
    happiness: u8,
    quit_propensity: f64,
    rage_quit: bool,
}

impl Player {
    /// Create a new player whose session length is drawn from `session_dist`.
    pub fn new<R: Rng + ?Sized>(kind: PlayerKind, session_dist: &Normal<f64>, rng: &mut R) -> Self {
        // Truncate toward zero, then keep at least one minute.
        let minutes = session_dist.sample(rng).trunc().max(1.0);
        Self {
            kind,
            remaining_minutes: minutes.min(u32::MAX as f64) as u32,
            happiness: MAX_HAPPINESS,
            quit_propensity: 0.0,
            rage_quit: false,
        }
    }

    /// Advance the player by one minute under the given server conditions.
    pub fn tick<R: Rng + ?Sized>(&mut self, is_overloaded: bool, latency: f64, rng: &mut R) {
        if !self.is_active() {
            return;
        }

        // Session time goes first so the last minute still updates happiness.
        self.remaining_minutes -= 1;

        let delta = rng.random_range(1..=2);
        self.happiness = if is_overloaded {
            self.happiness.saturating_sub(delta)
        } else {
            (self.happiness + delta).min(MAX_HAPPINESS)
        };

        if is_overloaded && latency >= FRUSTRATING_LATENCY {
            self.quit_propensity += QUIT_PROPENSITY_GAIN;
            // Used as-is: a propensity of 1 or more always triggers.
            if rng.random::<f64>() < self.quit_propensity {
                self.rage_quit = true;
                self.remaining_minutes = 0;
                self.happiness = 0;
            }
        } else {
            self.quit_propensity = (self.quit_propensity - QUIT_PROPENSITY_DECAY).max(0.0);
        }
    }

    pub fn kind(&self) -> PlayerKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.remaining_minutes > 0
    }

    pub fn is_rage_quit(&self) -> bool {
        self.rage_quit
    }

    pub fn happiness(&self) -> u8 {
        self.happiness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;

    impl Player {
        fn quit_propensity(&self) -> f64 {
            self.quit_propensity
        }

        fn remaining_minutes(&self) -> u32 {
            self.remaining_minutes
        }
    }

    fn long_session() -> Normal<f64> {
        Normal::new(10_000.0, 0.0).unwrap()
    }

    #[test]
    fn session_length_is_at_least_one_minute() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let dist = Normal::new(-50.0, 10.0).unwrap();
        for _ in 0..100 {
            let player = Player::new(PlayerKind::Idler, &dist, &mut rng);
            assert_eq!(player.remaining_minutes(), 1);
            assert!(player.is_active());
        }
    }

    #[test]
    fn new_player_starts_happy_and_calm() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let player = Player::new(PlayerKind::Pro, &long_session(), &mut rng);
        assert_eq!(player.happiness(), MAX_HAPPINESS);
        assert_eq!(player.quit_propensity(), 0.0);
        assert!(!player.is_rage_quit());
        assert_eq!(player.kind(), PlayerKind::Pro);
    }

    #[test]
    fn happiness_stays_in_bounds() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut player = Player::new(PlayerKind::Casual, &long_session(), &mut rng);
        // Overloaded but low latency: happiness drains without rage quitting.
        for _ in 0..200 {
            player.tick(true, 20.0, &mut rng);
            assert!(player.happiness() <= MAX_HAPPINESS);
        }
        assert_eq!(player.happiness(), 0);
        assert!(!player.is_rage_quit());
        for _ in 0..200 {
            player.tick(false, 500.0, &mut rng);
            assert!(player.happiness() <= MAX_HAPPINESS);
        }
        assert_eq!(player.happiness(), MAX_HAPPINESS);
    }

    #[test]
    fn session_counts_down_to_inactive() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let dist = Normal::new(3.0, 0.0).unwrap();
        let mut player = Player::new(PlayerKind::Idler, &dist, &mut rng);
        for expected in [2, 1, 0] {
            player.tick(false, 40.0, &mut rng);
            assert_eq!(player.remaining_minutes(), expected);
        }
        assert!(!player.is_active());
        assert!(!player.is_rage_quit());
        player.tick(false, 40.0, &mut rng);
        assert_eq!(player.remaining_minutes(), 0);
    }

    #[test]
    fn last_minute_still_updates_happiness() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let dist = Normal::new(4.0, 0.0).unwrap();
        let mut player = Player::new(PlayerKind::Casual, &dist, &mut rng);
        for _ in 0..3 {
            player.tick(true, 20.0, &mut rng);
        }
        let unhappy = player.happiness();
        assert!(unhappy < MAX_HAPPINESS);
        assert_eq!(player.remaining_minutes(), 1);

        player.tick(false, 20.0, &mut rng);
        assert!(!player.is_active());
        assert!(player.happiness() > unhappy);
    }

    #[test]
    fn sustained_frustration_ends_in_permanent_rage_quit() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let mut player = Player::new(PlayerKind::Pro, &long_session(), &mut rng);
        // Propensity passes 1 after about 100 minutes, so this must trigger.
        for _ in 0..150 {
            player.tick(true, 250.0, &mut rng);
            if player.is_rage_quit() {
                break;
            }
        }
        assert!(player.is_rage_quit());
        assert!(!player.is_active());
        assert_eq!(player.happiness(), 0);

        for _ in 0..50 {
            player.tick(false, 20.0, &mut rng);
            assert!(player.is_rage_quit());
            assert!(!player.is_active());
            assert_eq!(player.happiness(), 0);
        }
    }

    #[test]
    fn quit_propensity_decays_but_never_below_zero() {
        let mut rng = ChaCha12Rng::seed_from_u64(6);
        let mut player = Player::new(PlayerKind::Casual, &long_session(), &mut rng);
        player.tick(false, 300.0, &mut rng);
        assert_eq!(player.quit_propensity(), 0.0);

        // Overloaded with low latency does not count as frustrating.
        player.tick(true, 99.0, &mut rng);
        assert_eq!(player.quit_propensity(), 0.0);

        for _ in 0..3 {
            player.tick(false, 20.0, &mut rng);
            assert!(player.quit_propensity() >= 0.0);
        }
    }

    #[test]
    fn kind_names_match_config_keys() {
        let names: Vec<_> = PlayerKind::ALL.iter().map(|kind| kind.to_string()).collect();
        assert_eq!(names, ["idler", "casual", "pro"]);
    }

    #[test]
    fn per_kind_indexing_matches_fields() {
        let mut counts = PerKind::<usize>::default();
        counts[PlayerKind::Casual] += 2;
        counts[PlayerKind::Pro] += 1;
        assert_eq!(counts.idler, 0);
        assert_eq!(counts.casual, 2);
        assert_eq!(counts.pro, 1);
        let total: usize = counts.iter().map(|(_, &n)| n).sum();
        assert_eq!(total, 3);
    }
}
