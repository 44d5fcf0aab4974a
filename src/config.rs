use crate::model::PerKind;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Length and sampling of a simulated day.
    pub day: DayConfig,
    /// Server capacity and autoscaling policy.
    pub server: ServerConfig,
    /// Player arrival curve.
    pub arrival: ArrivalConfig,
    /// Player kind mix and session lengths.
    pub behavior: BehaviorConfig,
    /// Batch of independent days.
    pub batch: BatchConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DayConfig {
    /// Number of simulated minutes.
    pub length_minutes: usize,
    /// Number of minutes between occupancy/latency snapshots.
    pub check_interval: usize,
}

impl Default for DayConfig {
    fn default() -> Self {
        Self {
            length_minutes: 1440,
            check_interval: 10,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Number of active players above which the server is overloaded.
    pub capacity: f64,
    /// Number of parallel server instances sharing the arrivals.
    pub num_servers: usize,
    /// Raise the capacity whenever an overload is observed.
    pub autoscaling: bool,
    /// Capacity added per autoscaling event.
    pub autoscaling_step: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            capacity: 100.0,
            num_servers: 1,
            autoscaling: false,
            autoscaling_step: 50.0,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArrivalConfig {
    /// Expected arrivals per minute far from the peak.
    pub base_rate: f64,
    /// Expected arrivals per minute at the peak.
    pub peak_rate: f64,
    /// Minute of the peak (middle of the day if absent).
    pub peak_minute: Option<f64>,
    /// Width of the peak in minutes.
    pub spread: f64,
    /// Probability that a minute sees any arrivals at all.
    pub burst_prob: f64,
    /// Standard deviation of the arrival count around the expected rate.
    pub std_dev: f64,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            base_rate: 5.0,
            peak_rate: 15.0,
            peak_minute: None,
            spread: 200.0,
            burst_prob: 0.6,
            std_dev: 5.0,
        }
    }
}

/// Gaussian session length of a player kind, in minutes.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorConfig {
    /// Relative arrival weights (normalized internally).
    pub weights: PerKind<f64>,
    /// Session length distributions.
    pub sessions: PerKind<SessionConfig>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            weights: PerKind {
                idler: 0.3,
                casual: 0.5,
                pro: 0.2,
            },
            sessions: PerKind {
                idler: SessionConfig {
                    mean: 10.0,
                    std_dev: 10.0,
                },
                casual: SessionConfig {
                    mean: 55.0,
                    std_dev: 25.0,
                },
                pro: SessionConfig {
                    mean: 240.0,
                    std_dev: 30.0,
                },
            },
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Number of days simulated per `simulate` command.
    pub n_days: usize,
    /// Seed shared by all days; each day uses its own stream.
    pub seed: u64,
    /// Sample each day's capacity uniformly in `[min, max)` and round it.
    pub capacity_range: Option<[f64; 2]>,
    /// Worker threads (available parallelism if absent).
    pub n_threads: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            n_days: 100,
            seed: 0,
            capacity_range: None,
            n_threads: None,
        }
    }
}

impl ArrivalConfig {
    /// Minute of the arrival peak for a day of `length_minutes`.
    pub fn peak_minute(&self, length_minutes: usize) -> f64 {
        self.peak_minute.unwrap_or(length_minutes as f64 / 2.0)
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded. Missing sections and fields take their
    /// default values. Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.day.validate().context("invalid day section")?;
        self.server.validate().context("invalid server section")?;
        self.arrival.validate().context("invalid arrival section")?;
        self.behavior.validate().context("invalid behavior section")?;
        self.batch.validate().context("invalid batch section")?;
        Ok(())
    }
}

impl DayConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.length_minutes, 1..).context("invalid day length")?;
        check_num(self.check_interval, 1..).context("invalid check interval")?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.capacity, 0.0..f64::INFINITY).context("invalid server capacity")?;
        check_num(self.num_servers, 1..).context("invalid number of servers")?;
        check_num(self.autoscaling_step, 0.0..f64::INFINITY)
            .context("invalid autoscaling step")?;
        Ok(())
    }
}

impl ArrivalConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.base_rate, 0.0..f64::INFINITY).context("invalid base rate")?;
        check_num(self.peak_rate, 0.0..f64::INFINITY).context("invalid peak rate")?;
        if let Some(peak_minute) = self.peak_minute {
            check_num(peak_minute, f64::MIN..f64::INFINITY).context("invalid peak minute")?;
        }
        if !(self.spread > 0.0 && self.spread.is_finite()) {
            bail!("spread must be positive and finite, but is {:?}", self.spread);
        }
        check_num(self.burst_prob, 0.0..=1.0).context("invalid burst probability")?;
        check_num(self.std_dev, 0.0..f64::INFINITY).context("invalid arrival std dev")?;
        Ok(())
    }
}

impl BehaviorConfig {
    pub fn validate(&self) -> Result<()> {
        for (kind, &weight) in self.weights.iter() {
            check_num(weight, 0.0..f64::INFINITY)
                .with_context(|| format!("invalid {kind} weight"))?;
        }
        let sum: f64 = self.weights.iter().map(|(_, &weight)| weight).sum();
        if sum <= 0.0 {
            bail!("weights must not all be zero");
        }
        for (kind, session) in self.sessions.iter() {
            check_num(session.mean, f64::MIN..f64::INFINITY)
                .with_context(|| format!("invalid {kind} session mean"))?;
            check_num(session.std_dev, 0.0..f64::INFINITY)
                .with_context(|| format!("invalid {kind} session std dev"))?;
        }
        Ok(())
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.n_days, 1..100_000).context("invalid number of days")?;
        if let Some([min, max]) = self.capacity_range {
            check_num(min, 0.0..f64::INFINITY).context("invalid minimum capacity")?;
            check_num(max, min..f64::INFINITY).context("invalid maximum capacity")?;
            if min == max {
                bail!("capacity range must not be empty");
            }
        }
        if let Some(n_threads) = self.n_threads {
            check_num(n_threads, 1..1024).context("invalid number of threads")?;
        }
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
