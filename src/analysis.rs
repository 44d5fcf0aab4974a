use crate::aggregate::{Aggregate, DaySummary};
use crate::engine::Snapshot;
use crate::model::{FRUSTRATING_LATENCY, PerKind};
use crate::stats::{Accumulator, AccumulatorReport, compute_mean, compute_median};
use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::Path};

/// Average happiness a day must reach to count as passed.
pub const PASS_HAPPINESS: f64 = 75.0;

/// Summary of a single day.
#[derive(Debug, Serialize)]
pub struct DayReport {
    pub capacity: f64,
    pub n_players: usize,
    pub n_dropouts: usize,
    pub avg_happiness: Option<f64>,
    pub passed: Option<bool>,
    pub mean_latency: f64,
    /// Percentage of latency samples at or above the frustration threshold.
    pub pct_high_latency: f64,
    pub dropouts: PerKind<usize>,
}

impl DayReport {
    pub fn new(day: &DaySummary) -> Self {
        let latencies: Vec<_> = day.snapshots.iter().map(|s| s.latency).collect();
        let n_high = latencies
            .iter()
            .filter(|&&latency| latency >= FRUSTRATING_LATENCY)
            .count();
        let pct_high_latency = if latencies.is_empty() {
            f64::NAN
        } else {
            100.0 * n_high as f64 / latencies.len() as f64
        };
        let avg_happiness = day.avg_happiness();
        Self {
            capacity: day.capacity,
            n_players: day.n_players,
            n_dropouts: day.n_dropouts(),
            avg_happiness,
            passed: avg_happiness.map(|avg| avg >= PASS_HAPPINESS),
            mean_latency: compute_mean(&latencies),
            pct_high_latency,
            dropouts: day.dropouts.clone(),
        }
    }
}

/// Outcome of one player kind over all days.
#[derive(Debug, Serialize)]
pub struct KindReport {
    pub n_players: usize,
    pub n_dropouts: usize,
    pub dropout_rate: f64,
    pub mean_dropouts_per_day: f64,
    pub happiness_mean: f64,
    pub happiness_std_dev: f64,
    pub happiness_median: f64,
}

/// Report of a whole batch of days.
///
/// Every value except the order of `days` is independent of the order in
/// which the days were merged.
#[derive(Debug, Serialize)]
pub struct Report {
    pub n_days: usize,
    pub n_players: usize,
    pub n_dropouts: usize,
    pub avg_happiness: Option<f64>,
    pub n_passed: usize,
    pub n_failed: usize,
    /// Days without any player, which can be neither passed nor failed.
    pub n_empty: usize,
    pub pct_passed: f64,
    /// Estimated overload point: capacity of the day followed by the biggest
    /// rise in mean latency, with days ordered by capacity.
    pub overload_capacity: Option<f64>,
    /// Mean number of active players at each snapshot index.
    pub mean_active: Vec<f64>,
    /// Mean latency at each snapshot index.
    pub mean_latency: Vec<f64>,
    /// Distribution of the per-day average happiness.
    pub day_happiness: AccumulatorReport,
    pub kinds: PerKind<KindReport>,
    pub days: Vec<DayReport>,
}

impl Report {
    pub fn new(agg: &Aggregate) -> Self {
        let days: Vec<_> = agg.days.iter().map(DayReport::new).collect();

        let n_passed = days.iter().filter(|d| d.passed == Some(true)).count();
        let n_failed = days.iter().filter(|d| d.passed == Some(false)).count();
        let n_empty = days.len() - n_passed - n_failed;
        let n_judged = n_passed + n_failed;
        let pct_passed = if n_judged == 0 {
            f64::NAN
        } else {
            100.0 * n_passed as f64 / n_judged as f64
        };

        let mut day_avgs: Vec<_> = days.iter().filter_map(|d| d.avg_happiness).collect();
        day_avgs.sort_by(f64::total_cmp);
        let day_happiness = day_avgs.into_iter().collect::<Accumulator>().report();

        let kinds = agg.happiness.map(|kind, vals| {
            let mut vals: Vec<_> = vals.iter().map(|&val| val as f64).collect();
            vals.sort_by(f64::total_cmp);
            let acc_report = vals.iter().copied().collect::<Accumulator>().report();
            let n_dropouts = agg.dropouts[kind];
            KindReport {
                n_players: vals.len(),
                n_dropouts,
                dropout_rate: if vals.is_empty() {
                    f64::NAN
                } else {
                    n_dropouts as f64 / vals.len() as f64
                },
                mean_dropouts_per_day: if agg.n_days == 0 {
                    f64::NAN
                } else {
                    n_dropouts as f64 / agg.n_days as f64
                },
                happiness_mean: acc_report.mean,
                happiness_std_dev: acc_report.std_dev,
                happiness_median: compute_median(&vals),
            }
        });

        Self {
            n_days: agg.n_days,
            n_players: agg.n_players,
            n_dropouts: agg.n_dropouts(),
            avg_happiness: agg.avg_happiness(),
            n_passed,
            n_failed,
            n_empty,
            pct_passed,
            overload_capacity: overload_capacity(&days),
            mean_active: snapshot_curve(&agg.days, |s| s.n_active as f64),
            mean_latency: snapshot_curve(&agg.days, |s| s.latency),
            day_happiness,
            kinds,
            days,
        }
    }

    /// Write the report to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let contents = toml::to_string_pretty(self).context("failed to serialize report")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }

    pub fn log_summary(&self) {
        log::info!(
            "{} days, {} players, {} dropouts",
            self.n_days,
            self.n_players,
            self.n_dropouts
        );
        match self.avg_happiness {
            Some(avg) => log::info!("average happiness {avg:.2}"),
            None => log::info!("average happiness undefined (no players)"),
        }
        log::info!(
            "passed {} / failed {} / empty {} ({:.1}% passed)",
            self.n_passed,
            self.n_failed,
            self.n_empty,
            self.pct_passed
        );
        if let Some(capacity) = self.overload_capacity {
            log::info!("estimated overload point at capacity {capacity}");
        }
        for (kind, report) in self.kinds.iter() {
            log::info!(
                "{kind}: {} dropouts ({:.2} per day), happiness mean {:.2} median {:.2}",
                report.n_dropouts,
                report.mean_dropouts_per_day,
                report.happiness_mean,
                report.happiness_median
            );
        }
    }
}

/// Capacity at the biggest jump in mean latency between consecutive days.
///
/// Needs at least two days with latency samples.
fn overload_capacity(days: &[DayReport]) -> Option<f64> {
    let mut points: Vec<_> = days
        .iter()
        .filter(|d| !d.mean_latency.is_nan())
        .map(|d| (d.capacity, d.mean_latency))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut best: Option<(f64, f64)> = None;
    for pair in points.windows(2) {
        let jump = pair[1].1 - pair[0].1;
        if best.is_none_or(|(best_jump, _)| jump > best_jump) {
            best = Some((jump, pair[0].0));
        }
    }
    best.map(|(_, capacity)| capacity)
}

/// Mean of `val` at each snapshot index over the days that reached it.
fn snapshot_curve<F>(days: &[DaySummary], val: F) -> Vec<f64>
where
    F: Fn(&Snapshot) -> f64,
{
    let len = days.iter().map(|d| d.snapshots.len()).max().unwrap_or(0);
    (0..len)
        .map(|idx| {
            let mut vals: Vec<_> = days
                .iter()
                .filter_map(|d| d.snapshots.get(idx))
                .map(&val)
                .collect();
            vals.sort_by(f64::total_cmp);
            compute_mean(&vals)
        })
        .collect()
}
