use crate::aggregate::Aggregate;
use crate::analysis::Report;
use crate::config::Config;
use crate::engine::{RunResult, day_rng, simulate_day};
use anyhow::{Context, Result, bail};
use glob::glob;
use rand::prelude::*;
use rand_distr::Uniform;
use rayon::prelude::*;
use rmp_serde::{decode, encode};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Simulate `n_days` new days (the configured batch size if `None`).
    ///
    /// Day indices continue after the days already present, so every call
    /// uses fresh random streams.
    pub fn simulate_batch(&self, n_days: Option<usize>) -> Result<()> {
        let n_days = n_days.unwrap_or(self.cfg.batch.n_days);
        let day_indices = self.day_indices().context("failed to list day files")?;
        let first_idx = day_indices.last().map_or(0, |&last_idx| last_idx + 1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.cfg.batch.n_threads.unwrap_or(0))
            .build()
            .context("failed to build thread pool")?;
        log::info!(
            "simulating days {first_idx}..{} on {} threads",
            first_idx + n_days,
            pool.current_num_threads()
        );

        let start = Instant::now();
        pool.install(|| {
            (first_idx..first_idx + n_days)
                .into_par_iter()
                .try_for_each(|day_idx| {
                    self.run_day(day_idx)
                        .with_context(|| format!("failed to simulate day {day_idx}"))
                })
        })?;
        log::info!("simulated {n_days} days in {:.2?}", start.elapsed());

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let day_indices = self.day_indices().context("failed to list day files")?;
        if day_indices.is_empty() {
            bail!("no simulated days in {:?}", self.sim_dir);
        }
        log::info!("analyzing {} days", day_indices.len());

        let agg = day_indices
            .into_par_iter()
            .map(|day_idx| -> Result<Aggregate> {
                let file = self.day_file(day_idx);
                let result =
                    load_day(&file).with_context(|| format!("failed to load {file:?}"))?;
                Ok(Aggregate::from(result))
            })
            .try_reduce(Aggregate::default, |a, b| Ok(a.merge(b)))?;

        let report = Report::new(&agg);
        report.log_summary();

        let analysis_file = self.analysis_file();
        report
            .save(&analysis_file)
            .context("failed to save report")?;
        log::info!("wrote {analysis_file:?}");

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        let pattern = self.sim_dir.join("day-*.msgpack*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        for file in glob(pattern).context("failed to glob day files")? {
            let file = file.context("failed to read glob entry")?;
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
        }

        let analysis_file = self.analysis_file();
        if analysis_file.exists() {
            fs::remove_file(&analysis_file)
                .with_context(|| format!("failed to remove {analysis_file:?}"))?;
        }

        log::info!("cleaned {:?}", self.sim_dir);

        Ok(())
    }

    fn run_day(&self, day_idx: usize) -> Result<()> {
        let mut rng = day_rng(self.cfg.batch.seed, day_idx);

        let mut cfg = self.cfg.clone();
        if let Some([min, max]) = self.cfg.batch.capacity_range {
            let capacity_dist = Uniform::new(min, max)?;
            cfg.server.capacity = capacity_dist.sample(&mut rng).round();
        }

        let result = simulate_day(&cfg, rng)?;
        match result.avg_happiness() {
            Some(avg) => log::info!(
                "day {day_idx}: capacity {}, {} players, {} dropouts, happiness {avg:.2}",
                cfg.server.capacity,
                result.n_players,
                result.n_dropouts()
            ),
            None => log::info!(
                "day {day_idx}: capacity {}, no players",
                cfg.server.capacity
            ),
        }
        log::debug!("day {day_idx}: dropouts {:?}", result.dropouts);

        save_day(self.day_file(day_idx), &result)
    }

    /// Sorted indices of the completed day files.
    ///
    /// Days of an aborted batch may finish out of order, so the indices can
    /// have holes.
    fn day_indices(&self) -> Result<Vec<usize>> {
        let pattern = self.sim_dir.join("day-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut day_indices = Vec::new();
        for file in glob(pattern).context("failed to glob day files")? {
            let file = file.context("failed to read glob entry")?;
            match parse_day_idx(&file) {
                Some(day_idx) => day_indices.push(day_idx),
                None => log::warn!("ignoring {file:?}"),
            }
        }
        day_indices.sort_unstable();
        Ok(day_indices)
    }

    fn day_file(&self, day_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("day-{day_idx:04}.msgpack"))
    }

    fn analysis_file(&self) -> PathBuf {
        self.sim_dir.join("analysis.toml")
    }
}

fn parse_day_idx(file: &Path) -> Option<usize> {
    let stem = file.file_stem()?.to_str()?;
    stem.strip_prefix("day-")?.parse().ok()
}

/// Write a day result; the file only appears once it is complete.
fn save_day<P: AsRef<Path>>(file: P, result: &RunResult) -> Result<()> {
    let file = file.as_ref();
    let tmp_file = file.with_extension("msgpack.tmp");
    {
        let tmp = File::create(&tmp_file)
            .with_context(|| format!("failed to create {tmp_file:?}"))?;
        let mut writer = BufWriter::new(tmp);
        encode::write(&mut writer, result).context("failed to serialize result")?;
        writer.flush().context("failed to flush writer stream")?;
    }
    fs::rename(&tmp_file, file)
        .with_context(|| format!("failed to rename {tmp_file:?} to {file:?}"))?;
    Ok(())
}

fn load_day<P: AsRef<Path>>(file: P) -> Result<RunResult> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let result = decode::from_read(&mut reader).context("failed to deserialize result")?;
    Ok(result)
}
