use crate::bench::{Bencher, RunResults};
use crate::config::Config;
use crate::deviation::Variant;
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result, bail};
use glob::glob;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Mean time per call of one variant, accumulated over runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSummary {
    pub variant: Variant,
    /// Statistics of the per-run mean times, in nanoseconds.
    pub mean_time: AccumulatorReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub n_runs: usize,
    pub variants: Vec<VariantSummary>,
}

pub struct Manager {
    bench_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(bench_dir: P) -> Result<Self> {
        let bench_dir = bench_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(bench_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { bench_dir, cfg })
    }

    pub fn run_bench(&self) -> Result<()> {
        let bencher = Bencher::new(self.cfg.clone()).context("failed to construct bencher")?;
        let results = bencher.run().context("failed to run benchmark")?;

        for report in &results.variants {
            log::info!(
                "{:<8} mean {:>14.1} ns, median {:>14.1} ns, sem {:>10.1} ns",
                report.variant.name(),
                report.timing.mean,
                report.timing.median,
                report.timing.sem
            );
        }

        // The run dir only appears once there are results to put in it.
        let run_idx = self
            .run_dirs()
            .context("failed to list run dirs")?
            .last()
            .map_or(0, |(run_idx, _)| run_idx + 1);

        let run_dir = self.run_dir(run_idx);
        fs::create_dir(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let results_file = self.results_file(run_idx);
        write_msgpack(&results_file, &results)
            .with_context(|| format!("failed to write {results_file:?}"))?;

        Ok(())
    }

    pub fn analyze_runs(&self) -> Result<()> {
        let run_dirs = self.run_dirs().context("failed to list run dirs")?;

        let variants = &self.cfg.output.variants;
        let mut acc_vec = Vec::new();
        acc_vec.resize_with(variants.len(), Accumulator::new);

        let mut n_runs = 0;
        for (run_idx, run_dir) in run_dirs {
            let results_file = self.results_file(run_idx);
            if !results_file.is_file() {
                log::warn!("skipping {run_dir:?} without results");
                continue;
            }
            let results: RunResults = read_msgpack(&results_file)
                .with_context(|| format!("failed to read {results_file:?}"))?;

            for report in &results.variants {
                let Some(i_variant) = variants.iter().position(|&v| v == report.variant) else {
                    log::warn!("skipping unselected variant {}", report.variant);
                    continue;
                };
                acc_vec[i_variant].add(report.timing.mean);
            }
            n_runs += 1;
        }
        if n_runs == 0 {
            bail!("no runs with results found in {:?}", self.bench_dir);
        }

        let summary = Summary {
            n_runs,
            variants: variants
                .iter()
                .zip(&acc_vec)
                .map(|(&variant, acc)| VariantSummary {
                    variant,
                    mean_time: acc.report(),
                })
                .collect(),
        };

        for entry in &summary.variants {
            log::info!(
                "{:<8} {:>14.1} ns +- {:>12.1} ns over {} runs",
                entry.variant.name(),
                entry.mean_time.mean,
                entry.mean_time.std_dev,
                entry.mean_time.n_vals
            );
        }

        let summary_file = self.summary_file();
        write_msgpack(&summary_file, &summary)
            .with_context(|| format!("failed to write {summary_file:?}"))?;

        Ok(())
    }

    pub fn clean_runs(&self) -> Result<()> {
        let run_dirs = self.run_dirs().context("failed to list run dirs")?;
        for (_, run_dir) in run_dirs {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        let summary_file = self.summary_file();
        if summary_file.exists() {
            fs::remove_file(&summary_file)
                .with_context(|| format!("failed to remove {summary_file:?}"))?;
            log::info!("removed {summary_file:?}");
        }

        Ok(())
    }

    /// Existing run dirs with their indices, in ascending index order.
    fn run_dirs(&self) -> Result<Vec<(usize, PathBuf)>> {
        let pattern = self.bench_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut run_dirs: Vec<(usize, PathBuf)> = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .filter_map(|p| {
                let run_idx = p.file_name()?.to_str()?.strip_prefix("run-")?.parse().ok()?;
                Some((run_idx, p))
            })
            .collect();
        run_dirs.sort_unstable_by_key(|&(run_idx, _)| run_idx);
        Ok(run_dirs)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.bench_dir.join(format!("run-{run_idx:04}"))
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.msgpack")
    }

    fn summary_file(&self) -> PathBuf {
        self.bench_dir.join("summary.msgpack")
    }
}

fn write_msgpack<T: Serialize>(file: &Path, value: &T) -> Result<()> {
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, value).context("failed to serialize value")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

fn read_msgpack<T: DeserializeOwned>(file: &Path) -> Result<T> {
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let value = decode::from_read(&mut reader).context("failed to deserialize value")?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const CONFIG: &str = r#"
[input]
len = 2000
min_value = 1
max_value = 4
seed = 5

[schedule]
trials = 2
warmup_iters = 1
measure_iters = 3

[output]
variants = ["lookup", "table", "raw"]
"#;

    fn bench_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("absdev-manager-{name}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), CONFIG).unwrap();
        dir
    }

    fn run_idxs(mgr: &Manager) -> Vec<usize> {
        mgr.run_dirs()
            .unwrap()
            .into_iter()
            .map(|(run_idx, _)| run_idx)
            .collect()
    }

    #[test]
    fn run_analyze_clean() {
        let dir = bench_dir("workflow");
        let mgr = Manager::new(&dir).unwrap();

        mgr.run_bench().unwrap();
        mgr.run_bench().unwrap();
        assert_eq!(run_idxs(&mgr), vec![0, 1]);

        let results: RunResults = read_msgpack(&mgr.results_file(1)).unwrap();
        assert_eq!(results.trial_results.len(), 2);
        assert_eq!(results.variants.len(), 3);

        mgr.analyze_runs().unwrap();
        let summary: Summary = read_msgpack(&mgr.summary_file()).unwrap();
        assert_eq!(summary.n_runs, 2);
        assert_eq!(summary.variants.len(), 3);
        assert!(summary.variants.iter().all(|v| v.mean_time.n_vals == 2));

        mgr.clean_runs().unwrap();
        assert!(run_idxs(&mgr).is_empty());
        assert!(!mgr.summary_file().exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn analyze_skips_run_dirs_without_results() {
        let dir = bench_dir("orphan");
        let mgr = Manager::new(&dir).unwrap();

        mgr.run_bench().unwrap();
        fs::create_dir(mgr.run_dir(1)).unwrap();

        mgr.analyze_runs().unwrap();
        let summary: Summary = read_msgpack(&mgr.summary_file()).unwrap();
        assert_eq!(summary.n_runs, 1);

        // the next run goes after the orphan instead of into it
        mgr.run_bench().unwrap();
        assert_eq!(run_idxs(&mgr), vec![0, 1, 2]);
        assert!(mgr.results_file(2).is_file());
        assert!(!mgr.results_file(1).exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn new_runs_never_reuse_an_index_after_a_gap() {
        let dir = bench_dir("gap");
        let mgr = Manager::new(&dir).unwrap();

        mgr.run_bench().unwrap();
        mgr.run_bench().unwrap();
        let kept = fs::read(mgr.results_file(1)).unwrap();
        fs::remove_dir_all(mgr.run_dir(0)).unwrap();

        mgr.run_bench().unwrap();
        assert_eq!(run_idxs(&mgr), vec![1, 2]);
        assert_eq!(fs::read(mgr.results_file(1)).unwrap(), kept);

        mgr.analyze_runs().unwrap();
        let summary: Summary = read_msgpack(&mgr.summary_file()).unwrap();
        assert_eq!(summary.n_runs, 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn ignores_dirs_that_are_not_runs() {
        let dir = bench_dir("foreign");
        fs::create_dir(dir.join("run-old")).unwrap();
        let mgr = Manager::new(&dir).unwrap();

        mgr.run_bench().unwrap();
        assert_eq!(run_idxs(&mgr), vec![0]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn analyze_without_runs_fails() {
        let dir = bench_dir("empty");
        let mgr = Manager::new(&dir).unwrap();
        assert!(mgr.analyze_runs().is_err());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_config_fails() {
        let dir = env::temp_dir().join(format!("absdev-manager-missing-{}", std::process::id()));
        assert!(Manager::new(dir).is_err());
    }
}
