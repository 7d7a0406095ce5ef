use crate::config::Config;
use crate::deviation::{Value, Variant};
use crate::input::InputGenerator;
use crate::stats::{Samples, SamplesReport};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{hint::black_box, time::Instant};

/// Timing statistics of one variant over a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantReport {
    pub variant: Variant,
    /// Time per call, in nanoseconds.
    pub timing: SamplesReport,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    pub variants: Vec<VariantReport>,
    /// Result all variants agreed on, one per trial.
    pub trial_results: Vec<u64>,
}

/// Benchmark driver.
///
/// Generates one input per trial and measures every selected variant on
/// it, warmup first.
pub struct Bencher {
    cfg: Config,
    generator: InputGenerator,
    samples: Vec<Samples>,
}

impl Bencher {
    pub fn new(cfg: Config) -> Result<Self> {
        let generator =
            InputGenerator::new(&cfg.input).context("failed to construct input generator")?;
        let mut samples = Vec::new();
        samples.resize_with(cfg.output.variants.len(), Samples::new);
        Ok(Self {
            cfg,
            generator,
            samples,
        })
    }

    /// Run every trial and collect the results.
    pub fn run(mut self) -> Result<RunResults> {
        let n_trials = self.cfg.schedule.trials;
        let mut trial_results = Vec::with_capacity(n_trials);

        for i_trial in 0..n_trials {
            let input = self.generator.generate();
            let result = self
                .run_trial(&input)
                .with_context(|| format!("failed to run trial {i_trial}"))?;
            trial_results.push(result);

            let progress = 100.0 * (i_trial + 1) as f64 / n_trials as f64;
            log::info!("completed {progress:06.2}% (result {result})");
        }

        let variants = self
            .cfg
            .output
            .variants
            .iter()
            .zip(&self.samples)
            .map(|(&variant, samples)| VariantReport {
                variant,
                timing: samples.report(),
            })
            .collect();

        Ok(RunResults {
            variants,
            trial_results,
        })
    }

    /// Warm up and measure every variant on `input`.
    ///
    /// Returns the result the variants agree on.
    pub fn run_trial(&mut self, input: &[Value]) -> Result<u64> {
        let range = self.cfg.input.range();
        let schedule = &self.cfg.schedule;
        let mut agreed: Option<(Variant, u64)> = None;

        for (&variant, samples) in self.cfg.output.variants.iter().zip(&mut self.samples) {
            for _ in 0..schedule.warmup_iters {
                black_box(variant.compute(black_box(input), range.clone()))?;
            }

            let mut result = None;
            for _ in 0..schedule.measure_iters {
                let start = Instant::now();
                let out = black_box(variant.compute(black_box(input), range.clone()));
                samples.push(start.elapsed().as_nanos() as f64);
                result = Some(out.with_context(|| format!("failed to compute {variant}"))?);
            }
            let result = result.context("no measured iterations")?;
            log::debug!("{variant} = {result} ({} samples)", samples.len());

            match agreed {
                None => agreed = Some((variant, result)),
                Some((first, expected)) if expected != result => {
                    bail!("{variant} returned {result}, but {first} returned {expected}")
                }
                Some(_) => {}
            }
        }

        agreed
            .map(|(_, result)| result)
            .context("no variants selected")
    }
}
