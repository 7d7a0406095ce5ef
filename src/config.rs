use crate::counts::CountTable;
use crate::deviation::{Value, Variant};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, ops::RangeInclusive, path::Path};

/// Benchmark configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generated input parameters.
    pub input: InputConfig,

    /// Trial and iteration counts.
    pub schedule: ScheduleConfig,

    /// Selection of measured variants.
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Number of values per generated input.
    pub len: usize,
    /// Smallest generated value; also the lower bound of the count table.
    pub min_value: Value,
    /// Largest generated value; also the upper bound of the count table.
    pub max_value: Value,
    /// Random seed. Seeded from the OS if absent.
    pub seed: Option<u64>,
}

impl InputConfig {
    pub fn range(&self) -> RangeInclusive<Value> {
        self.min_value..=self.max_value
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Number of freshly generated inputs per run.
    pub trials: usize,
    /// Unmeasured iterations per variant and trial.
    pub warmup_iters: usize,
    /// Measured iterations per variant and trial.
    pub measure_iters: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Variants to measure, in order.
    #[serde(default = "all_variants")]
    pub variants: Vec<Variant>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            variants: all_variants(),
        }
    }
}

fn all_variants() -> Vec<Variant> {
    Variant::ALL.to_vec()
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_num(self.input.len, 1..=100_000_000).context("invalid input length")?;
        if self.input.min_value > self.input.max_value {
            bail!(
                "minimum value {} must not exceed maximum value {}",
                self.input.min_value,
                self.input.max_value
            );
        }
        CountTable::new(self.input.range()).context("invalid value range")?;

        check_num(self.schedule.trials, 1..=100).context("invalid number of trials")?;
        check_num(self.schedule.warmup_iters, 0..=10_000)
            .context("invalid number of warmup iterations")?;
        check_num(self.schedule.measure_iters, 1..=10_000)
            .context("invalid number of measured iterations")?;

        let variants = &self.output.variants;
        if variants.is_empty() {
            bail!("at least one variant must be selected");
        }
        for (i_variant, variant) in variants.iter().enumerate() {
            if variants[..i_variant].contains(variant) {
                bail!("variant {variant} is selected more than once");
            }
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
