use crate::config::InputConfig;
use crate::deviation::Value;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;

/// Generator of uniformly distributed benchmark inputs.
pub struct InputGenerator {
    len: usize,
    dist: Uniform<Value>,
    rng: ChaCha12Rng,
}

impl InputGenerator {
    /// Create a generator seeded from `cfg.seed`, or from the OS if it is unset.
    pub fn new(cfg: &InputConfig) -> Result<Self> {
        let rng = match cfg.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng().context("failed to seed rng")?,
        };
        let dist = Uniform::new_inclusive(cfg.min_value, cfg.max_value)
            .context("failed to construct value distribution")?;

        Ok(Self {
            len: cfg.len,
            dist,
            rng,
        })
    }

    /// Generate a fresh input of the configured length.
    pub fn generate(&mut self) -> Vec<Value> {
        (0..self.len)
            .map(|_| self.dist.sample(&mut self.rng))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_config(seed: Option<u64>) -> InputConfig {
        InputConfig {
            len: 1000,
            min_value: 1,
            max_value: 4,
            seed,
        }
    }

    #[test]
    fn generates_values_in_range() {
        let mut generator = InputGenerator::new(&input_config(None)).unwrap();
        let values = generator.generate();
        assert_eq!(values.len(), 1000);
        assert!(values.iter().all(|value| (1..=4).contains(value)));
        for expected in 1..=4 {
            assert!(values.contains(&expected), "{expected} never generated");
        }
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let mut a = InputGenerator::new(&input_config(Some(3))).unwrap();
        let mut b = InputGenerator::new(&input_config(Some(3))).unwrap();
        assert_eq!(a.generate(), b.generate());
        assert_eq!(a.generate(), b.generate());
    }

    #[test]
    fn successive_inputs_differ() {
        let mut generator = InputGenerator::new(&input_config(Some(3))).unwrap();
        assert_ne!(generator.generate(), generator.generate());
    }
}
