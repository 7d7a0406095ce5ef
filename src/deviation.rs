//! Weighted absolute deviation sum.
//!
//! Every [`Variant`] computes the same quantity: the sum over the input of
//! the absolute difference between each element and the rounded mean of
//! the input. The weighted variants go through a count table first; the
//! raw variant works on the elements directly.

use crate::counts::{CountMap, CountTable, Counts, MAX_TABLE_SLOTS};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive};
use thiserror::Error;

/// Element type of every input.
pub type Value = i32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviationError {
    #[error("input must contain at least one value")]
    EmptyInput,

    #[error("value {value} is outside the table range {range:?}")]
    OutOfRange {
        value: Value,
        range: RangeInclusive<Value>,
    },

    #[error("table range {range:?} is empty or exceeds {max} values", max = MAX_TABLE_SLOTS)]
    InvalidRange { range: RangeInclusive<Value> },
}

/// Round `sum / n` to the nearest integer, halves toward positive infinity.
///
/// Equivalent to `floor(sum / n + 0.5)` evaluated exactly. It agrees with
/// `(sum as f64 / n as f64 + 0.5).floor()`, the rounding of an IEEE double
/// quotient, whenever `|sum| < 2^52`. Past that the double quotient can
/// land on the wrong side of a half boundary; this function does not.
pub fn round_mean(sum: i64, n: u64) -> Result<i64, DeviationError> {
    if n == 0 {
        return Err(DeviationError::EmptyInput);
    }
    let sum = i128::from(sum);
    let n = i128::from(n);
    Ok((2 * sum + n).div_euclid(2 * n) as i64)
}

/// Aggregate a count table with explicit loops.
pub fn aggregate<C: Counts>(counts: &C) -> Result<u64, DeviationError> {
    let mut weighted_sum = 0_i64;
    for (value, count) in counts.pairs() {
        weighted_sum += i64::from(value) * count as i64;
    }
    let mean = round_mean(weighted_sum, counts.total())?;

    let mut result = 0;
    for (value, count) in counts.pairs() {
        let value = i64::from(value);
        if value != mean {
            result += value.abs_diff(mean) * count;
        }
    }
    Ok(result)
}

/// Aggregate a count table with iterator adapters.
pub fn aggregate_iter<C: Counts>(counts: &C) -> Result<u64, DeviationError> {
    let weighted_sum: i64 = counts
        .pairs()
        .map(|(value, count)| i64::from(value) * count as i64)
        .sum();
    let mean = round_mean(weighted_sum, counts.total())?;

    Ok(counts
        .pairs()
        .map(|(value, count)| i64::from(value).abs_diff(mean) * count)
        .sum())
}

pub fn weighted_lookup(values: &[Value]) -> Result<u64, DeviationError> {
    aggregate(&CountMap::count_lookup(values))
}

pub fn weighted_merge(values: &[Value]) -> Result<u64, DeviationError> {
    aggregate(&CountMap::count_merge(values))
}

/// Weighted deviation over a fixed table; every value must lie in `range`.
pub fn weighted_table(
    values: &[Value],
    range: RangeInclusive<Value>,
) -> Result<u64, DeviationError> {
    aggregate(&CountTable::count(values, range)?)
}

pub fn weighted_stream(values: &[Value]) -> Result<u64, DeviationError> {
    aggregate_iter(&CountMap::count_stream(values))
}

/// Unweighted deviation straight from the raw elements.
pub fn unweighted_raw(values: &[Value]) -> Result<u64, DeviationError> {
    let sum: i64 = values.iter().map(|&value| i64::from(value)).sum();
    let mean = round_mean(sum, values.len() as u64)?;
    Ok(values
        .iter()
        .map(|&value| i64::from(value).abs_diff(mean))
        .sum())
}

/// Implementation strategy for the deviation sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Hash map counts, lookup then insert.
    Lookup,
    /// Hash map counts, merged through the entry API.
    Merge,
    /// Fixed table counts over a closed range.
    Table,
    /// Hash map counts and aggregation as iterator pipelines.
    Stream,
    /// No counting, mean and deviations over the raw elements.
    Raw,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Lookup,
        Variant::Merge,
        Variant::Table,
        Variant::Stream,
        Variant::Raw,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variant::Lookup => "lookup",
            Variant::Merge => "merge",
            Variant::Table => "table",
            Variant::Stream => "stream",
            Variant::Raw => "raw",
        }
    }

    /// Compute the deviation sum of `values`.
    ///
    /// `range` is only consulted by [`Variant::Table`].
    pub fn compute(
        self,
        values: &[Value],
        range: RangeInclusive<Value>,
    ) -> Result<u64, DeviationError> {
        match self {
            Variant::Lookup => weighted_lookup(values),
            Variant::Merge => weighted_merge(values),
            Variant::Table => weighted_table(values, range),
            Variant::Stream => weighted_stream(values),
            Variant::Raw => unweighted_raw(values),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
