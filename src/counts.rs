//! Occurrence counting strategies.

use crate::deviation::{DeviationError, Value};
use std::{collections::HashMap, ops::RangeInclusive};

/// Maximum number of slots a [`CountTable`] may allocate.
pub const MAX_TABLE_SLOTS: usize = 1 << 16;

/// Mapping from distinct value to its number of occurrences.
pub trait Counts {
    /// Sum of all occurrence counts, i.e. the length of the counted input.
    fn total(&self) -> u64;

    /// Distinct values with a non-zero count, in no particular order.
    fn pairs(&self) -> impl Iterator<Item = (Value, u64)> + '_;
}

/// Count table backed by a hash map; accepts any value.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CountMap {
    counts: HashMap<Value, u64>,
}

impl CountMap {
    /// Build the table with an explicit lookup followed by an insert.
    pub fn count_lookup(values: &[Value]) -> Self {
        let mut counts = HashMap::new();
        for &value in values {
            match counts.get(&value) {
                Some(&count) => counts.insert(value, count + 1),
                None => counts.insert(value, 1),
            };
        }
        Self { counts }
    }

    /// Build the table by merging each occurrence into its entry.
    pub fn count_merge(values: &[Value]) -> Self {
        let mut counts = HashMap::new();
        for &value in values {
            counts
                .entry(value)
                .and_modify(|count| *count += 1)
                .or_insert(1);
        }
        Self { counts }
    }

    /// Build the table with a single fold over the input.
    pub fn count_stream(values: &[Value]) -> Self {
        let counts = values
            .iter()
            .copied()
            .fold(HashMap::new(), |mut counts, value| {
                *counts.entry(value).or_default() += 1;
                counts
            });
        Self { counts }
    }
}

#[cfg(test)]
impl CountMap {
    fn get(&self, value: Value) -> u64 {
        self.counts.get(&value).copied().unwrap_or(0)
    }

    fn n_distinct(&self) -> usize {
        self.counts.len()
    }
}

impl Counts for CountMap {
    fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    fn pairs(&self) -> impl Iterator<Item = (Value, u64)> + '_ {
        self.counts.iter().map(|(&value, &count)| (value, count))
    }
}

/// Count table backed by preallocated slots over a closed value range.
///
/// Slot `i` holds the count of value `lo + i`. Values outside the range
/// are rejected instead of being indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct CountTable {
    lo: Value,
    slots: Vec<u64>,
}

impl CountTable {
    /// Create an empty table covering `range`.
    ///
    /// # Errors
    /// Returns [`DeviationError::InvalidRange`] if the range is empty or
    /// needs more than [`MAX_TABLE_SLOTS`] slots.
    pub fn new(range: RangeInclusive<Value>) -> Result<Self, DeviationError> {
        let (lo, hi) = (*range.start(), *range.end());
        let n_slots = i64::from(hi) - i64::from(lo) + 1;
        if n_slots < 1 || n_slots > MAX_TABLE_SLOTS as i64 {
            return Err(DeviationError::InvalidRange { range });
        }
        Ok(Self {
            lo,
            slots: vec![0; n_slots as usize],
        })
    }

    /// Count every value of `values` into a fresh table covering `range`.
    pub fn count(values: &[Value], range: RangeInclusive<Value>) -> Result<Self, DeviationError> {
        let mut table = Self::new(range)?;
        for &value in values {
            table.add(value)?;
        }
        Ok(table)
    }

    pub fn add(&mut self, value: Value) -> Result<(), DeviationError> {
        let offset = i64::from(value) - i64::from(self.lo);
        let slot = usize::try_from(offset)
            .ok()
            .and_then(|i_slot| self.slots.get_mut(i_slot));
        match slot {
            Some(count) => {
                *count += 1;
                Ok(())
            }
            None => Err(DeviationError::OutOfRange {
                value,
                range: self.range(),
            }),
        }
    }

    pub fn range(&self) -> RangeInclusive<Value> {
        self.lo..=self.lo + (self.slots.len() - 1) as Value
    }
}

#[cfg(test)]
impl CountTable {
    fn get(&self, value: Value) -> u64 {
        let offset = i64::from(value) - i64::from(self.lo);
        usize::try_from(offset)
            .ok()
            .and_then(|i_slot| self.slots.get(i_slot))
            .copied()
            .unwrap_or(0)
    }
}

impl Counts for CountTable {
    fn total(&self) -> u64 {
        self.slots.iter().sum()
    }

    fn pairs(&self) -> impl Iterator<Item = (Value, u64)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(i_slot, &count)| (self.lo + i_slot as Value, count))
    }
}
