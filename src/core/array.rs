//! Backing storage for mip levels plus the handful of array reductions the
//! datasets need.

use crate::core::Interval;
use crate::error::{ChartError, ChartResult};

/// Growable 2-D array whose rows may have different lengths.
///
/// Row `r` of a mip pyramid holds level `r`. Writing past the end of a row
/// (or past the last row) grows the storage; cells skipped over are filled
/// with `0.0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JaggedArray {
    rows: Vec<Vec<f64>>,
}

impl JaggedArray {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an array from explicit rows. At least one row is required.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> ChartResult<Self> {
        if rows.is_empty() {
            return Err(ChartError::InvalidArgument(
                "jagged array needs at least one row".to_owned(),
            ));
        }
        Ok(Self { rows })
    }

    /// Single-row array.
    #[must_use]
    pub fn from_row(row: Vec<f64>) -> Self {
        Self { rows: vec![row] }
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Column count of `row`, or `0` when the row does not exist.
    #[must_use]
    pub fn num_columns(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.rows.get(row).and_then(|values| values.get(column)).copied()
    }

    /// Assigns `value` at `(row, column)`, growing rows and columns as needed.
    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        if row >= self.rows.len() {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let values = &mut self.rows[row];
        if column >= values.len() {
            values.resize(column + 1, 0.0);
        }
        values[column] = value;
    }

    /// Appends `value` to the end of `row`, creating the row if needed.
    /// Returns the new column count of that row.
    pub fn push(&mut self, row: usize, value: f64) -> usize {
        let column = self.num_columns(row);
        self.set(row, column, value);
        column + 1
    }

    pub fn push_row(&mut self, row: Vec<f64>) {
        self.rows.push(row);
    }

    /// True when both arrays have the same row count and per-row column counts.
    #[must_use]
    pub fn is_same_size(&self, other: &JaggedArray) -> bool {
        self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(&other.rows)
                .all(|(a, b)| a.len() == b.len())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Index of `value` within the ascending slice `values`.
///
/// Returns the leftmost index holding `value` when present (so duplicated
/// domain values resolve deterministically), otherwise the index of the next
/// larger element. Values above every element resolve to the last index.
/// An empty slice yields `0`.
#[must_use]
pub fn search_index(values: &[f64], value: f64) -> usize {
    if values.is_empty() {
        return 0;
    }
    values
        .partition_point(|candidate| *candidate < value)
        .min(values.len() - 1)
}

/// Minimum and maximum over `values`, or `None` for an empty slice.
#[must_use]
pub fn extrema(values: &[f64]) -> Option<Interval> {
    let (first, rest) = values.split_first()?;
    let mut bounds = Interval::point(*first);
    for value in rest {
        bounds.start = bounds.start.min(*value);
        bounds.end = bounds.end.max(*value);
    }
    Some(bounds)
}

/// Smallest absolute gap between consecutive values; `0.0` with fewer than two.
#[must_use]
pub fn min_interval(values: &[f64]) -> f64 {
    values
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .reduce(f64::min)
        .unwrap_or(0.0)
}

/// Sum of `values[start..=stop]`, with `stop` clamped to the last index.
#[must_use]
pub fn sum_range(values: &[f64], start: usize, stop: usize) -> f64 {
    if values.is_empty() || start >= values.len() {
        return 0.0;
    }
    let stop = stop.min(values.len() - 1);
    if start > stop {
        return 0.0;
    }
    values[start..=stop].iter().sum()
}

/// Indices `i` where `values[i] >= values[i + 1]`.
#[must_use]
pub fn non_increasing_positions(values: &[f64]) -> Vec<usize> {
    values
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0] >= pair[1])
        .map(|(index, _)| index)
        .collect()
}
