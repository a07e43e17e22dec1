use std::fmt;
use std::sync::Arc;

#[cfg(feature = "parallel-mipmap")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::JaggedArray;
use crate::core::primitives::ensure_finite;
use crate::error::{ChartError, ChartResult};
use crate::mipmap::MipMapChain;

pub type SharedMipStrategy = Arc<dyn MipStrategy>;

/// Binary mip-mapping strategy: every pair of samples at level `n` is folded
/// into one sample at level `n + 1` with [`MipStrategy::combine`].
///
/// Implementors only supply the aggregate; pyramid construction and the
/// logarithmic incremental updates are provided methods. The level-`n + 1`
/// domain value is always the even (left) sample of the pair.
pub trait MipStrategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Aggregate of two adjacent samples at the finer level.
    fn combine(&self, left: f64, right: f64) -> f64;

    /// Builds the full pyramid over `domain` and one or more range dimensions.
    fn mipmap(&self, domain: &[f64], ranges: &[Vec<f64>]) -> ChartResult<MipMapChain> {
        if domain.is_empty() {
            return Err(ChartError::InvalidArgument(
                "domain must not be empty".to_owned(),
            ));
        }
        if ranges.is_empty() {
            return Err(ChartError::InvalidArgument(
                "at least one range dimension is required".to_owned(),
            ));
        }
        if let Some((dimension, range)) = ranges
            .iter()
            .enumerate()
            .find(|(_, range)| range.len() != domain.len())
        {
            return Err(ChartError::InvalidArgument(format!(
                "range dimension {dimension} has {} samples but domain has {}",
                range.len(),
                domain.len()
            )));
        }

        let num_levels = level_count(domain.len());
        let domain_levels = mipmap_domain(domain, num_levels);

        #[cfg(feature = "parallel-mipmap")]
        let range_levels: Vec<JaggedArray> = ranges
            .par_iter()
            .map(|range| mipmap_range(self, range, num_levels))
            .collect();
        #[cfg(not(feature = "parallel-mipmap"))]
        let range_levels: Vec<JaggedArray> = ranges
            .iter()
            .map(|range| mipmap_range(self, range, num_levels))
            .collect();

        debug!(
            strategy = self.name(),
            samples = domain.len(),
            dimensions = ranges.len(),
            num_levels,
            "built mip pyramid"
        );
        MipMapChain::new(domain_levels, range_levels)
    }

    /// Appends one sample to the end of `chain`, propagating pair aggregates
    /// upward and growing the pyramid by at most one level.
    fn append_xy(&self, chain: &mut MipMapChain, x: f64, ys: &[f64]) -> ChartResult<()> {
        ensure_finite(x, "appended x")?;
        if ys.len() != chain.range_tuple_size() {
            return Err(ChartError::InvalidArgument(format!(
                "expected {} range values, got {}",
                chain.range_tuple_size(),
                ys.len()
            )));
        }
        for y in ys {
            ensure_finite(*y, "appended y")?;
        }
        let last_x = chain.raw().domain().last().copied().unwrap_or(f64::NEG_INFINITY);
        if x <= last_x {
            return Err(ChartError::InvalidArgument(format!(
                "appended x must be greater than the domain end: x={x}, end={last_x}"
            )));
        }

        let levels_before = chain.num_levels();
        let (domain, ranges) = chain.parts_mut();
        append_domain_value(domain, x);
        for (levels, y) in ranges.iter_mut().zip(ys) {
            append_range_value(self, levels, *y);
        }

        let new_levels = chain.num_levels();
        let level_diff = new_levels - levels_before;
        if level_diff > 1 {
            return Err(ChartError::Internal(format!(
                "mip level count grew by {level_diff} after a single append"
            )));
        }
        let diverged = (0..chain.range_tuple_size()).any(|dimension| {
            chain
                .range_levels(dimension)
                .is_some_and(|levels| !levels.is_same_size(chain.domain_levels()))
        });
        if diverged {
            return Err(ChartError::Internal(
                "range pyramid diverged from domain pyramid after append".to_owned(),
            ));
        }
        trace!(x, num_levels = new_levels, "appended sample to mip pyramid");
        Ok(())
    }

    /// Overwrites range dimension `dimension` at raw index `index` and
    /// recomputes the single affected aggregate on every coarser level.
    fn set_range_value(
        &self,
        chain: &mut MipMapChain,
        dimension: usize,
        index: usize,
        y: f64,
    ) -> ChartResult<()> {
        ensure_finite(y, "range value")?;
        let tuple_size = chain.range_tuple_size();
        ChartError::check_index(dimension, tuple_size)?;
        ChartError::check_index(index, chain.raw().len())?;

        let (_, ranges) = chain.parts_mut();
        let levels = &mut ranges[dimension];
        let mut level = 0;
        let mut index = index;
        let mut value = y;
        loop {
            levels.set(level, index, value);
            if level + 1 >= levels.num_rows() {
                break;
            }
            let row = levels.row(level);
            let (left, right) = if index % 2 == 1 {
                (row[index - 1], row[index])
            } else if index + 1 < row.len() {
                (row[index], row[index + 1])
            } else {
                // Unpaired trailing sample: nothing above depends on it.
                break;
            };
            value = self.combine(left, right);
            index /= 2;
            level += 1;
        }
        Ok(())
    }
}

/// `floor(log2(n)) + 1` for `n >= 1`.
#[must_use]
pub fn level_count(num_samples: usize) -> usize {
    if num_samples == 0 {
        return 0;
    }
    num_samples.ilog2() as usize + 1
}

fn mipmap_domain(domain: &[f64], num_levels: usize) -> JaggedArray {
    let mut levels = JaggedArray::new();
    for level in 0..num_levels {
        let stride = 1usize << level;
        let count = domain.len() >> level;
        levels.push_row((0..count).map(|i| domain[i * stride]).collect());
    }
    levels
}

fn mipmap_range<S: MipStrategy + ?Sized>(
    strategy: &S,
    range: &[f64],
    num_levels: usize,
) -> JaggedArray {
    let mut levels = JaggedArray::from_row(range.to_vec());
    for level in 1..num_levels {
        let coarser = levels
            .row(level - 1)
            .chunks_exact(2)
            .map(|pair| strategy.combine(pair[0], pair[1]))
            .collect();
        levels.push_row(coarser);
    }
    levels
}

fn append_domain_value(levels: &mut JaggedArray, x: f64) {
    let mut level = 0;
    let mut value = x;
    loop {
        let len = levels.push(level, value);
        if len % 2 != 0 {
            break;
        }
        value = levels.row(level)[len - 2];
        level += 1;
    }
}

fn append_range_value<S: MipStrategy + ?Sized>(strategy: &S, levels: &mut JaggedArray, y: f64) {
    let mut level = 0;
    let mut value = y;
    loop {
        let len = levels.push(level, value);
        if len % 2 != 0 {
            break;
        }
        let row = levels.row(level);
        value = strategy.combine(row[len - 2], row[len - 1]);
        level += 1;
    }
}

/// Arithmetic mean of each pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean;

impl MipStrategy for Mean {
    fn name(&self) -> &str {
        "mean"
    }

    fn combine(&self, left: f64, right: f64) -> f64 {
        (left + right) / 2.0
    }
}

/// Larger value of each pair; keeps peaks visible at coarse levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl MipStrategy for Max {
    fn name(&self) -> &str {
        "max"
    }

    fn combine(&self, left: f64, right: f64) -> f64 {
        left.max(right)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

impl MipStrategy for Min {
    fn name(&self) -> &str {
        "min"
    }

    fn combine(&self, left: f64, right: f64) -> f64 {
        left.min(right)
    }
}

/// Sum of each pair, for count-like series (volumes, event tallies).
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl MipStrategy for Sum {
    fn name(&self) -> &str {
        "sum"
    }

    fn combine(&self, left: f64, right: f64) -> f64 {
        left + right
    }
}

/// Serializable name of a built-in strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Mean,
    Max,
    Min,
    Sum,
}

impl StrategyKind {
    #[must_use]
    pub fn into_strategy(self) -> SharedMipStrategy {
        match self {
            Self::Mean => Arc::new(Mean),
            Self::Max => Arc::new(Max),
            Self::Min => Arc::new(Min),
            Self::Sum => Arc::new(Sum),
        }
    }
}
