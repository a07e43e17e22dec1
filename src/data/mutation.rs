use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::primitives::{datetime_to_unix_millis, decimal_to_f64};
use crate::error::ChartResult;

/// Edit applied to a [`crate::data::MutableDataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    /// Adds a sample after the current last domain value.
    Append { x: f64, y: f64 },
    /// Overwrites the first range dimension of an existing sample.
    SetY { index: usize, y: f64 },
    /// Applied all-or-nothing, reported as a single change.
    Batch(Vec<Mutation>),
}

impl Mutation {
    #[must_use]
    pub fn append(x: f64, y: f64) -> Self {
        Self::Append { x, y }
    }

    #[must_use]
    pub fn set_y(index: usize, y: f64) -> Self {
        Self::SetY { index, y }
    }

    pub fn batch<I>(mutations: I) -> Self
    where
        I: IntoIterator<Item = Mutation>,
    {
        Self::Batch(mutations.into_iter().collect())
    }

    /// Append keyed by wall-clock time, with the domain in Unix milliseconds.
    pub fn append_at(time: DateTime<Utc>, value: Decimal) -> ChartResult<Self> {
        Ok(Self::Append {
            x: datetime_to_unix_millis(time),
            y: decimal_to_f64(value, "value")?,
        })
    }

    /// Number of leaf edits, counting through nested batches.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Append { .. } | Self::SetY { .. } => 1,
            Self::Batch(mutations) => mutations.iter().map(Mutation::leaf_count).sum(),
        }
    }
}
