use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::Interval;
use crate::core::array::non_increasing_positions;
use crate::core::primitives::ensure_finite;
use crate::data::MutableArrayDataset;
use crate::error::{ChartError, ChartResult};
use crate::mipmap::StrategyKind;

pub const DATASET_CONFIG_JSON_SCHEMA_V1: u32 = 1;
pub const ZOOM_DATASET_CONFIG_JSON_SCHEMA_V1: u32 = 1;

/// Description of an in-memory dataset: samples plus pyramid options.
///
/// Serializable so hosts can persist datasets without an ad-hoc format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub domain: Vec<f64>,
    /// One slice per range dimension, each as long as `domain`.
    #[serde(default)]
    pub range_tuples: Vec<Vec<f64>>,
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default)]
    pub preferred_range_axis_interval: Option<Interval>,
    /// One name per pyramid level, finest first.
    #[serde(default)]
    pub level_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfigJsonContractV1 {
    pub schema_version: u32,
    pub config: DatasetConfig,
}

impl DatasetConfig {
    #[must_use]
    pub fn new(domain: Vec<f64>) -> Self {
        Self {
            domain,
            range_tuples: Vec::new(),
            strategy: StrategyKind::default(),
            preferred_range_axis_interval: None,
            level_names: None,
        }
    }

    /// Adds one range dimension.
    #[must_use]
    pub fn with_range_tuple_slice(mut self, values: Vec<f64>) -> Self {
        self.range_tuples.push(values);
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_preferred_range_axis_interval(mut self, interval: Interval) -> Self {
        self.preferred_range_axis_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn with_level_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.level_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn tuple_len(&self) -> usize {
        1 + self.range_tuples.len()
    }

    /// Checks the samples: non-empty, equal lengths, finite, and a
    /// non-descending domain. Repeated domain values are accepted with a
    /// warning.
    pub fn validate(&self) -> ChartResult<()> {
        if self.domain.is_empty() {
            return Err(ChartError::InvalidArgument(
                "domain must not be empty".to_owned(),
            ));
        }
        if self.range_tuples.is_empty() {
            return Err(ChartError::InvalidArgument(
                "at least one range tuple slice is required".to_owned(),
            ));
        }
        for (dimension, values) in self.range_tuples.iter().enumerate() {
            if values.len() != self.domain.len() {
                return Err(ChartError::InvalidArgument(format!(
                    "range tuple slice {dimension} has {} values but domain has {}",
                    values.len(),
                    self.domain.len()
                )));
            }
            for value in values {
                ensure_finite(*value, "range value")?;
            }
        }
        for value in &self.domain {
            ensure_finite(*value, "domain value")?;
        }

        let non_increasing = non_increasing_positions(&self.domain);
        if let Some(index) = non_increasing
            .iter()
            .find(|index| self.domain[**index] > self.domain[**index + 1])
        {
            return Err(ChartError::InvalidArgument(format!(
                "domain must be ascending: value at {} is smaller than value at {index}",
                index + 1
            )));
        }
        if !non_increasing.is_empty() {
            warn!(
                duplicates = non_increasing.len(),
                first_index = non_increasing[0],
                "dataset domain contains repeated values"
            );
        }
        if let Some(interval) = self.preferred_range_axis_interval {
            ensure_finite(interval.start, "preferred range axis start")?;
            ensure_finite(interval.end, "preferred range axis end")?;
        }
        Ok(())
    }

    pub fn build(&self) -> ChartResult<MutableArrayDataset> {
        MutableArrayDataset::from_config(self)
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize dataset config: {e}")))
    }

    pub fn to_json_contract_v1_pretty(&self) -> ChartResult<String> {
        let payload = DatasetConfigJsonContractV1 {
            schema_version: DATASET_CONFIG_JSON_SCHEMA_V1,
            config: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            ChartError::InvalidData(format!("failed to serialize dataset config contract v1: {e}"))
        })
    }

    /// Accepts either a bare config or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> ChartResult<Self> {
        if let Ok(config) = serde_json::from_str::<DatasetConfig>(input) {
            return Ok(config);
        }
        let payload: DatasetConfigJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            ChartError::InvalidData(format!("failed to parse dataset config json payload: {e}"))
        })?;
        if payload.schema_version != DATASET_CONFIG_JSON_SCHEMA_V1 {
            return Err(ChartError::InvalidData(format!(
                "unsupported dataset config schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.config)
    }
}

/// Options for a [`crate::data::ZoomDataset`]. Tier widths come from the
/// provider, not from here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomDatasetConfig {
    pub domain_extrema: Interval,
    /// Pending requests older than this are forgotten and re-issued on the
    /// next query. `None` marks requested regions as fetched forever.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub preferred_range_axis_interval: Option<Interval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomDatasetConfigJsonContractV1 {
    pub schema_version: u32,
    pub config: ZoomDatasetConfig,
}

impl ZoomDatasetConfig {
    #[must_use]
    pub fn new(domain_extrema: Interval) -> Self {
        Self {
            domain_extrema,
            request_timeout_ms: None,
            preferred_range_axis_interval: None,
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_preferred_range_axis_interval(mut self, interval: Interval) -> Self {
        self.preferred_range_axis_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn request_timeout(self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(self) -> ChartResult<()> {
        let Interval { start, end } = self.domain_extrema;
        ensure_finite(start, "domain extrema start")?;
        ensure_finite(end, "domain extrema end")?;
        if start >= end {
            return Err(ChartError::InvalidArgument(format!(
                "domain extrema must have positive length: [{start}, {end}]"
            )));
        }
        Ok(())
    }

    pub fn to_json_contract_v1_pretty(self) -> ChartResult<String> {
        let payload = ZoomDatasetConfigJsonContractV1 {
            schema_version: ZOOM_DATASET_CONFIG_JSON_SCHEMA_V1,
            config: self,
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            ChartError::InvalidData(format!(
                "failed to serialize zoom dataset config contract v1: {e}"
            ))
        })
    }

    pub fn from_json_compat_str(input: &str) -> ChartResult<Self> {
        if let Ok(config) = serde_json::from_str::<ZoomDatasetConfig>(input) {
            return Ok(config);
        }
        let payload: ZoomDatasetConfigJsonContractV1 =
            serde_json::from_str(input).map_err(|e| {
                ChartError::InvalidData(format!(
                    "failed to parse zoom dataset config json payload: {e}"
                ))
            })?;
        if payload.schema_version != ZOOM_DATASET_CONFIG_JSON_SCHEMA_V1 {
            return Err(ChartError::InvalidData(format!(
                "unsupported zoom dataset config schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.config)
    }
}
