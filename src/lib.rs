//! mip-series: multiresolution time-series storage for interactive charts.
//!
//! Samples are kept in mip pyramids (each level halves the previous one) so a
//! renderer can ask for "the densest view of this domain region that fits in
//! N points" in logarithmic time. In-memory datasets support appends and
//! edits with O(log N) pyramid maintenance; zoom datasets fetch tiered data
//! lazily from a provider as the viewport moves.

pub mod core;
pub mod data;
pub mod error;
pub mod mipmap;
pub mod telemetry;

pub use crate::core::{Interval, IntervalSet, JaggedArray, TimeUnit};
pub use data::{
    DataCallback, DataProvider, DataRequest, Dataset, DatasetCollection, DatasetConfig,
    DatasetListener, GeneratingProvider, ListenerId, MutableArrayDataset, MutableDataset,
    Mutation, RequestId, ZoomDataset, ZoomDatasetConfig,
};
pub use error::{ChartError, ChartResult};
pub use mipmap::{
    MipMap, MipMapChain, MipMapRegion, MipStrategy, Sample, SampleRef, SharedMipStrategy,
    StrategyKind,
};
