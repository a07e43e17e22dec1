//! Mip pyramids: decreasing-resolution views of a sorted sample set.

pub mod chain;
pub mod strategy;

pub use chain::{MipMap, MipMapChain, MipMapRegion, Sample, SampleRef};
pub use strategy::{
    Max, Mean, Min, MipStrategy, SharedMipStrategy, StrategyKind, Sum, level_count,
};
