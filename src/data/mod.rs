//! Dataset contracts consumed by rendering layers, plus the in-memory and
//! provider-backed implementations.

pub mod array_dataset;
pub mod collection;
pub mod config;
pub mod listener;
pub mod mutation;
pub mod provider;
pub mod zoom;

use std::borrow::Cow;

use crate::core::Interval;
use crate::error::ChartResult;
use crate::mipmap::{MipMapChain, MipMapRegion, SampleRef};

pub use array_dataset::MutableArrayDataset;
pub use collection::DatasetCollection;
pub use config::{DatasetConfig, ZoomDatasetConfig};
pub use listener::{DatasetListener, ListenerId, ListenerRegistry};
pub use mutation::Mutation;
pub use provider::{DataCallback, DataProvider, DataRequest, GeneratingProvider, RequestId};
pub use zoom::ZoomDataset;

/// Read contract shared by every dataset.
pub trait Dataset {
    /// The levels of this dataset from finest to coarsest.
    ///
    /// In-memory datasets lend their own chain; assembled chains (zoom
    /// datasets) are returned owned.
    fn mip_map_chain(&self) -> Cow<'_, MipMapChain>;

    /// Finds the highest-resolution level in which `region` spans at most
    /// `max_samples` index steps, falling back to the coarsest level.
    ///
    /// Takes `&mut self` because on-demand datasets use the query to schedule
    /// fetches for missing coverage.
    fn best_mip_map_for_interval(
        &mut self,
        region: Interval,
        max_samples: usize,
    ) -> ChartResult<MipMapRegion<'_>>;

    fn domain_extrema(&self) -> Interval;

    fn num_samples(&self) -> usize;

    /// Domain value of raw sample `index`.
    fn x(&self, index: usize) -> ChartResult<f64>;

    /// Borrowed cursor onto raw sample `index`. Copy it with
    /// [`SampleRef::to_sample`] if it must outlive the borrow.
    fn flyweight_tuple(&self, index: usize) -> ChartResult<SampleRef<'_>>;

    fn range_extrema(&self, dimension: usize) -> ChartResult<Interval>;

    /// Range bounds a value axis should use instead of the data extrema.
    fn preferred_range_axis_interval(&self) -> Option<Interval>;

    fn range_tuple_size(&self) -> usize;

    /// Smallest gap between consecutive raw domain values.
    fn min_domain_interval(&self) -> f64;
}

/// Dataset that accepts [`Mutation`]s and reports them to listeners.
pub trait MutableDataset: Dataset {
    /// Registers a listener. Only a weak reference is kept: dropping the last
    /// strong `Rc` silently unregisters it.
    fn add_listener(&mut self, listener: std::rc::Rc<dyn DatasetListener>) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId) -> bool;

    /// Applies `mutation` atomically, then notifies listeners with the
    /// affected domain span.
    fn mutate(&mut self, mutation: Mutation) -> ChartResult<()>;
}
