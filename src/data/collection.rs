use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::core::Interval;
use crate::data::{Dataset, DatasetListener, ListenerId, ListenerRegistry};
use crate::error::{ChartError, ChartResult};

/// Ordered set of datasets shown together, e.g. the series of one chart.
///
/// Listeners hear about datasets being added or removed; content changes are
/// reported by each dataset's own listeners.
#[derive(Default)]
pub struct DatasetCollection {
    datasets: Vec<Box<dyn Dataset>>,
    listeners: ListenerRegistry,
}

impl DatasetCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Rc<dyn DatasetListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Appends `dataset` and returns its index.
    pub fn add(&mut self, dataset: Box<dyn Dataset>) -> usize {
        self.datasets.push(dataset);
        let index = self.datasets.len() - 1;
        debug!(index, datasets = self.datasets.len(), "dataset added to collection");
        self.listeners.notify_added(&*self.datasets[index]);
        index
    }

    /// Removes and returns the dataset at `index`; later datasets shift down.
    pub fn remove(&mut self, index: usize) -> ChartResult<Box<dyn Dataset>> {
        ChartError::check_index(index, self.datasets.len())?;
        let dataset = self.datasets.remove(index);
        debug!(index, datasets = self.datasets.len(), "dataset removed from collection");
        self.listeners.notify_removed(&*dataset, index);
        Ok(dataset)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&dyn Dataset> {
        self.datasets.get(index).map(|dataset| &**dataset)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn Dataset + 'static)> {
        self.datasets.get_mut(index).map(|dataset| &mut **dataset)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Dataset> + '_ {
        self.datasets.iter().map(|dataset| &**dataset)
    }

    /// Union of the domain extrema of every dataset, `None` when empty.
    #[must_use]
    pub fn domain_extrema(&self) -> Option<Interval> {
        self.iter()
            .map(|dataset| dataset.domain_extrema())
            .reduce(|mut union, extrema| {
                union.expand_to_include(extrema);
                union
            })
    }
}

impl fmt::Debug for DatasetCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetCollection")
            .field("datasets", &self.datasets.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
