use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::core::primitives::ensure_finite;
use crate::core::{Interval, extrema, min_interval};
use crate::data::{
    Dataset, DatasetConfig, DatasetListener, ListenerId, ListenerRegistry, MutableDataset,
    Mutation,
};
use crate::error::{ChartError, ChartResult};
use crate::mipmap::{MipMapChain, MipMapRegion, SampleRef, SharedMipStrategy};

/// In-memory dataset over a full mip pyramid that supports appends and
/// in-place range edits in O(log N).
pub struct MutableArrayDataset {
    chain: MipMapChain,
    strategy: SharedMipStrategy,
    preferred_range_axis_interval: Option<Interval>,
    range_extrema: Vec<Cell<Option<Interval>>>,
    min_domain_interval: Cell<Option<f64>>,
    listeners: ListenerRegistry,
}

impl MutableArrayDataset {
    /// Single-dimension dataset pyramided with the mean strategy.
    pub fn new(domain: Vec<f64>, range: Vec<f64>) -> ChartResult<Self> {
        DatasetConfig::new(domain)
            .with_range_tuple_slice(range)
            .build()
    }

    pub fn with_strategy(
        domain: Vec<f64>,
        range: Vec<f64>,
        strategy: SharedMipStrategy,
    ) -> ChartResult<Self> {
        Self::from_tuples(domain, vec![range], strategy)
    }

    /// Dataset with one range slice per dimension.
    pub fn from_tuples(
        domain: Vec<f64>,
        ranges: Vec<Vec<f64>>,
        strategy: SharedMipStrategy,
    ) -> ChartResult<Self> {
        let mut config = DatasetConfig::new(domain);
        config.range_tuples = ranges;
        config.validate()?;
        let chain = strategy.mipmap(&config.domain, &config.range_tuples)?;
        Ok(Self::from_parts(chain, strategy, None))
    }

    pub fn from_config(config: &DatasetConfig) -> ChartResult<Self> {
        config.validate()?;
        let strategy = config.strategy.into_strategy();
        let mut chain = strategy.mipmap(&config.domain, &config.range_tuples)?;
        if let Some(names) = &config.level_names {
            chain = chain.with_level_names(names.iter().cloned())?;
        }
        Ok(Self::from_parts(
            chain,
            strategy,
            config.preferred_range_axis_interval,
        ))
    }

    fn from_parts(
        chain: MipMapChain,
        strategy: SharedMipStrategy,
        preferred_range_axis_interval: Option<Interval>,
    ) -> Self {
        debug!(
            samples = chain.raw().len(),
            dimensions = chain.range_tuple_size(),
            num_levels = chain.num_levels(),
            strategy = strategy.name(),
            "created mutable array dataset"
        );
        Self {
            range_extrema: (0..chain.range_tuple_size())
                .map(|_| Cell::new(None))
                .collect(),
            chain,
            strategy,
            preferred_range_axis_interval,
            min_domain_interval: Cell::new(None),
            listeners: ListenerRegistry::new(),
        }
    }

    #[must_use]
    pub fn with_preferred_range_axis_interval(mut self, interval: Interval) -> Self {
        self.preferred_range_axis_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn strategy(&self) -> &SharedMipStrategy {
        &self.strategy
    }

    /// Appends one sample carrying a value for every range dimension.
    pub fn append_tuple(&mut self, x: f64, ys: &[f64]) -> ChartResult<()> {
        self.strategy.append_xy(&mut self.chain, x, ys)?;
        for (cache, y) in self.range_extrema.iter().zip(ys) {
            if let Some(mut bounds) = cache.get() {
                bounds.expand(*y);
                cache.set(Some(bounds));
            }
        }
        self.min_domain_interval.set(None);
        trace!(x, dimensions = ys.len(), "appended tuple");
        self.notify_changed(Interval::point(x));
        Ok(())
    }

    /// Overwrites range dimension `dimension` of sample `index`.
    pub fn set_range_value(&mut self, dimension: usize, index: usize, y: f64) -> ChartResult<()> {
        self.strategy
            .set_range_value(&mut self.chain, dimension, index, y)?;
        self.range_extrema[dimension].set(None);
        let x = self.chain.raw().domain()[index];
        trace!(dimension, index, y, "set range value");
        self.notify_changed(Interval::point(x));
        Ok(())
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Checks every leaf of `mutation` against the state it would see when
    /// applied, without touching the dataset. Returns the affected domain
    /// span, or `None` for an empty batch.
    fn validate_mutation(&self, mutation: &Mutation) -> ChartResult<Option<Interval>> {
        let mut simulation = MutationSimulation {
            domain: self.chain.raw().domain(),
            tuple_size: self.chain.range_tuple_size(),
            appended: Vec::new(),
            span: None,
        };
        simulation.visit(mutation)?;
        Ok(simulation.span)
    }

    fn apply_mutation(&mut self, mutation: Mutation) -> ChartResult<()> {
        match mutation {
            Mutation::Append { x, y } => {
                self.strategy.append_xy(&mut self.chain, x, &[y])?;
                if let Some(mut bounds) = self.range_extrema[0].get() {
                    bounds.expand(y);
                    self.range_extrema[0].set(Some(bounds));
                }
                self.min_domain_interval.set(None);
            }
            Mutation::SetY { index, y } => {
                self.strategy
                    .set_range_value(&mut self.chain, 0, index, y)?;
                self.range_extrema[0].set(None);
            }
            Mutation::Batch(mutations) => {
                for mutation in mutations {
                    self.apply_mutation(mutation)?;
                }
            }
        }
        Ok(())
    }

    fn notify_changed(&mut self, span: Interval) {
        let listeners = self.listeners.snapshot();
        let dataset: &dyn Dataset = self;
        for listener in listeners {
            listener.on_dataset_changed(dataset, span.start, span.end);
        }
    }
}

/// Replays a mutation against the running domain end and sample count.
struct MutationSimulation<'a> {
    domain: &'a [f64],
    tuple_size: usize,
    appended: Vec<f64>,
    span: Option<Interval>,
}

impl MutationSimulation<'_> {
    fn visit(&mut self, mutation: &Mutation) -> ChartResult<()> {
        match mutation {
            Mutation::Append { x, y } => {
                if self.tuple_size != 1 {
                    return Err(ChartError::UnsupportedOperation(format!(
                        "append needs one range value per dimension, dataset has {}",
                        self.tuple_size
                    )));
                }
                ensure_finite(*x, "appended x")?;
                ensure_finite(*y, "appended y")?;
                let last_x = self
                    .appended
                    .last()
                    .or_else(|| self.domain.last())
                    .copied()
                    .unwrap_or(f64::NEG_INFINITY);
                if *x <= last_x {
                    return Err(ChartError::InvalidArgument(format!(
                        "appended x must be greater than the domain end: x={x}, end={last_x}"
                    )));
                }
                self.appended.push(*x);
                self.touch(*x);
            }
            Mutation::SetY { index, y } => {
                ensure_finite(*y, "range value")?;
                let len = self.domain.len() + self.appended.len();
                ChartError::check_index(*index, len)?;
                let x = match self.domain.get(*index) {
                    Some(x) => *x,
                    None => self.appended[*index - self.domain.len()],
                };
                self.touch(x);
            }
            Mutation::Batch(mutations) => {
                for mutation in mutations {
                    self.visit(mutation)?;
                }
            }
        }
        Ok(())
    }

    fn touch(&mut self, x: f64) {
        match &mut self.span {
            Some(span) => span.expand(x),
            None => self.span = Some(Interval::point(x)),
        }
    }
}

impl Dataset for MutableArrayDataset {
    fn mip_map_chain(&self) -> Cow<'_, MipMapChain> {
        Cow::Borrowed(&self.chain)
    }

    fn best_mip_map_for_interval(
        &mut self,
        region: Interval,
        max_samples: usize,
    ) -> ChartResult<MipMapRegion<'_>> {
        if max_samples == 0 {
            return Err(ChartError::InvalidArgument(
                "max_samples must be greater than zero".to_owned(),
            ));
        }
        Ok(self.chain.best_region(region, max_samples))
    }

    fn domain_extrema(&self) -> Interval {
        let domain = self.chain.raw().domain();
        Interval::new(domain[0], domain[domain.len() - 1])
    }

    fn num_samples(&self) -> usize {
        self.chain.raw().len()
    }

    fn x(&self, index: usize) -> ChartResult<f64> {
        let domain = self.chain.raw().domain();
        ChartError::check_index(index, domain.len())?;
        Ok(domain[index])
    }

    fn flyweight_tuple(&self, index: usize) -> ChartResult<SampleRef<'_>> {
        self.chain.raw().tuple(index)
    }

    fn range_extrema(&self, dimension: usize) -> ChartResult<Interval> {
        ChartError::check_index(dimension, self.range_extrema.len())?;
        let cache = &self.range_extrema[dimension];
        if let Some(bounds) = cache.get() {
            return Ok(bounds);
        }
        let bounds = extrema(self.chain.raw().range(dimension)).ok_or_else(|| {
            ChartError::Internal(format!("range dimension {dimension} has no samples"))
        })?;
        cache.set(Some(bounds));
        Ok(bounds)
    }

    fn preferred_range_axis_interval(&self) -> Option<Interval> {
        self.preferred_range_axis_interval
    }

    fn range_tuple_size(&self) -> usize {
        self.chain.range_tuple_size()
    }

    fn min_domain_interval(&self) -> f64 {
        if let Some(gap) = self.min_domain_interval.get() {
            return gap;
        }
        let gap = min_interval(self.chain.raw().domain());
        self.min_domain_interval.set(Some(gap));
        gap
    }
}

impl MutableDataset for MutableArrayDataset {
    fn add_listener(&mut self, listener: Rc<dyn DatasetListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn mutate(&mut self, mutation: Mutation) -> ChartResult<()> {
        let Some(span) = self.validate_mutation(&mutation)? else {
            return Ok(());
        };
        let leaves = mutation.leaf_count();
        self.apply_mutation(mutation)?;
        trace!(
            leaves,
            span_start = span.start,
            span_end = span.end,
            samples = self.chain.raw().len(),
            "applied dataset mutation"
        );
        self.notify_changed(span);
        Ok(())
    }
}

impl fmt::Debug for MutableArrayDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableArrayDataset")
            .field("samples", &self.chain.raw().len())
            .field("num_levels", &self.chain.num_levels())
            .field("strategy", &self.strategy.name())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TryFrom<DatasetConfig> for MutableArrayDataset {
    type Error = ChartError;

    fn try_from(config: DatasetConfig) -> ChartResult<Self> {
        Self::from_config(&config)
    }
}
