use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::core::array::non_increasing_positions;
use crate::core::primitives::ensure_finite;
use crate::core::{Interval, IntervalSet, extrema, min_interval};
use crate::data::provider::Delivery;
use crate::data::{
    DataCallback, DataProvider, DataRequest, Dataset, DatasetListener, ListenerId,
    ListenerRegistry, RequestId, ZoomDatasetConfig,
};
use crate::error::{ChartError, ChartResult};
use crate::mipmap::{MipMap, MipMapChain, MipMapRegion, SampleRef};

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    region: Interval,
    issued_at: Instant,
}

/// Per-tier fetch bookkeeping, created on the first query that selects the tier.
#[derive(Debug, Default)]
struct TierState {
    /// Regions already requested, answered or not.
    fetched: IntervalSet,
    samples: Option<MipMapChain>,
    pending: IndexMap<RequestId, PendingRequest>,
}

impl TierState {
    /// Forgets pending requests older than `timeout` so their regions are
    /// requested again. Returns how many were dropped.
    fn evict_expired(&mut self, now: Instant, timeout: Duration, unit_index: usize) -> usize {
        let before = self.pending.len();
        let fetched = &mut self.fetched;
        self.pending.retain(|id, request| {
            let expired = now.saturating_duration_since(request.issued_at) >= timeout;
            if expired {
                warn!(
                    request_id = id.0,
                    unit_index,
                    region_start = request.region.start,
                    region_end = request.region.end,
                    "provider request timed out; region will be requested again"
                );
                fetched.remove(request.region);
            }
            !expired
        });
        before - self.pending.len()
    }
}

/// Dataset whose samples are fetched lazily, per resolution tier, from a
/// [`DataProvider`].
///
/// Tiers are ordered coarsest first, following the provider's unit widths.
/// Each query picks the coarsest tier at least as wide as the requested spacing,
/// asks the provider for any part of the region not requested before and
/// answers with the best data already at hand. Until a tier has data the
/// query falls back to finer populated tiers and finally to a two-point
/// placeholder spanning the whole domain.
///
/// Provider replies travel over a channel and are merged at the start of the
/// next query (or an explicit [`ZoomDataset::process_deliveries`]).
pub struct ZoomDataset<P> {
    provider: P,
    domain_extrema: Interval,
    unit_widths: Vec<f64>,
    placeholder: MipMapChain,
    tiers: Vec<Option<TierState>>,
    request_timeout: Option<Duration>,
    preferred_range_axis_interval: Option<Interval>,
    next_request_id: u64,
    sender: Sender<Delivery>,
    receiver: Receiver<Delivery>,
    listeners: ListenerRegistry,
}

impl<P: DataProvider> ZoomDataset<P> {
    pub fn new(provider: P, domain_extrema: Interval) -> ChartResult<Self> {
        Self::from_config(provider, ZoomDatasetConfig::new(domain_extrema))
    }

    pub fn from_config(provider: P, config: ZoomDatasetConfig) -> ChartResult<Self> {
        config.validate()?;
        let unit_widths = provider.units().to_vec();
        validate_unit_widths(&unit_widths)?;

        let extrema = config.domain_extrema;
        let placeholder =
            MipMapChain::single_level(vec![extrema.start, extrema.end], vec![vec![0.0, 0.0]])?;
        let (sender, receiver) = channel::unbounded();
        debug!(
            domain_start = extrema.start,
            domain_end = extrema.end,
            tiers = unit_widths.len(),
            request_timeout_ms = config.request_timeout_ms,
            "created zoom dataset"
        );
        Ok(Self {
            provider,
            domain_extrema: extrema,
            tiers: (0..unit_widths.len()).map(|_| None).collect(),
            unit_widths,
            placeholder,
            request_timeout: config.request_timeout(),
            preferred_range_axis_interval: config.preferred_range_axis_interval,
            next_request_id: 0,
            sender,
            receiver,
            listeners: ListenerRegistry::new(),
        })
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Tier widths, coarsest first.
    #[must_use]
    pub fn unit_widths(&self) -> &[f64] {
        &self.unit_widths
    }

    pub fn add_listener(&mut self, listener: Rc<dyn DatasetListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Index of the coarsest tier whose width is at least `desired_width`,
    /// or the finest tier when none is.
    #[must_use]
    pub fn select_unit(&self, desired_width: f64) -> usize {
        self.unit_widths
            .iter()
            .position(|width| *width >= desired_width)
            .unwrap_or(self.unit_widths.len() - 1)
    }

    /// Regions of tier `unit_index` already requested from the provider.
    #[must_use]
    pub fn fetched_intervals(&self, unit_index: usize) -> Option<&IntervalSet> {
        self.tier(unit_index).map(|tier| &tier.fetched)
    }

    /// Requests issued and not yet answered, across all tiers.
    #[must_use]
    pub fn pending_request_count(&self) -> usize {
        self.tiers
            .iter()
            .flatten()
            .map(|tier| tier.pending.len())
            .sum()
    }

    /// True once tier `unit_index` holds provider data.
    #[must_use]
    pub fn is_tier_populated(&self, unit_index: usize) -> bool {
        self.tier(unit_index)
            .is_some_and(|tier| tier.samples.is_some())
    }

    /// Applies every provider reply received so far. Returns the number of
    /// replies consumed.
    pub fn process_deliveries(&mut self) -> usize {
        let mut consumed = 0;
        while let Ok(delivery) = self.receiver.try_recv() {
            consumed += 1;
            let request_id = delivery.request_id;
            let unit_index = delivery.unit_index;
            let answered = match self.tiers.get_mut(unit_index) {
                Some(Some(tier)) => tier.pending.shift_remove(&request_id),
                _ => None,
            };
            if let Err(err) = self.provide_data(unit_index, delivery.domain, delivery.range) {
                warn!(
                    error = %err,
                    request_id = request_id.0,
                    unit_index,
                    "dropping provider delivery; region will be requested again"
                );
                // Nothing was loaded, so the region must not stay marked.
                if let (Some(request), Some(Some(tier))) =
                    (answered, self.tiers.get_mut(unit_index))
                {
                    tier.fetched.remove(request.region);
                }
            }
        }
        consumed
    }

    /// Merges samples into tier `unit_index`, replacing the old samples whose
    /// domain value lies within `[domain[0], domain[last]]`.
    pub fn provide_data(
        &mut self,
        unit_index: usize,
        domain: Vec<f64>,
        range: Vec<f64>,
    ) -> ChartResult<()> {
        ChartError::check_index(unit_index, self.unit_widths.len())?;
        if domain.len() != range.len() {
            return Err(ChartError::InvalidArgument(format!(
                "delivered domain has {} samples but range has {}",
                domain.len(),
                range.len()
            )));
        }
        let (Some(first), Some(last)) = (domain.first().copied(), domain.last().copied()) else {
            trace!(unit_index, "ignoring empty provider delivery");
            return Ok(());
        };
        for value in domain.iter().chain(&range) {
            ensure_finite(*value, "delivered sample")?;
        }
        let non_increasing = non_increasing_positions(&domain);
        if !non_increasing.is_empty() {
            warn!(
                unit_index,
                count = non_increasing.len(),
                first_index = non_increasing[0],
                "provider delivered non-increasing domain values"
            );
        }

        let provided = Interval::new(first, last);
        let tier = self.tiers[unit_index].get_or_insert_with(TierState::default);
        let merged = {
            let base = tier.samples.as_ref().unwrap_or(&self.placeholder).raw();
            merge_samples(base, provided, domain, range)
        };
        let samples = merged.len();
        tier.samples = Some(MipMapChain::single_level(merged.domain, vec![merged.range])?);
        tier.fetched.add(provided);
        // Re-issued requests covered by this data must not expire and erase it.
        tier.pending.retain(|_, request| !provided.contains_interval(request.region));
        debug!(
            unit_index,
            provided_start = provided.start,
            provided_end = provided.end,
            samples,
            "merged provider data into tier"
        );
        self.notify_changed(provided);
        Ok(())
    }

    /// Evicts pending requests older than the configured timeout from every
    /// tier. A no-op without a timeout. Returns the number evicted.
    pub fn expire_pending_requests(&mut self, now: Instant) -> usize {
        let Some(timeout) = self.request_timeout else {
            return 0;
        };
        self.tiers
            .iter_mut()
            .enumerate()
            .filter_map(|(unit_index, tier)| tier.as_mut().map(|tier| (unit_index, tier)))
            .map(|(unit_index, tier)| tier.evict_expired(now, timeout, unit_index))
            .sum()
    }

    fn tier(&self, unit_index: usize) -> Option<&TierState> {
        self.tiers.get(unit_index).and_then(Option::as_ref)
    }

    fn request_missing(&mut self, unit_index: usize, requested: Interval, now: Instant) {
        let tier = self.tiers[unit_index].get_or_insert_with(TierState::default);
        if let Some(timeout) = self.request_timeout {
            tier.evict_expired(now, timeout, unit_index);
        }
        let missing = tier.fetched.difference(&IntervalSet::from(requested));
        for region in missing.iter() {
            tier.fetched.add(region);
            let id = RequestId(self.next_request_id);
            self.next_request_id += 1;
            tier.pending.insert(
                id,
                PendingRequest {
                    region,
                    issued_at: now,
                },
            );
            debug!(
                request_id = id.0,
                unit_index,
                region_start = region.start,
                region_end = region.end,
                "requesting provider data"
            );
            self.provider.request_data(
                DataRequest {
                    id,
                    region,
                    unit_index,
                },
                DataCallback::new(id, unit_index, self.sender.clone()),
            );
        }
    }

    /// First populated level from `unit_index` toward finer tiers, else the
    /// placeholder.
    fn best_available(&self, unit_index: usize) -> MipMap<'_> {
        self.tiers[unit_index..]
            .iter()
            .flatten()
            .find_map(|tier| tier.samples.as_ref())
            .unwrap_or(&self.placeholder)
            .raw()
    }

    /// Finest populated tier, else the placeholder.
    fn finest_available(&self) -> MipMap<'_> {
        self.tiers
            .iter()
            .rev()
            .flatten()
            .find_map(|tier| tier.samples.as_ref())
            .unwrap_or(&self.placeholder)
            .raw()
    }

    fn notify_changed(&mut self, span: Interval) {
        let listeners = self.listeners.snapshot();
        let dataset: &dyn Dataset = self;
        for listener in listeners {
            listener.on_dataset_changed(dataset, span.start, span.end);
        }
    }
}

fn validate_unit_widths(widths: &[f64]) -> ChartResult<()> {
    if widths.is_empty() {
        return Err(ChartError::InvalidArgument(
            "provider must expose at least one unit width".to_owned(),
        ));
    }
    for width in widths {
        let width = ensure_finite(*width, "unit width")?;
        if width <= 0.0 {
            return Err(ChartError::InvalidArgument(format!(
                "unit widths must be positive, got {width}"
            )));
        }
    }
    if let Some(pair) = widths.windows(2).find(|pair| pair[0] <= pair[1]) {
        return Err(ChartError::InvalidArgument(format!(
            "unit widths must be strictly descending (coarsest first): {} then {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

struct MergedSamples {
    domain: Vec<f64>,
    range: Vec<f64>,
}

impl MergedSamples {
    fn len(&self) -> usize {
        self.domain.len()
    }
}

/// Keeps the samples of `base` outside `provided` and splices the new
/// samples in between.
fn merge_samples(
    base: MipMap<'_>,
    provided: Interval,
    domain: Vec<f64>,
    range: Vec<f64>,
) -> MergedSamples {
    let old_domain = base.domain();
    let old_range = base.range(0);
    let head = old_domain.partition_point(|x| *x < provided.start);
    let tail = old_domain
        .partition_point(|x| *x <= provided.end)
        .max(head);

    let capacity = head + domain.len() + (old_domain.len() - tail);
    let mut merged_domain = Vec::with_capacity(capacity);
    let mut merged_range = Vec::with_capacity(capacity);
    merged_domain.extend_from_slice(&old_domain[..head]);
    merged_range.extend_from_slice(&old_range[..head]);
    merged_domain.extend(domain);
    merged_range.extend(range);
    merged_domain.extend_from_slice(&old_domain[tail..]);
    merged_range.extend_from_slice(&old_range[tail..]);
    MergedSamples {
        domain: merged_domain,
        range: merged_range,
    }
}

impl<P: DataProvider> Dataset for ZoomDataset<P> {
    /// Placeholder first, then every populated tier in tier order.
    ///
    /// Unlike an in-memory pyramid, level 0 here is the coarsest view (the
    /// two-point placeholder) and later levels get finer, one level per
    /// populated tier. Use [`Dataset::best_mip_map_for_interval`] to get
    /// resolution-appropriate data.
    fn mip_map_chain(&self) -> Cow<'_, MipMapChain> {
        let levels = std::iter::once(self.placeholder.raw()).chain(
            self.tiers
                .iter()
                .flatten()
                .filter_map(|tier| tier.samples.as_ref().map(MipMapChain::raw)),
        );
        match MipMapChain::from_levels(levels) {
            Ok(chain) => Cow::Owned(chain),
            Err(err) => {
                warn!(error = %err, "failed to assemble zoom chain; using placeholder");
                Cow::Borrowed(&self.placeholder)
            }
        }
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
        self.process_deliveries();

        let desired_width = region.length() / max_samples as f64;
        let unit_index = self.select_unit(desired_width);
        if let Some(requested) = region.normalized().intersect(self.domain_extrema) {
            self.request_missing(unit_index, requested, Instant::now());
        }
        Ok(self.best_available(unit_index).region_for(region))
    }

    fn domain_extrema(&self) -> Interval {
        self.domain_extrema
    }

    fn num_samples(&self) -> usize {
        self.finest_available().len()
    }

    fn x(&self, index: usize) -> ChartResult<f64> {
        self.finest_available().tuple(index).map(|sample| sample.x())
    }

    fn flyweight_tuple(&self, index: usize) -> ChartResult<SampleRef<'_>> {
        self.finest_available().tuple(index)
    }

    fn range_extrema(&self, dimension: usize) -> ChartResult<Interval> {
        ChartError::check_index(dimension, 1)?;
        extrema(self.finest_available().range(dimension))
            .ok_or_else(|| ChartError::Internal("zoom tier has no samples".to_owned()))
    }

    fn preferred_range_axis_interval(&self) -> Option<Interval> {
        self.preferred_range_axis_interval
    }

    fn range_tuple_size(&self) -> usize {
        1
    }

    fn min_domain_interval(&self) -> f64 {
        min_interval(self.finest_available().domain())
    }
}

impl<P> fmt::Debug for ZoomDataset<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoomDataset")
            .field("domain_extrema", &self.domain_extrema)
            .field("unit_widths", &self.unit_widths)
            .field("request_timeout", &self.request_timeout)
            .field("next_request_id", &self.next_request_id)
            .finish_non_exhaustive()
    }
}
