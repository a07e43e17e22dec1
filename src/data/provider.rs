use std::collections::VecDeque;
use std::fmt;

use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fetch request for one missing region of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    pub id: RequestId,
    pub region: Interval,
    /// Index into the provider's [`DataProvider::units`].
    pub unit_index: usize,
}

/// Samples sent back through a [`DataCallback`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Delivery {
    pub(crate) request_id: RequestId,
    pub(crate) unit_index: usize,
    pub(crate) domain: Vec<f64>,
    pub(crate) range: Vec<f64>,
}

/// One-shot reply handle for a [`DataRequest`].
///
/// `provide_data` consumes the handle, so a request is answered at most once.
/// The handle is `Send`: providers may answer from worker threads, and the
/// data is applied when the owning dataset next drains its deliveries.
#[derive(Debug)]
pub struct DataCallback {
    request_id: RequestId,
    unit_index: usize,
    sender: Sender<Delivery>,
}

impl DataCallback {
    pub(crate) fn new(request_id: RequestId, unit_index: usize, sender: Sender<Delivery>) -> Self {
        Self {
            request_id,
            unit_index,
            sender,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn unit_index(&self) -> usize {
        self.unit_index
    }

    /// Sends `domain`/`range` samples back to the dataset.
    ///
    /// Returns `false` when the dataset has been dropped.
    pub fn provide_data(self, domain: Vec<f64>, range: Vec<f64>) -> bool {
        let delivered = self
            .sender
            .send(Delivery {
                request_id: self.request_id,
                unit_index: self.unit_index,
                domain,
                range,
            })
            .is_ok();
        if !delivered {
            warn!(
                request_id = self.request_id.0,
                "dataset dropped before provider delivery"
            );
        }
        delivered
    }
}

/// Source of tiered samples for a [`crate::data::ZoomDataset`].
pub trait DataProvider {
    /// Tier widths (sample spacing) from coarsest to finest.
    fn units(&self) -> &[f64];

    /// Starts fetching `request.region` at tier `request.unit_index`.
    /// Answer through `callback`, now or later.
    fn request_data(&mut self, request: DataRequest, callback: DataCallback);
}

/// Provider that synthesizes samples from a function, holding every reply
/// until [`GeneratingProvider::deliver_pending`] is called.
///
/// Useful for demos and for exercising asynchronous delivery deterministically.
pub struct GeneratingProvider<F> {
    units: Vec<f64>,
    generator: F,
    queued: VecDeque<(DataRequest, DataCallback)>,
    history: Vec<DataRequest>,
}

impl<F> GeneratingProvider<F>
where
    F: Fn(f64, usize) -> f64,
{
    /// Upper bound on the samples generated for a single request. Wider
    /// requests are truncated at the region start plus this many ticks.
    pub const MAX_SAMPLES_PER_REQUEST: usize = 1 << 20;

    /// `generator(x, unit_index)` yields the range value at domain `x`.
    pub fn new(units: Vec<f64>, generator: F) -> Self {
        Self {
            units,
            generator,
            queued: VecDeque::new(),
            history: Vec::new(),
        }
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> &[DataRequest] {
        &self.history
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.queued.len()
    }

    /// Answers the oldest queued request. Returns `false` when nothing is queued.
    pub fn deliver_next(&mut self) -> bool {
        let Some((request, callback)) = self.queued.pop_front() else {
            return false;
        };
        let (domain, range) = self.generate(request);
        debug!(
            request_id = request.id.0,
            unit_index = request.unit_index,
            samples = domain.len(),
            "delivering generated samples"
        );
        callback.provide_data(domain, range);
        true
    }

    /// Answers every queued request. Returns how many were answered.
    pub fn deliver_pending(&mut self) -> usize {
        let mut delivered = 0;
        while self.deliver_next() {
            delivered += 1;
        }
        delivered
    }

    /// Discards queued requests without answering them, as a failed
    /// backend would.
    pub fn drop_pending(&mut self) -> usize {
        let dropped = self.queued.len();
        self.queued.clear();
        dropped
    }

    /// Samples on the tier tick grid starting at the region start and
    /// staying inside the region.
    fn generate(&self, request: DataRequest) -> (Vec<f64>, Vec<f64>) {
        let Some(tick) = self.units.get(request.unit_index).copied() else {
            return (Vec::new(), Vec::new());
        };
        let region = request.region;
        if tick.is_nan() || tick <= 0.0 || !region.length().is_finite() || region.length() < 0.0 {
            return (Vec::new(), Vec::new());
        }
        let ticks = (region.length() / tick).floor();
        let max_steps = Self::MAX_SAMPLES_PER_REQUEST - 1;
        let steps = if ticks > max_steps as f64 {
            warn!(
                request_id = request.id.0,
                unit_index = request.unit_index,
                ticks,
                max_samples = Self::MAX_SAMPLES_PER_REQUEST,
                "truncating generated samples"
            );
            max_steps
        } else {
            ticks as usize
        };
        let domain: Vec<f64> = (0..=steps)
            .map(|step| region.start + step as f64 * tick)
            .collect();
        let range = domain
            .iter()
            .map(|x| (self.generator)(*x, request.unit_index))
            .collect();
        (domain, range)
    }
}

impl<F> DataProvider for GeneratingProvider<F>
where
    F: Fn(f64, usize) -> f64,
{
    fn units(&self) -> &[f64] {
        &self.units
    }

    fn request_data(&mut self, request: DataRequest, callback: DataCallback) {
        self.history.push(request);
        self.queued.push_back((request, callback));
    }
}

impl<F> fmt::Debug for GeneratingProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratingProvider")
            .field("units", &self.units)
            .field("queued", &self.queued.len())
            .field("history", &self.history.len())
            .finish()
    }
}
