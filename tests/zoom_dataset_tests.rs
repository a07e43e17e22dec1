use std::cell::RefCell;
use std::rc::Rc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use mip_series::core::{Interval, TimeUnit};
use mip_series::data::{
    DataCallback, DataProvider, DataRequest, Dataset, DatasetListener, GeneratingProvider,
    RequestId, ZoomDataset, ZoomDatasetConfig,
};
use mip_series::error::ChartError;

type Generator = fn(f64, usize) -> f64;

fn linear(x: f64, _unit_index: usize) -> f64 {
    x * 2.0
}

fn provider() -> GeneratingProvider<Generator> {
    GeneratingProvider::new(vec![100.0, 10.0, 1.0], linear as Generator)
}

fn dataset() -> ZoomDataset<GeneratingProvider<Generator>> {
    ZoomDataset::new(provider(), Interval::new(0.0, 1000.0)).expect("valid zoom dataset")
}

#[derive(Default)]
struct RecordingListener {
    changes: RefCell<Vec<(f64, f64)>>,
}

impl DatasetListener for RecordingListener {
    fn on_dataset_changed(&self, _dataset: &dyn Dataset, domain_start: f64, domain_end: f64) {
        self.changes.borrow_mut().push((domain_start, domain_end));
    }
}

#[test]
fn query_requests_coarsest_qualifying_tier_once() {
    let mut dataset = dataset();

    let region = dataset
        .best_mip_map_for_interval(Interval::new(0.0, 50.0), 500)
        .expect("query");
    assert_eq!(region.mip_map.domain(), &[0.0, 1000.0]);

    let requests = dataset.provider().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].unit_index, 0);
    assert_eq!(requests[0].region, Interval::new(0.0, 50.0));

    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 50.0), 500)
        .expect("repeat query");
    assert_eq!(dataset.provider().requests().len(), 1);
    assert_eq!(dataset.pending_request_count(), 1);
}

#[test]
fn finest_tier_is_used_when_no_tier_is_wide_enough() {
    let dataset = dataset();
    assert_eq!(dataset.select_unit(0.5), 0);
    assert_eq!(dataset.select_unit(50.0), 0);
    assert_eq!(dataset.select_unit(100.0), 0);
    assert_eq!(dataset.select_unit(100.5), 2);
}

#[test]
fn only_uncovered_pieces_are_requested() {
    let mut dataset = dataset();
    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("first query");
    dataset
        .best_mip_map_for_interval(Interval::new(50.0, 150.0), 20)
        .expect("overlapping query");

    let regions: Vec<Interval> = dataset
        .provider()
        .requests()
        .iter()
        .map(|request| request.region)
        .collect();
    assert_eq!(
        regions,
        vec![Interval::new(0.0, 100.0), Interval::new(100.0, 150.0)]
    );
    let fetched = dataset.fetched_intervals(0).expect("tier 0 state");
    assert_eq!(fetched.as_slice(), &[Interval::new(0.0, 150.0)]);
}

#[test]
fn regions_outside_the_domain_issue_no_requests() {
    let mut dataset = dataset();
    let region = dataset
        .best_mip_map_for_interval(Interval::new(2000.0, 3000.0), 10)
        .expect("query");
    assert_eq!(region.mip_map.len(), 2);
    assert!(dataset.provider().requests().is_empty());
}

#[test]
fn requests_are_clipped_to_domain_extrema() {
    let mut dataset = dataset();
    dataset
        .best_mip_map_for_interval(Interval::new(900.0, 1100.0), 20)
        .expect("query");
    assert_eq!(
        dataset.provider().requests()[0].region,
        Interval::new(900.0, 1000.0)
    );
}

#[test]
fn deliveries_populate_tier_and_notify_listeners() {
    let provider = GeneratingProvider::new(vec![10.0, 1.0], linear as Generator);
    let mut dataset =
        ZoomDataset::new(provider, Interval::new(0.0, 1000.0)).expect("valid zoom dataset");
    let listener = Rc::new(RecordingListener::default());
    dataset.add_listener(listener.clone());

    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("query");
    assert!(!dataset.is_tier_populated(0));

    assert_eq!(dataset.provider_mut().deliver_pending(), 1);
    assert_eq!(dataset.process_deliveries(), 1);
    assert!(dataset.is_tier_populated(0));
    assert_eq!(dataset.pending_request_count(), 0);
    assert_eq!(*listener.changes.borrow(), vec![(0.0, 100.0)]);

    let region = dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("query after delivery");
    assert_eq!(region.start_index, 0);
    assert_eq!(region.end_index, 10);
    let ys: Vec<f64> = region.samples().map(|sample| sample.y()).collect();
    assert_eq!(ys.len(), 11);
    assert_eq!(ys[3], 60.0);

    assert_eq!(dataset.provider().requests().len(), 1);
    assert_eq!(dataset.num_samples(), 12);
    assert_eq!(dataset.x(11).expect("placeholder tail"), 1000.0);
    assert_eq!(dataset.range_extrema(0).expect("extrema"), Interval::new(0.0, 200.0));
    assert_eq!(dataset.min_domain_interval(), 10.0);
}

#[test]
fn coarse_query_falls_back_to_finer_populated_tier() {
    let mut dataset = dataset();
    dataset
        .provide_data(1, vec![0.0, 10.0, 20.0], vec![1.0, 2.0, 3.0])
        .expect("direct provide");

    let region = dataset
        .best_mip_map_for_interval(Interval::new(0.0, 1000.0), 20)
        .expect("coarse query");
    assert_eq!(region.mip_map.domain(), &[0.0, 10.0, 20.0, 1000.0]);
    assert_eq!(dataset.provider().requests()[0].unit_index, 0);
}

#[test]
fn provide_data_replaces_samples_in_closed_span() {
    let mut dataset = dataset();
    dataset
        .provide_data(2, vec![10.0, 20.0, 30.0], vec![1.0, 2.0, 3.0])
        .expect("first batch");
    dataset
        .provide_data(2, vec![20.0, 25.0], vec![9.0, 8.0])
        .expect("second batch");

    let chain = dataset.mip_map_chain();
    assert_eq!(chain.num_levels(), 2);
    assert_eq!(chain.raw().domain(), &[0.0, 1000.0]);
    let tier = chain.mip_map(1).expect("tier level");
    assert_eq!(tier.domain(), &[0.0, 10.0, 20.0, 25.0, 30.0, 1000.0]);
    assert_eq!(tier.range(0), &[0.0, 1.0, 9.0, 8.0, 3.0, 0.0]);
}

#[test]
fn provide_data_validates_input() {
    let mut dataset = dataset();

    let err = dataset
        .provide_data(0, vec![1.0, 2.0], vec![1.0])
        .expect_err("length mismatch");
    assert!(matches!(err, ChartError::InvalidArgument(_)));

    let err = dataset
        .provide_data(3, vec![1.0], vec![1.0])
        .expect_err("unknown tier");
    assert!(matches!(err, ChartError::IndexOutOfBounds { index: 3, len: 3 }));

    dataset
        .provide_data(0, Vec::new(), Vec::new())
        .expect("empty delivery is ignored");
    assert!(!dataset.is_tier_populated(0));

    dataset
        .provide_data(0, vec![5.0, 4.0], vec![1.0, 1.0])
        .expect("non-increasing delivery is accepted with a warning");
    assert!(dataset.is_tier_populated(0));
}

#[test]
fn construction_validates_widths_and_extrema() {
    let err = ZoomDataset::new(
        GeneratingProvider::new(vec![1.0, 10.0], linear as Generator),
        Interval::new(0.0, 1.0),
    )
    .expect_err("ascending widths");
    assert!(matches!(err, ChartError::InvalidArgument(_)));

    let err = ZoomDataset::new(
        GeneratingProvider::new(Vec::new(), linear as Generator),
        Interval::new(0.0, 1.0),
    )
    .expect_err("no widths");
    assert!(matches!(err, ChartError::InvalidArgument(_)));

    let err = ZoomDataset::new(provider(), Interval::new(5.0, 5.0)).expect_err("empty domain");
    assert!(matches!(err, ChartError::InvalidArgument(_)));
}

#[test]
fn time_unit_widths_build_tiers() {
    let units = [TimeUnit::Day, TimeUnit::Hour, TimeUnit::Minute];
    let provider = GeneratingProvider::new(TimeUnit::widths(&units), linear as Generator);
    let dataset = ZoomDataset::new(provider, Interval::new(0.0, TimeUnit::Week.ms()))
        .expect("valid zoom dataset");
    assert_eq!(dataset.unit_widths()[1], 3_600_000.0);
}

#[test]
fn expired_requests_are_issued_again() {
    let config = ZoomDatasetConfig::new(Interval::new(0.0, 1000.0))
        .with_request_timeout(Duration::from_secs(60));
    let mut dataset = ZoomDataset::from_config(provider(), config).expect("valid zoom dataset");

    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("query");
    assert_eq!(dataset.provider_mut().drop_pending(), 1);

    assert_eq!(dataset.expire_pending_requests(Instant::now()), 0);
    let evicted = dataset.expire_pending_requests(Instant::now() + Duration::from_secs(61));
    assert_eq!(evicted, 1);
    assert!(dataset.fetched_intervals(0).expect("tier state").is_empty());

    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("query after eviction");
    let requests = dataset.provider().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].region, requests[0].region);
    assert_ne!(requests[1].id, requests[0].id);
}

#[test]
fn without_timeout_requested_regions_stay_marked() {
    let mut dataset = dataset();
    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("query");
    dataset.provider_mut().drop_pending();

    assert_eq!(
        dataset.expire_pending_requests(Instant::now() + Duration::from_secs(3600)),
        0
    );
    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("repeat query");
    assert_eq!(dataset.provider().requests().len(), 1);
}

/// Answers every request from a worker thread.
struct ThreadedProvider {
    units: Vec<f64>,
    workers: Vec<JoinHandle<bool>>,
}

impl DataProvider for ThreadedProvider {
    fn units(&self) -> &[f64] {
        &self.units
    }

    fn request_data(&mut self, request: DataRequest, callback: DataCallback) {
        self.workers.push(std::thread::spawn(move || {
            let region = request.region;
            callback.provide_data(vec![region.start, region.end], vec![1.0, 2.0])
        }));
    }
}

#[test]
fn callbacks_can_deliver_from_other_threads() {
    let provider = ThreadedProvider {
        units: vec![10.0],
        workers: Vec::new(),
    };
    let mut dataset =
        ZoomDataset::new(provider, Interval::new(0.0, 100.0)).expect("valid zoom dataset");

    dataset
        .best_mip_map_for_interval(Interval::new(20.0, 40.0), 100)
        .expect("query");
    for worker in dataset.provider_mut().workers.drain(..) {
        assert!(worker.join().expect("worker finished"));
    }

    assert_eq!(dataset.process_deliveries(), 1);
    let region = dataset
        .best_mip_map_for_interval(Interval::new(20.0, 40.0), 100)
        .expect("query after delivery");
    assert_eq!(region.mip_map.domain(), &[0.0, 20.0, 40.0, 100.0]);
}

/// Hands callbacks to the test instead of answering them.
struct StashingProvider {
    units: Vec<f64>,
    stash: Rc<RefCell<Vec<DataCallback>>>,
}

impl DataProvider for StashingProvider {
    fn units(&self) -> &[f64] {
        &self.units
    }

    fn request_data(&mut self, _request: DataRequest, callback: DataCallback) {
        self.stash.borrow_mut().push(callback);
    }
}

#[test]
fn late_callback_after_dataset_drop_reports_failure() {
    let stash = Rc::new(RefCell::new(Vec::new()));
    let provider = StashingProvider {
        units: vec![1.0],
        stash: stash.clone(),
    };
    let mut dataset =
        ZoomDataset::new(provider, Interval::new(0.0, 10.0)).expect("valid zoom dataset");
    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 10.0), 10)
        .expect("query");
    drop(dataset);

    let callback = stash.borrow_mut().pop().expect("stashed callback");
    assert_eq!(callback.request_id(), RequestId(0));
    assert!(!callback.provide_data(vec![1.0], vec![1.0]));
}

#[test]
fn late_reply_clears_reissued_request_for_same_region() {
    let config = ZoomDatasetConfig::new(Interval::new(0.0, 1000.0))
        .with_request_timeout(Duration::from_secs(60));
    let mut dataset = ZoomDataset::from_config(provider(), config).expect("valid zoom dataset");

    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("first query");
    let later = Instant::now() + Duration::from_secs(61);
    assert_eq!(dataset.expire_pending_requests(later), 1);
    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("query after timeout");
    assert_eq!(dataset.provider().requests().len(), 2);

    // The first request answers late, the reissued one never does.
    assert!(dataset.provider_mut().deliver_next());
    assert_eq!(dataset.provider_mut().drop_pending(), 1);
    assert_eq!(dataset.process_deliveries(), 1);
    assert_eq!(dataset.pending_request_count(), 0);

    let much_later = Instant::now() + Duration::from_secs(3600);
    assert_eq!(dataset.expire_pending_requests(much_later), 0);
    assert_eq!(
        dataset.fetched_intervals(0).expect("tier state").as_slice(),
        &[Interval::new(0.0, 100.0)]
    );
    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 20)
        .expect("query after late reply");
    assert_eq!(dataset.provider().requests().len(), 2);
}

#[test]
fn rejected_reply_unmarks_region_for_another_request() {
    let stash = Rc::new(RefCell::new(Vec::new()));
    let provider = StashingProvider {
        units: vec![1.0],
        stash: stash.clone(),
    };
    let config = ZoomDatasetConfig::new(Interval::new(0.0, 100.0))
        .with_request_timeout(Duration::from_secs(60));
    let mut dataset = ZoomDataset::from_config(provider, config).expect("valid zoom dataset");

    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 200)
        .expect("query");
    let callback = stash.borrow_mut().pop().expect("stashed callback");
    assert!(callback.provide_data(vec![f64::NAN, 1.0], vec![1.0, 1.0]));

    assert_eq!(dataset.process_deliveries(), 1);
    assert_eq!(dataset.pending_request_count(), 0);
    assert!(!dataset.is_tier_populated(0));
    assert!(dataset.fetched_intervals(0).expect("tier state").is_empty());

    dataset
        .best_mip_map_for_interval(Interval::new(0.0, 100.0), 200)
        .expect("query after rejected reply");
    let callback = stash.borrow_mut().pop().expect("request issued again");
    assert_eq!(callback.request_id(), RequestId(1));
}

#[test]
fn assembled_chain_runs_from_placeholder_to_finest_tier() {
    let mut dataset = dataset();
    dataset
        .provide_data(2, vec![1.0, 2.0, 3.0], vec![1.0, 1.0, 1.0])
        .expect("fine tier");
    dataset
        .provide_data(0, vec![100.0], vec![5.0])
        .expect("coarse tier");

    let chain = dataset.mip_map_chain();
    let lengths: Vec<usize> = chain.levels().map(|level| level.len()).collect();
    assert_eq!(lengths, vec![2, 3, 5]);
    assert_eq!(chain.raw().domain(), &[0.0, 1000.0]);
    assert_eq!(chain.top().domain(), &[0.0, 1.0, 2.0, 3.0, 1000.0]);
}
