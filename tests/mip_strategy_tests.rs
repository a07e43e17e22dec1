use approx::assert_relative_eq;
use mip_series::error::ChartError;
use mip_series::mipmap::{Max, Mean, Min, MipStrategy, Sum, level_count};

#[test]
fn mean_pyramid_matches_worked_example() {
    let chain = Mean
        .mipmap(&[0.0, 1.0, 2.0, 3.0], &[vec![1.0, 2.0, 3.0, 4.0]])
        .expect("valid pyramid");

    assert_eq!(chain.num_levels(), 3);
    let level1 = chain.mip_map(1).expect("level 1");
    assert_eq!(level1.domain(), &[0.0, 2.0]);
    assert_eq!(level1.range(0), &[1.5, 3.5]);
    let level2 = chain.mip_map(2).expect("level 2");
    assert_eq!(level2.domain(), &[0.0]);
    assert_eq!(level2.range(0), &[2.5]);
}

#[test]
fn max_min_and_sum_fold_each_pair() {
    let domain = [0.0, 1.0, 2.0, 3.0];
    let range = vec![5.0, -1.0, 2.0, 8.0];

    let max = Max.mipmap(&domain, &[range.clone()]).expect("max pyramid");
    assert_eq!(max.mip_map(1).expect("level 1").range(0), &[5.0, 8.0]);
    assert_eq!(max.top().range(0), &[8.0]);

    let min = Min.mipmap(&domain, &[range.clone()]).expect("min pyramid");
    assert_eq!(min.mip_map(1).expect("level 1").range(0), &[-1.0, 2.0]);

    let sum = Sum.mipmap(&domain, &[range]).expect("sum pyramid");
    assert_relative_eq!(sum.top().range(0)[0], 14.0);
}

#[test]
fn level_zero_is_the_input_verbatim() {
    let domain: Vec<f64> = (0..37).map(|i| f64::from(i) * 0.25).collect();
    let range: Vec<f64> = domain.iter().map(|x| x.sin()).collect();
    let chain = Mean
        .mipmap(&domain, &[range.clone()])
        .expect("valid pyramid");

    assert_eq!(chain.raw().domain(), domain.as_slice());
    assert_eq!(chain.raw().range(0), range.as_slice());
}

#[test]
fn every_level_halves_the_previous_one() {
    let domain: Vec<f64> = (0..1000).map(f64::from).collect();
    let range = vec![1.0; domain.len()];
    let chain = Mean.mipmap(&domain, &[range]).expect("valid pyramid");

    assert_eq!(chain.num_levels(), level_count(1000));
    assert_eq!(chain.num_levels(), 10);
    for (finer, coarser) in chain.levels().zip(chain.levels().skip(1)) {
        assert_eq!(coarser.len(), finer.len() / 2);
        assert_eq!(coarser.range(0).len(), coarser.len());
    }
    assert_eq!(chain.top().len(), 1);
}

#[test]
fn coarse_domain_uses_left_sample_of_each_pair() {
    let domain = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0];
    let chain = Mean
        .mipmap(&domain, &[vec![0.0; 8]])
        .expect("valid pyramid");
    assert_eq!(chain.mip_map(2).expect("level 2").domain(), &[10.0, 14.0]);
}

#[test]
fn multiple_range_dimensions_share_domain_levels() {
    let domain = [0.0, 1.0, 2.0, 3.0];
    let chain = Max
        .mipmap(&domain, &[vec![1.0, 2.0, 3.0, 4.0], vec![9.0, 8.0, 7.0, 6.0]])
        .expect("valid pyramid");

    assert_eq!(chain.range_tuple_size(), 2);
    let level1 = chain.mip_map(1).expect("level 1");
    assert_eq!(level1.range(0), &[2.0, 4.0]);
    assert_eq!(level1.range(1), &[9.0, 7.0]);
    assert!(level1.range(2).is_empty());
}

#[test]
fn mismatched_or_empty_inputs_are_rejected() {
    let err = Mean.mipmap(&[], &[vec![]]).expect_err("empty domain");
    assert!(matches!(err, ChartError::InvalidArgument(_)));

    let err = Mean
        .mipmap(&[0.0, 1.0], &[vec![1.0]])
        .expect_err("length mismatch");
    assert!(matches!(err, ChartError::InvalidArgument(_)));

    let err = Mean.mipmap(&[0.0, 1.0], &[]).expect_err("no dimensions");
    assert!(matches!(err, ChartError::InvalidArgument(_)));
}

#[test]
fn append_grows_pyramid_by_one_level_at_powers_of_two() {
    let mut chain = Mean
        .mipmap(&[0.0, 1.0, 2.0], &[vec![2.0, 4.0, 6.0]])
        .expect("valid pyramid");
    assert_eq!(chain.num_levels(), 2);

    Mean.append_xy(&mut chain, 3.0, &[8.0]).expect("append");
    assert_eq!(chain.num_levels(), 3);
    assert_eq!(chain.mip_map(1).expect("level 1").range(0), &[3.0, 7.0]);
    assert_eq!(chain.top().range(0), &[5.0]);
}

#[test]
fn append_rejects_non_increasing_x_without_touching_chain() {
    let mut chain = Mean
        .mipmap(&[0.0, 1.0], &[vec![1.0, 1.0]])
        .expect("valid pyramid");
    let before = chain.clone();

    let err = Mean
        .append_xy(&mut chain, 1.0, &[5.0])
        .expect_err("duplicate x");
    assert!(matches!(err, ChartError::InvalidArgument(_)));
    let err = Mean
        .append_xy(&mut chain, 2.0, &[5.0, 6.0])
        .expect_err("wrong tuple size");
    assert!(matches!(err, ChartError::InvalidArgument(_)));
    assert_eq!(chain, before);
}

#[test]
fn set_range_value_updates_each_ancestor() {
    let mut chain = Mean
        .mipmap(&[0.0, 1.0, 2.0, 3.0], &[vec![1.0, 2.0, 3.0, 4.0]])
        .expect("valid pyramid");

    Mean.set_range_value(&mut chain, 0, 2, 13.0)
        .expect("set value");

    assert_eq!(chain.raw().range(0), &[1.0, 2.0, 13.0, 4.0]);
    assert_eq!(chain.mip_map(1).expect("level 1").range(0), &[1.5, 8.5]);
    assert_eq!(chain.top().range(0), &[5.0]);
}

#[test]
fn set_range_value_checks_bounds() {
    let mut chain = Mean
        .mipmap(&[0.0, 1.0], &[vec![1.0, 2.0]])
        .expect("valid pyramid");

    let err = Mean
        .set_range_value(&mut chain, 0, 2, 0.0)
        .expect_err("index past end");
    assert!(matches!(err, ChartError::IndexOutOfBounds { index: 2, len: 2 }));

    let err = Mean
        .set_range_value(&mut chain, 1, 0, 0.0)
        .expect_err("unknown dimension");
    assert!(matches!(err, ChartError::IndexOutOfBounds { index: 1, len: 1 }));
}
