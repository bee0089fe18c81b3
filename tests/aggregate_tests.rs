use labelscope::aggregate::{combine, Weights};
use labelscope::matrix::{SimMatrix, NOT_APPLICABLE};

fn filled(n: usize, score: f64) -> SimMatrix {
    let mut m = SimMatrix::new(n);
    for (i, j) in m.pairs().collect::<Vec<_>>() {
        m.set(i, j, score);
    }
    m
}

#[test]
fn combines_dimensions_by_configured_weight() {
    let control_flow = filled(2, 0.8);
    let resource = filled(2, 0.4);
    let data = filled(2, NOT_APPLICABLE);
    let time = filled(2, NOT_APPLICABLE);
    let duration = filled(2, NOT_APPLICABLE);
    let weights = Weights { control_flow: 2, resource: 1, data: 1, time: 1, duration: 1 };
    let overall = combine(&control_flow, &resource, &data, &time, &duration, &weights);
    // (2 * 0.8 + 1 * 0.4) / 3
    assert!((overall.get(0, 1) - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn sentinel_dimensions_contribute_no_weight() {
    let control_flow = filled(2, 0.9);
    let resource = filled(2, NOT_APPLICABLE);
    let data = filled(2, NOT_APPLICABLE);
    let time = filled(2, NOT_APPLICABLE);
    let duration = filled(2, NOT_APPLICABLE);
    let overall =
        combine(&control_flow, &resource, &data, &time, &duration, &Weights::default());
    assert!((overall.get(0, 1) - 0.9).abs() < 1e-9);
}

#[test]
fn all_sentinel_pair_falls_back_to_equal_weights_and_stays_defined() {
    let m = filled(2, NOT_APPLICABLE);
    let overall = combine(&m, &m, &m, &m, &m, &Weights::default());
    let v = overall.get(0, 1);
    assert!(!v.is_nan());
    // equal-weight fallback averages the five sentinels
    assert!((v - NOT_APPLICABLE).abs() < 1e-9);
}

#[test]
fn all_zero_weights_fall_back_to_equal_weights() {
    let control_flow = filled(2, 0.5);
    let resource = filled(2, NOT_APPLICABLE);
    let data = filled(2, NOT_APPLICABLE);
    let time = filled(2, NOT_APPLICABLE);
    let duration = filled(2, NOT_APPLICABLE);
    let weights = Weights { control_flow: 0, resource: 0, data: 0, time: 0, duration: 0 };
    let overall = combine(&control_flow, &resource, &data, &time, &duration, &weights);
    // every weight resets to 1 for the pair: (0.5 - 1 - 1 - 1 - 1) / 5
    assert!((overall.get(0, 1) - (0.5 - 4.0) / 5.0).abs() < 1e-9);
    assert!(!overall.get(0, 1).is_nan());
}

#[test]
fn overall_matrix_is_symmetric_with_unit_diagonal() {
    let mut control_flow = SimMatrix::new(3);
    control_flow.set(0, 1, 0.2);
    control_flow.set(0, 2, 0.7);
    control_flow.set(1, 2, 0.9);
    let resource = filled(3, 0.6);
    let data = filled(3, 0.1);
    let time = filled(3, NOT_APPLICABLE);
    let duration = filled(3, 0.3);
    let overall =
        combine(&control_flow, &resource, &data, &time, &duration, &Weights::default());
    for i in 0..3 {
        assert_eq!(overall.get(i, i), 1.0);
        for j in 0..3 {
            assert_eq!(overall.get(i, j), overall.get(j, i));
        }
    }
}
