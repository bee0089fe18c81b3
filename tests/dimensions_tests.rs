use labelscope::dataset::Dataset;
use labelscope::dimensions::{
    control_flow_similarity, data_similarity, duration_similarity, resource_similarity,
    string_similarity, time_similarity,
};
use labelscope::matrix::NOT_APPLICABLE;
use labelscope::parser::{parse, EventLog, ParserConfig};
use labelscope::profile::build_profiles;

fn dataset(columns: &[&str], rows: Vec<Vec<String>>) -> Dataset {
    let mut d = Dataset::new(columns.iter().map(|c| c.to_string()).collect());
    for row in rows {
        d.push_row(row);
    }
    d
}

fn row(vals: &[&str]) -> Vec<String> {
    vals.iter().map(|v| v.to_string()).collect()
}

fn log_of(columns: &[&str], rows: Vec<Vec<String>>) -> EventLog {
    let d = dataset(columns, rows);
    parse(&d, &ParserConfig::new("case", "activity")).unwrap()
}

fn idx(log: &EventLog, label: &str) -> usize {
    log.activities.iter().position(|a| a.label == label).unwrap()
}

#[test]
fn string_similarity_is_normalized_edit_distance() {
    let log = log_of(
        &["case", "activity"],
        vec![row(&["c1", "Check Stock"]), row(&["c1", "Chek Stock"]), row(&["c1", "Ship Order"])],
    );
    let m = string_similarity(&log);
    let a = idx(&log, "Check Stock");
    let b = idx(&log, "Chek Stock");
    let c = idx(&log, "Ship Order");
    // one deletion over 11 characters
    assert!((m.get(a, b) - (1.0 - 1.0 / 11.0)).abs() < 1e-9);
    assert_eq!(m.get(a, b), m.get(b, a));
    assert_eq!(m.get(a, a), 1.0);
    assert!(m.get(a, c) < 0.5);
}

#[test]
fn control_flow_scores_bidirectional_succession() {
    // A is always directly followed by B; B is never followed by A
    let log = log_of(
        &["case", "activity", "time:timestamp"],
        vec![
            row(&["c1", "A", "2024-01-01 09:00:00"]),
            row(&["c1", "B", "2024-01-01 09:10:00"]),
            row(&["c2", "A", "2024-01-02 09:00:00"]),
            row(&["c2", "B", "2024-01-02 09:10:00"]),
        ],
    );
    let m = control_flow_similarity(&log, 0.0);
    let a = idx(&log, "A");
    let b = idx(&log, "B");
    assert!((m.get(a, b) - 0.5).abs() < 1e-9);
}

#[test]
fn control_flow_discounts_successions_below_the_noise_threshold() {
    // A -> B nine times, A -> C once
    let mut rows = Vec::new();
    for i in 0..9 {
        rows.push(row(&[&format!("c{i}"), "A", "2024-01-01 09:00:00"]));
        rows.push(row(&[&format!("c{i}"), "B", "2024-01-01 09:10:00"]));
    }
    rows.push(row(&["c9", "A", "2024-01-01 09:00:00"]));
    rows.push(row(&["c9", "C", "2024-01-01 09:10:00"]));
    let log = log_of(&["case", "activity", "time:timestamp"], rows);
    let a = idx(&log, "A");
    let c = idx(&log, "C");

    let lenient = control_flow_similarity(&log, 0.0);
    assert!((lenient.get(a, c) - 0.05).abs() < 1e-9);

    let strict = control_flow_similarity(&log, 0.2);
    assert_eq!(strict.get(a, c), 0.0);
}

#[test]
fn resource_similarity_is_distribution_overlap() {
    let log = log_of(
        &["case", "activity", "org:resource"],
        vec![
            row(&["c1", "A", "alice"]),
            row(&["c1", "A", "bob"]),
            row(&["c1", "B", "alice"]),
        ],
    );
    let profiles = build_profiles(&log);
    let m = resource_similarity(&profiles);
    let a = idx(&log, "A");
    let b = idx(&log, "B");
    // A: {alice: 0.5, bob: 0.5}, B: {alice: 1.0} -> overlap 0.5
    assert!((m.get(a, b) - 0.5).abs() < 1e-9);
}

#[test]
fn resource_similarity_is_not_applicable_without_any_resource_data() {
    let log = log_of(&["case", "activity"], vec![row(&["c1", "A"]), row(&["c1", "B"])]);
    let profiles = build_profiles(&log);
    let m = resource_similarity(&profiles);
    assert_eq!(m.get(0, 1), NOT_APPLICABLE);
}

#[test]
fn duration_similarity_is_not_applicable_without_histograms() {
    // single durationless event per activity: no histogram, sentinel only
    let log = log_of(
        &["case", "activity", "time:timestamp"],
        vec![row(&["c1", "A", "2024-01-01 09:00:00"]), row(&["c1", "B", "2024-01-01 10:00:00"])],
    );
    let profiles = build_profiles(&log);
    let m = duration_similarity(&profiles);
    let v = m.get(0, 1);
    assert_eq!(v, NOT_APPLICABLE);
    assert!(!v.is_nan());
}

#[test]
fn identical_duration_histograms_overlap_fully() {
    let mut rows = Vec::new();
    for (case, label) in [("c1", "A"), ("c2", "B")] {
        rows.push(row(&[case, label, "2024-01-01 09:00:00", "start"]));
        rows.push(row(&[case, label, "2024-01-01 09:00:30", "complete"]));
    }
    let log = log_of(&["case", "activity", "time:timestamp", "lifecycle:transition"], rows);
    let profiles = build_profiles(&log);
    assert!(profiles[0].duration_hist.is_some());
    let m = duration_similarity(&profiles);
    assert!((m.get(0, 1) - 1.0).abs() < 1e-9);
}

#[test]
fn time_similarity_is_not_applicable_when_both_sides_are_random() {
    // no timestamps at all: every temporal flag is Unknown, which counts as random
    let log = log_of(&["case", "activity"], vec![row(&["c1", "A"]), row(&["c1", "B"])]);
    let profiles = build_profiles(&log);
    let m = time_similarity(&profiles);
    assert_eq!(m.get(0, 1), NOT_APPLICABLE);
}

#[test]
fn time_similarity_compares_structured_distributions() {
    let mut rows = Vec::new();
    for i in 0..12 {
        rows.push(row(&[&format!("a{i:02}"), "Morning", "2024-03-04 09:00:00"]));
    }
    for i in 0..24 {
        rows.push(row(&[&format!("b{i:02}"), "Evening", "2024-03-04 21:00:00"]));
    }
    let log = log_of(&["case", "activity", "time:timestamp"], rows);
    let profiles = build_profiles(&log);
    let m = time_similarity(&profiles);
    let a = idx(&log, "Morning");
    let b = idx(&log, "Evening");
    // hour buckets are disjoint (overlap 0); weekday and month distributions
    // are identical (overlap 1) but both random, hence skipped
    assert!((m.get(a, b) - 0.0).abs() < 1e-9);
}

#[test]
fn data_similarity_averages_over_shared_keys() {
    let log = log_of(
        &["case", "activity", "data:team", "data:priority"],
        vec![
            row(&["c1", "A", "picking", "high"]),
            row(&["c1", "A", "picking", "low"]),
            row(&["c1", "B", "picking", "high"]),
            row(&["c1", "B", "packing", "high"]),
        ],
    );
    let profiles = build_profiles(&log);
    let m = data_similarity(&profiles);
    let a = idx(&log, "A");
    let b = idx(&log, "B");
    // team: A {picking: 1.0}, B {picking: 0.5, packing: 0.5} -> 0.5
    // priority: A {high: 0.5, low: 0.5}, B {high: 1.0} -> 0.5
    assert!((m.get(a, b) - 0.5).abs() < 1e-9);
}

#[test]
fn data_similarity_is_not_applicable_without_shared_keys() {
    let log = log_of(
        &["case", "activity", "data:team", "data:priority"],
        vec![row(&["c1", "A", "picking", ""]), row(&["c1", "B", "", "high"])],
    );
    let profiles = build_profiles(&log);
    let m = data_similarity(&profiles);
    assert_eq!(m.get(0, 1), NOT_APPLICABLE);
}

#[test]
fn all_dimension_matrices_are_symmetric_with_unit_diagonal() {
    let log = log_of(
        &["case", "activity", "time:timestamp", "org:resource", "data:team"],
        vec![
            row(&["c1", "A", "2024-03-04 09:00:00", "alice", "picking"]),
            row(&["c1", "B", "2024-03-04 10:00:00", "bob", "packing"]),
            row(&["c2", "A", "2024-03-04 09:30:00", "alice", "picking"]),
            row(&["c2", "C", "2024-03-04 11:00:00", "carol", ""]),
        ],
    );
    let profiles = build_profiles(&log);
    let mats = [
        string_similarity(&log),
        control_flow_similarity(&log, 0.05),
        resource_similarity(&profiles),
        duration_similarity(&profiles),
        time_similarity(&profiles),
        data_similarity(&profiles),
    ];
    for m in mats.iter() {
        for i in 0..m.len() {
            assert_eq!(m.get(i, i), 1.0);
            for j in 0..m.len() {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
    }
}
