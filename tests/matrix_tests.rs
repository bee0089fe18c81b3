use labelscope::matrix::{SimMatrix, NOT_APPLICABLE};

#[test]
fn new_matrix_has_unit_diagonal_and_zero_elsewhere() {
    let m = SimMatrix::new(3);
    for i in 0..3 {
        for j in 0..3 {
            if i == j {
                assert_eq!(m.get(i, j), 1.0);
            } else {
                assert_eq!(m.get(i, j), 0.0);
            }
        }
    }
}

#[test]
fn set_writes_both_cells() {
    let mut m = SimMatrix::new(4);
    m.set(1, 3, 0.42);
    assert_eq!(m.get(1, 3), 0.42);
    assert_eq!(m.get(3, 1), 0.42);
}

#[test]
fn diagonal_is_not_writable() {
    let mut m = SimMatrix::new(2);
    m.set(1, 1, 0.0);
    assert_eq!(m.get(1, 1), 1.0);
}

#[test]
fn sentinel_round_trips() {
    let mut m = SimMatrix::new(2);
    m.set(0, 1, NOT_APPLICABLE);
    assert_eq!(m.get(0, 1), NOT_APPLICABLE);
    assert_eq!(m.get(1, 0), NOT_APPLICABLE);
}

#[test]
fn pairs_visits_the_upper_triangle_once() {
    let m = SimMatrix::new(5);
    let pairs: Vec<(usize, usize)> = m.pairs().collect();
    assert_eq!(pairs.len(), 10);
    for &(i, j) in pairs.iter() {
        assert!(i < j);
    }
    let unique: std::collections::HashSet<_> = pairs.iter().collect();
    assert_eq!(unique.len(), pairs.len());
}
