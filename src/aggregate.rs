use crate::matrix::{SimMatrix, NOT_APPLICABLE};

/// Per-dimension weights for the overall score. String similarity is a
/// grouping co-requirement, not an aggregated dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weights {
    pub control_flow: u32,
    pub resource: u32,
    pub data: u32,
    pub time: u32,
    pub duration: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Weights { control_flow: 1, resource: 1, data: 1, time: 1, duration: 1 }
    }
}

/// Weighted combination of the five context matrices.
///
/// A dimension whose score is the N/A sentinel contributes no weight for
/// that pair. When the effective weight sum reaches 0 (all weights
/// configured to 0, or every dimension inapplicable) all five weights are
/// reset to 1 for that pair only; the reset does not distinguish the two
/// causes.
pub fn combine(
    control_flow: &SimMatrix,
    resource: &SimMatrix,
    data: &SimMatrix,
    time: &SimMatrix,
    duration: &SimMatrix,
    weights: &Weights,
) -> SimMatrix {
    let n = control_flow.len();
    let configured = [
        weights.control_flow as f64,
        weights.resource as f64,
        weights.data as f64,
        weights.time as f64,
        weights.duration as f64,
    ];
    let mut overall = SimMatrix::new(n);
    for (i, j) in overall.pairs().collect::<Vec<_>>() {
        let scores = [
            control_flow.get(i, j),
            resource.get(i, j),
            data.get(i, j),
            time.get(i, j),
            duration.get(i, j),
        ];
        let mut effective = configured;
        for (w, &s) in effective.iter_mut().zip(scores.iter()) {
            if s == NOT_APPLICABLE {
                *w = 0.0;
            }
        }
        let mut weight_sum: f64 = effective.iter().sum();
        if weight_sum == 0.0 {
            effective = [1.0; 5];
            weight_sum = 5.0;
        }
        let score = scores.iter().zip(effective.iter()).map(|(s, w)| s * w).sum::<f64>() / weight_sum;
        overall.set(i, j, score);
    }
    overall
}
