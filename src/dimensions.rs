use crate::matrix::{SimMatrix, NOT_APPLICABLE};
use crate::parser::EventLog;
use crate::profile::ActivityProfile;
use ahash::AHashMap;

/// Lexical similarity: 1 - edit distance / max label length.
pub fn string_similarity(log: &EventLog) -> SimMatrix {
    let labels: Vec<&str> = log.activities.iter().map(|a| a.label.as_str()).collect();
    let n = labels.len();
    let mut m = SimMatrix::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let longest = labels[i].chars().count().max(labels[j].chars().count());
            let score = if longest == 0 {
                1.0
            } else {
                1.0 - levenshtein(labels[i], labels[j]) as f64 / longest as f64
            };
            m.set(i, j, score);
        }
    }
    m
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let sub = prev[j] + usize::from(ca != cb);
            curr[j + 1] = sub.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Direct-succession similarity: the relative frequency of `b` directly
/// following `a`, frequencies under the noise threshold discounted to zero,
/// symmetrized as the mean of the two directions.
pub fn control_flow_similarity(log: &EventLog, noise_threshold: f64) -> SimMatrix {
    let n = log.activities.len();
    let index: AHashMap<&str, usize> =
        log.activities.iter().enumerate().map(|(i, a)| (a.label.as_str(), i)).collect();

    let mut succ = vec![0u64; n * n];
    let mut totals = vec![0u64; n];
    for (i, activity) in log.activities.iter().enumerate() {
        for &r in activity.events.iter() {
            if let Some(next) = log.successor_label(r) {
                if let Some(&j) = index.get(next) {
                    succ[i * n + j] += 1;
                    totals[i] += 1;
                }
            }
        }
    }

    let rel = |i: usize, j: usize| -> f64 {
        if totals[i] == 0 {
            return 0.0;
        }
        let f = succ[i * n + j] as f64 / totals[i] as f64;
        if f < noise_threshold {
            0.0
        } else {
            f
        }
    };

    let mut m = SimMatrix::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            m.set(i, j, (rel(i, j) + rel(j, i)) / 2.0);
        }
    }
    m
}

/// Overlap between resource distributions; N/A when neither activity ever
/// carried a non-empty resource.
pub fn resource_similarity(profiles: &[ActivityProfile]) -> SimMatrix {
    let n = profiles.len();
    let mut m = SimMatrix::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let a = &profiles[i];
            let b = &profiles[j];
            let score = if !a.has_resource_data && !b.has_resource_data {
                NOT_APPLICABLE
            } else {
                overlap(&a.resource_probs, &b.resource_probs)
            };
            m.set(i, j, score);
        }
    }
    m
}

/// Overlap between the two duration histograms; N/A when either activity
/// has no duration distribution.
pub fn duration_similarity(profiles: &[ActivityProfile]) -> SimMatrix {
    let n = profiles.len();
    let mut m = SimMatrix::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let score = match (&profiles[i].duration_hist, &profiles[j].duration_hist) {
                (Some(a), Some(b)) => density_overlap(&a.probs, a.bin_width, &b.probs, b.bin_width),
                _ => NOT_APPLICABLE,
            };
            m.set(i, j, score);
        }
    }
    m
}

/// Overlap across the hour/weekday/month distributions, averaged over the
/// sub-dimensions where at least one side shows structure; N/A when every
/// sub-dimension is random for both activities.
pub fn time_similarity(profiles: &[ActivityProfile]) -> SimMatrix {
    let n = profiles.len();
    let mut m = SimMatrix::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let a = &profiles[i];
            let b = &profiles[j];
            let mut sum = 0.0;
            let mut used = 0usize;
            if !(a.hour_random.is_random() && b.hour_random.is_random()) {
                sum += overlap(&a.hour_probs, &b.hour_probs);
                used += 1;
            }
            if !(a.weekday_random.is_random() && b.weekday_random.is_random()) {
                sum += overlap(&a.weekday_probs, &b.weekday_probs);
                used += 1;
            }
            if !(a.month_random.is_random() && b.month_random.is_random()) {
                sum += overlap(&a.month_probs, &b.month_probs);
                used += 1;
            }
            let score = if used == 0 { NOT_APPLICABLE } else { sum / used as f64 };
            m.set(i, j, score);
        }
    }
    m
}

/// Overlap between attribute value distributions, averaged over the keys
/// the two activities share; N/A when no key is shared.
pub fn data_similarity(profiles: &[ActivityProfile]) -> SimMatrix {
    let n = profiles.len();
    let mut m = SimMatrix::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let a = &profiles[i];
            let b = &profiles[j];
            let mut sum = 0.0;
            let mut shared = 0usize;
            for (key, pa) in a.attrs.iter() {
                let Some(pb) = b.attrs.get(key) else { continue };
                if pa.total == 0 || pb.total == 0 {
                    continue;
                }
                let mut key_overlap = 0.0;
                for (value, &count) in pa.counts.iter() {
                    let p = count as f64 / pa.total as f64;
                    key_overlap += p.min(pb.prob(value));
                }
                sum += key_overlap;
                shared += 1;
            }
            let score = if shared == 0 { NOT_APPLICABLE } else { sum / shared as f64 };
            m.set(i, j, score);
        }
    }
    m
}

fn overlap(p: &[f64], q: &[f64]) -> f64 {
    p.iter().zip(q.iter()).map(|(a, b)| a.min(*b)).sum()
}

// Intersection of two piecewise-constant densities with (possibly)
// different bin widths, integrated over the merged bin edges.
fn density_overlap(p: &[f64], wp: f64, q: &[f64], wq: f64) -> f64 {
    let end = (p.len() as f64 * wp).min(q.len() as f64 * wq);
    if end <= 0.0 {
        return 0.0;
    }
    let mut cuts: Vec<f64> = Vec::with_capacity(p.len() + q.len() + 2);
    let mut x = 0.0;
    while x < end {
        cuts.push(x);
        x += wp;
    }
    x = wq;
    while x < end {
        cuts.push(x);
        x += wq;
    }
    cuts.push(end);
    cuts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    cuts.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    let density = |probs: &[f64], width: f64, at: f64| -> f64 {
        let idx = (at / width) as usize;
        probs.get(idx).map(|p| p / width).unwrap_or(0.0)
    };

    let mut total = 0.0;
    for w in cuts.windows(2) {
        let mid = (w[0] + w[1]) / 2.0;
        let seg = w[1] - w[0];
        total += density(p, wp, mid).min(density(q, wq, mid)) * seg;
    }
    total.min(1.0)
}
