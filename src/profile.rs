use crate::parser::{Activity, Availability, EventLog};
use chrono::{Datelike, Timelike};
use std::collections::BTreeMap;

/// Hours of the day are folded into six 4-hour buckets.
pub const HOUR_BUCKETS: usize = 6;

// minimum share of events with a positive duration before a histogram is built
const DURATION_COVERAGE: f64 = 0.2;

// starting histogram bin width, in seconds
const BASE_BIN_WIDTH: f64 = 60.0;

/// Verdict of the randomness test for one temporal dimension. `Unknown`
/// covers the degenerate all-zero cases and counts as random.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Randomness {
    Random,
    Structured,
    Unknown,
}

impl Randomness {
    pub fn is_random(self) -> bool {
        !matches!(self, Randomness::Structured)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationHistogram {
    pub bin_width: f64,
    pub probs: Vec<f64>,
}

/// Empirical value distribution for one free-form attribute key, keyed by
/// the value's string rendering.
#[derive(Debug, Clone, Default)]
pub struct AttrProfile {
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
}

impl AttrProfile {
    pub fn prob(&self, value: &str) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        *self.counts.get(value).unwrap_or(&0) as f64 / self.total as f64
    }
}

#[derive(Debug, Clone)]
pub struct ActivityProfile {
    pub resource_probs: Vec<f64>,
    pub resource_cumulative: Vec<f64>,
    pub resource_stddev: f64,
    pub has_resource_data: bool,
    pub duration_hist: Option<DurationHistogram>,
    pub hour_probs: [f64; HOUR_BUCKETS],
    pub weekday_probs: [f64; 7],
    pub month_probs: [f64; 12],
    pub hour_random: Randomness,
    pub weekday_random: Randomness,
    pub month_random: Randomness,
    pub attrs: BTreeMap<String, AttrProfile>,
}

pub fn build_profiles(log: &EventLog) -> Vec<ActivityProfile> {
    log.activities.iter().map(|a| build_profile(log, a)).collect()
}

fn build_profile(log: &EventLog, activity: &Activity) -> ActivityProfile {
    let n_events = activity.events.len();
    let n_resources = log.resources.len();

    // resource distribution against the uniform expectation
    let mut resource_counts = vec![0usize; n_resources];
    let mut has_resource_data = false;
    let mut durations: Vec<f64> = Vec::new();
    let mut hour_counts = [0f64; HOUR_BUCKETS];
    let mut weekday_counts = [0f64; 7];
    let mut month_counts = [0f64; 12];
    let mut attrs: BTreeMap<String, AttrProfile> = BTreeMap::new();

    for &r in activity.events.iter() {
        let ev = log.event(r);
        resource_counts[ev.resource] += 1;
        if !log.resources.name(ev.resource).is_empty() {
            has_resource_data = true;
        }
        if let Some(d) = ev.duration_secs() {
            if d > 0 {
                durations.push(d as f64);
            }
        }
        if let Some(t) = ev.complete_time {
            hour_counts[t.hour() as usize / 4] += 1.0;
            weekday_counts[t.weekday().num_days_from_monday() as usize] += 1.0;
            month_counts[t.month0() as usize] += 1.0;
        }
        for (key, value) in ev.attrs.iter() {
            let profile = attrs.entry(key.clone()).or_default();
            *profile.counts.entry(value.render()).or_insert(0) += 1;
            profile.total += 1;
        }
    }

    let total_with_resource: usize = resource_counts.iter().sum();
    let mut resource_probs = vec![0f64; n_resources];
    if total_with_resource > 0 {
        for (i, &c) in resource_counts.iter().enumerate() {
            resource_probs[i] = c as f64 / total_with_resource as f64;
        }
    }
    let mut resource_cumulative = vec![0f64; n_resources];
    let mut acc = 0f64;
    for (i, &p) in resource_probs.iter().enumerate() {
        acc += p;
        resource_cumulative[i] = acc;
    }
    let resource_stddev = if n_resources > 0 {
        let uniform = 1.0 / n_resources as f64;
        let var = resource_probs.iter().map(|p| (p - uniform) * (p - uniform)).sum::<f64>()
            / n_resources as f64;
        var.sqrt()
    } else {
        0.0
    };

    let duration_hist = duration_histogram(&durations, n_events);

    let hour_probs = normalize_fixed(hour_counts);
    let weekday_probs = normalize_fixed(weekday_counts);
    let month_probs = normalize_fixed(month_counts);

    let baseline = &log.availability;
    let hour_random = randomness_verdict(&hour_counts, &fold_hours(baseline));
    let weekday_random = randomness_verdict(&weekday_counts, &to_f64(&baseline.weekdays));
    let month_random = randomness_verdict(&month_counts, &to_f64(&baseline.months));

    ActivityProfile {
        resource_probs,
        resource_cumulative,
        resource_stddev,
        has_resource_data,
        duration_hist,
        hour_probs,
        weekday_probs,
        month_probs,
        hour_random,
        weekday_random,
        month_random,
        attrs,
    }
}

/// Bin positive duration samples. The bin width starts at 60s and is widened
/// to at least the smallest positive gap between samples; bins at or below
/// 1% of the event count are zeroed and trailing zeros trimmed before
/// normalizing.
fn duration_histogram(durations: &[f64], n_events: usize) -> Option<DurationHistogram> {
    if n_events == 0 || (durations.len() as f64) < DURATION_COVERAGE * n_events as f64 {
        return None;
    }
    let mut sorted = durations.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut min_gap = f64::INFINITY;
    for w in sorted.windows(2) {
        let gap = w[1] - w[0];
        if gap > 0.0 && gap < min_gap {
            min_gap = gap;
        }
    }
    let bin_width = if min_gap.is_finite() { BASE_BIN_WIDTH.max(min_gap) } else { BASE_BIN_WIDTH };

    let last = *sorted.last()?;
    let n_bins = (last / bin_width) as usize + 1;
    let mut counts = vec![0f64; n_bins];
    for &d in sorted.iter() {
        let idx = ((d / bin_width) as usize).min(n_bins - 1);
        counts[idx] += 1.0;
    }

    let floor = 0.01 * n_events as f64;
    for c in counts.iter_mut() {
        if *c <= floor {
            *c = 0.0;
        }
    }
    while counts.last() == Some(&0.0) {
        counts.pop();
    }
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return None;
    }
    for c in counts.iter_mut() {
        *c /= total;
    }
    Some(DurationHistogram { bin_width, probs: counts })
}

/// Two-sided Kolmogorov-Smirnov comparison of the observed slot counts
/// against the expected-if-random distribution: what remains of the
/// availability baseline once this activity's own events are removed.
/// Degenerate inputs short-circuit to `Unknown`.
fn randomness_verdict<const N: usize>(observed: &[f64; N], baseline: &[f64; N]) -> Randomness {
    let obs_total: f64 = observed.iter().sum();
    if obs_total <= 0.0 {
        return Randomness::Unknown;
    }
    let mut expected = [0f64; N];
    for i in 0..N {
        expected[i] = (baseline[i] - observed[i]).max(0.0);
    }
    let exp_total: f64 = expected.iter().sum();
    if exp_total <= 0.0 {
        return Randomness::Unknown;
    }

    let mut cdf_obs = 0f64;
    let mut cdf_exp = 0f64;
    let mut statistic = 0f64;
    for i in 0..N {
        cdf_obs += observed[i] / obs_total;
        cdf_exp += expected[i] / exp_total;
        statistic = statistic.max((cdf_obs - cdf_exp).abs());
    }

    let critical = 1.63 / obs_total.sqrt();
    if statistic <= 2.0 * critical {
        Randomness::Random
    } else {
        Randomness::Structured
    }
}

fn normalize_fixed<const N: usize>(counts: [f64; N]) -> [f64; N] {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return [0.0; N];
    }
    let mut out = [0f64; N];
    for i in 0..N {
        out[i] = counts[i] / total;
    }
    out
}

fn fold_hours(a: &Availability) -> [f64; HOUR_BUCKETS] {
    let mut out = [0f64; HOUR_BUCKETS];
    for (h, &c) in a.hours.iter().enumerate() {
        out[h / 4] += c as f64;
    }
    out
}

fn to_f64<const N: usize>(counts: &[u64; N]) -> [f64; N] {
    let mut out = [0f64; N];
    for i in 0..N {
        out[i] = counts[i] as f64;
    }
    out
}
