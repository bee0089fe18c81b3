use crate::dataset::{parse_timestamp, AttrValue, ConfigError, Dataset};
use ahash::AHashMap;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::collections::BTreeMap;

/// Column selection for the parse. Only the case-id and activity columns
/// must exist; the rest are picked up when present under their default
/// (XES-flavored) names.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub case_col: String,
    pub activity_col: String,
    pub timestamp_col: String,
    pub resource_col: String,
    pub lifecycle_col: String,
    pub attr_prefix: String,
}

impl ParserConfig {
    pub fn new(case_col: &str, activity_col: &str) -> Self {
        ParserConfig {
            case_col: case_col.to_string(),
            activity_col: activity_col.to_string(),
            timestamp_col: "time:timestamp".to_string(),
            resource_col: "org:resource".to_string(),
            lifecycle_col: "lifecycle:transition".to_string(),
            attr_prefix: "data:".to_string(),
        }
    }
}

/// Insertion-ordered interner with stable integer handles.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    names: Vec<String>,
    index: AHashMap<String, usize>,
}

impl ResourceSet {
    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        i
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub label: String,
    pub case_id: String,
    pub resource: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
    /// Ordinal within the owning trace, assigned when the trace is sealed.
    pub position: usize,
    // index links to the chronological neighbors in the same trace
    pub prev: Option<usize>,
    pub next: Option<usize>,
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Event {
    pub fn duration_secs(&self) -> Option<i64> {
        match (self.start_time, self.complete_time) {
            (Some(s), Some(c)) => Some((c - s).num_seconds()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trace {
    pub case_id: String,
    pub events: Vec<Event>,
}

/// Handle to an event inside its owning trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventRef {
    pub trace: usize,
    pub event: usize,
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub label: String,
    pub events: Vec<EventRef>,
}

/// Whole-log event counts per calendar slot, the available-time baseline
/// the randomness test compares each activity against.
#[derive(Debug, Clone, Default)]
pub struct Availability {
    pub hours: [u64; 24],
    pub weekdays: [u64; 7],
    pub months: [u64; 12],
}

impl Availability {
    fn record(&mut self, t: DateTime<Utc>) {
        self.hours[t.hour() as usize] += 1;
        self.weekdays[t.weekday().num_days_from_monday() as usize] += 1;
        self.months[t.month0() as usize] += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub traces: Vec<Trace>,
    pub activities: Vec<Activity>,
    pub resources: ResourceSet,
    pub availability: Availability,
    /// Rows dropped because the activity cell was empty.
    pub skipped_rows: usize,
}

impl EventLog {
    pub fn event(&self, r: EventRef) -> &Event {
        &self.traces[r.trace].events[r.event]
    }

    pub fn successor_label(&self, r: EventRef) -> Option<&str> {
        let ev = self.event(r);
        ev.next.map(|n| self.traces[r.trace].events[n].label.as_str())
    }

    pub fn event_count(&self) -> usize {
        self.traces.iter().map(|t| t.events.len()).sum()
    }
}

/// Parse a tabular dataset into traces, events and activities.
///
/// Rows are visited in case-id order. When a lifecycle column is present,
/// `start` rows are buffered per label and consumed (earliest first) by the
/// matching `complete` row of the same case; every other row is a complete,
/// durationless event. Rows with an empty activity cell are skipped and
/// counted, never fatal.
pub fn parse(dataset: &Dataset, config: &ParserConfig) -> Result<EventLog, ConfigError> {
    let case_col = dataset.require_col(&config.case_col)?;
    let activity_col = dataset.require_col(&config.activity_col)?;
    if dataset.row_count() == 0 {
        return Err(ConfigError::EmptyDataset);
    }
    let ts_col = dataset.col(&config.timestamp_col);
    let res_col = dataset.col(&config.resource_col);
    let life_col = dataset.col(&config.lifecycle_col);
    let attr_cols: Vec<usize> = dataset
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with(&config.attr_prefix))
        .map(|(i, _)| i)
        .collect();

    let mut order: Vec<usize> = (0..dataset.row_count()).collect();
    order.sort_by(|&a, &b| dataset.value(a, case_col).cmp(dataset.value(b, case_col)));

    let mut log = EventLog::default();
    let mut activity_index: AHashMap<String, usize> = AHashMap::new();

    let mut current_case: Option<String> = None;
    let mut open_events: Vec<Event> = Vec::new();
    // buffered `start` timestamps per label, waiting for their completion
    let mut pending_starts: AHashMap<String, Vec<Option<DateTime<Utc>>>> = AHashMap::new();

    for &row in order.iter() {
        let case_id = dataset.value(row, case_col);
        if current_case.as_deref() != Some(case_id) {
            if let Some(finished) = current_case.take() {
                seal_trace(&mut log, &mut activity_index, finished, std::mem::take(&mut open_events));
            }
            current_case = Some(case_id.to_string());
            pending_starts.clear();
        }

        let label = dataset.value(row, activity_col).trim();
        if label.is_empty() {
            log.skipped_rows += 1;
            continue;
        }
        let timestamp = ts_col.and_then(|c| parse_timestamp(dataset.value(row, c)));

        if let Some(lc) = life_col {
            if dataset.value(row, lc).trim().eq_ignore_ascii_case("start") {
                pending_starts.entry(label.to_string()).or_default().push(timestamp);
                continue;
            }
        }

        // earliest buffered start for this label, if one exists
        let start_time = pending_starts.get_mut(label).and_then(|starts| {
            if starts.is_empty() {
                return None;
            }
            let mut best = 0usize;
            for (i, s) in starts.iter().enumerate() {
                if s < &starts[best] {
                    best = i;
                }
            }
            starts.remove(best)
        });

        let resource = match res_col {
            Some(c) => log.resources.intern(dataset.value(row, c).trim()),
            None => log.resources.intern(""),
        };

        let mut attrs = BTreeMap::new();
        for &c in attr_cols.iter() {
            let raw = dataset.value(row, c);
            if raw.trim().is_empty() {
                continue;
            }
            let key = dataset.columns()[c][config.attr_prefix.len()..].to_string();
            attrs.insert(key, AttrValue::infer(raw));
        }

        open_events.push(Event {
            label: label.to_string(),
            case_id: case_id.to_string(),
            resource,
            start_time,
            complete_time: timestamp,
            position: 0,
            prev: None,
            next: None,
            attrs,
        });
    }
    if let Some(finished) = current_case.take() {
        seal_trace(&mut log, &mut activity_index, finished, open_events);
    }

    Ok(log)
}

/// Finalize one trace: chronological sort, neighbor links, availability
/// accounting, and distribution of the events into their activities.
fn seal_trace(
    log: &mut EventLog,
    activity_index: &mut AHashMap<String, usize>,
    case_id: String,
    mut events: Vec<Event>,
) {
    if events.is_empty() {
        return;
    }
    events.sort_by_key(|e| e.complete_time);
    let n = events.len();
    for (i, ev) in events.iter_mut().enumerate() {
        ev.position = i;
        ev.prev = i.checked_sub(1);
        ev.next = if i + 1 < n { Some(i + 1) } else { None };
        if let Some(t) = ev.complete_time {
            log.availability.record(t);
        }
    }
    let trace_idx = log.traces.len();
    for (i, ev) in events.iter().enumerate() {
        let slot = *activity_index.entry(ev.label.clone()).or_insert_with(|| {
            log.activities.push(Activity { label: ev.label.clone(), events: Vec::new() });
            log.activities.len() - 1
        });
        log.activities[slot].events.push(EventRef { trace: trace_idx, event: i });
    }
    log.traces.push(Trace { case_id, events });
}
