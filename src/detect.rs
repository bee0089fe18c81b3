use crate::aggregate::{self, Weights};
use crate::dataset::{ConfigError, Dataset};
use crate::dimensions;
use crate::grouping::{self, ActivityGroup, ActivityPair};
use crate::matrix::{SimMatrix, NOT_APPLICABLE};
use crate::parser::{self, EventLog, ParserConfig};
use crate::profile::{self, ActivityProfile};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Groups,
    Pairs,
}

#[derive(Debug, Clone)]
pub struct DetectOpts {
    pub parser: ParserConfig,
    pub control_flow_noise: f64,
    pub overall_threshold: f64,
    pub string_threshold: f64,
    pub weights: Weights,
    pub max_group_size: usize,
    pub max_pairs: usize,
    pub strategy: Strategy,
}

impl DetectOpts {
    pub fn new(case_col: &str, activity_col: &str) -> Self {
        DetectOpts {
            parser: ParserConfig::new(case_col, activity_col),
            control_flow_noise: 0.05,
            overall_threshold: 0.7,
            string_threshold: 0.5,
            weights: Weights::default(),
            max_group_size: 6,
            max_pairs: 10,
            strategy: Strategy::Groups,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    String,
    ControlFlow,
    Resource,
    Duration,
    Time,
    Data,
}

impl Dimension {
    const ALL: [Dimension; 6] = [
        Dimension::String,
        Dimension::ControlFlow,
        Dimension::Resource,
        Dimension::Duration,
        Dimension::Time,
        Dimension::Data,
    ];
}

#[derive(Debug, Clone)]
pub struct DimensionMatrices {
    pub string_sim: SimMatrix,
    pub control_flow: SimMatrix,
    pub resource: SimMatrix,
    pub duration: SimMatrix,
    pub time: SimMatrix,
    pub data: SimMatrix,
}

/// Fan out the six calculators over worker threads. Each is a pure function
/// of the read-only log/profile snapshot writing its own matrix; the collect
/// is the join barrier.
pub fn compute_matrices(
    log: &EventLog,
    profiles: &[ActivityProfile],
    control_flow_noise: f64,
) -> DimensionMatrices {
    let mats: Vec<SimMatrix> = Dimension::ALL
        .par_iter()
        .map(|d| match d {
            Dimension::String => dimensions::string_similarity(log),
            Dimension::ControlFlow => dimensions::control_flow_similarity(log, control_flow_noise),
            Dimension::Resource => dimensions::resource_similarity(profiles),
            Dimension::Duration => dimensions::duration_similarity(profiles),
            Dimension::Time => dimensions::time_similarity(profiles),
            Dimension::Data => dimensions::data_similarity(profiles),
        })
        .collect();
    let [string_sim, control_flow, resource, duration, time, data]: [SimMatrix; 6] =
        mats.try_into().expect("one matrix per dimension");
    DimensionMatrices { string_sim, control_flow, resource, duration, time, data }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub activities: usize,
    pub traces: usize,
    pub events: usize,
    pub skipped_rows: usize,
}

/// One candidate merge group. Similarity cells are formatted strings, one
/// value per member pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRow {
    pub group: usize,
    pub members: Vec<String>,
    pub size: usize,
    pub score: String,
    pub string_sim: String,
    pub control_flow: String,
    pub resource: String,
    pub data: String,
    pub time: String,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRow {
    pub pair: usize,
    pub label_a: String,
    pub label_b: String,
    pub overall: String,
    pub string_sim: String,
    pub control_flow: String,
    pub resource: String,
    pub data: String,
    pub time: String,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub summary: Summary,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub groups: Vec<GroupRow>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub pairs: Vec<PairRow>,
}

/// Three decimals, exact 0 and 1 printed bare, the sentinel as "N/A".
pub fn format_score(score: f64) -> String {
    if score == NOT_APPLICABLE {
        "N/A".to_string()
    } else if score == 0.0 {
        "0".to_string()
    } else if score == 1.0 {
        "1".to_string()
    } else {
        format!("{:.3}", score)
    }
}

fn pair_list(m: &SimMatrix, members: &[usize]) -> String {
    let mut parts = Vec::new();
    for (idx, &i) in members.iter().enumerate() {
        for &j in members[idx + 1..].iter() {
            parts.push(format_score(m.get(i, j)));
        }
    }
    parts.join(", ")
}

fn group_rows(log: &EventLog, mats: &DimensionMatrices, groups: &[ActivityGroup]) -> Vec<GroupRow> {
    groups
        .iter()
        .enumerate()
        .map(|(id, g)| GroupRow {
            group: id + 1,
            members: g.members.iter().map(|&i| log.activities[i].label.clone()).collect(),
            size: g.members.len(),
            score: format_score(g.score),
            string_sim: pair_list(&mats.string_sim, &g.members),
            control_flow: pair_list(&mats.control_flow, &g.members),
            resource: pair_list(&mats.resource, &g.members),
            data: pair_list(&mats.data, &g.members),
            time: pair_list(&mats.time, &g.members),
            duration: pair_list(&mats.duration, &g.members),
        })
        .collect()
}

fn pair_rows(log: &EventLog, mats: &DimensionMatrices, pairs: &[ActivityPair]) -> Vec<PairRow> {
    pairs
        .iter()
        .enumerate()
        .map(|(id, p)| PairRow {
            pair: id + 1,
            label_a: log.activities[p.a].label.clone(),
            label_b: log.activities[p.b].label.clone(),
            overall: format_score(p.score),
            string_sim: format_score(mats.string_sim.get(p.a, p.b)),
            control_flow: format_score(mats.control_flow.get(p.a, p.b)),
            resource: format_score(mats.resource.get(p.a, p.b)),
            data: format_score(mats.data.get(p.a, p.b)),
            time: format_score(mats.time.get(p.a, p.b)),
            duration: format_score(mats.duration.get(p.a, p.b)),
        })
        .collect()
}

/// Run the whole pipeline: parse, profile, fan out the calculators,
/// aggregate, group, and materialize the result table.
pub fn run_detection(dataset: &Dataset, opts: &DetectOpts) -> Result<Detection, ConfigError> {
    let log = parser::parse(dataset, &opts.parser)?;
    let profiles = profile::build_profiles(&log);
    let mats = compute_matrices(&log, &profiles, opts.control_flow_noise);
    let overall = aggregate::combine(
        &mats.control_flow,
        &mats.resource,
        &mats.data,
        &mats.time,
        &mats.duration,
        &opts.weights,
    );

    let summary = Summary {
        activities: log.activities.len(),
        traces: log.traces.len(),
        events: log.event_count(),
        skipped_rows: log.skipped_rows,
    };
    let detection = match opts.strategy {
        Strategy::Groups => {
            let groups = grouping::group_components(
                &overall,
                &mats.string_sim,
                opts.overall_threshold,
                opts.string_threshold,
                opts.max_group_size,
            );
            Detection { summary, groups: group_rows(&log, &mats, &groups), pairs: Vec::new() }
        }
        Strategy::Pairs => {
            let pairs = grouping::select_pairs(
                &overall,
                &mats.string_sim,
                opts.overall_threshold,
                opts.string_threshold,
                opts.max_pairs,
            );
            Detection { summary, groups: Vec::new(), pairs: pair_rows(&log, &mats, &pairs) }
        }
    };
    Ok(detection)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Detected,
    Repaired,
}

/// Two-state repair workflow. Construction runs detection from scratch and
/// lands in `Detected`; the only transition is `confirm`, which rewrites the
/// label column for the approved pairs and ends in the terminal `Repaired`
/// state. Re-detection means building a new session.
#[derive(Debug, Clone)]
pub struct RepairSession {
    dataset: Dataset,
    label_col: usize,
    detection: Detection,
    state: SessionState,
}

impl RepairSession {
    pub fn detect(dataset: Dataset, opts: &DetectOpts) -> Result<Self, ConfigError> {
        let detection = run_detection(&dataset, opts)?;
        let label_col = dataset.require_col(&opts.parser.activity_col)?;
        Ok(RepairSession { dataset, label_col, detection, state: SessionState::Detected })
    }

    pub fn detection(&self) -> &Detection {
        &self.detection
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Apply the approved (canonical, variant) pairs: every occurrence of
    /// the variant label is replaced by the canonical one. Returns the
    /// number of rewritten cells, or `None` once the session is repaired.
    pub fn confirm(&mut self, approved: &[(String, String)]) -> Option<usize> {
        if self.state == SessionState::Repaired {
            return None;
        }
        let mut replaced = 0usize;
        for (canonical, variant) in approved.iter() {
            replaced += self.dataset.replace_in_column(self.label_col, variant, canonical);
        }
        self.state = SessionState::Repaired;
        Some(replaced)
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }
}
