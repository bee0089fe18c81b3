use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("column '{name}' does not exist in the dataset")]
    MissingColumn { name: String },
    #[error("dataset has no rows")]
    EmptyDataset,
}

/// In-memory tabular dataset: named columns over row-major string cells.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Dataset { columns, rows: Vec::new() }
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn col(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_col(&self, name: &str) -> Result<usize, ConfigError> {
        self.col(name)
            .ok_or_else(|| ConfigError::MissingColumn { name: name.to_string() })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, row: usize, col: usize) -> &str {
        &self.rows[row][col]
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: String) {
        self.rows[row][col] = value;
    }

    /// Replace every cell in `col` equal to `from` with `to`; returns the
    /// number of rewritten cells.
    pub fn replace_in_column(&mut self, col: usize, from: &str, to: &str) -> usize {
        let mut replaced = 0usize;
        for row in self.rows.iter_mut() {
            if row[col] == from {
                row[col] = to.to_string();
                replaced += 1;
            }
        }
        replaced
    }

    pub fn count_in_column(&self, col: usize, value: &str) -> usize {
        self.rows.iter().filter(|r| r[col] == value).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Date(DateTime<Utc>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl AttrValue {
    // date, integer, float, boolean, else text
    pub fn infer(raw: &str) -> AttrValue {
        let s = raw.trim();
        if let Some(ts) = parse_timestamp(s) {
            return AttrValue::Date(ts);
        }
        if let Ok(i) = s.parse::<i64>() {
            return AttrValue::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return AttrValue::Float(f);
        }
        match s.to_ascii_lowercase().as_str() {
            "true" => return AttrValue::Bool(true),
            "false" => return AttrValue::Bool(false),
            _ => {}
        }
        AttrValue::Text(s.to_string())
    }

    /// Values are counted by this rendering regardless of declared type.
    pub fn render(&self) -> String {
        match self {
            AttrValue::Date(d) => d.to_rfc3339(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Float(f) => f.to_string(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Text(s) => s.clone(),
        }
    }
}

static RE_ISO_SHAPE: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
    regex::Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}").unwrap()
});

/// Parse a timestamp cell: RFC3339 first, then common naive formats
/// (interpreted as UTC), then 10/13-digit epoch values.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if RE_ISO_SHAPE.is_match(s) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        let fmts = [
            "%Y-%m-%d %H:%M:%S%.f%:z",
            "%Y-%m-%d %H:%M:%S%:z",
            "%Y-%m-%dT%H:%M:%S%.f%:z",
            "%Y-%m-%dT%H:%M:%S%:z",
        ];
        for f in fmts.iter() {
            if let Ok(dt) = DateTime::parse_from_str(s, f) {
                return Some(dt.with_timezone(&Utc));
            }
        }
        let naive_fmts = [
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
        ];
        for f in naive_fmts.iter() {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(s, f) {
                return Some(Utc.from_utc_datetime(&ndt));
            }
        }
        return None;
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    // epoch seconds / milliseconds
    if s.chars().all(|c| c.is_ascii_digit()) {
        match s.len() {
            10 => return s.parse::<i64>().ok().and_then(|v| DateTime::<Utc>::from_timestamp(v, 0)),
            13 => {
                return s.parse::<i64>().ok().and_then(|ms| {
                    DateTime::<Utc>::from_timestamp(ms / 1000, ((ms % 1000) as u32) * 1_000_000)
                })
            }
            _ => {}
        }
    }
    None
}
