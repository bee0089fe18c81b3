use anyhow::Context;
use clap::Parser;
use labelscope::aggregate::Weights;
use labelscope::dataset::Dataset;
use labelscope::detect::{Detection, DetectOpts, RepairSession, Strategy};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write as _};
use std::sync::Once;

fn init_parallelism() {
    static START: Once = Once::new();
    START.call_once(|| {
        let n = num_cpus::get();
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    });
}

#[derive(Parser, Debug)]
#[command(name = "labelscope", version, about = "Contextual activity-label similarity and grouping for event logs")]
struct Cli {
    /// Input CSV file (`-` for stdin), first row is the header
    input: String,

    /// Column holding the case identifier
    #[arg(long = "case-col")]
    case_col: String,
    /// Column holding the activity label
    #[arg(long = "activity-col")]
    activity_col: String,
    #[arg(long = "timestamp-col")]
    timestamp_col: Option<String>,
    #[arg(long = "resource-col")]
    resource_col: Option<String>,
    #[arg(long = "lifecycle-col")]
    lifecycle_col: Option<String>,
    /// Column-name prefix marking free-form data attributes
    #[arg(long = "attr-prefix")]
    attr_prefix: Option<String>,
    #[arg(long = "delimiter", default_value = ",")]
    delimiter: String,

    /// Emit ranked cycle-free pairs instead of connected groups
    #[arg(long = "pairs", default_value_t = false)]
    pairs: bool,
    /// Direct-succession noise cutoff (0-1)
    #[arg(long = "noise", default_value_t = 0.05)]
    noise: f64,
    #[arg(long = "overall-threshold", default_value_t = 0.7)]
    overall_threshold: f64,
    #[arg(long = "string-threshold", default_value_t = 0.5)]
    string_threshold: f64,
    #[arg(long = "weight-control-flow", default_value_t = 1)]
    weight_control_flow: u32,
    #[arg(long = "weight-resource", default_value_t = 1)]
    weight_resource: u32,
    #[arg(long = "weight-data", default_value_t = 1)]
    weight_data: u32,
    #[arg(long = "weight-time", default_value_t = 1)]
    weight_time: u32,
    #[arg(long = "weight-duration", default_value_t = 1)]
    weight_duration: u32,
    #[arg(long = "max-group-size", default_value_t = 6)]
    max_group_size: usize,
    #[arg(long = "max-pairs", default_value_t = 10)]
    max_pairs: usize,

    /// Approve a merge as CANONICAL=VARIANT; may be repeated. The repaired
    /// dataset is written to --out (or stdout).
    #[arg(long = "apply")]
    apply: Vec<String>,
    /// Path for the repaired dataset
    #[arg(long = "out")]
    out: Option<String>,
    /// Result format: json | table (default: table on a TTY, json otherwise)
    #[arg(long = "format")]
    format: Option<String>,
}

fn main() -> anyhow::Result<()> {
    init_parallelism();
    let cli = Cli::parse();
    let delim = cli
        .delimiter
        .chars()
        .next()
        .context("--delimiter must be a single character")?;

    let lines = read_all_lines(&cli.input)?;
    let dataset = parse_csv(&lines, delim).context("failed to parse input as CSV")?;

    let mut opts = DetectOpts::new(&cli.case_col, &cli.activity_col);
    if let Some(c) = cli.timestamp_col.as_ref() {
        opts.parser.timestamp_col = c.clone();
    }
    if let Some(c) = cli.resource_col.as_ref() {
        opts.parser.resource_col = c.clone();
    }
    if let Some(c) = cli.lifecycle_col.as_ref() {
        opts.parser.lifecycle_col = c.clone();
    }
    if let Some(p) = cli.attr_prefix.as_ref() {
        opts.parser.attr_prefix = p.clone();
    }
    opts.control_flow_noise = cli.noise;
    opts.overall_threshold = cli.overall_threshold;
    opts.string_threshold = cli.string_threshold;
    opts.weights = Weights {
        control_flow: cli.weight_control_flow,
        resource: cli.weight_resource,
        data: cli.weight_data,
        time: cli.weight_time,
        duration: cli.weight_duration,
    };
    opts.max_group_size = cli.max_group_size;
    opts.max_pairs = cli.max_pairs;
    opts.strategy = if cli.pairs { Strategy::Pairs } else { Strategy::Groups };

    let mut session = RepairSession::detect(dataset, &opts)?;

    let as_table = match cli.format.as_deref() {
        Some("table") => true,
        Some("json") => false,
        _ => atty::is(atty::Stream::Stdout),
    };
    if as_table {
        print_table(session.detection());
    } else {
        println!("{}", serde_json::to_string_pretty(session.detection())?);
    }

    if !cli.apply.is_empty() {
        let approved: Vec<(String, String)> = cli
            .apply
            .iter()
            .map(|spec| {
                spec.split_once('=')
                    .map(|(c, v)| (c.to_string(), v.to_string()))
                    .with_context(|| format!("--apply expects CANONICAL=VARIANT, got '{spec}'"))
            })
            .collect::<anyhow::Result<_>>()?;
        let replaced = session.confirm(&approved).unwrap_or(0);
        eprintln!("rewrote {replaced} cells");
        let csv = render_csv(session.dataset(), delim);
        match cli.out.as_ref() {
            Some(path) => std::fs::write(path, csv).with_context(|| format!("writing {path}"))?,
            None => io::stdout().write_all(csv.as_bytes())?,
        }
    }
    Ok(())
}

fn read_all_lines(path: &str) -> io::Result<Vec<String>> {
    let mut out = Vec::new();
    if path == "-" {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            out.push(line?);
        }
    } else {
        let f = File::open(path)?;
        for line in BufReader::new(f).lines() {
            out.push(line?);
        }
    }
    Ok(out)
}

/// Minimal quote-aware CSV: double-quoted fields, `""` escapes, no embedded
/// newlines. First row is the header.
fn parse_csv(lines: &[String], delim: char) -> Option<Dataset> {
    let mut it = lines.iter().filter(|l| !l.trim().is_empty());
    let header = split_row(it.next()?, delim);
    let mut dataset = Dataset::new(header);
    for line in it {
        dataset.push_row(split_row(line, delim));
    }
    Some(dataset)
}

fn split_row(line: &str, delim: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delim {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }
    fields.push(field);
    fields
}

fn render_csv(dataset: &Dataset, delim: char) -> String {
    let quote = |s: &str| -> String {
        if s.contains(delim) || s.contains('"') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    };
    let mut out = String::new();
    out.push_str(&dataset.columns().iter().map(|c| quote(c)).collect::<Vec<_>>().join(&delim.to_string()));
    out.push('\n');
    for row in 0..dataset.row_count() {
        let rendered: Vec<String> =
            (0..dataset.columns().len()).map(|c| quote(dataset.value(row, c))).collect();
        out.push_str(&rendered.join(&delim.to_string()));
        out.push('\n');
    }
    out
}

fn print_table(detection: &Detection) {
    let s = &detection.summary;
    println!(
        "{} activities, {} traces, {} events ({} rows skipped)",
        s.activities, s.traces, s.events, s.skipped_rows
    );
    if !detection.groups.is_empty() {
        println!("{:<6} {:<6} {:<8} members", "group", "size", "score");
        for g in detection.groups.iter() {
            println!("{:<6} {:<6} {:<8} {}", g.group, g.size, g.score, g.members.join(" | "));
        }
    }
    if !detection.pairs.is_empty() {
        println!("{:<6} {:<8} {:<8} pair", "pair", "overall", "string");
        for p in detection.pairs.iter() {
            println!("{:<6} {:<8} {:<8} {} ~ {}", p.pair, p.overall, p.string_sim, p.label_a, p.label_b);
        }
    }
    if detection.groups.is_empty() && detection.pairs.is_empty() {
        println!("no merge candidates above the thresholds");
    }
}
