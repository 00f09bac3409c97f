//! Drives a `RIBEngine` from a stream of JSON-lines-encoded `Record`s and
//! prints the metric points emitted at each interval boundary.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bgpview::rib_engine::{RIBEngine, Record};
use bgpview::RIBEngineConfig;
use clap::Parser;
use tracing::{info, warn};

/// bgpview-replay feeds a JSON-lines record stream into a RIBEngine and
/// prints the metrics produced at each interval boundary.
#[derive(Parser, Debug)]
struct Opts {
    /// Path to a file of newline-delimited JSON `Record`s. Reads stdin
    /// when omitted.
    input: Option<PathBuf>,

    /// BGP-time seconds between interval_end() calls.
    #[clap(long, default_value_t = 300)]
    interval_secs: u32,

    /// Metric prefix override (defaults to the engine's own default).
    #[clap(long)]
    metric_prefix: Option<String>,

    /// whether to print debug
    #[clap(long)]
    debug: bool,
}

fn open_input(path: &Option<PathBuf>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(p) => {
            let f = File::open(p).with_context(|| format!("opening {}", p.display()))?;
            Ok(Box::new(BufReader::new(f)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    if opts.debug {
        tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();
    }

    let mut config = RIBEngineConfig::default();
    if let Some(prefix) = opts.metric_prefix {
        config.metric_prefix = prefix;
    }
    let mut engine = RIBEngine::new(config);

    let reader = open_input(&opts.input)?;
    let mut next_interval: Option<u32> = None;
    let mut records = 0u64;
    let mut errors = 0u64;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).with_context(|| "decoding record")?;
        records += 1;

        let start = *next_interval.get_or_insert(record.time_sec);
        if record.time_sec.saturating_sub(start) >= opts.interval_secs {
            for point in engine.interval_end(record.time_sec) {
                println!("{}", serde_json::to_string(&point)?);
            }
            next_interval = Some(record.time_sec);
        }

        if engine.process_record(&record) != 0 {
            errors += 1;
            if let Some(err) = engine.last_error() {
                warn!(error = %err, "record failed");
            }
        }
    }

    for point in engine.interval_end(next_interval.unwrap_or(0)) {
        println!("{}", serde_json::to_string(&point)?);
    }

    info!(records, errors, "replay finished");
    Ok(())
}
