//! Drives a `RIBEngine` from a JSON-lines `Record` stream and writes the
//! reconstructed view, binary-encoded (spec §6.2), to a file at every
//! interval boundary.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bgpview::rib_engine::{RIBEngine, Record};
use bgpview::transport::{write_view, ViewFilter};
use bgpview::RIBEngineConfig;
use clap::Parser;
use tracing::info;

/// bgpview-convert feeds a JSON-lines record stream into a RIBEngine and
/// appends one binary view snapshot per interval boundary to `output`.
#[derive(Parser, Debug)]
struct Opts {
    /// Path to a file of newline-delimited JSON `Record`s. Reads stdin
    /// when omitted.
    input: Option<PathBuf>,

    /// Destination for the binary-encoded view snapshots.
    #[clap(long)]
    output: PathBuf,

    /// BGP-time seconds between written snapshots.
    #[clap(long, default_value_t = 300)]
    interval_secs: u32,

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
        tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
    }

    let mut engine = RIBEngine::new(RIBEngineConfig::default());
    let filter = ViewFilter::new();
    let mut writer = BufWriter::new(File::create(&opts.output).with_context(|| format!("creating {}", opts.output.display()))?);

    let reader = open_input(&opts.input)?;
    let mut next_interval: Option<u32> = None;
    let mut snapshots = 0u64;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).with_context(|| "decoding record")?;

        let start = *next_interval.get_or_insert(record.time_sec);
        if record.time_sec.saturating_sub(start) >= opts.interval_secs {
            engine.interval_end(record.time_sec);
            write_view(engine.view(), &filter, &mut writer)?;
            snapshots += 1;
            next_interval = Some(record.time_sec);
        }

        engine.process_record(&record);
    }

    if let Some(t) = next_interval {
        engine.interval_end(t);
        write_view(engine.view(), &filter, &mut writer)?;
        snapshots += 1;
    }

    info!(snapshots, "convert finished");
    Ok(())
}
