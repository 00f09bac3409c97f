//! Drives a `RIBEngine` from a JSON-lines `Record` stream and prints the
//! ASCII view (one line per pfx-peer) at every interval boundary.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bgpview::rib_engine::{RIBEngine, Record};
use bgpview::transport::{write_view_ascii, ViewFilter};
use bgpview::RIBEngineConfig;
use clap::Parser;

/// bgpview-cat feeds a JSON-lines record stream into a RIBEngine and
/// prints the reconstructed view as ASCII at every interval boundary.
#[derive(Parser, Debug)]
struct Opts {
    /// Path to a file of newline-delimited JSON `Record`s. Reads stdin
    /// when omitted.
    input: Option<PathBuf>,

    /// BGP-time seconds between printed snapshots.
    #[clap(long, default_value_t = 300)]
    interval_secs: u32,

    /// Only print pfx-peers belonging to this collector.
    #[clap(long)]
    collector: Option<String>,

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
    let mut filter = ViewFilter::new();
    if let Some(wanted) = opts.collector {
        filter = filter.with_peer_filter(move |sig| sig.collector == wanted);
    }

    let reader = open_input(&opts.input)?;
    let mut next_interval: Option<u32> = None;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).with_context(|| "decoding record")?;

        let start = *next_interval.get_or_insert(record.time_sec);
        if record.time_sec.saturating_sub(start) >= opts.interval_secs {
            print_snapshot(&mut engine, &filter, record.time_sec);
            next_interval = Some(record.time_sec);
        }

        engine.process_record(&record);
    }

    if let Some(t) = next_interval {
        print_snapshot(&mut engine, &filter, t);
    }
    Ok(())
}

fn print_snapshot(engine: &mut RIBEngine, filter: &ViewFilter, now: u32) {
    engine.interval_end(now);
    let mut out = String::new();
    write_view_ascii(engine.view(), filter, &mut out);
    print!("{out}");
}
