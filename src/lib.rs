pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod validate;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use log::{error, info, warn};
use std::path::PathBuf;

pub use config::Config;
pub use error::{IngestError, RowSkip};
pub use model::{NavigationStatus, TrajectoryPoint, VesselCategory, VesselRecord};
pub use pipeline::{
    ingest_reader, ingest_str, CancellationToken, IngestOptions, IngestResult, RunMetadata,
    Termination,
};
pub use progress::{ChannelProgress, ProgressEvent, ProgressSink, Stage};
pub use store::{TrajectoryStore, VesselStateStore};
pub use validate::{BoundingBox, FilterConfig};

pub fn get_arg() -> Result<Config> {
    let matches = Command::new("vessel-track")
        .version(env!("CARGO_PKG_VERSION"))
        .about("aggregate AIS csv files into latest vessel states and trajectories")
        .arg(
            Arg::new("paths")
                .short('f')
                .long("file-path")
                .action(ArgAction::Append)
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("csv file to ingest, repeat for several"),
        )
        .arg(
            Arg::new("max-records")
                .long("max-records")
                .value_parser(value_parser!(usize))
                .default_value("5000")
                .help("stop each file after this many accepted records"),
        )
        .arg(
            Arg::new("trajectory-capacity")
                .long("trajectory-capacity")
                .value_parser(value_parser!(usize))
                .default_value("100")
                .help("history points kept per vessel"),
        )
        .arg(
            Arg::new("progress-interval")
                .long("progress-interval")
                .value_parser(value_parser!(usize))
                .default_value("1000")
                .help("accepted records between progress reports"),
        )
        .arg(
            Arg::new("bbox")
                .long("bbox")
                .conflicts_with("region")
                .help("bounding box as north,south,east,west"),
        )
        .arg(
            Arg::new("region")
                .long("region")
                .help("named bounding box (all, northeast, southeast, gulfcoast, ...)"),
        )
        .arg(
            Arg::new("vessel-types")
                .long("vessel-type")
                .action(ArgAction::Append)
                .help("keep only this vessel category, repeat for several"),
        )
        .arg(
            Arg::new("recency-hours")
                .long("recency-hours")
                .value_parser(value_parser!(f64))
                .help("drop records older than this many hours"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("print the merged result as json"),
        )
        .get_matches();

    let paths = matches
        .get_many::<PathBuf>("paths")
        .unwrap_or_default()
        .cloned()
        .collect::<Vec<PathBuf>>();
    let mut config = Config::new(paths);

    let options = &mut config.options;
    if let Some(max) = matches.get_one::<usize>("max-records") {
        options.max_records = *max;
    }
    if let Some(capacity) = matches.get_one::<usize>("trajectory-capacity") {
        options.trajectory_capacity = *capacity;
    }
    if let Some(interval) = matches.get_one::<usize>("progress-interval") {
        options.progress_interval = *interval;
    }
    if let Some(raw) = matches.get_one::<String>("bbox") {
        options.filter.bounding_box = Some(config::parse_bbox(raw)?);
    }
    if let Some(name) = matches.get_one::<String>("region") {
        options.filter.bounding_box = config::region(name)?;
    }
    let types = matches
        .get_many::<String>("vessel-types")
        .unwrap_or_default()
        .map(String::as_str);
    options.filter.vessel_types = config::parse_vessel_types(types)?;
    options.filter.recency_window_hours = matches.get_one::<f64>("recency-hours").copied();

    config.json = matches.get_flag("json");
    Ok(config)
}

fn log_progress(event: &ProgressEvent) {
    match (&event.error, event.processed) {
        (Some(e), _) => warn!("{:?}: {}", event.stage, e),
        (None, Some(processed)) => info!(
            "{:?}: {:.0}% ({} records)",
            event.stage, event.percentage, processed
        ),
        (None, None) => info!("{:?}: {:.0}%", event.stage, event.percentage),
    }
}

pub fn run(config: Config) -> Result<()> {
    info!("config is {:?}", config);

    // Drained on a separate thread; a full queue drops events.
    let (sink, events) = ChannelProgress::bounded(64);
    let printer = std::thread::spawn(move || events.iter().for_each(|e| log_progress(&e)));

    let cancel = CancellationToken::new();
    let results = loader::ingest_files(&config.paths, &config.options, &sink, &cancel);
    drop(sink);
    if printer.join().is_err() {
        warn!("progress printer panicked");
    }
    let total = results.len();
    let mut loaded = Vec::with_capacity(total);
    let mut failed = 0;
    for result in results {
        match result {
            Ok(result) => loaded.push(result),
            Err(e) => {
                error!("{e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, total);
    }

    if !config.json {
        for result in &loaded {
            println!("{}", summary(&result.metadata));
        }
    }

    let merged = IngestResult::merge(loaded).context("no input files")?;
    if config.json {
        println!("{}", serde_json::to_string_pretty(&merged)?);
    } else {
        println!("{}", summary(&merged.metadata));
    }

    Ok(())
}

fn summary(metadata: &RunMetadata) -> String {
    format!(
        "{} has {} records from {} vessels passed ({} rows read{}).",
        metadata.source_label,
        metadata.total_processed,
        metadata.unique_vessel_count,
        metadata.rows_read,
        if metadata.truncated { ", truncated" } else { "" }
    )
}
