//! Whole-source loading and multi-file ingestion.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;
use rayon::prelude::*;

use crate::error::IngestError;
use crate::pipeline::{ingest_str, CancellationToken, IngestOptions, IngestResult};
use crate::progress::{report, ProgressEvent, ProgressSink, Stage, StagedProgress};

const READ_CHUNK: usize = 64 * 1024;
/// Upper bound on buffer space reserved from an advertised length.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Read a whole source into memory, then ingest it.
///
/// Reading counts for the first half of the reported percentage (only
/// when `content_length` is known), parsing for the second half. A final
/// `processing` event carries the vessel count and `completed`.
/// Cancellation is checked between chunks while reading.
pub fn load_reader<R: Read>(
    mut source: R,
    content_length: Option<u64>,
    label: &Path,
    options: &IngestOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<IngestResult, IngestError> {
    report(progress, ProgressEvent::stage(Stage::Downloading, 0.0));

    let reserve = content_length.unwrap_or(0).min(MAX_PREALLOCATION);
    let mut bytes = Vec::with_capacity(reserve as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        if cancel.is_cancelled() {
            info!("{}: cancelled while reading", label.display());
            return Ok(IngestResult::cancelled(options));
        }
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                report(progress, ProgressEvent::failed(Stage::Downloading, e.to_string()));
                return Err(IngestError::Io {
                    path: label.to_path_buf(),
                    source: e,
                });
            }
        };
        bytes.extend_from_slice(&chunk[..n]);
        if let Some(total) = content_length.filter(|t| *t > 0) {
            let percentage = bytes.len() as f64 / total as f64 * 50.0;
            report(progress, ProgressEvent::stage(Stage::Downloading, percentage.min(50.0)));
        }
    }

    report(progress, ProgressEvent::stage(Stage::Parsing, 50.0));
    let text = String::from_utf8_lossy(&bytes);

    let staged = StagedProgress::new(progress, Stage::Parsing, 50.0, 50.0);
    let result = ingest_str(&text, options, &staged, cancel)?;

    if !result.is_cancelled() {
        let vessels = result.vessels.len();
        report(
            progress,
            ProgressEvent {
                processed: Some(vessels),
                total: Some(vessels),
                completed: true,
                ..ProgressEvent::stage(Stage::Processing, 100.0)
            },
        );
    }
    Ok(result)
}

/// Open and load one file. The file name becomes the source label.
pub fn load_file(
    path: &Path,
    options: &IngestOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<IngestResult, IngestError> {
    let io_error = |source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let length = file.metadata().map_err(io_error)?.len();

    let options = IngestOptions {
        source_label: path.display().to_string(),
        ..options.clone()
    };
    load_reader(file, Some(length), path, &options, progress, cancel)
}

/// Ingest each file as an independent run in parallel.
///
/// Results come back in input order; merge them with [`IngestResult::merge`].
pub fn ingest_files(
    paths: &[PathBuf],
    options: &IngestOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Vec<Result<IngestResult, IngestError>> {
    info!("ingesting {} file(s)", paths.len());
    paths
        .par_iter()
        .map(|path| load_file(path, options, progress, cancel))
        .collect()
}

/// Daily NOAA archive names (`AIS_YYYY_MM_DD.zip`) from `start` to `end` inclusive.
pub fn noaa_archive_names(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| day.format("AIS_%Y_%m_%d.zip").to_string())
        .collect()
}
