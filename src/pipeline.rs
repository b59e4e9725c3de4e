//! Row-by-row ingestion: decode, validate, then update both stores.
//!
//! A run owns its stores for its whole lifetime and hands them back by
//! value. Rows are processed strictly in source order on one thread.
//! Cancellation and the record budget are checked between rows, never
//! in the middle of one.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use csv::StringRecord;
use log::{debug, info, trace, warn};

use crate::decode::{decode_row, Field, HeaderIndex};
use crate::error::{IngestError, RowSkip};
use crate::model::VesselRecord;
use crate::progress::{report, ProgressEvent, ProgressSink, Stage};
use crate::store::{
    sort_for_display, TrajectoryStore, VesselStateStore, DEFAULT_TRAJECTORY_CAPACITY,
};
use crate::validate::FilterConfig;

pub const DEFAULT_MAX_RECORDS: usize = 5000;
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Stop after this many accepted records.
    pub max_records: usize,
    pub filter: FilterConfig,
    pub trajectory_capacity: usize,
    /// Accepted records between progress events.
    pub progress_interval: usize,
    pub source_label: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            max_records: DEFAULT_MAX_RECORDS,
            filter: FilterConfig::default(),
            trajectory_capacity: DEFAULT_TRAJECTORY_CAPACITY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            source_label: "AIS".to_string(),
        }
    }
}

impl IngestOptions {
    fn check(&self) -> Result<(), IngestError> {
        if self.trajectory_capacity == 0 {
            return Err(IngestError::InvalidOptions(
                "trajectory capacity must be at least 1".into(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(IngestError::InvalidOptions(
                "progress interval must be at least 1".into(),
            ));
        }
        if let Some(hours) = self.filter.recency_window_hours {
            if hours.is_nan() || hours < 0.0 {
                return Err(IngestError::InvalidOptions(format!(
                    "recency window must be a non-negative number of hours, got {hours}"
                )));
            }
        }
        Ok(())
    }
}

/// Shared flag a caller flips to stop a run at the next row boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Cancelled | RunState::Failed)
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Termination {
    SourceExhausted,
    BudgetReached,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub total_processed: usize,
    pub unique_vessel_count: usize,
    pub source_label: String,
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// The budget stopped the run while unread rows remained.
    pub truncated: bool,
    pub termination: Termination,
}

/// Output of a completed or cancelled run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestResult {
    pub vessels: Vec<VesselRecord>,
    pub trajectories: TrajectoryStore,
    pub metadata: RunMetadata,
}

impl IngestResult {
    /// Empty result for a run cancelled before any row was read.
    pub fn cancelled(options: &IngestOptions) -> Self {
        IngestResult {
            vessels: Vec::new(),
            trajectories: TrajectoryStore::new(options.trajectory_capacity),
            metadata: RunMetadata {
                total_processed: 0,
                unique_vessel_count: 0,
                source_label: options.source_label.clone(),
                rows_read: 0,
                rows_skipped: 0,
                truncated: false,
                termination: Termination::Cancelled,
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.metadata.termination == Termination::Cancelled
    }

    /// Single-threaded reduction of independent runs.
    ///
    /// Vessels merge latest-wins and come back sorted for display.
    /// Trajectories merge and keep the most recent points.
    pub fn merge(results: impl IntoIterator<Item = IngestResult>) -> Option<IngestResult> {
        let mut results = results.into_iter();
        let first = results.next()?;

        let mut vessels: VesselStateStore = first.vessels.into_iter().collect();
        let mut trajectories = first.trajectories;
        let mut metadata = first.metadata;

        for result in results {
            vessels.merge(result.vessels.into_iter().collect());
            trajectories.merge(result.trajectories);

            metadata.total_processed += result.metadata.total_processed;
            metadata.rows_read += result.metadata.rows_read;
            metadata.rows_skipped += result.metadata.rows_skipped;
            metadata.truncated |= result.metadata.truncated;
            metadata.source_label =
                format!("{}, {}", metadata.source_label, result.metadata.source_label);
            if result.metadata.termination == Termination::Cancelled {
                metadata.termination = Termination::Cancelled;
            } else if metadata.termination == Termination::SourceExhausted {
                metadata.termination = result.metadata.termination;
            }
        }

        metadata.unique_vessel_count = vessels.len();
        let mut vessels = vessels.into_snapshot();
        sort_for_display(&mut vessels);
        Some(IngestResult {
            vessels,
            trajectories,
            metadata,
        })
    }
}

/// One ingestion over one source.
pub struct IngestionRun<'a> {
    options: &'a IngestOptions,
    progress: &'a dyn ProgressSink,
    cancel: &'a CancellationToken,
    now: DateTime<Utc>,
    state: RunState,
    vessels: VesselStateStore,
    trajectories: TrajectoryStore,
    processed: usize,
    rows_read: usize,
    rows_skipped: usize,
}

impl<'a> IngestionRun<'a> {
    pub fn new(
        options: &'a IngestOptions,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self::with_clock(options, progress, cancel, Utc::now())
    }

    /// `now` stands in for every unparseable timestamp and anchors the recency window.
    pub fn with_clock(
        options: &'a IngestOptions,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancellationToken,
        now: DateTime<Utc>,
    ) -> Self {
        IngestionRun {
            options,
            progress,
            cancel,
            now,
            state: RunState::Idle,
            vessels: VesselStateStore::new(),
            trajectories: TrajectoryStore::new(options.trajectory_capacity),
            processed: 0,
            rows_read: 0,
            rows_skipped: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(!self.state.is_terminal(), "run already {:?}", self.state);
        debug!("{}: {:?} -> {:?}", self.options.source_label, self.state, next);
        self.state = next;
    }

    /// Process one decoded-and-validated row. Skipped rows are not counted.
    fn accept(&mut self, index: &HeaderIndex, record: &StringRecord) -> Result<(), RowSkip> {
        let vessel = decode_row(&index.row(record), self.now).ok_or(RowSkip::MissingIdentity)?;
        self.options.filter.validate(&vessel, self.now)?;

        self.trajectories.append(&vessel.id, vessel.trajectory_point());
        self.vessels.upsert(vessel);
        self.processed += 1;
        Ok(())
    }

    fn fail(&mut self, source: csv::Error) -> IngestError {
        self.transition(RunState::Failed);
        let message = format!("{}: {}", self.options.source_label, source);
        report(self.progress, ProgressEvent::failed(Stage::Parsing, message));
        IngestError::Failed {
            source_label: self.options.source_label.clone(),
            processed: self.processed,
            rows_read: self.rows_read,
            source,
        }
    }

    /// Drive the run to a terminal state.
    ///
    /// `resort` re-sorts every trajectory once at the end, for sources
    /// whose rows are not known to be in time order.
    pub fn run<R: Read>(
        mut self,
        mut reader: csv::Reader<R>,
        resort: bool,
    ) -> Result<IngestResult, IngestError> {
        self.options.check()?;
        self.transition(RunState::Running);
        info!(
            "{}: ingesting up to {} records",
            self.options.source_label, self.options.max_records
        );

        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => return Err(self.fail(e)),
        };
        let index = HeaderIndex::new(&headers);
        if !index.has(Field::Id) {
            warn!(
                "{}: no vessel identity column in header {:?}; every row will be skipped",
                self.options.source_label, headers
            );
        }

        let max_records = self.options.max_records;
        let interval = self.options.progress_interval;
        let mut record = StringRecord::new();
        let mut truncated = false;

        let termination = loop {
            if self.cancel.is_cancelled() {
                break Termination::Cancelled;
            }

            if self.processed >= max_records {
                // Look ahead only to learn whether input remained. An
                // unreadable row still counts as remaining input.
                truncated = !matches!(reader.read_record(&mut record), Ok(false));
                debug!(
                    "{}: record budget of {} reached (truncated: {})",
                    self.options.source_label, max_records, truncated
                );
                break Termination::BudgetReached;
            }

            match reader.read_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break Termination::SourceExhausted,
                Err(e) => return Err(self.fail(e)),
            }
            self.rows_read += 1;

            match self.accept(&index, &record) {
                Ok(()) => {
                    if self.processed % interval == 0 {
                        report(self.progress, ProgressEvent::counts(self.processed, max_records));
                    }
                }
                Err(skip) => {
                    self.rows_skipped += 1;
                    trace!(
                        "{}: row {} skipped: {}",
                        self.options.source_label,
                        self.rows_read,
                        skip
                    );
                }
            }
        };

        // Drop the reader before handing results back so the source is released.
        drop(reader);

        report(self.progress, ProgressEvent::counts(self.processed, max_records));
        if termination == Termination::Cancelled {
            self.transition(RunState::Cancelled);
        } else {
            self.transition(RunState::Completed);
            report(self.progress, ProgressEvent::completed(self.processed));
        }

        if resort {
            self.trajectories.sort_chronologically();
        }

        let metadata = RunMetadata {
            total_processed: self.processed,
            unique_vessel_count: self.vessels.len(),
            source_label: self.options.source_label.clone(),
            rows_read: self.rows_read,
            rows_skipped: self.rows_skipped,
            truncated,
            termination,
        };
        info!(
            "{}: {:?} with {} records from {} vessels ({} rows read, {} skipped)",
            metadata.source_label,
            metadata.termination,
            metadata.total_processed,
            metadata.unique_vessel_count,
            metadata.rows_read,
            metadata.rows_skipped
        );

        Ok(IngestResult {
            vessels: self.vessels.into_snapshot(),
            trajectories: self.trajectories,
            metadata,
        })
    }
}

fn csv_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source)
}

/// Ingest text already held in memory. Trajectories are re-sorted at the end.
pub fn ingest_str(
    text: &str,
    options: &IngestOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<IngestResult, IngestError> {
    IngestionRun::new(options, progress, cancel).run(csv_reader(text.as_bytes()), true)
}

/// Ingest a streaming source row by row. Points stay in arrival order.
pub fn ingest_reader<R: Read>(
    source: R,
    options: &IngestOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<IngestResult, IngestError> {
    IngestionRun::new(options, progress, cancel).run(csv_reader(source), false)
}
