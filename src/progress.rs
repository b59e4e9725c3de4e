//! Progress events and the sinks that receive them.
//!
//! Reporting is best-effort: a sink that errors or panics is logged and
//! ingestion carries on. [`ChannelProgress`] never blocks the row loop;
//! when the consumer falls behind, events are dropped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Downloading,
    Parsing,
    Processing,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn stage(stage: Stage, percentage: f64) -> Self {
        ProgressEvent {
            stage,
            percentage: percentage.clamp(0.0, 100.0),
            processed: None,
            total: None,
            completed: false,
            error: None,
        }
    }

    /// Periodic snapshot of accepted records against the budget.
    pub fn counts(processed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            processed as f64 * 100.0 / total as f64
        };
        ProgressEvent {
            processed: Some(processed),
            total: Some(total),
            ..ProgressEvent::stage(Stage::Parsing, percentage)
        }
    }

    pub fn completed(processed: usize) -> Self {
        ProgressEvent {
            processed: Some(processed),
            total: Some(processed),
            completed: true,
            ..ProgressEvent::stage(Stage::Parsing, 100.0)
        }
    }

    pub fn failed(stage: Stage, message: impl Into<String>) -> Self {
        ProgressEvent {
            error: Some(message.into()),
            ..ProgressEvent::stage(stage, 0.0)
        }
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent) -> anyhow::Result<()>;
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Bounded channel sink. A full queue drops the event.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: SyncSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn bounded(capacity: usize) -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        (ChannelProgress { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn on_progress(&self, event: &ProgressEvent) -> anyhow::Result<()> {
        match self.sender.try_send(event.clone()) {
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Disconnected(_)) => {
                anyhow::bail!("progress receiver disconnected")
            }
        }
    }
}

/// Rescales percentages into `[start, start + span]` under a fixed stage,
/// so a parse reported as 0..100 shows up as 50..100 of a whole load.
pub struct StagedProgress<'a> {
    inner: &'a dyn ProgressSink,
    stage: Stage,
    start: f64,
    span: f64,
}

impl<'a> StagedProgress<'a> {
    pub fn new(inner: &'a dyn ProgressSink, stage: Stage, start: f64, span: f64) -> Self {
        StagedProgress {
            inner,
            stage,
            start,
            span,
        }
    }
}

impl ProgressSink for StagedProgress<'_> {
    fn on_progress(&self, event: &ProgressEvent) -> anyhow::Result<()> {
        let scaled = ProgressEvent {
            stage: self.stage,
            percentage: self.start + event.percentage / 100.0 * self.span,
            // completion is the outer loader's to announce
            completed: false,
            ..event.clone()
        };
        self.inner.on_progress(&scaled)
    }
}

/// Deliver an event, logging rather than propagating sink errors and panics.
pub fn report(sink: &dyn ProgressSink, event: ProgressEvent) {
    match catch_unwind(AssertUnwindSafe(|| sink.on_progress(&event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("progress sink failed: {e:#}"),
        Err(_) => warn!("progress sink panicked; continuing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn counts_percentage() {
        let event = ProgressEvent::counts(250, 1000);
        assert_eq!(event.percentage, 25.0);
        assert_eq!(ProgressEvent::counts(0, 0).percentage, 100.0);
    }

    #[test]
    fn serializes_with_optional_fields_omitted() {
        let json = serde_json::to_value(ProgressEvent::stage(Stage::Downloading, 10.0)).unwrap();
        assert_eq!(json, serde_json::json!({"stage": "downloading", "percentage": 10.0}));
        let json = serde_json::to_value(ProgressEvent::completed(3)).unwrap();
        assert_eq!(json["completed"], serde_json::json!(true));
        assert_eq!(json["total"], serde_json::json!(3));
    }

    #[test]
    fn report_swallows_errors_and_panics() {
        let failing = |_: &ProgressEvent| -> anyhow::Result<()> { anyhow::bail!("boom") };
        report(&failing, ProgressEvent::counts(1, 2));
        let panicking = |_: &ProgressEvent| -> anyhow::Result<()> { panic!("boom") };
        report(&panicking, ProgressEvent::counts(1, 2));
    }

    #[test]
    fn channel_drops_when_full() {
        let (sink, rx) = ChannelProgress::bounded(1);
        sink.on_progress(&ProgressEvent::counts(1, 10)).unwrap();
        sink.on_progress(&ProgressEvent::counts(2, 10)).unwrap();
        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].processed, Some(1));
    }

    #[test]
    fn channel_reports_disconnect() {
        let (sink, rx) = ChannelProgress::bounded(1);
        drop(rx);
        assert!(sink.on_progress(&ProgressEvent::counts(1, 10)).is_err());
    }

    #[test]
    fn staged_rescales() {
        let seen = Mutex::new(Vec::new());
        let inner = |e: &ProgressEvent| -> anyhow::Result<()> {
            seen.lock().unwrap().push(e.clone());
            Ok(())
        };
        let staged = StagedProgress::new(&inner, Stage::Parsing, 50.0, 50.0);
        staged.on_progress(&ProgressEvent::counts(500, 1000)).unwrap();
        staged.on_progress(&ProgressEvent::completed(1000)).unwrap();
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen[0].percentage, 75.0);
        assert_eq!(seen[1].percentage, 100.0);
        assert!(!seen[1].completed);
    }
}
