use crate::backup_core::job::JobReport;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::time::{Duration, Instant};

/// Minimum spacing between two progress events.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Periodic progress update from a running job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub processed: usize,
    pub total: usize,
    pub message: String,
}

/// Receives progress from the backup worker.
///
/// Called on the worker thread, so implementations should hand off quickly.
pub trait ProgressReporter: Send + Sync {
    fn progress(&self, event: &ProgressEvent);

    fn finished(&self, report: &JobReport);
}

/// Reporter that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn progress(&self, _event: &ProgressEvent) {}

    fn finished(&self, _report: &JobReport) {}
}

/// Message sent through a [`ChannelReporter`].
#[derive(Debug, Clone)]
pub enum JobEvent {
    Progress(ProgressEvent),
    Finished(JobReport),
}

/// Forwards events into a channel for consumption on another thread.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: Sender<JobEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, Receiver<JobEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn progress(&self, event: &ProgressEvent) {
        if self.tx.send(JobEvent::Progress(event.clone())).is_err() {
            log::debug!("Progress receiver dropped");
        }
    }

    fn finished(&self, report: &JobReport) {
        if self.tx.send(JobEvent::Finished(report.clone())).is_err() {
            log::debug!("Progress receiver dropped before the final report");
        }
    }
}

/// Decides when a progress event is due.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True if an event should go out now. The last item is always due.
    pub fn should_emit(&mut self, now: Instant, is_last: bool) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if due || is_last {
            self.last = Some(now);
            return true;
        }
        false
    }
}
