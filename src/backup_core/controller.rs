use crate::backup_core::date::DateResolver;
use crate::backup_core::error::{BackupError, Result};
use crate::backup_core::job::{
    BackupJob, CancellationToken, JobReport, JobState, JobStatus, PreflightSummary, StateHandle,
};
use crate::backup_core::media::MediaExtensionSet;
use crate::backup_core::progress::{DEFAULT_PROGRESS_INTERVAL, ProgressEvent, ProgressReporter};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Fans events out to every subscriber.
struct Subscribers(Vec<Arc<dyn ProgressReporter>>);

impl ProgressReporter for Subscribers {
    fn progress(&self, event: &ProgressEvent) {
        for reporter in &self.0 {
            reporter.progress(event);
        }
    }

    fn finished(&self, report: &JobReport) {
        for reporter in &self.0 {
            reporter.finished(report);
        }
    }
}

/// Control surface for backup jobs: prepare, confirm, cancel, observe.
///
/// Runs at most one job at a time on a dedicated `backup-worker` thread.
pub struct BackupController {
    extensions: MediaExtensionSet,
    resolver: Option<Arc<dyn DateResolver>>,
    progress_interval: Duration,
    subscribers: Vec<Arc<dyn ProgressReporter>>,
    state: StateHandle,
    cancel: CancellationToken,
    pending: Option<BackupJob>,
    worker: Option<JoinHandle<JobReport>>,
}

impl BackupController {
    pub fn new(extensions: MediaExtensionSet) -> Self {
        Self {
            extensions,
            resolver: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            subscribers: Vec::new(),
            state: StateHandle::default(),
            cancel: CancellationToken::new(),
            pending: None,
            worker: None,
        }
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Date resolver shared by every job this controller starts.
    ///
    /// Without one, each job builds a
    /// [`MetadataDateResolver`](crate::backup_core::date::MetadataDateResolver) when it is
    /// prepared, which may not see the local timezone once other threads exist.
    pub fn with_resolver(mut self, resolver: Arc<dyn DateResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Register a reporter for every job started after this call.
    pub fn subscribe(&mut self, reporter: Arc<dyn ProgressReporter>) {
        self.subscribers.push(reporter);
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Latest published job state.
    pub fn state(&self) -> JobState {
        self.state.snapshot()
    }

    /// Validate folders and enumerate the source tree.
    ///
    /// The returned counts are meant for confirmation; nothing is copied
    /// until [`confirm_and_run`](Self::confirm_and_run).
    pub fn start_job(&mut self, source: &Path, destination: &Path) -> Result<PreflightSummary> {
        if self.is_running() {
            log::warn!("Ignoring start request while a backup is running");
            return Err(BackupError::JobAlreadyRunning);
        }
        if self.worker.is_some() {
            self.wait();
        }
        self.reset();

        let mut job = BackupJob::prepare(source, destination, &self.extensions)?
            .with_progress_interval(self.progress_interval);
        if let Some(resolver) = &self.resolver {
            job = job.with_resolver(Arc::clone(resolver));
        }
        let summary = job.preflight();
        self.pending = Some(job);
        Ok(summary)
    }

    /// Start copying the prepared job on the worker thread.
    pub fn confirm_and_run(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(BackupError::JobAlreadyRunning);
        }
        let job = self.pending.take().ok_or(BackupError::NoPendingJob)?;

        self.cancel = CancellationToken::new();
        let cancel = self.cancel.clone();
        let state = self.state.clone();
        let reporters = Subscribers(self.subscribers.clone());

        let handle = thread::Builder::new()
            .name("backup-worker".to_string())
            .spawn(move || job.run(&cancel, &reporters, &state))?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Request cancellation of the running job, or drop a prepared one.
    ///
    /// Takes effect before the next file; the file in flight completes.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            log::info!("Prepared backup discarded");
        }
        if self.is_running() {
            log::info!("Cancelling backup...");
            self.cancel.cancel();
        }
    }

    /// Block until the worker finishes and return its report.
    ///
    /// Returns `None` when no job was started since the last wait.
    pub fn wait(&mut self) -> Option<JobReport> {
        let handle = self.worker.take()?;
        match handle.join() {
            Ok(report) => Some(report),
            Err(_) => {
                log::error!("Backup worker terminated unexpectedly");
                let current = self.state.snapshot();
                let report = JobReport {
                    status: JobStatus::Failed,
                    processed: current.processed,
                    total: current.total,
                    message: "Backup worker terminated unexpectedly".to_string(),
                    ..Default::default()
                };
                self.state.update(|s| {
                    s.status = JobStatus::Failed;
                    s.last_error = Some(report.message.clone());
                });
                for reporter in &self.subscribers {
                    reporter.finished(&report);
                }
                Some(report)
            }
        }
    }

    /// Return to Idle after a terminal state. No effect while running.
    pub fn reset(&mut self) {
        if self.is_running() {
            return;
        }
        self.pending = None;
        self.state.reset();
    }
}

impl Drop for BackupController {
    fn drop(&mut self) {
        if self.is_running() {
            self.cancel.cancel();
        }
        self.wait();
    }
}
