use crate::backup_core::date::{DateResolver, MetadataDateResolver};
use crate::backup_core::error::{BackupError, FileFailures, Result};
use crate::backup_core::media::{MediaExtensionSet, MediaFileRecord};
use crate::backup_core::planner::{DestinationPlanner, UNKNOWN_DATE_FOLDER};
use crate::backup_core::progress::{
    DEFAULT_PROGRESS_INTERVAL, ProgressEvent, ProgressReporter, ProgressThrottle,
};
use crate::backup_core::writer::copy_into;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Cancelling,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Cancelling => "cancelling",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a job's progress as published by the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobState {
    pub status: JobStatus,
    pub processed: usize,
    pub total: usize,
    pub message: String,
    pub last_error: Option<String>,
}

/// Shared slot holding the latest [`JobState`].
///
/// Only the worker writes; readers take cloned snapshots.
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    inner: Arc<Mutex<JobState>>,
}

impl StateHandle {
    pub fn snapshot(&self) -> JobState {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut JobState)) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    pub fn reset(&self) {
        self.update(|state| *state = JobState::default());
    }
}

/// Cooperative cancellation flag, polled once per file.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Media counts shown before the copy phase is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreflightSummary {
    pub total: usize,
    pub images: usize,
    pub videos: usize,
}

impl PreflightSummary {
    pub fn from_records(records: &[MediaFileRecord]) -> Self {
        let images = records.iter().filter(|r| r.is_image()).count();
        Self {
            total: records.len(),
            images,
            videos: records.len() - images,
        }
    }
}

impl std::fmt::Display for PreflightSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Found in source folder:")?;
        writeln!(f, "  Total Media Files: {}", self.total)?;
        writeln!(f, "  Images: {}", self.images)?;
        write!(f, "  Videos: {}", self.videos)
    }
}

/// Terminal summary of one job run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub status: JobStatus,
    pub processed: usize,
    pub total: usize,
    pub copied: usize,
    pub unknown_date: usize,
    pub failures: FileFailures,
    pub message: String,
}

impl JobReport {
    pub fn nothing_to_do(&self) -> bool {
        self.status == JobStatus::Completed && self.total == 0
    }
}

/// One backup run: a fully enumerated source tree and a destination root.
pub struct BackupJob {
    source: PathBuf,
    destination: PathBuf,
    files: Vec<MediaFileRecord>,
    resolver: Arc<dyn DateResolver>,
    progress_interval: Duration,
}

impl BackupJob {
    /// Validate the folders and enumerate every matching file under `source`.
    ///
    /// The destination root is created here; failure to do so is fatal and
    /// the job never starts.
    pub fn prepare(
        source: &Path,
        destination: &Path,
        extensions: &MediaExtensionSet,
    ) -> Result<Self> {
        validate_source(source)?;

        fs::create_dir_all(destination).map_err(|e| BackupError::DestinationCreate {
            path: destination.to_path_buf(),
            source: e,
        })?;

        log::info!("Backup source: {}", source.display());
        log::info!("Backup destination: {}", destination.display());
        log::info!("Media extensions: {:?}", extensions.as_slice());

        let files = enumerate_media(source, extensions);
        log::info!("Total media files to copy: {}", files.len());

        Ok(Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            files,
            resolver: Arc::new(MetadataDateResolver::new()),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        })
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn DateResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn files(&self) -> &[MediaFileRecord] {
        &self.files
    }

    pub fn preflight(&self) -> PreflightSummary {
        PreflightSummary::from_records(&self.files)
    }

    /// Copy every enumerated file, publishing state and progress as it goes.
    ///
    /// Always ends with exactly one `reporter.finished` call. Per-file errors
    /// are recorded in the report and never stop the loop.
    pub fn run(
        self,
        cancel: &CancellationToken,
        reporter: &dyn ProgressReporter,
        state: &StateHandle,
    ) -> JobReport {
        let total = self.files.len();
        let mut report = JobReport {
            total,
            ..Default::default()
        };

        if total == 0 {
            report.status = JobStatus::Completed;
            report.message = "No media files found!".to_string();
            log::info!("Nothing to back up in {}", self.source.display());
            return finish(report, reporter, state);
        }

        state.update(|s| {
            *s = JobState {
                status: JobStatus::Running,
                total,
                message: format!("Copying 0/{} files...", total),
                ..Default::default()
            }
        });

        let mut planner = DestinationPlanner::new(&self.destination);
        let unknown_folder = planner.unknown_folder();
        if let Err(e) = planner.ensure_created(&unknown_folder) {
            log::error!(
                "Cannot create {} folder {}: {}",
                UNKNOWN_DATE_FOLDER,
                unknown_folder.display(),
                e
            );
            report.status = JobStatus::Failed;
            report.message = format!("Cannot create {}: {}", unknown_folder.display(), e);
            return finish(report, reporter, state);
        }

        let mut throttle = ProgressThrottle::new(self.progress_interval);

        for record in &self.files {
            if cancel.is_cancelled() {
                log::info!(
                    "Backup cancelled after {}/{} files",
                    report.processed,
                    total
                );
                state.update(|s| s.status = JobStatus::Cancelling);
                report.status = JobStatus::Cancelled;
                break;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.backup_file(record, &mut planner)
            }));

            match outcome {
                Ok(Ok(copied)) => {
                    report.copied += 1;
                    if copied.unknown_date {
                        report.unknown_date += 1;
                    }
                }
                Ok(Err(e)) => {
                    log::error!("Error processing {}: {}", record.path.display(), e);
                    report.failures.add(record.path.clone(), e.to_string());
                    state.update(|s| s.last_error = Some(e.to_string()));
                }
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    log::error!(
                        "Unexpected failure processing {}: {}",
                        record.path.display(),
                        reason
                    );
                    report.failures.add(record.path.clone(), reason.clone());
                    state.update(|s| s.last_error = Some(reason));
                }
            }

            report.processed += 1;
            let processed = report.processed;
            let message = format!("Copying {}/{} files...", processed, total);
            state.update(|s| {
                s.processed = processed;
                s.message = message.clone();
            });

            if throttle.should_emit(Instant::now(), processed == total) {
                reporter.progress(&ProgressEvent {
                    processed,
                    total,
                    message,
                });
            }
        }

        if report.status == JobStatus::Cancelled {
            report.message = format!(
                "Backup cancelled after {}/{} files. {} media files copied.",
                report.processed, total, report.copied
            );
        } else {
            report.status = JobStatus::Completed;
            report.message = format!(
                "{} media files copied! Files without metadata moved to '{}'.",
                report.copied, UNKNOWN_DATE_FOLDER
            );
            if !report.failures.is_empty() {
                report
                    .message
                    .push_str(&format!(" {} files skipped due to errors.", report.failures.len()));
            }
        }

        log::info!("{}", report.message);
        finish(report, reporter, state)
    }

    fn backup_file(
        &self,
        record: &MediaFileRecord,
        planner: &mut DestinationPlanner,
    ) -> std::io::Result<CopiedFile> {
        let date = self.resolver.resolve(&record.path);
        if date.is_unknown() {
            log::warn!("No date found for file: {}", record.path.display());
        }

        let folder = planner.prepare(&date)?;
        let destination = copy_into(&record.path, &folder)?;
        log::debug!(
            "Copied {} -> {} [{}]",
            record.path.display(),
            destination.display(),
            date
        );

        Ok(CopiedFile {
            unknown_date: date.is_unknown(),
        })
    }
}

struct CopiedFile {
    unknown_date: bool,
}

fn finish(report: JobReport, reporter: &dyn ProgressReporter, state: &StateHandle) -> JobReport {
    state.update(|s| {
        s.status = report.status;
        s.processed = report.processed;
        s.total = report.total;
        s.message = report.message.clone();
        if report.status == JobStatus::Failed {
            s.last_error = Some(report.message.clone());
        }
    });
    reporter.finished(&report);
    report
}

/// Check that `source` exists and is a directory.
pub fn validate_source(source: &Path) -> Result<()> {
    if !source.exists() {
        return Err(BackupError::SourceNotFound(source.to_path_buf()));
    }
    if !source.is_dir() {
        return Err(BackupError::NotADirectory(source.to_path_buf()));
    }
    Ok(())
}

/// Recursively collect regular files whose extension is in `extensions`.
///
/// Entries are visited in file-name order so runs over the same tree are
/// reproducible. Unreadable entries are logged and skipped.
pub fn enumerate_media(source: &Path, extensions: &MediaExtensionSet) -> Vec<MediaFileRecord> {
    WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| extensions.contains_path(entry.path()))
        .map(|entry| MediaFileRecord::new(entry.into_path()))
        .collect()
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
