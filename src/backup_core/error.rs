use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Filesystem errors
    #[error("Source folder does not exist: {0}")]
    SourceNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Cannot create destination folder {path}: {source}")]
    DestinationCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    // Job control
    #[error("A backup job is already running")]
    JobAlreadyRunning,

    #[error("No prepared backup job to run")]
    NoPendingJob,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single file that could not be backed up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-file failures collected over one job run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFailures {
    pub failures: Vec<FileFailure>,
}

impl std::fmt::Display for FileFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for failure in &self.failures {
            writeln!(f, "  {}: {}", failure.path.display(), failure.reason)?;
        }
        Ok(())
    }
}

impl FileFailures {
    pub fn add(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.failures.push(FileFailure {
            path,
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }
}

/// Result type for backup operations.
pub type Result<T> = std::result::Result<T, BackupError>;
