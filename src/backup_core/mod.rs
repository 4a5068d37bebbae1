pub mod cli;
pub mod config;
pub mod controller;
pub mod date;
pub mod error;
pub mod job;
pub mod media;
pub mod planner;
pub mod progress;
pub mod writer;

pub use cli::{Cli, Commands};
pub use config::{BackupConfig, load_extensions};
pub use controller::BackupController;
pub use date::{DateResolver, DateSource, MetadataDateResolver, ResolvedDate};
pub use error::{BackupError, FileFailure, FileFailures};
pub use job::{
    BackupJob, CancellationToken, JobReport, JobState, JobStatus, PreflightSummary, StateHandle,
    enumerate_media, validate_source,
};
pub use media::{MediaExtensionSet, MediaFileRecord, MediaKind};
pub use planner::{DestinationPlanner, UNKNOWN_DATE_FOLDER};
pub use progress::{ChannelReporter, JobEvent, NullReporter, ProgressEvent, ProgressReporter};
pub use writer::{copy_collision_safe, copy_into};
