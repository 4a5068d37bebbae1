use clap::{Parser, Subcommand};
use simplelog::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Back up photos and videos into year/month folders")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Extension configuration file (created with defaults if missing)
    #[arg(long, global = true, default_value = "backup_config.json")]
    pub config: PathBuf,

    /// Enable file logging to media_backup.log
    #[arg(long = "log", global = true)]
    pub log: bool,

    /// Log level for file logging (debug, info, warn, error)
    #[arg(long, default_value_t = LevelFilter::Debug, global = true)]
    pub log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy media from a source tree into <DEST>/<YYYY>/<MM>_<Month> folders.
    ///
    /// Capture dates come from EXIF DateTime for images and from the file
    /// modification time otherwise. Files whose date cannot be read at all
    /// go to <DEST>/Unknown_Date. Existing files are never overwritten; a
    /// numeric suffix is added instead.
    Backup {
        /// Folder to scan recursively
        #[arg(required = true)]
        source_dir: PathBuf,

        /// Backup destination folder (created if missing)
        #[arg(required = true)]
        dest_dir: PathBuf,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Count the media files a backup would copy
    Count {
        /// Folder to scan recursively
        #[arg(required = true)]
        source_dir: PathBuf,
    },

    /// Show the media extensions in effect
    Extensions,
}
