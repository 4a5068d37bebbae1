use crate::backup_core::error::{BackupError, Result};
use crate::backup_core::media::{MediaExtensionSet, default_extensions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "backup_config.json";

/// On-disk configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    #[serde(default = "default_extensions")]
    pub media_extensions: Vec<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            media_extensions: default_extensions(),
        }
    }
}

impl BackupConfig {
    pub fn extension_set(&self) -> MediaExtensionSet {
        MediaExtensionSet::new(&self.media_extensions)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Read and parse the config file, failing on any problem.
pub fn read_config(path: &Path) -> Result<BackupConfig> {
    let content = fs::read_to_string(path)?;
    let config: BackupConfig = serde_json::from_str(&content)?;
    if MediaExtensionSet::new(&config.media_extensions).is_empty() {
        return Err(BackupError::Config(format!(
            "{} lists no media extensions",
            path.display()
        )));
    }
    Ok(config)
}

pub fn write_config(path: &Path, config: &BackupConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(())
}

/// Load the extension set, falling back to the defaults on any failure.
///
/// When the defaults are used they are written back so later runs find a
/// valid file. A failed write is logged and otherwise ignored.
pub fn load_extensions(path: &Path) -> MediaExtensionSet {
    match read_config(path) {
        Ok(config) => {
            log::debug!("Loaded media extensions from {}", path.display());
            config.extension_set()
        }
        Err(e) => {
            if path.exists() {
                log::error!("Error loading config {}: {}", path.display(), e);
            } else {
                log::info!("No config at {}, using defaults", path.display());
            }
            let config = BackupConfig::default();
            if let Err(write_err) = write_config(path, &config) {
                log::error!(
                    "Error creating default config {}: {}",
                    path.display(),
                    write_err
                );
            }
            config.extension_set()
        }
    }
}
