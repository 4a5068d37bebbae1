use crate::backup_core::date::ResolvedDate;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Folder name for files whose date could not be resolved at all.
pub const UNKNOWN_DATE_FOLDER: &str = "Unknown_Date";

/// Maps resolved dates to `<dest>/<YYYY>/<MM>_<MonthName>` folders.
///
/// Remembers which folders it has already created so each one is touched on
/// disk at most once per job. The cache lives as long as the planner, which
/// is owned by a single job run.
#[derive(Debug)]
pub struct DestinationPlanner {
    base: PathBuf,
    created: HashSet<PathBuf>,
}

impl DestinationPlanner {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            created: HashSet::new(),
        }
    }

    pub fn unknown_folder(&self) -> PathBuf {
        self.base.join(UNKNOWN_DATE_FOLDER)
    }

    pub fn plan_folder(&self, date: &ResolvedDate) -> PathBuf {
        match date {
            ResolvedDate::Unknown => self.unknown_folder(),
            ResolvedDate::Known { year, month, .. } => self
                .base
                .join(format!("{:04}", year))
                .join(format!("{:02}_{}", u8::from(*month), month)),
        }
    }

    /// Create `folder` (and parents) unless this planner already did.
    pub fn ensure_created(&mut self, folder: &Path) -> io::Result<()> {
        if self.created.contains(folder) {
            return Ok(());
        }
        fs::create_dir_all(folder)?;
        log::debug!("Created folder {}", folder.display());
        self.created.insert(folder.to_path_buf());
        Ok(())
    }

    /// Plan and create the folder for `date` in one step.
    pub fn prepare(&mut self, date: &ResolvedDate) -> io::Result<PathBuf> {
        let folder = self.plan_folder(date);
        self.ensure_created(&folder)?;
        Ok(folder)
    }

    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}
