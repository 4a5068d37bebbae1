use crate::backup_core::media::{MediaKind, classify};
use exif::{In, Reader, Tag, Value};
use std::fs;
use std::io::BufReader;
use std::path::Path;
use time::{Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Date format used in EXIF data.
const EXIF_DATE_FORMAT: &[time::format_description::FormatItem] =
    time::macros::format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");

/// Where a resolved date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Metadata,
    Filesystem,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::Metadata => "metadata",
            DateSource::Filesystem => "filesystem",
        }
    }
}

/// Capture date of a media file, or an explicit unknown marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedDate {
    Known {
        year: i32,
        month: Month,
        source: DateSource,
    },
    Unknown,
}

impl ResolvedDate {
    pub fn from_datetime(dt: PrimitiveDateTime, source: DateSource) -> Self {
        ResolvedDate::Known {
            year: dt.year(),
            month: dt.month(),
            source,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ResolvedDate::Unknown)
    }

    pub fn source(&self) -> Option<DateSource> {
        match self {
            ResolvedDate::Known { source, .. } => Some(*source),
            ResolvedDate::Unknown => None,
        }
    }
}

impl std::fmt::Display for ResolvedDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedDate::Known {
                year,
                month,
                source,
            } => write!(f, "{:04}-{:02} ({})", year, u8::from(*month), source.as_str()),
            ResolvedDate::Unknown => write!(f, "unknown"),
        }
    }
}

/// Maps a media file to the year and month it belongs under.
///
/// Implementations must not fail; anything they cannot determine comes back
/// as [`ResolvedDate::Unknown`].
pub trait DateResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> ResolvedDate;
}

/// Resolves capture dates: EXIF `DateTime` first, then modification time.
///
/// Never fails; every error along the way degrades to the next tier and the
/// last tier is [`ResolvedDate::Unknown`].
#[derive(Debug, Clone, Copy)]
pub struct MetadataDateResolver {
    offset: UtcOffset,
}

impl Default for MetadataDateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataDateResolver {
    /// Resolver that reports filesystem times in the local timezone.
    ///
    /// On Unix the local offset can only be read while the process is
    /// single-threaded; call this before spawning threads.
    pub fn new() -> Self {
        Self {
            offset: get_local_offset(),
        }
    }

    /// Resolver that reports filesystem times at a fixed offset.
    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl DateResolver for MetadataDateResolver {
    fn resolve(&self, path: &Path) -> ResolvedDate {
        log::debug!("Attempting to extract date for: {}", path.display());

        if classify(path).carries_exif() {
            match read_exif_datetime(path) {
                Ok(Some(dt)) => return ResolvedDate::from_datetime(dt, DateSource::Metadata),
                Ok(None) => {
                    log::debug!("No EXIF DateTime in {}", path.display());
                }
                Err(reason) => {
                    log::warn!("EXIF date extraction failed for {}: {}", path.display(), reason);
                }
            }
        }

        match modification_time(path) {
            Ok(modified) => {
                let local = modified.to_offset(self.offset);
                ResolvedDate::from_datetime(
                    PrimitiveDateTime::new(local.date(), local.time()),
                    DateSource::Filesystem,
                )
            }
            Err(e) => {
                log::error!(
                    "Failed to get modification time for {}: {}",
                    path.display(),
                    e
                );
                ResolvedDate::Unknown
            }
        }
    }
}

/// Read the primary-IFD `DateTime` tag.
///
/// `Ok(None)` means the file parsed but has no usable tag; `Err` carries the
/// reason the metadata could not be read or parsed.
fn read_exif_datetime(path: &Path) -> std::result::Result<Option<PrimitiveDateTime>, String> {
    let file = fs::File::open(path).map_err(|e| e.to_string())?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };

    let Some(field) = exif.get_field(Tag::DateTime, In::PRIMARY) else {
        return Ok(None);
    };

    let raw = match field.value {
        Value::Ascii(ref parts) if !parts.is_empty() => {
            String::from_utf8(parts[0].clone()).map_err(|e| e.to_string())?
        }
        _ => return Err("DateTime tag is not an ASCII value".to_string()),
    };

    parse_exif_date(raw.trim().trim_matches('\0')).map(Some)
}

/// Parse an EXIF date string (`YYYY:MM:DD HH:MM:SS`).
fn parse_exif_date(date_str: &str) -> std::result::Result<PrimitiveDateTime, String> {
    if date_str.is_empty() {
        return Err("empty date".to_string());
    }
    PrimitiveDateTime::parse(date_str, EXIF_DATE_FORMAT).map_err(|e| e.to_string())
}

fn modification_time(path: &Path) -> std::io::Result<OffsetDateTime> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(OffsetDateTime::from(modified))
}

/// Get the local timezone offset, falling back to UTC if unavailable.
fn get_local_offset() -> UtcOffset {
    match UtcOffset::current_local_offset() {
        Ok(offset) => offset,
        Err(e) => {
            log::warn!(
                "Could not determine local timezone ({}); filesystem dates will use UTC",
                e
            );
            UtcOffset::UTC
        }
    }
}
