use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Whether embedded capture metadata is worth probing for this kind.
    pub fn carries_exif(&self) -> bool {
        matches!(self, MediaKind::Image)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extension classification table (lowercase, with leading dot).
const CLASSIFICATION: &[(&str, MediaKind)] = &[
    (".jpg", MediaKind::Image),
    (".jpeg", MediaKind::Image),
    (".png", MediaKind::Image),
    (".gif", MediaKind::Image),
    (".bmp", MediaKind::Image),
    (".webp", MediaKind::Image),
    (".mp4", MediaKind::Video),
    (".mov", MediaKind::Video),
    (".avi", MediaKind::Video),
    (".mkv", MediaKind::Video),
    (".flv", MediaKind::Video),
    (".wmv", MediaKind::Video),
    (".webm", MediaKind::Video),
    (".m4v", MediaKind::Video),
    (".3gp", MediaKind::Video),
];

/// Lowercase extension of a path with its leading dot, e.g. `.jpg`.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

/// Classify a path by extension.
///
/// Anything not listed as an image counts as video, so configured extensions
/// outside the table still land in the video bucket of the pre-flight count.
pub fn classify(path: &Path) -> MediaKind {
    let Some(ext) = dotted_extension(path) else {
        return MediaKind::Video;
    };
    CLASSIFICATION
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, kind)| *kind)
        .unwrap_or(MediaKind::Video)
}

/// The built-in extension list, in table order.
pub fn default_extensions() -> Vec<String> {
    CLASSIFICATION.iter().map(|(ext, _)| ext.to_string()).collect()
}

/// Ordered set of backup-eligible extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaExtensionSet {
    extensions: Vec<String>,
}

impl MediaExtensionSet {
    /// Build a set from raw entries, normalising case and the leading dot.
    /// Blank entries are dropped and the first occurrence of a duplicate wins.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = Vec::new();
        for entry in entries {
            let trimmed = entry.as_ref().trim().to_lowercase();
            if trimmed.is_empty() || trimmed == "." {
                continue;
            }
            let ext = if trimmed.starts_with('.') {
                trimmed
            } else {
                format!(".{}", trimmed)
            };
            if !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
        Self { extensions }
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        dotted_extension(path)
            .map(|ext| self.extensions.contains(&ext))
            .unwrap_or(false)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.extensions
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }
}

impl Default for MediaExtensionSet {
    fn default() -> Self {
        Self::new(default_extensions())
    }
}

/// A file discovered under the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFileRecord {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaFileRecord {
    pub fn new(path: PathBuf) -> Self {
        let kind = classify(&path);
        Self { path, kind }
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }
}
