//! Media kind classification by file extension.

use std::path::Path;

/// Still images handled by the in-process image pipeline
pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".webp", ".bmp", ".tiff", ".heic", ".heif",
];
/// Animated images re-encoded through FFmpeg
pub const GIF_EXTENSIONS: &[&str] = &[".gif"];
/// Video containers re-encoded through FFmpeg
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".mov", ".avi", ".mkv", ".webm", ".m4v", ".wmv", ".flv", ".mts", ".m2ts",
];
const HEIC_EXTENSIONS: &[&str] = &[".heic", ".heif"];

/// How a file gets compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Gif,
    Video,
}

impl MediaKind {
    /// Classify a path by its extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        Self::from_extension(&dotted_extension(path.as_ref())?)
    }

    /// Classify a dotted extension such as `.MP4`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if GIF_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Gif)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Gif => "gif",
            MediaKind::Video => "video",
        }
    }
}

/// Lowercased extension with its leading dot, or `None` when absent.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

/// Whether the path is a HEIC/HEIF image.
pub fn is_heic(path: impl AsRef<Path>) -> bool {
    dotted_extension(path.as_ref())
        .map(|ext| HEIC_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Whether an upload with this dotted extension is accepted.
pub fn is_allowed_upload(ext: &str) -> bool {
    MediaKind::from_extension(ext).is_some()
}
