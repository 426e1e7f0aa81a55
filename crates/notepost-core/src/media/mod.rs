//! Media reference resolution.
//!
//! Callers hand over media in whatever shape they have: a single path, a
//! comma-separated string, a JSON array string, a bracketed pseudo-array, or
//! a real list. [`MediaPathResolver`] normalizes that into tokens and turns
//! each token into an existing local file, downloading remote URLs into a
//! scratch directory. Scratch files outlive resolution; [`sweep_scratch`]
//! reclaims them later.

mod fetch;
mod janitor;
mod normalize;
mod resolver;

use std::path::PathBuf;

pub use fetch::{extension_for_content_type, HttpFetcher, HttpResponse, ReqwestFetcher};
pub use janitor::sweep_scratch;
pub use normalize::MediaInput;
pub use resolver::{MediaPathResolver, MediaResolution};

/// Video file extensions the platform accepts, lower-case with the dot.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi", ".mkv", ".flv", ".wmv", ".m4v"];

/// Which resolver variant produced a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Local,
    /// `http://` or `https://` URL, downloaded into the scratch directory.
    Remote,
}

impl ReferenceKind {
    pub fn of(token: &str) -> Self {
        if token.starts_with("http://") || token.starts_with("https://") {
            ReferenceKind::Remote
        } else {
            ReferenceKind::Local
        }
    }
}

/// One normalized input token and what became of it.
///
/// Exactly one of `resolved_path` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub raw: String,
    pub resolved_path: Option<PathBuf>,
    pub kind: ReferenceKind,
    pub error: Option<String>,
}

impl MediaReference {
    pub(crate) fn resolved(raw: &str, path: PathBuf) -> Self {
        Self {
            raw: raw.to_string(),
            kind: ReferenceKind::of(raw),
            resolved_path: Some(path),
            error: None,
        }
    }

    pub(crate) fn failed(raw: &str, error: impl Into<String>) -> Self {
        Self {
            raw: raw.to_string(),
            kind: ReferenceKind::of(raw),
            resolved_path: None,
            error: Some(error.into()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_path.is_some()
    }
}
