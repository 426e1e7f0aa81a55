//! Token-to-file resolution for the image and video variants.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notepost_types::{MediaConfig, NoteError};

use super::fetch::{extension_for_content_type, HttpFetcher};
use super::normalize::MediaInput;
use super::{MediaKind, MediaReference, ReferenceKind, VIDEO_EXTENSIONS};

/// How many failed tokens the aggregated error names before summarising.
const ERROR_TOKEN_PREVIEW: usize = 3;

/// Resolved paths in input order, plus an aggregated error when nothing
/// resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaResolution {
    pub paths: Vec<PathBuf>,
    pub error: Option<String>,
    /// Every normalized token and its fate, failures included.
    pub references: Vec<MediaReference>,
}

impl MediaResolution {
    fn rejected(error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &MediaReference> {
        self.references.iter().filter(|r| !r.is_resolved())
    }

    /// Paths, or the aggregated error as [`NoteError::MediaResolution`].
    pub fn into_result(self) -> Result<Vec<PathBuf>, NoteError> {
        match self.error {
            Some(message) => Err(NoteError::MediaResolution { message }),
            None => Ok(self.paths),
        }
    }
}

/// Turns loosely structured media input into existing local files.
///
/// Local tokens are looked up as given, then under the base directory, then
/// under the process working directory. Remote tokens are downloaded into
/// the scratch directory as `download_<index>_<random><ext>`.
#[derive(Clone)]
pub struct MediaPathResolver {
    kind: MediaKind,
    base_dir: PathBuf,
    scratch_dir: PathBuf,
    download_timeout: Duration,
    /// Cap on resolved paths; for videos this is a hard limit on tokens.
    max_items: usize,
    fetcher: Arc<dyn HttpFetcher>,
}

impl std::fmt::Debug for MediaPathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPathResolver")
            .field("kind", &self.kind)
            .field("base_dir", &self.base_dir)
            .field("scratch_dir", &self.scratch_dir)
            .field("max_items", &self.max_items)
            .finish_non_exhaustive()
    }
}

impl MediaPathResolver {
    pub fn images(config: &MediaConfig, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self::build(MediaKind::Image, config, config.max_images, fetcher)
    }

    pub fn videos(config: &MediaConfig, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self::build(MediaKind::Video, config, 1, fetcher)
    }

    fn build(
        kind: MediaKind,
        config: &MediaConfig,
        max_items: usize,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Self {
        Self {
            kind,
            base_dir: config.effective_base_dir(),
            scratch_dir: config.scratch_dir.clone(),
            download_timeout: config.download_timeout(),
            max_items,
            fetcher,
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `input`.
    ///
    /// Partial success is allowed: failed tokens are dropped from `paths`
    /// and logged. Tokens after the `max_items`-th resolved one are never
    /// looked up or downloaded. `error` is set only when every token failed, or when the
    /// video variant receives more than one token.
    pub async fn resolve(&self, input: impl Into<MediaInput>) -> MediaResolution {
        let tokens = input.into().normalize();
        if tokens.is_empty() {
            return MediaResolution::default();
        }
        tracing::debug!(kind = self.kind.as_str(), ?tokens, "resolving media");

        if self.kind == MediaKind::Video && tokens.len() > self.max_items {
            tracing::warn!(count = tokens.len(), "more than one video supplied");
            return MediaResolution::rejected(format!(
                "only {} video file can be attached, but {} were given",
                self.max_items,
                tokens.len()
            ));
        }

        let mut references = Vec::with_capacity(tokens.len());
        let mut resolved = 0;
        for (index, token) in tokens.iter().enumerate() {
            if resolved == self.max_items {
                tracing::warn!(
                    skipped = tokens.len() - index,
                    max = self.max_items,
                    "too many media files, keeping the first ones"
                );
                break;
            }
            let reference = match self.resolve_token(index, token).await {
                Ok(path) => {
                    tracing::debug!(token = %token, path = %path.display(), "media resolved");
                    resolved += 1;
                    MediaReference::resolved(token, path)
                }
                Err(reason) => {
                    tracing::warn!(kind = self.kind.as_str(), token = %token, reason = %reason, "media token failed");
                    MediaReference::failed(token, reason)
                }
            };
            references.push(reference);
        }

        let paths: Vec<PathBuf> = references
            .iter()
            .filter_map(|r| r.resolved_path.clone())
            .collect();

        let error = if paths.is_empty() {
            let failed: Vec<&MediaReference> = references.iter().filter(|r| !r.is_resolved()).collect();
            Some(self.aggregate_error(&failed))
        } else {
            None
        };

        tracing::info!(
            kind = self.kind.as_str(),
            resolved = paths.len(),
            total = tokens.len(),
            "media resolution finished"
        );
        MediaResolution {
            paths,
            error,
            references,
        }
    }

    async fn resolve_token(&self, index: usize, token: &str) -> Result<PathBuf, String> {
        let kind = ReferenceKind::of(token);

        if self.kind == MediaKind::Video {
            let ext = match kind {
                ReferenceKind::Remote => url_extension(token),
                ReferenceKind::Local => path_extension(Path::new(token)),
            };
            check_video_extension(ext.as_deref())?;
        }

        match kind {
            ReferenceKind::Remote => self.download(index, token).await,
            ReferenceKind::Local => self.find_local(token),
        }
    }

    fn find_local(&self, token: &str) -> Result<PathBuf, String> {
        let given = Path::new(token);
        let mut candidates = vec![given.to_path_buf()];
        if given.is_relative() {
            candidates.push(self.base_dir.join(given));
            if let Ok(cwd) = std::env::current_dir() {
                candidates.push(cwd.join(given));
            }
        }

        for candidate in &candidates {
            if candidate.is_file() {
                return candidate
                    .canonicalize()
                    .map_err(|e| format!("cannot resolve {}: {e}", candidate.display()));
            }
        }

        let tried: Vec<String> = candidates.iter().map(|c| c.display().to_string()).collect();
        Err(format!("file not found (tried {})", tried.join(", ")))
    }

    async fn download(&self, index: usize, url: &str) -> Result<PathBuf, String> {
        tracing::info!(url = %url, "downloading media");
        let resp = self
            .fetcher
            .get(url, self.download_timeout)
            .await
            .map_err(|e| format!("download failed: {e}"))?;

        if resp.status != 200 {
            return Err(format!("download failed with status {}", resp.status));
        }

        let ext = resp
            .content_type
            .as_deref()
            .and_then(extension_for_content_type)
            .map(str::to_string)
            .or_else(|| url_extension(url))
            .unwrap_or_else(|| self.default_extension().to_string());

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let path = self
            .scratch_dir
            .join(format!("download_{index}_{}{ext}", &suffix[..8]));

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| format!("cannot create {}: {e}", self.scratch_dir.display()))?;
        tokio::fs::write(&path, &resp.body)
            .await
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?;

        tracing::info!(url = %url, path = %path.display(), bytes = resp.body.len(), "media downloaded");
        Ok(path)
    }

    fn default_extension(&self) -> &'static str {
        match self.kind {
            MediaKind::Image => ".jpg",
            MediaKind::Video => ".mp4",
        }
    }

    fn aggregate_error(&self, failed: &[&MediaReference]) -> String {
        let noun = self.kind.as_str();
        let mut msg = format!("could not read any {noun} from the input");

        let preview: Vec<String> = failed
            .iter()
            .take(ERROR_TOKEN_PREVIEW)
            .map(|r| match &r.error {
                Some(reason) => format!("{} ({reason})", r.raw),
                None => r.raw.clone(),
            })
            .collect();
        if !preview.is_empty() {
            msg.push_str(&format!("\nfailed: {}", preview.join(", ")));
        }
        if failed.len() > ERROR_TOKEN_PREVIEW {
            msg.push_str(&format!(" ... {} in total", failed.len()));
        }

        msg.push_str("\n\naccepted formats:");
        let examples: &[&str] = match self.kind {
            MediaKind::Image => &[
                r#"single path: "photo.jpg""#,
                r#"JSON array: ["image1.jpg", "image2.jpg"]"#,
                r#"bracketed list: [image1.jpg, image2.jpg]"#,
                r#"comma-separated: "image1.jpg,image2.jpg""#,
                r#"remote image: "https://example.com/image.jpg""#,
                r#"relative path: "./images/photo.jpg""#,
                r#"absolute path: "/Users/name/Desktop/image.jpg""#,
            ],
            MediaKind::Video => &[
                r#"single path: "video.mp4""#,
                r#"JSON array (one item): ["video.mp4"]"#,
                r#"bracketed list (one item): [video.mp4]"#,
                r#"remote video: "https://example.com/video.mp4""#,
                r#"relative path: "./videos/video.mp4""#,
                r#"absolute path: "/Users/name/Desktop/video.mp4""#,
            ],
        };
        for (i, example) in examples.iter().enumerate() {
            msg.push_str(&format!("\n  {}. {example}", i + 1));
        }

        match self.kind {
            MediaKind::Image => msg.push_str("\nmake sure each path is correct and the file exists"),
            MediaKind::Video => msg.push_str(&format!(
                "\nsupported extensions: {}; only one video per note",
                VIDEO_EXTENSIONS.join(", ")
            )),
        }
        msg
    }
}

/// Lower-case extension with the dot, e.g. `".mp4"`.
fn path_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

/// Extension of a URL's path, query and fragment ignored.
fn url_extension(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    path_extension(Path::new(parsed.path())).filter(|ext| {
        ext.len() <= 6 && ext[1..].chars().all(|c| c.is_ascii_alphanumeric())
    })
}

fn check_video_extension(ext: Option<&str>) -> Result<(), String> {
    match ext {
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => Ok(()),
        Some(ext) => Err(format!(
            "unsupported video format {ext} (supported: {})",
            VIDEO_EXTENSIONS.join(", ")
        )),
        None => Err(format!(
            "missing video file extension (supported: {})",
            VIDEO_EXTENSIONS.join(", ")
        )),
    }
}
