//! The validated note aggregate.
//!
//! [`NoteSpec`] can only be obtained through validation, so holding one
//! means every field invariant and the images-xor-videos rule hold. Field
//! rules run first, in declaration order; the cross-field media rule runs
//! last.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use notepost_types::NoteError;

use crate::media::{MediaInput, MediaPathResolver, VIDEO_EXTENSIONS};
use crate::topics::{normalize_tag, parse_tags};

pub const MAX_TITLE_CHARS: usize = 50;
pub const MAX_BODY_CHARS: usize = 1000;
pub const MAX_IMAGES: usize = 9;
pub const MAX_VIDEOS: usize = 1;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_CHARS: usize = 20;

/// Unvalidated note input, as read from a draft file or assembled by a
/// caller. Media fields accept every shape [`MediaInput`] does; `tags`
/// accepts a list or a comma-separated string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
    #[serde(default)]
    pub images: MediaInput,
    #[serde(default)]
    pub videos: MediaInput,
    #[serde(default, alias = "topics", deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

fn deserialize_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::String(s) => parse_tags(&s),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => normalize_tag(&s),
                other => normalize_tag(&other.to_string()),
            })
            .collect(),
        other => parse_tags(&other.to_string()),
    })
}

/// A note that passed validation. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSpec {
    title: String,
    body: String,
    images: Vec<PathBuf>,
    videos: Vec<PathBuf>,
    tags: Vec<String>,
    location: Option<String>,
}

/// Collects fields for [`NoteSpec::builder`].
#[derive(Debug, Clone, Default)]
pub struct NoteSpecBuilder {
    title: String,
    body: String,
    images: Vec<PathBuf>,
    videos: Vec<PathBuf>,
    tags: Vec<String>,
    location: Option<String>,
}

impl NoteSpecBuilder {
    pub fn images<I, P>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.images = images.into_iter().map(Into::into).collect();
        self
    }

    pub fn videos<I, P>(mut self, videos: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.videos = videos.into_iter().map(Into::into).collect();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<NoteSpec, NoteError> {
        let title = validate_title(&self.title)?;
        validate_body(&self.body)?;
        validate_images(&self.images)?;
        validate_videos(&self.videos)?;
        validate_tags(&self.tags)?;
        validate_media_choice(&self.images, &self.videos)?;

        let location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        Ok(NoteSpec {
            title,
            body: self.body,
            images: self.images,
            videos: self.videos,
            tags: self.tags.iter().map(|t| t.trim().to_string()).collect(),
            location,
        })
    }
}

impl NoteSpec {
    pub fn builder(title: impl Into<String>, body: impl Into<String>) -> NoteSpecBuilder {
        NoteSpecBuilder {
            title: title.into(),
            body: body.into(),
            ..NoteSpecBuilder::default()
        }
    }

    /// Resolve a draft's media inputs and validate the result.
    ///
    /// Title and body are checked before any media is touched, so an
    /// obviously bad draft never triggers a download.
    pub async fn resolve(
        draft: NoteDraft,
        images: &MediaPathResolver,
        videos: &MediaPathResolver,
    ) -> Result<NoteSpec, NoteError> {
        validate_title(&draft.title)?;
        validate_body(&draft.body)?;

        let image_paths = resolve_input(images, draft.images).await?;
        let video_paths = resolve_input(videos, draft.videos).await?;

        let mut builder = NoteSpec::builder(draft.title, draft.body)
            .images(image_paths)
            .videos(video_paths)
            .tags(draft.tags);
        if let Some(location) = draft.location {
            builder = builder.location(location);
        }
        builder.build()
    }

    /// Trimmed title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Body exactly as supplied, newlines included.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn videos(&self) -> &[PathBuf] {
        &self.videos
    }

    /// Whichever media list is non-empty.
    pub fn media(&self) -> &[PathBuf] {
        if self.images.is_empty() {
            &self.videos
        } else {
            &self.images
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

async fn resolve_input(
    resolver: &MediaPathResolver,
    input: MediaInput,
) -> Result<Vec<PathBuf>, NoteError> {
    if input == MediaInput::Absent {
        return Ok(Vec::new());
    }
    resolver.resolve(input).await.into_result()
}

fn validate_title(raw: &str) -> Result<String, NoteError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(NoteError::validation("title", raw, "must not be empty"));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_CHARS {
        return Err(NoteError::validation(
            "title",
            raw,
            format!("must be at most {MAX_TITLE_CHARS} characters, got {len}"),
        ));
    }
    Ok(title.to_string())
}

/// Length is measured on the raw body; newlines count.
fn validate_body(raw: &str) -> Result<(), NoteError> {
    if raw.trim().is_empty() {
        return Err(NoteError::validation("body", raw, "must not be empty"));
    }
    let len = raw.chars().count();
    if len > MAX_BODY_CHARS {
        return Err(NoteError::validation(
            "body",
            format!("{}...", raw.chars().take(20).collect::<String>()),
            format!("must be at most {MAX_BODY_CHARS} characters, got {len}"),
        ));
    }
    Ok(())
}

fn validate_images(images: &[PathBuf]) -> Result<(), NoteError> {
    if images.len() > MAX_IMAGES {
        return Err(NoteError::validation(
            "images",
            images.len().to_string(),
            format!("at most {MAX_IMAGES} images are allowed"),
        ));
    }
    for path in images {
        check_local_file("images", path)?;
    }
    Ok(())
}

fn validate_videos(videos: &[PathBuf]) -> Result<(), NoteError> {
    if videos.len() > MAX_VIDEOS {
        return Err(NoteError::validation(
            "videos",
            videos.len().to_string(),
            "only one video can be attached",
        ));
    }
    for path in videos {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        if !VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            return Err(NoteError::validation(
                "videos",
                path.display().to_string(),
                format!("unsupported video format (supported: {})", VIDEO_EXTENSIONS.join(", ")),
            ));
        }
        check_local_file("videos", path)?;
    }
    Ok(())
}

fn check_local_file(field: &'static str, path: &Path) -> Result<(), NoteError> {
    let shown = path.display().to_string();
    if shown.starts_with("http://") || shown.starts_with("https://") {
        return Err(NoteError::validation(
            field,
            shown,
            "remote media must be resolved to a local file first",
        ));
    }
    if !path.is_absolute() {
        return Err(NoteError::validation(field, shown, "path must be absolute"));
    }
    if !path.is_file() {
        return Err(NoteError::validation(field, shown, "file does not exist"));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), NoteError> {
    if tags.len() > MAX_TAGS {
        return Err(NoteError::validation(
            "tags",
            tags.len().to_string(),
            format!("at most {MAX_TAGS} tags are allowed"),
        ));
    }
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(NoteError::validation("tags", tag, "tag must not be empty"));
        }
        if trimmed.chars().count() > MAX_TAG_CHARS {
            return Err(NoteError::validation(
                "tags",
                tag,
                format!("each tag must be at most {MAX_TAG_CHARS} characters"),
            ));
        }
    }
    Ok(())
}

fn validate_media_choice(images: &[PathBuf], videos: &[PathBuf]) -> Result<(), NoteError> {
    match (images.is_empty(), videos.is_empty()) {
        (false, false) => Err(NoteError::validation(
            "media",
            format!("{} image(s), {} video(s)", images.len(), videos.len()),
            "images and videos cannot both be attached; choose one",
        )),
        (true, true) => Err(NoteError::validation(
            "media",
            "none",
            "at least one image or one video is required",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.jpg");
        std::fs::write(&path, b"jpeg").unwrap();
        (dir, path)
    }

    fn field_of(err: NoteError) -> &'static str {
        match err {
            NoteError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_note_builds() {
        let (_dir, img) = image();
        let note = NoteSpec::builder("  Caption 😊 ", "Line one\nLine two ❤️")
            .images([&img])
            .tags(["food", "travel"])
            .location("  Tokyo ")
            .build()
            .unwrap();
        assert_eq!(note.title(), "Caption 😊");
        assert_eq!(note.body(), "Line one\nLine two ❤️");
        assert_eq!(note.media(), &[img]);
        assert_eq!(note.tags(), &["food", "travel"]);
        assert_eq!(note.location(), Some("Tokyo"));
    }

    #[test]
    fn title_bounds() {
        let (_dir, img) = image();
        let err = NoteSpec::builder("   ", "body").images([&img]).build().unwrap_err();
        assert_eq!(field_of(err), "title");

        let long = "字".repeat(51);
        let err = NoteSpec::builder(long, "body").images([&img]).build().unwrap_err();
        assert_eq!(field_of(err), "title");

        let exact = "字".repeat(50);
        assert!(NoteSpec::builder(exact, "body").images([&img]).build().is_ok());
    }

    #[test]
    fn body_length_is_raw() {
        let (_dir, img) = image();
        let err = NoteSpec::builder("t", " \n ").images([&img]).build().unwrap_err();
        assert_eq!(field_of(err), "body");

        // 999 letters plus two newlines is over the limit only when counted raw
        let body = format!("\n{}\n", "a".repeat(999));
        let err = NoteSpec::builder("t", body).images([&img]).build().unwrap_err();
        assert_eq!(field_of(err), "body");

        let note = NoteSpec::builder("t", "\nkeep\n").images([&img]).build().unwrap();
        assert_eq!(note.body(), "\nkeep\n");
    }

    #[test]
    fn image_rules() {
        let (_dir, img) = image();
        let err = NoteSpec::builder("t", "b").images(vec![&img; 10]).build().unwrap_err();
        assert_eq!(field_of(err), "images");

        let err = NoteSpec::builder("t", "b").images(["x.jpg"]).build().unwrap_err();
        assert!(err.to_string().contains("absolute"));

        let err = NoteSpec::builder("t", "b")
            .images(["/definitely/not/here.jpg"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let err = NoteSpec::builder("t", "b")
            .images(["https://cdn.example.com/a.jpg"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("resolved"));
    }

    #[test]
    fn video_rules() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        let text = dir.path().join("clip.txt");
        std::fs::write(&clip, b"mp4").unwrap();
        std::fs::write(&text, b"txt").unwrap();

        assert!(NoteSpec::builder("t", "b").videos([&clip]).build().is_ok());

        let err = NoteSpec::builder("t", "b").videos([&clip, &clip]).build().unwrap_err();
        assert_eq!(field_of(err), "videos");

        let err = NoteSpec::builder("t", "b").videos([&text]).build().unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn tag_rules() {
        let (_dir, img) = image();
        let err = NoteSpec::builder("t", "b")
            .images([&img])
            .tags((0..11).map(|i| format!("t{i}")))
            .build()
            .unwrap_err();
        assert_eq!(field_of(err), "tags");

        let err = NoteSpec::builder("t", "b")
            .images([&img])
            .tags(["x".repeat(21)])
            .build()
            .unwrap_err();
        assert_eq!(field_of(err), "tags");

        assert!(NoteSpec::builder("t", "b")
            .images([&img])
            .tags(["中".repeat(20)])
            .build()
            .is_ok());
    }

    #[test]
    fn both_media_kinds_is_a_cross_field_error() {
        let (dir, img) = image();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"mp4").unwrap();

        let err = NoteSpec::builder("t", "b")
            .images([&img])
            .videos([&clip])
            .build()
            .unwrap_err();
        assert_eq!(field_of(err), "media");
    }

    #[test]
    fn no_media_is_a_cross_field_error() {
        let err = NoteSpec::builder("t", "b").build().unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn field_errors_win_over_cross_field_errors() {
        let (_dir, img) = image();
        // both kinds supplied, but the video path is also invalid
        let err = NoteSpec::builder("t", "b")
            .images([&img])
            .videos(["/missing/clip.mp4"])
            .build()
            .unwrap_err();
        assert_eq!(field_of(err), "videos");
    }

    #[test]
    fn draft_accepts_loose_shapes() {
        let draft: NoteDraft = serde_json::from_str(
            r##"{
                "title": "Caption",
                "content": "Body",
                "images": "a.jpg,b.jpg",
                "topics": "#food #travel"
            }"##,
        )
        .unwrap();
        assert_eq!(draft.body, "Body");
        assert_eq!(draft.images.normalize(), vec!["a.jpg", "b.jpg"]);
        assert_eq!(draft.videos, MediaInput::Absent);
        assert_eq!(draft.tags, vec!["food", "travel"]);

        let draft: NoteDraft =
            serde_json::from_str(r#"{"title": "t", "body": "b", "tags": [" #a ", "", null]}"#)
                .unwrap();
        assert_eq!(draft.tags, vec!["a"]);
    }
}
