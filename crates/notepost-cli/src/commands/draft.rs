//! Draft file loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use notepost_core::NoteDraft;

/// Read a draft; `.toml` files are parsed as TOML, everything else as JSON.
pub fn load_draft(path: &Path) -> Result<NoteDraft> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read draft {}", path.display()))?;
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    parse_draft(&content, is_toml).with_context(|| format!("invalid draft {}", path.display()))
}

fn parse_draft(content: &str, is_toml: bool) -> Result<NoteDraft> {
    if is_toml {
        Ok(toml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use notepost_core::MediaInput;

    #[test]
    fn json_draft_accepts_aliases_and_tag_string() {
        let draft = parse_draft(
            r##"{
                "title": "Caption",
                "content": "Body",
                "images": "a.jpg,b.jpg",
                "topics": "#food, travel"
            }"##,
            false,
        )
        .expect("should parse json draft");
        assert_eq!(draft.body, "Body");
        assert_eq!(draft.tags, vec!["food", "travel"]);
        assert_eq!(draft.images.normalize(), vec!["a.jpg", "b.jpg"]);
        assert_eq!(draft.videos, MediaInput::Absent);
    }

    #[test]
    fn toml_draft_accepts_lists() {
        let draft = parse_draft(
            r#"
            title = "Caption"
            body = "Line one"
            videos = ["clip.mp4"]
            tags = ["a", "b"]
            "#,
            true,
        )
        .expect("should parse toml draft");
        assert_eq!(draft.videos.normalize(), vec!["clip.mp4"]);
        assert_eq!(draft.tags, vec!["a", "b"]);
        assert!(draft.location.is_none());
    }

    #[test]
    fn missing_title_is_rejected() {
        assert!(parse_draft(r#"{ "body": "x" }"#, false).is_err());
    }

    #[test]
    fn load_draft_picks_format_by_extension() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("note.toml");
        fs::write(&path, "title = \"T\"\nbody = \"B\"\n").expect("should write draft");
        let draft = load_draft(&path).expect("should load toml draft");
        assert_eq!(draft.title, "T");

        let missing = load_draft(&dir.path().join("absent.json"));
        assert!(missing.is_err());
    }
}
