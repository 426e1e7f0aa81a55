//! `notepost resolve` and `notepost check`.

use std::path::Path;

use anyhow::Result;

use notepost_core::{MediaInput, NoteSpec};
use notepost_types::PublishOutcome;

use super::compose::print_outcome;
use super::draft::load_draft;
use super::{load_config, resolvers};

/// Resolve one media input and print each path on its own line.
pub async fn resolve(config_path: &Path, video: bool, input: &str) -> Result<bool> {
    let config = load_config(config_path)?;
    let (images, videos) = resolvers(&config);
    let resolver = if video { videos } else { images };

    let resolution = resolver.resolve(MediaInput::from(input)).await;
    for failure in resolution.failures() {
        eprintln!(
            "skipped {}: {}",
            failure.raw,
            failure.error.as_deref().unwrap_or("unresolved")
        );
    }
    if let Some(error) = &resolution.error {
        eprintln!("{error}");
        return Ok(false);
    }
    for path in &resolution.paths {
        println!("{}", path.display());
    }
    Ok(true)
}

/// Resolve and validate a draft, then print a summary of what would be
/// composed.
pub async fn check(config_path: &Path, draft_path: &Path) -> Result<bool> {
    let config = load_config(config_path)?;
    let draft = load_draft(draft_path)?;
    let title = draft.title.trim().to_string();

    let (images, videos) = resolvers(&config);
    let note = match NoteSpec::resolve(draft, &images, &videos).await {
        Ok(note) => note,
        Err(e) => return print_outcome(&PublishOutcome::failed(Some(&title), &e)),
    };

    println!("Title:   {}", note.title());
    println!("Body:    {} char(s)", note.body().chars().count());
    let label = if note.videos().is_empty() { "Images:" } else { "Video:" };
    println!("{label:<8} {}", note.media().len());
    for path in note.media() {
        println!("  - {}", path.display());
    }
    if note.tags().is_empty() {
        println!("Tags:    (none)");
    } else {
        println!("Tags:    {}", note.tags().join(", "));
    }
    if let Some(location) = note.location() {
        println!("Place:   {location}");
    }
    Ok(true)
}
