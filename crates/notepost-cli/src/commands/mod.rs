//! CLI command implementations for the `notepost` binary.
//!
//! Each command returns `Ok(true)` on success and `Ok(false)` when it ran
//! but the result is a reported failure; `Err` is reserved for plumbing
//! problems (unreadable files, bad config).

pub mod compose;
pub mod config;
pub mod draft;
pub mod media;
pub mod sweep;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use notepost_core::{MediaPathResolver, ReqwestFetcher};
use notepost_types::NoteConfig;

/// Load `path`, or defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<NoteConfig> {
    NoteConfig::load_or_default(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

/// Image and video resolvers sharing one HTTP client.
pub fn resolvers(config: &NoteConfig) -> (MediaPathResolver, MediaPathResolver) {
    let fetcher = Arc::new(ReqwestFetcher::new());
    (
        MediaPathResolver::images(&config.media, fetcher.clone()),
        MediaPathResolver::videos(&config.media, fetcher),
    )
}
