//! `notepost compose`: fill the open publish form from a draft.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use notepost_browser::{discover_page_ws_url, CdpPage};
use notepost_core::{NoteComposer, NoteSpec};
use notepost_types::PublishOutcome;

use super::draft::load_draft;
use super::{load_config, resolvers};

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(200);
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run(
    config_path: &Path,
    draft_path: &Path,
    endpoint: &str,
    page_hint: Option<&str>,
    navigate: Option<&str>,
) -> Result<bool> {
    let config = load_config(config_path)?;
    let draft = load_draft(draft_path)?;
    let title = draft.title.trim().to_string();

    let (images, videos) = resolvers(&config);
    let note = match NoteSpec::resolve(draft, &images, &videos).await {
        Ok(note) => note,
        Err(e) => {
            tracing::warn!(error = %e, "draft rejected before reaching the browser");
            return print_outcome(&PublishOutcome::failed(Some(&title), &e));
        }
    };

    let ws_url = discover_page_ws_url(endpoint, page_hint, DISCOVERY_TIMEOUT)
        .await
        .with_context(|| format!("no drivable page at {endpoint}"))?;
    let page = CdpPage::connect(&ws_url)
        .await
        .context("failed to attach to page target")?;

    if let Some(url) = navigate {
        page.navigate(url).await?;
        page.wait_for_load(LOAD_POLL_INTERVAL, LOAD_TIMEOUT).await?;
    }

    let outcome = NoteComposer::new(&config).compose_outcome(&page, &note).await;
    print_outcome(&outcome)
}

/// Print the outcome as JSON on stdout; its success flag is the exit status.
pub fn print_outcome(outcome: &PublishOutcome) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(outcome.success)
}
