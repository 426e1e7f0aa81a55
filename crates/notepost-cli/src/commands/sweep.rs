//! `notepost sweep`: reclaim old downloads from the scratch directory.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use notepost_core::media::sweep_scratch;
use notepost_types::MediaConfig;

use super::load_config;

pub fn run(config_path: &Path, max_age_hours: Option<u64>) -> Result<bool> {
    let config = load_config(config_path)?;
    let max_age = effective_max_age(&config.media, max_age_hours);
    let dir = &config.media.scratch_dir;

    let removed = sweep_scratch(dir, max_age)
        .with_context(|| format!("failed to sweep {}", dir.display()))?;
    println!("removed {removed} file(s) from {}", dir.display());
    Ok(true)
}

/// `--max-age-hours` wins over the configured age.
fn effective_max_age(media: &MediaConfig, max_age_hours: Option<u64>) -> Duration {
    max_age_hours
        .map(|hours| Duration::from_secs(hours.saturating_mul(3600)))
        .unwrap_or_else(|| media.janitor_max_age())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_configured_age() {
        let media = MediaConfig::default();
        assert_eq!(effective_max_age(&media, Some(2)), Duration::from_secs(7200));
        assert_eq!(effective_max_age(&media, None), media.janitor_max_age());
    }

    #[test]
    fn huge_flag_saturates() {
        let media = MediaConfig::default();
        assert_eq!(
            effective_max_age(&media, Some(u64::MAX)),
            Duration::from_secs(u64::MAX)
        );
    }
}
