//! `notepost config`: print the effective configuration.

use std::path::Path;

use anyhow::Result;

use notepost_types::NoteConfig;

use super::load_config;

pub fn show(config_path: &Path, default: bool) -> Result<bool> {
    let config = if default {
        NoteConfig::default()
    } else {
        load_config(config_path)?
    };
    print!("{}", config.to_toml()?);
    Ok(true)
}
