//! Optional config file loading. Search order: ./mangafeed.toml, then
//! $XDG_CONFIG_HOME/mangafeed/config.toml (or ~/.config/mangafeed/config.toml).

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct Config {
    /// API root (default https://api.mangadex.org).
    pub base_url: Option<String>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Translated language to aggregate chapters for (default "en").
    pub language: Option<String>,
    /// Per-request timeout in seconds (default 8).
    pub timeout_secs: Option<u64>,
    /// Attempts per request including the first (default 3).
    pub retry_count: Option<u32>,
    /// Delay before the first retry; doubles each retry (default 1).
    pub retry_base_delay_secs: Option<u64>,
    /// Ceiling on feed records considered per manga (default 5000).
    pub max_chapters: Option<usize>,
    /// Favorites file (default: platform data dir, mangafeed/favorites.json).
    pub favorites_path: Option<PathBuf>,
    /// Default output format: json, text, or markdown.
    pub format: Option<String>,
}

/// Candidate config paths in search order.
pub fn search_paths() -> anyhow::Result<Vec<PathBuf>> {
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    let mut paths = vec![cwd.join("mangafeed.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("mangafeed").join("config.toml"));
    }
    Ok(paths)
}

/// Parse one config file.
pub fn load_from(path: &Path) -> anyhow::Result<Config> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {}", path.display()))?;
    let config: Config =
        toml::from_str(&s).with_context(|| format!("Invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// First existing file in [`search_paths`]. Missing files give Ok(None); a present file
/// that cannot be read or parsed is an error.
pub fn load_config() -> anyhow::Result<Option<Config>> {
    for path in search_paths()? {
        if path.exists() {
            return load_from(&path).map(Some);
        }
    }
    Ok(None)
}
