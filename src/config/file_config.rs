use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,

    // Upstream catalog
    pub upstream_api_url: Option<String>,
    pub upstream_accounts_url: Option<String>,
    pub upstream_timeout_sec: Option<u64>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_encryption_key: Option<String>,

    pub sync: Option<SyncConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub album_page_size: Option<u32>,
    /// `include_groups` value for artist album listings, e.g. "album" or "album,single".
    pub album_group: Option<String>,
    pub cascade_concurrency: Option<usize>,
    pub search_limit: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
