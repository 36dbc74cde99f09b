mod file_config;

pub use file_config::{FileConfig, SyncConfig};

use crate::server::RequestsLoggingLevel;
use crate::sync::SyncSettings;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_UPSTREAM_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_UPSTREAM_ACCOUNTS_URL: &str = "https://accounts.spotify.com/api/token";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub upstream_api_url: Option<String>,
    pub upstream_accounts_url: Option<String>,
    pub upstream_timeout_sec: u64,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_encryption_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub api_url: String,
    pub accounts_url: String,
    pub timeout_sec: u64,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub upstream: UpstreamSettings,
    pub token_encryption_key: String,
    pub sync: SyncSettings,
}

fn required(value: Option<String>, name: &str, flag: &str, env: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!(
            "{} must be specified via {}, the {} environment variable or in config file",
            name,
            flag,
            env
        ),
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let upstream = UpstreamSettings {
            api_url: file
                .upstream_api_url
                .or_else(|| cli.upstream_api_url.clone())
                .unwrap_or_else(|| DEFAULT_UPSTREAM_API_URL.to_string()),
            accounts_url: file
                .upstream_accounts_url
                .or_else(|| cli.upstream_accounts_url.clone())
                .unwrap_or_else(|| DEFAULT_UPSTREAM_ACCOUNTS_URL.to_string()),
            timeout_sec: file.upstream_timeout_sec.unwrap_or(cli.upstream_timeout_sec),
            client_id: required(
                file.client_id.or_else(|| cli.client_id.clone()),
                "client_id",
                "--client-id",
                "CATALOG_CLIENT_ID",
            )?,
            client_secret: required(
                file.client_secret.or_else(|| cli.client_secret.clone()),
                "client_secret",
                "--client-secret",
                "CATALOG_CLIENT_SECRET",
            )?,
        };

        let token_encryption_key = required(
            file.token_encryption_key
                .or_else(|| cli.token_encryption_key.clone()),
            "token_encryption_key",
            "--token-encryption-key",
            "CATALOG_TOKEN_KEY",
        )?;

        let defaults = SyncSettings::default();
        let sync_file = file.sync.unwrap_or_default();
        let sync = SyncSettings {
            album_page_size: sync_file.album_page_size.unwrap_or(defaults.album_page_size),
            album_group: sync_file.album_group.unwrap_or(defaults.album_group),
            cascade_concurrency: sync_file
                .cascade_concurrency
                .unwrap_or(defaults.cascade_concurrency),
            search_limit: sync_file.search_limit.unwrap_or(defaults.search_limit),
        };
        if sync.album_page_size == 0 {
            bail!("sync.album_page_size must be greater than 0");
        }
        if sync.cascade_concurrency == 0 {
            bail!("sync.cascade_concurrency must be greater than 0");
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            upstream,
            token_encryption_key,
            sync,
        })
    }

    pub fn entities_db_path(&self) -> PathBuf {
        self.db_dir.join("entities.db")
    }

    pub fn credentials_db_path(&self) -> PathBuf {
        self.db_dir.join("credentials.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
