//! Configuration loading for the search backend.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/growgram/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::GrowError;

const APP_NAME: &str = "growgram";

/// Taxonomy dictionary configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomySettings {
    /// Optional TOML dictionary replacing the built-in alias tables.
    #[serde(default)]
    pub dictionary_path: Option<String>,
}

/// Query-side limits and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,

    /// Hard ceiling on page size
    #[serde(default = "default_search_max_limit")]
    pub max_limit: usize,

    /// Only posts with this visibility are searchable
    #[serde(default = "default_visibility")]
    pub visibility: String,

    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,

    /// Posts scanned when collecting keyword suggestions
    #[serde(default = "default_suggestion_scan")]
    pub suggestion_scan: usize,

    /// Newest public posts considered for trending tags
    #[serde(default = "default_trending_window")]
    pub trending_window: usize,

    #[serde(default = "default_trending_limit")]
    pub trending_limit: usize,

    #[serde(default = "default_trending_max_limit")]
    pub trending_max_limit: usize,
}

fn default_search_limit() -> usize {
    20
}

fn default_search_max_limit() -> usize {
    50
}

fn default_visibility() -> String {
    "public".to_string()
}

fn default_suggestion_limit() -> usize {
    8
}

fn default_suggestion_scan() -> usize {
    50
}

fn default_trending_window() -> usize {
    500
}

fn default_trending_limit() -> usize {
    16
}

fn default_trending_max_limit() -> usize {
    50
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            max_limit: default_search_max_limit(),
            visibility: default_visibility(),
            suggestion_limit: default_suggestion_limit(),
            suggestion_scan: default_suggestion_scan(),
            trending_window: default_trending_window(),
            trending_limit: default_trending_limit(),
            trending_max_limit: default_trending_max_limit(),
        }
    }
}

/// Settings for one paged batch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Whether the scheduler registers this job
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cron expression (6 fields, with seconds)
    pub cron: String,

    /// Records fetched per page
    pub page_size: usize,

    /// Safety bound on pages per run
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Lease lifetime in seconds
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,

    /// Pending write count that forces a batch commit
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,

    /// Owner prefix written into the lease document
    pub owner_prefix: String,

    /// Max random delay before each scheduled run, in seconds
    #[serde(default)]
    pub jitter_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_pages() -> usize {
    9999
}

fn default_lock_ttl_secs() -> u64 {
    600
}

fn default_batch_threshold() -> usize {
    450
}

impl JobSettings {
    /// Nightly reindex of the derived search block.
    pub fn reindex() -> Self {
        Self {
            enabled: true,
            cron: "0 0 3 * * *".to_string(),
            page_size: 250,
            max_pages: default_max_pages(),
            lock_ttl_secs: default_lock_ttl_secs(),
            batch_threshold: default_batch_threshold(),
            owner_prefix: "reindex".to_string(),
            jitter_secs: 60,
        }
    }

    /// Nightly thumbnail backfill.
    pub fn thumbnails() -> Self {
        Self {
            enabled: true,
            cron: "0 30 3 * * *".to_string(),
            page_size: 200,
            max_pages: default_max_pages(),
            lock_ttl_secs: default_lock_ttl_secs(),
            batch_threshold: default_batch_threshold(),
            owner_prefix: "thumbs".to_string(),
            jitter_secs: 60,
        }
    }
}

/// The two scheduled jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsSettings {
    #[serde(default = "JobSettings::reindex")]
    pub reindex: JobSettings,

    #[serde(default = "JobSettings::thumbnails")]
    pub thumbnails: JobSettings,
}

impl Default for JobsSettings {
    fn default() -> Self {
        Self {
            reindex: JobSettings::reindex(),
            thumbnails: JobSettings::thumbnails(),
        }
    }
}

/// Thumbnail URL transform parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailSettings {
    #[serde(default = "default_thumb_width")]
    pub width: u32,

    #[serde(default = "default_thumb_fit")]
    pub fit: String,
}

fn default_thumb_width() -> u32 {
    512
}

fn default_thumb_fit() -> String {
    "cover".to_string()
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            width: default_thumb_width(),
            fit: default_thumb_fit(),
        }
    }
}

/// Scheduler runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// IANA timezone used to evaluate cron expressions
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: default_timezone(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub taxonomy: TaxonomySettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub jobs: JobsSettings,

    #[serde(default)]
    pub thumbnails: ThumbnailSettings,

    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            taxonomy: TaxonomySettings::default(),
            search: SearchSettings::default(),
            jobs: JobsSettings::default(),
            thumbnails: ThumbnailSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/growgram/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (GROW_*, nested keys split on `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, GrowError> {
        let config_dir = ProjectDirs::from("", "", APP_NAME)
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| GrowError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| GrowError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // GROW_DB_PATH, GROW_SEARCH__MAX_LIMIT, GROW_JOBS__REINDEX__PAGE_SIZE, ...
        builder = builder.add_source(
            Environment::with_prefix("GROW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| GrowError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| GrowError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings no job or query could run with.
    pub fn validate(&self) -> Result<(), GrowError> {
        if self.search.max_limit == 0 {
            return Err(GrowError::Config("search.max_limit must be > 0".into()));
        }
        for (name, job) in [("reindex", &self.jobs.reindex), ("thumbnails", &self.jobs.thumbnails)] {
            if job.page_size == 0 {
                return Err(GrowError::Config(format!("jobs.{name}.page_size must be > 0")));
            }
            if job.batch_threshold == 0 || job.batch_threshold > 500 {
                return Err(GrowError::Config(format!(
                    "jobs.{name}.batch_threshold must be 1..=500, got {}",
                    job.batch_threshold
                )));
            }
            if job.owner_prefix.is_empty() {
                return Err(GrowError::Config(format!("jobs.{name}.owner_prefix is empty")));
            }
        }
        Ok(())
    }

    /// Expand ~ in db_path to the home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        if let Some(rest) = self.db_path.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new() {
                return home.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.db_path)
    }
}
