use serde::Deserialize;

use crate::models::Granularity;
use crate::usage_repo::DEFAULT_HISTOGRAM_QUERY;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub widget: WidgetConfig,
    #[serde(default)]
    pub provider: ProviderSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    pub widget_id: String,
    /// Refresh period after mount, before the user picks a granularity.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Refresh period once a granularity has been selected.
    #[serde(default = "default_selected_refresh_interval_ms")]
    pub selected_refresh_interval_ms: u64,
    #[serde(default = "default_granularity")]
    pub default_granularity: Granularity,
    /// How often to prune request events past database.retention_days.
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

fn default_refresh_interval_ms() -> u64 {
    60_000
}

fn default_selected_refresh_interval_ms() -> u64 {
    10_000
}

fn default_granularity() -> Granularity {
    Granularity::Seconds
}

fn default_prune_interval_secs() -> u64 {
    3600
}

/// Histogram query template. Validated when the widget builds its provider
/// config; a bad template shows as a widget configuration error, not a startup failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    #[serde(default = "default_query_name")]
    pub query_name: String,
    #[serde(default = "default_query")]
    pub query: String,
}

fn default_query_name() -> String {
    "query".into()
}

fn default_query() -> String {
    DEFAULT_HISTOGRAM_QUERY.into()
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            query_name: default_query_name(),
            query: default_query(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            !self.widget.widget_id.trim().is_empty(),
            "widget.widget_id must be non-empty"
        );
        anyhow::ensure!(
            self.widget.refresh_interval_ms > 0,
            "widget.refresh_interval_ms must be > 0, got {}",
            self.widget.refresh_interval_ms
        );
        anyhow::ensure!(
            self.widget.selected_refresh_interval_ms > 0,
            "widget.selected_refresh_interval_ms must be > 0, got {}",
            self.widget.selected_refresh_interval_ms
        );
        anyhow::ensure!(
            self.widget.prune_interval_secs > 0,
            "widget.prune_interval_secs must be > 0, got {}",
            self.widget.prune_interval_secs
        );
        Ok(())
    }
}
