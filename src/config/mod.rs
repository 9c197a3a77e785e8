use crate::models::Adjustment;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Quote API endpoints and HTTP politeness
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_list_url")]
    pub list_url: String,

    #[serde(default = "default_kline_url")]
    pub kline_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Fixed pause before every request.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Detection and orchestration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// ChiNext codes all start with "300".
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,

    #[serde(default)]
    pub adjustment: Adjustment,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_symbol_timeout_secs")]
    pub symbol_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Directory of CSV tables
    #[default]
    Csv,
    /// Single JSON document
    Json,
}

/// Report output settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Directory for `csv`, file for `json` (".json" appended if missing).
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default)]
    pub format: ReportFormat,

    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_list_url() -> String {
    "https://82.push2.eastmoney.com/api/qt/clist/get".to_string()
}
fn default_kline_url() -> String {
    "https://push2his.eastmoney.com/api/qt/stock/kline/get".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    100
}
fn default_page_size() -> u32 {
    100
}
fn default_user_agent() -> String {
    "gem-limitup/0.1 (research project; daily limit-up scan)".to_string()
}
fn default_lookback_days() -> u32 {
    30
}
fn default_threshold() -> f64 {
    crate::detector::DEFAULT_THRESHOLD
}
fn default_code_prefix() -> String {
    "300".to_string()
}
fn default_concurrency() -> usize {
    3
}
fn default_symbol_timeout_secs() -> u64 {
    60
}
fn default_output_path() -> PathBuf {
    PathBuf::from("gem_limit_up_stocks")
}
fn default_preview_rows() -> usize {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            list_url: default_list_url(),
            kline_url: default_kline_url(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            threshold: default_threshold(),
            code_prefix: default_code_prefix(),
            adjustment: Adjustment::default(),
            concurrency: default_concurrency(),
            symbol_timeout_secs: default_symbol_timeout_secs(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            format: ReportFormat::default(),
            preview_rows: default_preview_rows(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("GEM").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scan.lookback_days, 30);
        assert_eq!(cfg.scan.threshold, 19.0);
        assert_eq!(cfg.scan.code_prefix, "300");
        assert_eq!(cfg.scan.adjustment, Adjustment::Forward);
        assert_eq!(cfg.provider.request_delay_ms, 100);
        assert_eq!(cfg.report.format, ReportFormat::Csv);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[scan]\nlookback_days = 10\nadjustment = \"none\"\n\n[report]\nformat = \"json\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.scan.lookback_days, 10);
        assert_eq!(cfg.scan.adjustment, Adjustment::None);
        assert_eq!(cfg.scan.threshold, 19.0);
        assert_eq!(cfg.report.format, ReportFormat::Json);
        assert_eq!(cfg.provider.page_size, 100);
    }
}
