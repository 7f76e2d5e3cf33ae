//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.progress-reporter.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".progress-reporter.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Report engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Report rendering settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

/// Longest accepted lookback window (ten years).
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

/// Longest accepted cache lifetime (one week).
pub const MAX_CACHE_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Upper bound on records fetched per student.
pub const MAX_RECORDS_LIMIT: usize = 10_000;

/// Upper bound on weekly reports kept per student.
pub const MAX_WEEKS_LIMIT: usize = 520;

fn default_output() -> String {
    "progress_report.md".to_string()
}

/// Aggregation engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many days of activity history a report covers.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Maximum activity records fetched per student.
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Maximum weekly reports kept per student.
    #[serde(default = "default_max_weeks")]
    pub max_weeks: usize,

    /// Weeks averaged into the overall completion rate.
    #[serde(default = "default_overall_weeks")]
    pub overall_weeks: usize,

    /// Weeks considered when classifying the trend.
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    /// How long a generated report is served from cache.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            max_records: default_max_records(),
            max_weeks: default_max_weeks(),
            overall_weeks: default_overall_weeks(),
            trend_window: default_trend_window(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_lookback_days() -> i64 {
    56
}

fn default_max_records() -> usize {
    200
}

fn default_max_weeks() -> usize {
    8
}

fn default_overall_weeks() -> usize {
    4
}

fn default_trend_window() -> usize {
    3
}

fn default_cache_ttl() -> u64 {
    300 // 5 min
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include strengths, challenges and recommendations.
    #[serde(default = "default_true")]
    pub include_insights: bool,

    /// Include per-weekday and per-activity-type tables.
    #[serde(default = "default_true")]
    pub include_breakdowns: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_insights: true,
            include_breakdowns: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(days) = args.lookback_days {
            self.engine.lookback_days = days;
        }
        if let Some(max) = args.max_records {
            self.engine.max_records = max;
        }
    }

    /// Check that engine limits are within supported ranges.
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;

        if !(1..=MAX_LOOKBACK_DAYS).contains(&engine.lookback_days) {
            bail!(
                "engine.lookback_days must be between 1 and {}, got {}",
                MAX_LOOKBACK_DAYS,
                engine.lookback_days
            );
        }
        if engine.cache_ttl_seconds > MAX_CACHE_TTL_SECONDS {
            bail!(
                "engine.cache_ttl_seconds must be at most {}, got {}",
                MAX_CACHE_TTL_SECONDS,
                engine.cache_ttl_seconds
            );
        }
        if !(1..=MAX_RECORDS_LIMIT).contains(&engine.max_records) {
            bail!(
                "engine.max_records must be between 1 and {}, got {}",
                MAX_RECORDS_LIMIT,
                engine.max_records
            );
        }
        if !(1..=MAX_WEEKS_LIMIT).contains(&engine.max_weeks) {
            bail!(
                "engine.max_weeks must be between 1 and {}, got {}",
                MAX_WEEKS_LIMIT,
                engine.max_weeks
            );
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
