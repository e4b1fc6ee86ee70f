//! Ledger configuration: closed vocabularies and store tunables.
//!
//! Everything has a default so a missing `config.toml` still yields a working
//! setup pointed at `data/budget.csv`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_settlement_month() -> u32 {
    9
}

fn default_year() -> i32 {
    2025
}

fn default_min_year() -> i32 {
    2020
}

fn default_max_year() -> i32 {
    2030
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/budget.csv")
}

fn default_departments() -> Vec<String> {
    [
        "DX전략 Core Group",
        "서비스혁신 Core",
        "플랫폼혁신 Core",
        "백오피스혁신 Core",
        "러닝마케팅 Core",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_account_categories() -> Vec<String> {
    [
        "광고선전비(이벤트)",
        "통신비",
        "지급수수료",
        "지급수수료(은행수수료)",
        "지급수수료(외부용역,자문료)",
        "지급수수료(유지보수료)",
        "지급수수료(저작료)",
        "지급수수료(제휴)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Error returned when a configuration file cannot be read or parsed.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config file: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

/// Runtime configuration for the ledger.
///
/// `departments` and `account_categories` are the closed vocabularies used by
/// row validation; entries referencing a value outside them are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Last month whose actual-spend data is considered final.
    #[serde(default = "default_settlement_month")]
    pub settlement_month: u32,
    /// Year assumed when a row omits one.
    #[serde(default = "default_year")]
    pub default_year: i32,
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default = "default_max_year")]
    pub max_year: i32,
    #[serde(default = "default_departments")]
    pub departments: Vec<String>,
    #[serde(default = "default_account_categories")]
    pub account_categories: Vec<String>,
    /// How long after a save the file watcher keeps ignoring change events.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Quiet window used to coalesce bursts of file-change notifications.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Spreadsheet file the store synchronizes with.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config must deserialize from defaults")
    }
}

impl LedgerConfig {
    /// Load configuration from a TOML file. A missing file is not an error;
    /// the defaults are used instead.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let cfg: Self = toml::from_str(&data).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if cfg.settlement_month > 12 {
            return Err(ConfigError::Invalid(format!(
                "settlement_month must be between 0 and 12, got {}",
                cfg.settlement_month
            )));
        }
        if cfg.min_year > cfg.max_year {
            return Err(ConfigError::Invalid(format!(
                "min_year {} is greater than max_year {}",
                cfg.min_year, cfg.max_year
            )));
        }
        Ok(cfg)
    }

    pub fn is_valid_department(&self, value: &str) -> bool {
        self.departments.iter().any(|d| d == value)
    }

    pub fn is_valid_account_category(&self, value: &str) -> bool {
        self.account_categories.iter().any(|c| c == value)
    }

    pub fn is_valid_year(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
