//! Ledger settings
//!
//! Import normalization rules, store deadlines and listing defaults. The
//! loaded [`Settings`] value is handed to each service at construction.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::error::LedgerError;

/// Rules applied to rows read by the CSV importer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Currency assumed when the currency column is blank
    #[serde(default = "default_fallback_currency")]
    pub fallback_currency: String,

    /// Currency whose source amounts are recorded in thousands
    #[serde(default = "default_fallback_currency")]
    pub scaled_currency: String,

    /// Multiplier applied to amounts in `scaled_currency`
    #[serde(default = "default_scale_factor")]
    pub scale_factor: u32,

    /// Name given to rows that carry a price but no name
    #[serde(default = "default_placeholder_name")]
    pub placeholder_name: String,
}

fn default_fallback_currency() -> String {
    "VND".to_string()
}

fn default_scale_factor() -> u32 {
    1000
}

fn default_placeholder_name() -> String {
    "No Name".to_string()
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            fallback_currency: default_fallback_currency(),
            scaled_currency: default_fallback_currency(),
            scale_factor: default_scale_factor(),
            placeholder_name: default_placeholder_name(),
        }
    }
}

impl ImportSettings {
    /// Apply the unit normalization rule for `currency`
    ///
    /// `None` when the scaled amount does not fit in a `Decimal`.
    pub fn normalize_amount(&self, amount: Decimal, currency: &str) -> Option<Decimal> {
        if currency == self.scaled_currency {
            amount.checked_mul(Decimal::from(self.scale_factor))
        } else {
            Some(amount)
        }
    }
}

/// Per-call deadlines for store operations, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTimeouts {
    #[serde(default = "default_short_ms")]
    pub read_ms: u64,
    #[serde(default = "default_short_ms")]
    pub write_ms: u64,
    #[serde(default = "default_aggregate_ms")]
    pub aggregate_ms: u64,
    #[serde(default = "default_bulk_ms")]
    pub bulk_ms: u64,
}

fn default_short_ms() -> u64 {
    5_000
}

fn default_aggregate_ms() -> u64 {
    10_000
}

fn default_bulk_ms() -> u64 {
    30_000
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            read_ms: default_short_ms(),
            write_ms: default_short_ms(),
            aggregate_ms: default_aggregate_ms(),
            bulk_ms: default_bulk_ms(),
        }
    }
}

impl StoreTimeouts {
    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    pub fn write(&self) -> Duration {
        Duration::from_millis(self.write_ms)
    }

    pub fn aggregate(&self) -> Duration {
        Duration::from_millis(self.aggregate_ms)
    }

    pub fn bulk(&self) -> Duration {
        Duration::from_millis(self.bulk_ms)
    }
}

/// Settings for the expense ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// CSV import normalization
    #[serde(default)]
    pub import: ImportSettings,

    /// Store deadlines
    #[serde(default)]
    pub timeouts: StoreTimeouts,

    /// Page size used when the caller gives none
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u64,
}

fn default_schema_version() -> u32 {
    1
}

fn default_page_limit() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            import: ImportSettings::default(),
            timeouts: StoreTimeouts::default(),
            default_page_limit: default_page_limit(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &LedgerPaths) -> Result<Self, LedgerError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| LedgerError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                LedgerError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LedgerPaths) -> Result<(), LedgerError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| LedgerError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| LedgerError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
