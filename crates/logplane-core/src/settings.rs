//! Operator-supplied settings.
//!
//! Settings arrive either as a raw string map (the operator front end
//! delivers everything stringly) or as a TOML file for the daemon.
//! Invalid values are a configuration error surfaced to the operator;
//! they abort the current reconciliation attempt, never the process.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const INGESTION_RATE_MB: &str = "ingestion-rate-mb";
const INGESTION_BURST_SIZE_MB: &str = "ingestion-burst-size-mb";
const RETENTION_PERIOD: &str = "retention-period";
const REPORTING_ENABLED: &str = "reporting-enabled";

/// Errors raised while parsing operator settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("setting `{key}` must be an integer, got `{value}`")]
    NotNumeric { key: &'static str, value: String },

    #[error("setting `{key}` must be a boolean, got `{value}`")]
    NotBoolean { key: &'static str, value: String },

    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Validated operator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OperatorSettings {
    /// Per-tenant ingestion rate limit, megabytes per second.
    pub ingestion_rate_mb: u64,
    /// Per-tenant ingestion burst size, megabytes.
    pub ingestion_burst_size_mb: u64,
    /// Retention period in days; 0 disables retention.
    pub retention_period: u64,
    /// Whether the engine reports anonymous usage analytics upstream.
    pub reporting_enabled: bool,
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            ingestion_rate_mb: 4,
            ingestion_burst_size_mb: 6,
            retention_period: 0,
            reporting_enabled: true,
        }
    }
}

impl OperatorSettings {
    /// Parse settings from a raw string map, falling back to defaults
    /// for absent keys.
    pub fn from_map(raw: &BTreeMap<String, String>) -> Result<Self, SettingsError> {
        let defaults = Self::default();
        Ok(Self {
            ingestion_rate_mb: parse_int(raw, INGESTION_RATE_MB, defaults.ingestion_rate_mb)?,
            ingestion_burst_size_mb: parse_int(
                raw,
                INGESTION_BURST_SIZE_MB,
                defaults.ingestion_burst_size_mb,
            )?,
            retention_period: parse_int(raw, RETENTION_PERIOD, defaults.retention_period)?,
            reporting_enabled: parse_bool(raw, REPORTING_ENABLED, defaults.reporting_enabled)?,
        })
    }

    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Render back to the stringly map form the operator front end uses.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (INGESTION_RATE_MB.to_string(), self.ingestion_rate_mb.to_string()),
            (
                INGESTION_BURST_SIZE_MB.to_string(),
                self.ingestion_burst_size_mb.to_string(),
            ),
            (RETENTION_PERIOD.to_string(), self.retention_period.to_string()),
            (REPORTING_ENABLED.to_string(), self.reporting_enabled.to_string()),
        ])
    }

    /// Retention is enabled iff the configured period is non-zero.
    pub fn retention_enabled(&self) -> bool {
        self.retention_period != 0
    }
}

fn parse_int(
    raw: &BTreeMap<String, String>,
    key: &'static str,
    default: u64,
) -> Result<u64, SettingsError> {
    match raw.get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| SettingsError::NotNumeric {
            key,
            value: value.clone(),
        }),
    }
}

fn parse_bool(
    raw: &BTreeMap<String, String>,
    key: &'static str,
    default: bool,
) -> Result<bool, SettingsError> {
    match raw.get(key) {
        None => Ok(default),
        Some(value) => match value.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(SettingsError::NotBoolean {
                key,
                value: value.clone(),
            }),
        },
    }
}
