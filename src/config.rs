use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown timezone: {0}")]
    Timezone(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Chromium,
    Http,
}

/// The area the pipeline serves. Venue fields and prices default to it, and
/// "today" is always computed in its timezone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    pub city: String,
    pub state: String,
    pub country: String,
    pub currency: String,
    pub timezone: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            city: "Sydney".to_string(),
            state: "NSW".to_string(),
            country: "Australia".to_string(),
            currency: "AUD".to_string(),
            timezone: "Australia/Sydney".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timeouts {
    pub navigation_secs: u64,
    pub selector_probe_secs: u64,
    pub adapter_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_secs: 30,
            selector_probe_secs: 5,
            adapter_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub region: RegionConfig,
    pub database_path: Option<PathBuf>,
    pub renderer: RendererKind,
    pub chromium_path: Option<PathBuf>,
    pub headless: bool,
    pub timeouts: Timeouts,
    pub retention_days: i64,
    pub synthetic_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: RegionConfig::default(),
            database_path: None,
            renderer: RendererKind::default(),
            chromium_path: None,
            headless: true,
            timeouts: Timeouts::default(),
            retention_days: 1,
            synthetic_enabled: true,
        }
    }
}

impl AppConfig {
    /// Reads `path` (or the default location). A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(utils::config_path);
        read_config(&path)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(utils::config_path);
        write_config(&path, self)?;
        Ok(path)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::database_path)
    }

    pub fn region(&self) -> Result<Region, ConfigError> {
        Region::try_from(&self.region)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.navigation_secs)
    }

    pub fn selector_probe(&self) -> Duration {
        Duration::from_secs(self.timeouts.selector_probe_secs)
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.adapter_secs)
    }
}

/// Resolved form of [`RegionConfig`] handed to normalizers and adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub city: String,
    pub state: String,
    pub country: String,
    pub currency: String,
    pub timezone: Tz,
}

impl Region {
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

impl Default for Region {
    fn default() -> Self {
        let defaults = RegionConfig::default();
        Self {
            city: defaults.city,
            state: defaults.state,
            country: defaults.country,
            currency: defaults.currency,
            timezone: chrono_tz::Australia::Sydney,
        }
    }
}

impl TryFrom<&RegionConfig> for Region {
    type Error = ConfigError;

    fn try_from(config: &RegionConfig) -> Result<Self, Self::Error> {
        let timezone = config
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Timezone(config.timezone.clone()))?;
        Ok(Self {
            city: config.city.clone(),
            state: config.state.clone(),
            country: config.country.clone(),
            currency: config.currency.clone(),
            timezone,
        })
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    utils::ensure_parent(path);
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
