use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::CapacityConfig;

pub const DEFAULT_DAILY_CAPACITY: u32 = 10;
pub const DEFAULT_TIMESLOT_CAPACITY: u32 = 2;
pub const DEFAULT_CATALOG_PATH: &str = "./courier_timeslots.json";
pub const DEFAULT_HOLIDAY_API_URL: &str = "https://holidayapi.com/v1/holidays";

/// Process configuration, read once at start-up from `SLOTD_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub capacity: CapacityConfig,
    pub catalog_path: PathBuf,
    /// `None` disables the background reloader.
    pub catalog_reload_interval: Option<Duration>,
    pub holiday_api_url: String,
    /// Empty means the holiday source is not configured.
    pub holiday_api_key: String,
    pub holiday_timeout: Duration,
    pub holiday_success_ttl: Duration,
    pub holiday_failure_ttl: Duration,
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
    ZeroCapacity(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => write!(f, "invalid value for {key}: {value:?}"),
            ConfigError::ZeroCapacity(key) => write!(f, "{key} must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn capacity(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: u32) -> Result<u32, ConfigError> {
    let value = parse_or(lookup, key, default)?;
    if value == 0 {
        return Err(ConfigError::ZeroCapacity(key));
    }
    Ok(value)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let daily = capacity(&lookup, "SLOTD_DAILY_CAPACITY", DEFAULT_DAILY_CAPACITY)?;
        let timeslot = capacity(&lookup, "SLOTD_TIMESLOT_CAPACITY", DEFAULT_TIMESLOT_CAPACITY)?;

        let reload_secs: u64 = parse_or(&lookup, "SLOTD_CATALOG_RELOAD_SECS", 60)?;
        let metrics_port = match lookup("SLOTD_METRICS_PORT") {
            None => None,
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "SLOTD_METRICS_PORT",
                value: raw,
            })?),
        };

        Ok(Self {
            capacity: CapacityConfig::new(daily, timeslot),
            catalog_path: lookup("SLOTD_CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH)),
            catalog_reload_interval: (reload_secs > 0).then(|| Duration::from_secs(reload_secs)),
            holiday_api_url: lookup("SLOTD_HOLIDAY_API_URL")
                .unwrap_or_else(|| DEFAULT_HOLIDAY_API_URL.to_string()),
            holiday_api_key: lookup("SLOTD_HOLIDAY_API_KEY").unwrap_or_default(),
            holiday_timeout: Duration::from_secs(parse_or(&lookup, "SLOTD_HOLIDAY_TIMEOUT_SECS", 5)?),
            holiday_success_ttl: Duration::from_secs(parse_or(
                &lookup,
                "SLOTD_HOLIDAY_SUCCESS_TTL_SECS",
                24 * 60 * 60,
            )?),
            holiday_failure_ttl: Duration::from_secs(parse_or(
                &lookup,
                "SLOTD_HOLIDAY_FAILURE_TTL_SECS",
                60 * 60,
            )?),
            metrics_port,
        })
    }
}
