//! Monitor configuration from environment variables
//!
//! Loaded once at startup (after `dotenv`) and read-only afterwards.
//!
//! Environment variables:
//! - `USGS_URL` (default: https://earthquake.usgs.gov/fdsnws/event/1/query)
//! - `SAFECAST_URL` (default: https://api.safecast.org/measurements.json)
//! - `BLUESKY_PDS_URL` (default: https://bsky.social)
//! - `MIN_MAGNITUDE` (default: 1.0)
//! - `MAX_DEPTH_KM` (default: 2.0)
//! - `RADIATION_THRESHOLD_CPM` (default: 125)
//! - `REQUEST_TIMEOUT_SECS` (default: 15)
//! - `RADIATION_RADIUS_KM` (default: 20)
//! - `BLUESKY_CLOSET_H` / `BLUESKY_CLOSET_P` (optional publish credentials)

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_USGS_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";
pub const DEFAULT_SAFECAST_URL: &str = "https://api.safecast.org/measurements.json";
pub const DEFAULT_BLUESKY_PDS_URL: &str = "https://bsky.social";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_RADIUS_KM: f64 = 20.0;

/// Detection thresholds, fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Events below this magnitude never qualify
    pub min_magnitude: f64,
    /// Events deeper than this never qualify
    pub max_depth_km: f64,
    /// Readings strictly above this are a breach (CPM)
    pub radiation_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_magnitude: 1.0,
            max_depth_km: 2.0,
            radiation_threshold: 125.0,
        }
    }
}

impl Thresholds {
    pub fn is_breach(&self, radiation_value: f64) -> bool {
        radiation_value > self.radiation_threshold
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BlueskyCredentials {
    pub handle: String,
    pub password: String,
}

impl fmt::Debug for BlueskyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlueskyCredentials")
            .field("handle", &self.handle)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub usgs_url: String,
    pub safecast_url: String,
    pub bluesky_pds_url: String,
    pub thresholds: Thresholds,
    pub request_timeout: Duration,
    pub radius_km: f64,
    /// `None` when either half is missing; publishing is then skipped
    pub bluesky_credentials: Option<BlueskyCredentials>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            usgs_url: DEFAULT_USGS_URL.to_string(),
            safecast_url: DEFAULT_SAFECAST_URL.to_string(),
            bluesky_pds_url: DEFAULT_BLUESKY_PDS_URL.to_string(),
            thresholds: Thresholds::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            radius_km: DEFAULT_RADIUS_KM,
            bluesky_credentials: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Thresholds::default();

        let usgs_url = url_var(&lookup, "USGS_URL", DEFAULT_USGS_URL)?;
        let safecast_url = url_var(&lookup, "SAFECAST_URL", DEFAULT_SAFECAST_URL)?;
        let bluesky_pds_url = url_var(&lookup, "BLUESKY_PDS_URL", DEFAULT_BLUESKY_PDS_URL)?;

        let thresholds = Thresholds {
            min_magnitude: finite_var(&lookup, "MIN_MAGNITUDE", defaults.min_magnitude)?,
            max_depth_km: finite_var(&lookup, "MAX_DEPTH_KM", defaults.max_depth_km)?,
            radiation_threshold: finite_var(
                &lookup,
                "RADIATION_THRESHOLD_CPM",
                defaults.radiation_threshold,
            )?,
        };

        let timeout_secs: u64 = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let radius_km = finite_var(&lookup, "RADIATION_RADIUS_KM", DEFAULT_RADIUS_KM)?;
        if radius_km <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "RADIATION_RADIUS_KM must be positive".to_string(),
            ));
        }

        let handle = non_empty(&lookup, "BLUESKY_CLOSET_H");
        let password = non_empty(&lookup, "BLUESKY_CLOSET_P");
        let bluesky_credentials = match (handle, password) {
            (Some(handle), Some(password)) => Some(BlueskyCredentials { handle, password }),
            _ => None,
        };

        Ok(Self {
            usgs_url,
            safecast_url,
            bluesky_pds_url,
            thresholds,
            request_timeout: Duration::from_secs(timeout_secs),
            radius_km,
            bluesky_credentials,
        })
    }
}

fn non_empty<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn url_var<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &str) -> Result<String, ConfigError> {
    let url = non_empty(lookup, key).unwrap_or_else(|| default.to_string());
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidValue(format!(
            "{} must start with http:// or https://",
            key
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{}='{}' is not a valid number", key, raw))),
        None => Ok(default),
    }
}

fn finite_var<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: f64) -> Result<f64, ConfigError> {
    let value: f64 = parse_var(lookup, key, default)?;
    if !value.is_finite() {
        return Err(ConfigError::InvalidValue(format!("{} must be finite", key)));
    }
    Ok(value)
}
