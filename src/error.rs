//! Top-level failures: the only errors that end a run with a non-zero exit

use crate::config::ConfigError;
use std::fmt;

#[derive(Debug)]
pub enum MonitorError {
    Config(ConfigError),
    HttpClient(reqwest::Error),
    Runtime(std::io::Error),
}

impl From<ConfigError> for MonitorError {
    fn from(err: ConfigError) -> Self {
        MonitorError::Config(err)
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::HttpClient(err)
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Config(e) => write!(f, "Configuration error: {}", e),
            MonitorError::HttpClient(e) => write!(f, "Failed to build HTTP client: {}", e),
            MonitorError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Config(e) => Some(e),
            MonitorError::HttpClient(e) => Some(e),
            MonitorError::Runtime(e) => Some(e),
        }
    }
}

/// Full diagnostic for an unrecoverable failure: message, cause chain, debug form.
pub fn diagnostic_trace(err: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut lines = vec![format!("Script failed with error: {}", err)];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("  caused by: {}", cause));
        source = cause.source();
    }
    lines.push(format!("  details: {:?}", err));
    lines
}
