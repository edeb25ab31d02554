//! Upstream data feeds
//!
//! Both clients own every failure of their upstream call: a timeout, a
//! transport error, a bad status or an undecodable body all collapse into
//! "no data" (an empty event list, or no sample). [`FeedError`] exists only
//! so the clients can log *which* failure happened; it never crosses the
//! trait boundary.
//!
//! - `seismic` - USGS FDSN event query (trailing 15-minute window)
//! - `radiation` - Safecast measurement query (radius around a point)

pub mod radiation;
pub mod seismic;

pub use radiation::{RadiationFeed, SafecastClient, SelectionPolicy, MIN_VALUE_HEURISTIC};
pub use seismic::{SeismicFeed, SeismicWindow, UsgsClient};

use std::fmt;
use std::time::Duration;

/// Number of records previewed at detail level.
pub(crate) const PREVIEW_LIMIT: usize = 5;

#[derive(Debug)]
pub enum FeedError {
    Timeout,
    Transport(reqwest::Error),
    Status(reqwest::StatusCode),
    Decode(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout
        } else {
            FeedError::Transport(err)
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Timeout => write!(f, "request timed out"),
            FeedError::Transport(e) => write!(f, "transport error: {}", e),
            FeedError::Status(code) => write!(f, "unexpected HTTP status: {}", code),
            FeedError::Decode(e) => write!(f, "invalid JSON response: {}", e),
        }
    }
}

impl std::error::Error for FeedError {}

/// Shared HTTP client with the per-request timeout applied.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("quakerad/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// GET `url` with `params` and return the body of a successful response.
pub(crate) async fn get_body(
    http: &reqwest::Client,
    url: &str,
    params: &[(&str, String)],
) -> Result<String, FeedError> {
    let response = http.get(url).query(params).send().await?;

    if !response.status().is_success() {
        return Err(FeedError::Status(response.status()));
    }

    Ok(response.text().await?)
}

/// Numeric JSON value, or `None` for anything else (including NaN/inf).
pub(crate) fn json_number(value: Option<&serde_json::Value>) -> Option<f64> {
    value.and_then(serde_json::Value::as_f64).filter(|v| v.is_finite())
}

/// Numeric JSON value with the text the provider sent (`2`, `1.25`).
pub(crate) fn json_figure(value: Option<&serde_json::Value>) -> Option<(f64, String)> {
    match value? {
        serde_json::Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(|v| (v, n.to_string())),
        _ => None,
    }
}

/// String JSON value, or `None` for anything else.
pub(crate) fn json_str(value: Option<&serde_json::Value>) -> Option<&str> {
    value.and_then(serde_json::Value::as_str)
}

/// First `limit` characters of a body, marked when cut.
pub(crate) fn truncate_body(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
