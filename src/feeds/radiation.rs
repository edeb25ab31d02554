//! Safecast radiation measurement feed
//!
//! Endpoint: https://api.safecast.org/measurements.json
//! Query: `distance` (km), `latitude`, `longitude`
//! Returns: a JSON array of measurements, or an object wrapping them in
//! `measurements`
//!
//! ## Which sample is "nearest"
//!
//! The client reports the sample with the **lowest reading** in the radius,
//! not the geographically closest one ([`MIN_VALUE_HEURISTIC`]). Alerting
//! depends on this choice: a breach is only raised when even the quietest
//! sensor in range reads above threshold.

use super::{get_body, json_number, json_str, truncate_body, FeedError, PREVIEW_LIMIT};
use crate::debug_log::{DebugLevel, DebugLogger};
use crate::types::{CapturedAt, Coordinates, RadiationSample, Unit};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// How a single sample is chosen from everything in the radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Lowest `value` wins; ties keep the first in response order.
    MinValueHeuristic,
}

pub const MIN_VALUE_HEURISTIC: SelectionPolicy = SelectionPolicy::MinValueHeuristic;

impl SelectionPolicy {
    pub fn select<'a>(&self, samples: &'a [RadiationSample]) -> Option<&'a RadiationSample> {
        match self {
            SelectionPolicy::MinValueHeuristic => samples.iter().min_by(|a, b| a.value.total_cmp(&b.value)),
        }
    }
}

/// Source of radiation readings around a point.
///
/// Implementations never fail: any problem yields `None`.
#[async_trait]
pub trait RadiationFeed: Send + Sync {
    async fn fetch_nearest_sample(&self, location: Coordinates, radius_km: f64) -> Option<RadiationSample>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MeasurementsBody {
    List(Vec<Value>),
    Wrapped { measurements: Vec<Value> },
}

/// Convert one measurement. `None` when it carries no numeric value.
///
/// Non-string `unit`/`captured_at` fall back to their unknown labels.
fn measurement_to_sample(measurement: &Value) -> Option<RadiationSample> {
    let value = json_number(measurement.get("value"))?;
    let location = match (
        json_number(measurement.get("latitude")),
        json_number(measurement.get("longitude")),
    ) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    };

    Some(RadiationSample {
        value,
        unit: Unit::parse(json_str(measurement.get("unit"))),
        captured_at: CapturedAt::parse(json_str(measurement.get("captured_at"))),
        location,
    })
}

/// Result of decoding one measurements response.
#[derive(Debug, Default)]
pub struct DecodedSamples {
    /// Usable samples, in response order
    pub samples: Vec<RadiationSample>,
    /// Measurements dropped for lack of a numeric value
    pub skipped: usize,
}

/// Decode a measurements body (bare array or `{"measurements": [...]}`).
pub fn decode_samples(body: &str) -> Result<DecodedSamples, FeedError> {
    let measurements = match serde_json::from_str::<MeasurementsBody>(body) {
        Ok(MeasurementsBody::List(list)) => list,
        Ok(MeasurementsBody::Wrapped { measurements }) => measurements,
        Err(e) => return Err(FeedError::Decode(e.to_string())),
    };

    let mut decoded = DecodedSamples::default();
    for measurement in &measurements {
        match measurement_to_sample(measurement) {
            Some(sample) => decoded.samples.push(sample),
            None => decoded.skipped += 1,
        }
    }
    Ok(decoded)
}

pub struct SafecastClient {
    http: reqwest::Client,
    base_url: String,
    policy: SelectionPolicy,
    logger: DebugLogger,
}

impl SafecastClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, logger: DebugLogger) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            policy: MIN_VALUE_HEURISTIC,
            logger,
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    async fn try_fetch(&self, location: Coordinates, radius_km: f64) -> Result<Vec<RadiationSample>, FeedError> {
        let params = [
            ("distance", radius_km.to_string()),
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
        ];
        self.logger.emit_fields(DebugLevel::Detail, "Safecast API request parameters", &params);
        self.logger.detail(format!("Safecast API URL: {}", self.base_url));
        self.logger.trace("Sending request to Safecast API...");

        let body = get_body(&self.http, &self.base_url, &params).await?;
        if self.logger.enabled(DebugLevel::Trace) {
            self.logger
                .trace(format!("Raw Safecast API Response: {}", truncate_body(&body, 1000)));
        }

        let decoded = decode_samples(&body)?;
        if decoded.skipped > 0 {
            self.logger.warning(format!(
                "Skipped {} Safecast measurements without a numeric value",
                decoded.skipped
            ));
        }
        Ok(decoded.samples)
    }

    fn preview(&self, samples: &[RadiationSample]) {
        if !self.logger.enabled(DebugLevel::Detail) {
            return;
        }
        self.logger.detail("Radiation measurement details:");
        for (i, sample) in samples.iter().take(PREVIEW_LIMIT).enumerate() {
            let location = sample
                .location
                .map(|c| c.to_string())
                .unwrap_or_else(|| "(?, ?)".to_string());
            self.logger.detail(format!(
                "  {}. Value: {} {}, Location: {}, Time: {}",
                i + 1,
                sample.value,
                sample.unit,
                location,
                sample.captured_at
            ));
        }
        if samples.len() > PREVIEW_LIMIT {
            self.logger.detail(format!(
                "  ... and {} more measurements",
                samples.len() - PREVIEW_LIMIT
            ));
        }
    }
}

#[async_trait]
impl RadiationFeed for SafecastClient {
    async fn fetch_nearest_sample(&self, location: Coordinates, radius_km: f64) -> Option<RadiationSample> {
        self.logger.info(format!(
            "Fetching nearest radiation sample near {} with a distance of {} km",
            location, radius_km
        ));

        let samples = match self.try_fetch(location, radius_km).await {
            Ok(samples) => samples,
            Err(FeedError::Timeout) => {
                self.logger.warning("Timeout occurred while fetching Safecast data");
                return None;
            }
            Err(FeedError::Decode(_)) => {
                self.logger.error("Invalid JSON response from Safecast API");
                return None;
            }
            Err(e) => {
                self.logger.error(format!("API request error: {}", e));
                return None;
            }
        };

        self.logger.info(format!(
            "Safecast API returned {} radiation measurements",
            samples.len()
        ));
        if samples.is_empty() {
            self.logger.warning("No radiation measurements found in the area");
            return None;
        }
        self.preview(&samples);

        let chosen = self.policy.select(&samples).cloned();
        if let Some(sample) = &chosen {
            self.logger.info(format!(
                "Nearest radiation sample: {} {} captured at {}",
                sample.value, sample.unit, sample.captured_at
            ));
        }
        chosen
    }
}
