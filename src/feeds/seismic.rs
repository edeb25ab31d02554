//! USGS FDSN event feed
//!
//! Endpoint: https://earthquake.usgs.gov/fdsnws/event/1/query
//! Returns: GeoJSON FeatureCollection, one Feature per event
//!
//! The provider-side magnitude floor is 0: the whole window is pulled and
//! filtered locally by the correlation engine.
//!
//! Consumed fields:
//! - `id`
//! - `properties.mag`, `properties.place`, `properties.time` (ms since epoch)
//! - `geometry.coordinates` = `[longitude, latitude, depth_km]`

use super::{get_body, json_figure, json_number, json_str, truncate_body, FeedError, PREVIEW_LIMIT};
use crate::debug_log::{DebugLevel, DebugLogger};
use crate::types::{Coordinates, ReportedFigures, SeismicEvent};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Length of the trailing look-back window.
pub const TRAILING_WINDOW_MINUTES: i64 = 15;

/// Query window `[start, end]` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeismicWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SeismicWindow {
    /// The fixed policy: the 15 minutes leading up to `now`.
    pub fn trailing(now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::minutes(TRAILING_WINDOW_MINUTES),
            end: now,
        }
    }
}

/// Source of recent seismic events.
///
/// Implementations never fail: any problem yields an empty list.
#[async_trait]
pub trait SeismicFeed: Send + Sync {
    async fn fetch_recent_events(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Vec<SeismicEvent>;
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    /// Converted one at a time by `decode_events`
    #[serde(default)]
    features: Option<Vec<Value>>,
}

/// Convert one GeoJSON feature. `None` when it has no usable latitude/longitude.
fn feature_to_event(feature: &Value, index: usize) -> Option<SeismicEvent> {
    let coords = feature
        .pointer("/geometry/coordinates")
        .and_then(Value::as_array)?;
    let longitude = json_number(coords.first())?;
    let latitude = json_number(coords.get(1))?;
    let depth = json_figure(coords.get(2));

    let properties = feature.get("properties");
    let field = |name: &str| properties.and_then(|p| p.get(name));
    let magnitude = json_figure(field("mag"));

    Some(SeismicEvent {
        id: json_str(feature.get("id"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("feature-{}", index)),
        magnitude: magnitude.as_ref().map(|(value, _)| *value),
        depth_km: depth.as_ref().map(|(value, _)| *value),
        coordinates: Coordinates::new(latitude, longitude),
        place: json_str(field("place"))
            .filter(|p| !p.trim().is_empty())
            .unwrap_or("Unknown location")
            .to_string(),
        occurred_at_ms: field("time").and_then(Value::as_i64),
        reported: ReportedFigures {
            magnitude: magnitude.map(|(_, text)| text),
            depth_km: depth.map(|(_, text)| text),
        },
    })
}

/// Result of decoding one feed response.
#[derive(Debug, Default)]
pub struct DecodedEvents {
    pub events: Vec<SeismicEvent>,
    /// Features dropped because they had no usable coordinates
    pub skipped: usize,
}

/// Decode a GeoJSON FeatureCollection body, keeping feed order.
pub fn decode_events(body: &str) -> Result<DecodedEvents, FeedError> {
    let collection: FeatureCollection = serde_json::from_str(body)?;
    let mut decoded = DecodedEvents::default();

    for (index, feature) in collection.features.unwrap_or_default().iter().enumerate() {
        match feature_to_event(feature, index) {
            Some(event) => decoded.events.push(event),
            None => decoded.skipped += 1,
        }
    }

    Ok(decoded)
}

/// FDSN time parameter; the service treats offset-less times as UTC.
fn fdsn_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub struct UsgsClient {
    http: reqwest::Client,
    base_url: String,
    logger: DebugLogger,
}

impl UsgsClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, logger: DebugLogger) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            logger,
        }
    }

    async fn try_fetch(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<SeismicEvent>, FeedError> {
        let params = [
            ("format", "geojson".to_string()),
            ("starttime", fdsn_time(start)),
            ("endtime", fdsn_time(end)),
            ("minmagnitude", "0".to_string()),
        ];
        self.logger.emit_fields(DebugLevel::Detail, "USGS API request parameters", &params);
        self.logger.detail(format!("USGS API URL: {}", self.base_url));
        self.logger.trace("Sending request to USGS API...");

        let body = get_body(&self.http, &self.base_url, &params).await?;
        if self.logger.enabled(DebugLevel::Trace) {
            self.logger.trace(format!("Full USGS API response: {}", body));
        }

        let decoded = decode_events(&body)?;
        if decoded.skipped > 0 {
            self.logger.warning(format!(
                "Skipped {} malformed USGS features (no usable coordinates)",
                decoded.skipped
            ));
        }
        Ok(decoded.events)
    }

    fn preview(&self, events: &[SeismicEvent]) {
        if !self.logger.enabled(DebugLevel::Detail) || events.is_empty() {
            return;
        }
        self.logger.detail("Event details:");
        for (i, event) in events.iter().take(PREVIEW_LIMIT).enumerate() {
            self.logger.detail(format!(
                "  {}. Magnitude {} at {}, Coordinates: {}, Depth: {} km, Time: {}",
                i + 1,
                event.magnitude_display(),
                event.place,
                event.coordinates,
                event.depth_display(),
                event.occurred_at_display()
            ));
        }
        if events.len() > PREVIEW_LIMIT {
            self.logger
                .detail(format!("  ... and {} more events", events.len() - PREVIEW_LIMIT));
        }
    }
}

#[async_trait]
impl SeismicFeed for UsgsClient {
    async fn fetch_recent_events(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Vec<SeismicEvent> {
        self.logger.info(format!(
            "Fetching USGS events from {} to {}",
            window_start.to_rfc3339(),
            window_end.to_rfc3339()
        ));

        match self.try_fetch(window_start, window_end).await {
            Ok(events) => {
                self.logger
                    .info(format!("USGS API returned {} seismic events", events.len()));
                self.preview(&events);
                events
            }
            Err(FeedError::Timeout) => {
                self.logger.warning("Timeout occurred while fetching USGS data");
                Vec::new()
            }
            Err(FeedError::Decode(e)) => {
                self.logger.error(format!(
                    "Unexpected error while processing USGS data: {}",
                    truncate_body(&e, 200)
                ));
                Vec::new()
            }
            Err(e) => {
                self.logger.error(format!("Failed to fetch USGS data: {}", e));
                Vec::new()
            }
        }
    }
}
