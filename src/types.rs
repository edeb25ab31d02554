//! Core data structures shared by the feeds, the engine and the publisher
//!
//! Everything here is built fresh per run and dropped when the run ends;
//! nothing is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", decimal(self.latitude), decimal(self.longitude))
    }
}

/// Render a float the way people write it: `2.0`, `1.25`, `-122.5`.
pub fn decimal(value: f64) -> String {
    format!("{:?}", value)
}

/// One seismic event as reported by the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SeismicEvent {
    /// Provider identifier; only unique within a single poll
    pub id: String,
    pub magnitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub coordinates: Coordinates,
    pub place: String,
    /// Milliseconds since the Unix epoch
    pub occurred_at_ms: Option<i64>,
    pub reported: ReportedFigures,
}

/// Magnitude and depth as the provider sent them (`2`, not `2.0`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportedFigures {
    pub magnitude: Option<String>,
    pub depth_km: Option<String>,
}

impl SeismicEvent {
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.occurred_at_ms.and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    /// `2024-05-01 12:00:00 UTC`, or `unknown time`.
    pub fn occurred_at_display(&self) -> String {
        self.occurred_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown time".to_string())
    }

    /// Provider text when known, else the decoded value, else `Unknown`.
    pub fn magnitude_display(&self) -> String {
        figure_display(self.reported.magnitude.as_deref(), self.magnitude)
    }

    pub fn depth_display(&self) -> String {
        figure_display(self.reported.depth_km.as_deref(), self.depth_km)
    }
}

fn figure_display(reported: Option<&str>, value: Option<f64>) -> String {
    match (reported, value) {
        (Some(text), Some(_)) => text.to_string(),
        (_, Some(value)) => decimal(value),
        _ => "Unknown".to_string(),
    }
}

/// Radiation unit label exactly as the provider reported it.
///
/// Providers mix units (`cpm`, `usv`, ...) and nothing converts between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit(String);

impl Unit {
    pub const UNKNOWN: &'static str = "unknown";

    /// Trimmed label, or `unknown` when absent or blank.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(label) if !label.is_empty() => Unit(label.to_string()),
            _ => Unit(Self::UNKNOWN.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider capture timestamp, kept as the opaque string the provider sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedAt(String);

impl CapturedAt {
    pub const UNKNOWN: &'static str = "unknown time";

    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(stamp) if !stamp.is_empty() => CapturedAt(stamp.to_string()),
            _ => CapturedAt(Self::UNKNOWN.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapturedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One radiation measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiationSample {
    pub value: f64,
    pub unit: Unit,
    pub captured_at: CapturedAt,
    /// Where the sample was taken, when the provider says so
    pub location: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    Simulation,
    Detonation,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Simulation => f.write_str("SIMULATION"),
            AlertKind::Detonation => f.write_str("DETONATION"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeismicSummary {
    pub magnitude: f64,
    pub depth_km: f64,
    /// Rendered in the alert text
    pub magnitude_label: String,
    pub depth_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadiationReading {
    pub value: f64,
    pub unit: Unit,
    pub captured_at: CapturedAt,
}

impl From<&RadiationSample> for RadiationReading {
    fn from(sample: &RadiationSample) -> Self {
        Self {
            value: sample.value,
            unit: sample.unit.clone(),
            captured_at: sample.captured_at.clone(),
        }
    }
}

/// Alert handed to the publisher. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub location: Coordinates,
    /// Present only for `Detonation`
    pub seismic: Option<SeismicSummary>,
    pub radiation: RadiationReading,
}

impl AlertEvent {
    pub fn detonation(location: Coordinates, seismic: SeismicSummary, sample: &RadiationSample) -> Self {
        Self {
            kind: AlertKind::Detonation,
            location,
            seismic: Some(seismic),
            radiation: RadiationReading::from(sample),
        }
    }

    /// Simulated readings are always reported in CPM.
    pub fn simulation(location: Coordinates, radiation_value: f64) -> Self {
        Self {
            kind: AlertKind::Simulation,
            location,
            seismic: None,
            radiation: RadiationReading {
                value: radiation_value,
                unit: Unit::parse(Some("CPM")),
                captured_at: CapturedAt::parse(Some("simulated")),
            },
        }
    }
}
