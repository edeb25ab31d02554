//! Correlation engine: seismic scan → filter → radiation lookup → threshold
//!
//! ## State machine
//!
//! ```text
//! Idle
//!   ↓ run()
//! Scanning ── (no events) ──────────────────────────────┐
//!   ↓ per event, feed order                              │
//! Filtering ── (not qualifying) ── next event            │
//!   ↓                                                    │
//! CorrelatingRadiation ── (no sample) ── next event      │
//!   ↓                                                    │
//! Evaluating ── (value <= threshold) ── next event       │
//!   ↓ value > threshold                                  ↓
//! Alerted (publish once, stop)                       Exhausted
//! ```
//!
//! The first breach ends the run: later events are never examined and no
//! further radiation lookups happen. Both terminal states are successes.

use crate::config::Thresholds;
use crate::debug_log::DebugLogger;
use crate::feeds::{RadiationFeed, SeismicFeed, SeismicWindow};
use crate::publisher::{publish_alert, AlertPublisher};
use crate::types::{AlertEvent, SeismicEvent, SeismicSummary};
use chrono::{DateTime, Utc};
use std::ops::ControlFlow;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Scanning,
    Filtering,
    CorrelatingRadiation,
    Evaluating,
    Alerted,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A breach was found; the scan stopped at that event
    Alerted(AlertEvent),
    /// Every event was examined (or there were none) without a breach
    Exhausted,
}

/// What one run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub events_fetched: usize,
    pub events_examined: usize,
    pub events_qualified: usize,
    pub radiation_lookups: usize,
    /// `Some(accepted)` once a publish was attempted
    pub published: Option<bool>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            outcome: RunOutcome::Exhausted,
            events_fetched: 0,
            events_examined: 0,
            events_qualified: 0,
            radiation_lookups: 0,
            published: None,
        }
    }

    pub fn alert(&self) -> Option<&AlertEvent> {
        match &self.outcome {
            RunOutcome::Alerted(alert) => Some(alert),
            RunOutcome::Exhausted => None,
        }
    }
}

/// Magnitude/depth filter.
///
/// Qualifies iff magnitude is present and `>= min_magnitude` and depth is
/// present and `<= max_depth_km`. A missing depth never qualifies.
pub fn qualifies(event: &SeismicEvent, thresholds: &Thresholds) -> bool {
    seismic_summary(event, thresholds).is_some()
}

/// The alert's seismic figures for a qualifying event, `None` otherwise.
pub fn seismic_summary(event: &SeismicEvent, thresholds: &Thresholds) -> Option<SeismicSummary> {
    let magnitude = event.magnitude.filter(|m| m.is_finite())?;
    let depth_km = event.depth_km.filter(|d| d.is_finite())?;
    if magnitude < thresholds.min_magnitude || depth_km > thresholds.max_depth_km {
        return None;
    }

    Some(SeismicSummary {
        magnitude,
        depth_km,
        magnitude_label: event.magnitude_display(),
        depth_label: event.depth_display(),
    })
}

pub struct CorrelationEngine {
    seismic: Arc<dyn SeismicFeed>,
    radiation: Arc<dyn RadiationFeed>,
    publisher: Arc<dyn AlertPublisher>,
    thresholds: Thresholds,
    radius_km: f64,
    logger: DebugLogger,
    state: MonitorState,
}

impl CorrelationEngine {
    pub fn new(
        seismic: Arc<dyn SeismicFeed>,
        radiation: Arc<dyn RadiationFeed>,
        publisher: Arc<dyn AlertPublisher>,
        thresholds: Thresholds,
        radius_km: f64,
        logger: DebugLogger,
    ) -> Self {
        Self {
            seismic,
            radiation,
            publisher,
            thresholds,
            radius_km,
            logger,
            state: MonitorState::Idle,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    fn transition(&mut self, next: MonitorState) {
        self.logger
            .trace(format!("Monitor state: {:?} -> {:?}", self.state, next));
        self.state = next;
    }

    /// One complete pass over the trailing window ending at `now`.
    pub async fn run(&mut self, now: DateTime<Utc>) -> RunReport {
        let mut report = RunReport::new();
        self.state = MonitorState::Idle;
        self.transition(MonitorState::Scanning);

        let window = SeismicWindow::trailing(now);
        let events = self.seismic.fetch_recent_events(window.start, window.end).await;
        report.events_fetched = events.len();

        if events.is_empty() {
            self.logger
                .info("No seismic events detected in the monitoring window");
            self.transition(MonitorState::Exhausted);
            return report;
        }

        self.logger
            .info(format!("Processing {} seismic events", events.len()));

        for (index, event) in events.iter().enumerate() {
            report.events_examined += 1;
            if let ControlFlow::Break(alert) = self.examine(index + 1, event, &mut report).await {
                self.transition(MonitorState::Alerted);
                report.published = Some(publish_alert(self.publisher.as_ref(), &alert, &self.logger).await);
                report.outcome = RunOutcome::Alerted(alert);
                return report;
            }
        }

        self.logger
            .info("Monitoring complete - No significant events detected");
        self.transition(MonitorState::Exhausted);
        report
    }

    /// Filter, correlate and evaluate one event.
    ///
    /// `Break` carries the alert that ends the scan.
    async fn examine(
        &mut self,
        ordinal: usize,
        event: &SeismicEvent,
        report: &mut RunReport,
    ) -> ControlFlow<AlertEvent> {
        self.transition(MonitorState::Filtering);
        self.logger.info(format!(
            "Examining event #{}: Magnitude {} at {}",
            ordinal,
            event.magnitude_display(),
            event.place
        ));
        self.logger
            .detail(format!("  - Coordinates: {}", event.coordinates));
        self.logger
            .detail(format!("  - Depth: {} km", event.depth_display()));
        self.logger
            .detail(format!("  - Time: {}", event.occurred_at_display()));

        let seismic = match seismic_summary(event, &self.thresholds) {
            Some(seismic) => seismic,
            None => {
                self.logger.detail(format!(
                    "Event does not meet seismic criteria (requires mag >= {} and depth <= {} km)",
                    self.thresholds.min_magnitude, self.thresholds.max_depth_km
                ));
                return ControlFlow::Continue(());
            }
        };
        report.events_qualified += 1;
        self.logger.warning(format!(
            "Event meets seismic criteria: Magnitude {} >= {} and Depth {} km <= {} km",
            seismic.magnitude_label,
            self.thresholds.min_magnitude,
            seismic.depth_label,
            self.thresholds.max_depth_km
        ));

        self.transition(MonitorState::CorrelatingRadiation);
        self.logger
            .info(format!("Checking radiation levels near {}", event.coordinates));
        report.radiation_lookups += 1;
        let sample = match self
            .radiation
            .fetch_nearest_sample(event.coordinates, self.radius_km)
            .await
        {
            Some(sample) => sample,
            None => {
                self.logger.warning(format!(
                    "Could not retrieve radiation data for location {}",
                    event.coordinates
                ));
                return ControlFlow::Continue(());
            }
        };

        self.transition(MonitorState::Evaluating);
        self.logger.detail(format!(
            "Found radiation level: {} {} at {}",
            sample.value, sample.unit, sample.captured_at
        ));

        if !self.thresholds.is_breach(sample.value) {
            self.logger.info(format!(
                "Radiation level {} {} does not exceed threshold of {} CPM",
                sample.value, sample.unit, self.thresholds.radiation_threshold
            ));
            return ControlFlow::Continue(());
        }

        self.logger.warning(format!(
            "ALERT: Radiation level {} {} exceeds threshold of {} CPM!",
            sample.value, sample.unit, self.thresholds.radiation_threshold
        ));
        self.logger.warning(format!(
            "ALERT: Possible nuclear detonation detected at {}!",
            event.coordinates
        ));

        ControlFlow::Break(AlertEvent::detonation(event.coordinates, seismic, &sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coordinates, ReportedFigures};

    fn event(magnitude: Option<f64>, depth_km: Option<f64>) -> SeismicEvent {
        SeismicEvent {
            id: "test".to_string(),
            magnitude,
            depth_km,
            coordinates: Coordinates::new(10.0, 20.0),
            place: "Test".to_string(),
            occurred_at_ms: None,
            reported: ReportedFigures::default(),
        }
    }

    #[test]
    fn test_qualifying_event() {
        let thresholds = Thresholds::default();
        assert!(qualifies(&event(Some(1.2), Some(1.5)), &thresholds));
        // Boundaries are inclusive
        assert!(qualifies(&event(Some(1.0), Some(2.0)), &thresholds));
    }

    #[test]
    fn test_weak_or_deep_events_rejected() {
        let thresholds = Thresholds::default();
        assert!(!qualifies(&event(Some(0.8), Some(1.0)), &thresholds));
        assert!(!qualifies(&event(Some(3.0), Some(2.01)), &thresholds));
    }

    #[test]
    fn test_missing_fields_never_qualify() {
        let thresholds = Thresholds::default();
        assert!(!qualifies(&event(Some(5.0), None), &thresholds));
        assert!(!qualifies(&event(None, Some(0.5)), &thresholds));
        assert!(!qualifies(&event(None, None), &thresholds));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let thresholds = Thresholds::default();
        assert!(!qualifies(&event(Some(f64::NAN), Some(1.0)), &thresholds));
        assert!(!qualifies(&event(Some(2.0), Some(f64::NEG_INFINITY)), &thresholds));
    }

    #[test]
    fn test_summary_carries_provider_text() {
        let mut quake = event(Some(2.0), Some(1.0));
        quake.reported = ReportedFigures {
            magnitude: Some("2".to_string()),
            depth_km: Some("1".to_string()),
        };

        let summary = seismic_summary(&quake, &Thresholds::default()).unwrap();
        assert_eq!(summary.magnitude, 2.0);
        assert_eq!(summary.depth_km, 1.0);
        assert_eq!(summary.magnitude_label, "2");
        assert_eq!(summary.depth_label, "1");

        assert!(seismic_summary(&event(Some(0.5), Some(1.0)), &Thresholds::default()).is_none());
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = Thresholds {
            min_magnitude: 2.5,
            max_depth_km: 10.0,
            radiation_threshold: 125.0,
        };
        assert!(!qualifies(&event(Some(2.0), Some(5.0)), &thresholds));
        assert!(qualifies(&event(Some(2.5), Some(10.0)), &thresholds));
    }
}
