//! Synthetic single-event path
//!
//! Exercises the publish path without touching either feed. The simulation
//! alert is published first and unconditionally; the threshold comparison
//! afterwards only decides what gets logged.

use crate::config::Thresholds;
use crate::debug_log::DebugLogger;
use crate::publisher::{publish_alert, AlertPublisher};
use crate::types::{decimal, AlertEvent, Coordinates};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub alert: AlertEvent,
    /// Whether the channel accepted the post
    pub published: bool,
    /// Whether the simulated value would have breached the threshold
    pub breach: bool,
}

pub struct SimulationHarness {
    publisher: Arc<dyn AlertPublisher>,
    thresholds: Thresholds,
    logger: DebugLogger,
}

impl SimulationHarness {
    pub fn new(publisher: Arc<dyn AlertPublisher>, thresholds: Thresholds, logger: DebugLogger) -> Self {
        Self {
            publisher,
            thresholds,
            logger,
        }
    }

    pub async fn run_simulation(&self, latitude: f64, longitude: f64, radiation_value: f64) -> SimulationReport {
        let location = Coordinates::new(latitude, longitude);
        self.logger.info("Running in SIMULATION mode with parameters:");
        self.logger.info(format!("  - Latitude: {}", decimal(latitude)));
        self.logger.info(format!("  - Longitude: {}", decimal(longitude)));
        self.logger
            .info(format!("  - Radiation: {} CPM", decimal(radiation_value)));

        let alert = AlertEvent::simulation(location, radiation_value);
        let published = publish_alert(self.publisher.as_ref(), &alert, &self.logger).await;

        let breach = self.thresholds.is_breach(radiation_value);
        let threshold = self.thresholds.radiation_threshold;
        if breach {
            self.logger.warning(format!(
                "SIMULATION: Radiation exceeds threshold of {} CPM!",
                threshold
            ));
            self.logger.warning(format!(
                "SIMULATION: Possible detonation detected at {} with radiation {} CPM",
                location,
                decimal(radiation_value)
            ));
        } else {
            self.logger.info(format!(
                "SIMULATION: Radiation level {} CPM does not exceed threshold of {} CPM",
                decimal(radiation_value),
                threshold
            ));
        }

        SimulationReport {
            alert,
            published,
            breach,
        }
    }
}
