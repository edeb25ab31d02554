//! Wires configuration, feeds and publisher together for one invocation

use crate::cli::RunMode;
use crate::config::MonitorConfig;
use crate::debug_log::DebugLogger;
use crate::engine::{CorrelationEngine, RunReport};
use crate::feeds::{SafecastClient, UsgsClient};
use crate::publisher::{AlertPublisher, BlueskyPublisher, LogPublisher};
use crate::simulation::{SimulationHarness, SimulationReport};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum RunSummary {
    Monitor(RunReport),
    Simulation(SimulationReport),
}

/// Choose the publishing channel: the log for dry runs, Bluesky otherwise.
pub fn build_publisher(
    config: &MonitorConfig,
    http: &reqwest::Client,
    dry_run: bool,
    logger: DebugLogger,
) -> Arc<dyn AlertPublisher> {
    if dry_run {
        Arc::new(LogPublisher::new(logger))
    } else {
        Arc::new(BlueskyPublisher::new(
            http.clone(),
            config.bluesky_pds_url.clone(),
            config.bluesky_credentials.clone(),
            logger,
        ))
    }
}

/// Run one invocation in the given mode.
pub async fn run(
    mode: RunMode,
    config: &MonitorConfig,
    http: &reqwest::Client,
    publisher: Arc<dyn AlertPublisher>,
    logger: DebugLogger,
) -> RunSummary {
    logger.info("🚀 Starting nuclear event monitoring process");

    match mode {
        RunMode::Simulation {
            location,
            radiation_value,
        } => {
            let harness = SimulationHarness::new(publisher, config.thresholds, logger);
            let report = harness
                .run_simulation(location.latitude, location.longitude, radiation_value)
                .await;
            RunSummary::Simulation(report)
        }
        RunMode::Monitor => {
            let thresholds = config.thresholds;
            logger.info("Running in normal monitoring mode");
            logger.info(format!(
                "Thresholds: Magnitude >= {}, Depth <= {} km, Radiation > {} CPM",
                thresholds.min_magnitude, thresholds.max_depth_km, thresholds.radiation_threshold
            ));

            let mut engine = CorrelationEngine::new(
                Arc::new(UsgsClient::new(http.clone(), config.usgs_url.clone(), logger)),
                Arc::new(SafecastClient::new(http.clone(), config.safecast_url.clone(), logger)),
                publisher,
                thresholds,
                config.radius_km,
                logger,
            );

            let report = engine.run(chrono::Utc::now()).await;
            RunSummary::Monitor(report)
        }
    }
}
