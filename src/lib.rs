//! quakerad - seismic/radiation correlation monitor
//!
//! Polls a seismic feed for shallow, sudden-onset events and checks the
//! radiation readings around each one, publishing at most one alert per run.
//!
//! # Architecture
//!
//! ```text
//! UsgsClient (trailing 15 min) → CorrelationEngine
//!     ↓ qualifying events, feed order
//! SafecastClient (20 km radius, MIN_VALUE_HEURISTIC)
//!     ↓ value > threshold
//! AlertPublisher (Bluesky or log) → stop
//! ```
//!
//! Every diagnostic goes through [`debug_log::DebugLogger`].

pub mod cli;
pub mod config;
pub mod debug_log;
pub mod engine;
pub mod error;
pub mod feeds;
pub mod publisher;
pub mod runtime;
pub mod simulation;
pub mod types;

pub use config::{MonitorConfig, Thresholds};
pub use engine::{CorrelationEngine, MonitorState, RunOutcome, RunReport};
pub use error::MonitorError;
pub use simulation::{SimulationHarness, SimulationReport};
pub use types::{AlertEvent, AlertKind, Coordinates, RadiationSample, SeismicEvent};
