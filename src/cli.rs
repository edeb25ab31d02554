//! Command-line surface and run-mode selection

use crate::config::ConfigError;
use crate::debug_log::DebugLevel;
use crate::types::Coordinates;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "quakerad",
    version,
    about = "Monitor seismic and radiation events for potential nuclear detonations."
)]
pub struct Args {
    /// Latitude for simulated event
    #[arg(long, allow_negative_numbers = true)]
    pub simulate_lat: Option<String>,

    /// Longitude for simulated event
    #[arg(long, allow_negative_numbers = true)]
    pub simulate_lon: Option<String>,

    /// Simulated radiation level (CPM)
    #[arg(long, allow_negative_numbers = true)]
    pub simulate_radiation: Option<String>,

    /// Debug level (0-5)
    #[arg(long, default_value_t = 3)]
    pub debug_level: u8,

    /// Write diagnostic output to this file instead of stderr
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Log alerts instead of posting them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunMode {
    Monitor,
    Simulation {
        location: Coordinates,
        radiation_value: f64,
    },
}

impl Args {
    pub fn debug_level(&self) -> DebugLevel {
        DebugLevel::from_number(self.debug_level)
    }

    /// Simulation needs all three `--simulate-*` values; anything less runs
    /// the normal monitor. Blank values count as missing.
    pub fn run_mode(&self) -> Result<RunMode, ConfigError> {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        match (
            present(&self.simulate_lat),
            present(&self.simulate_lon),
            present(&self.simulate_radiation),
        ) {
            (Some(lat), Some(lon), Some(radiation)) => Ok(RunMode::Simulation {
                location: Coordinates::new(
                    parse_number("--simulate-lat", &lat)?,
                    parse_number("--simulate-lon", &lon)?,
                ),
                radiation_value: parse_number("--simulate-radiation", &radiation)?,
            }),
            _ => Ok(RunMode::Monitor),
        }
    }
}

fn parse_number(flag: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::InvalidValue(format!("{} '{}' is not a number", flag, raw)))
}
