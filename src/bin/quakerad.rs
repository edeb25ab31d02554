//! quakerad - one monitoring (or simulation) pass, then exit
//!
//! Usage:
//!   quakerad [--debug-level N] [--output FILE] [--dry-run]
//!   quakerad --simulate-lat LAT --simulate-lon LON --simulate-radiation CPM
//!
//! Meant to be scheduled externally (e.g. cron every 15 minutes); each run is
//! independent and keeps no state.
//!
//! Environment variables: see `quakerad::config`.

use clap::Parser;
use dotenv::dotenv;
use quakerad::cli::Args;
use quakerad::config::MonitorConfig;
use quakerad::debug_log::{self, DebugLogger};
use quakerad::error::{diagnostic_trace, MonitorError};
use quakerad::feeds::build_http_client;
use quakerad::runtime::{self, build_publisher, RunSummary};

fn main() {
    dotenv().ok();
    let args = Args::parse();
    let level = args.debug_level();

    if let Err(e) = debug_log::init_logging(level, args.output.as_deref()) {
        eprintln!("Error setting up output file: {}", e);
        let _ = debug_log::init_logging(level, None);
    }
    let logger = DebugLogger::new(level);

    logger.info(format!("Debug level set to {}", level.as_number()));
    if let Some(path) = &args.output {
        logger.info(format!("Debug output will be written to {}", path.display()));
    }
    logger.info(format!(
        "Script started at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    logger.detail(format!("quakerad version: {}", env!("CARGO_PKG_VERSION")));
    logger.detail(format!(
        "Running on: {}-{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));

    match try_main(&args, logger) {
        Ok(summary) => {
            match summary {
                RunSummary::Monitor(report) => logger.detail(format!(
                    "Run summary: fetched={} examined={} qualified={} lookups={} alerted={}",
                    report.events_fetched,
                    report.events_examined,
                    report.events_qualified,
                    report.radiation_lookups,
                    report.alert().is_some()
                )),
                RunSummary::Simulation(report) => logger.detail(format!(
                    "Simulation summary: published={} breach={}",
                    report.published, report.breach
                )),
            }
            logger.info("✅ Script completed successfully");
        }
        Err(e) => {
            for line in diagnostic_trace(&e) {
                logger.error(line);
            }
            log::logger().flush();
            std::process::exit(1);
        }
    }
}

fn try_main(args: &Args, logger: DebugLogger) -> Result<RunSummary, MonitorError> {
    let config = MonitorConfig::from_env()?;
    let mode = args.run_mode()?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(MonitorError::Runtime)?;

    rt.block_on(async {
        let http = build_http_client(config.request_timeout)?;
        let publisher = build_publisher(&config, &http, args.dry_run, logger);
        Ok::<_, MonitorError>(runtime::run(mode, &config, &http, publisher, logger).await)
    })
}
