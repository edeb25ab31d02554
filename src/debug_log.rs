//! Leveled, sanitizing diagnostic sink
//!
//! All monitor diagnostics flow through [`DebugLogger`], which:
//! - gates lines against a verbosity level fixed at construction
//! - redacts credential-looking text before anything is rendered
//! - forwards the cleaned line to the `log` facade (rendered by `env_logger`)
//!
//! ## Levels
//!
//! | Number | Level   | `log` level |
//! |--------|---------|-------------|
//! | 0      | None    | off         |
//! | 1      | Error   | error       |
//! | 2      | Warning | warn        |
//! | 3      | Info    | info        |
//! | 4      | Detail  | debug       |
//! | 5      | Trace   | trace       |

use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Ordered verbosity level. Higher numbers emit more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DebugLevel {
    None = 0,
    Error = 1,
    Warning = 2,
    #[default]
    Info = 3,
    Detail = 4,
    Trace = 5,
}

impl DebugLevel {
    /// Convert a numeric level. Values above 5 clamp to `Trace`.
    pub fn from_number(level: u8) -> Self {
        match level {
            0 => DebugLevel::None,
            1 => DebugLevel::Error,
            2 => DebugLevel::Warning,
            3 => DebugLevel::Info,
            4 => DebugLevel::Detail,
            _ => DebugLevel::Trace,
        }
    }

    pub fn as_number(self) -> u8 {
        self as u8
    }

    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            DebugLevel::None => log::LevelFilter::Off,
            DebugLevel::Error => log::LevelFilter::Error,
            DebugLevel::Warning => log::LevelFilter::Warn,
            DebugLevel::Info => log::LevelFilter::Info,
            DebugLevel::Detail => log::LevelFilter::Debug,
            DebugLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Words masked inside free-text messages.
const MESSAGE_REDACTIONS: &[&str] = &["password", "secret"];

/// Key fragments that mark a structured field as a credential.
const CREDENTIAL_KEYS: &[&str] = &["password", "secret", "token", "jwt", "authorization"];

const MASK: &str = "***";

/// Replace every case-insensitive occurrence of a redacted word with `***`.
pub fn sanitize_message(message: &str) -> String {
    let mut cleaned = message.to_string();
    for word in MESSAGE_REDACTIONS {
        cleaned = replace_ignore_ascii_case(&cleaned, word, MASK);
    }
    cleaned
}

/// Mask the value of every field whose key looks like a credential.
pub fn sanitize_fields(fields: &[(&str, String)]) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(key, value)| {
            let lowered = key.to_ascii_lowercase();
            if CREDENTIAL_KEYS.iter().any(|k| lowered.contains(k)) {
                (key.to_string(), MASK.to_string())
            } else {
                (key.to_string(), sanitize_message(value))
            }
        })
        .collect()
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> String {
    let lowered = haystack.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    while let Some(offset) = lowered[cursor..].find(needle) {
        let start = cursor + offset;
        out.push_str(&haystack[cursor..start]);
        out.push_str(replacement);
        cursor = start + needle.len();
    }
    out.push_str(&haystack[cursor..]);
    out
}

/// Sanitizing front-end over the `log` facade.
///
/// Cheap to copy; every component receives its own copy at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugLogger {
    level: DebugLevel,
}

impl DebugLogger {
    pub fn new(level: DebugLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> DebugLevel {
        self.level
    }

    /// Whether a line at `level` would be emitted.
    pub fn enabled(&self, level: DebugLevel) -> bool {
        level != DebugLevel::None && level <= self.level
    }

    /// Sanitize and emit one line.
    pub fn emit(&self, level: DebugLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let cleaned = sanitize_message(message);
        match level {
            DebugLevel::None => {}
            DebugLevel::Error => log::error!("{}", cleaned),
            DebugLevel::Warning => log::warn!("{}", cleaned),
            DebugLevel::Info => log::info!("{}", cleaned),
            DebugLevel::Detail => log::debug!("{}", cleaned),
            DebugLevel::Trace => log::trace!("{}", cleaned),
        }
    }

    /// Emit `label: key=value, ...` with credential fields masked.
    pub fn emit_fields(&self, level: DebugLevel, label: &str, fields: &[(&str, String)]) {
        if !self.enabled(level) {
            return;
        }
        self.emit(level, &render_fields(label, &sanitize_fields(fields)));
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.emit(DebugLevel::Error, message.as_ref());
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.emit(DebugLevel::Warning, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.emit(DebugLevel::Info, message.as_ref());
    }

    pub fn detail(&self, message: impl AsRef<str>) {
        self.emit(DebugLevel::Detail, message.as_ref());
    }

    pub fn trace(&self, message: impl AsRef<str>) {
        self.emit(DebugLevel::Trace, message.as_ref());
    }
}

fn render_fields(label: &str, fields: &[(String, String)]) -> String {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}: {}", label, body)
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARNING",
        log::Level::Info => "INFO",
        log::Level::Debug => "DETAIL",
        log::Level::Trace => "TRACE",
    }
}

/// Build the `env_logger` backend for a verbosity level.
///
/// Only this crate's targets are enabled so HTTP client internals stay quiet.
/// When `output` is set, lines go to that file instead of stderr.
pub fn build_logger(level: DebugLevel, output: Option<&Path>) -> std::io::Result<env_logger::Logger> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Off)
        .filter_module("quakerad", level.level_filter())
        .format(|buf, record| writeln!(buf, "[{}] {}", level_tag(record.level()), record.args()));

    match output {
        Some(path) => {
            let file = File::create(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }

    Ok(builder.build())
}

/// Install the backend as the process logger.
pub fn init_logging(level: DebugLevel, output: Option<&Path>) -> std::io::Result<()> {
    let logger = build_logger(level, output)?;
    let max_level = logger.filter();
    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::AlreadyExists, e.to_string()))?;
    log::set_max_level(max_level);
    Ok(())
}
