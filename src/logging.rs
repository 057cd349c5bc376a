//! Logger bootstrap for the command-line front end.
//!
//! The library only emits through the `log` facade; this module wires it to
//! stderr via `flexi_logger`. Initialization must not panic and happens once.

use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Plain levels accepted by [`init_logging`]; anything else is a filter string
/// handed to `flexi_logger` as-is (e.g. `info, pm_dashboard::store=debug`).
const PLAIN_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

/// Normalize a user-supplied level, defaulting blank input to `info`.
pub fn normalize_level(level: &str) -> String {
    let trimmed = level.trim();
    if trimmed.is_empty() {
        return "info".to_string();
    }
    let lower = trimmed.to_ascii_lowercase();
    if PLAIN_LEVELS.contains(&lower.as_str()) {
        lower
    } else {
        trimmed.to_string()
    }
}

/// Start logging to stderr. Keep the returned handle alive for the process.
pub fn init_logging(level: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_str(normalize_level(level))?
        .format(flexi_logger::default_format)
        .start()
}
