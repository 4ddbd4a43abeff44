//! INI parsing: `Ini` → `TrackerConfig`.
//!
//! The single place where INI key names are mapped to struct fields.

use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::TrackerConfig;
use crate::location::MAX_RELAXED_RETRIES;

/// Parse an `Ini` object into a `TrackerConfig`.
///
/// Starts from `TrackerConfig::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<TrackerConfig, ConfigFileError> {
    let mut config = TrackerConfig::default();

    // [tracking] section
    if let Some(section) = ini.section(Some("tracking")) {
        if let Some(v) = section.get("min_accuracy_meters") {
            let meters: f64 = parse_value("tracking", "min_accuracy_meters", v, POSITIVE_NUMBER)?;
            if !(meters > 0.0) || !meters.is_finite() {
                return Err(invalid("tracking", "min_accuracy_meters", v, POSITIVE_NUMBER));
            }
            config.min_accuracy_meters = meters;
        }
        if let Some(v) = section.get("high_accuracy_timeout_secs") {
            let secs: u64 =
                parse_value("tracking", "high_accuracy_timeout_secs", v, POSITIVE_SECONDS)?;
            if secs == 0 {
                return Err(invalid("tracking", "high_accuracy_timeout_secs", v, POSITIVE_SECONDS));
            }
            config.high_accuracy_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = section.get("retry_delay_ms") {
            let millis: u64 = parse_value(
                "tracking",
                "retry_delay_ms",
                v,
                "must be a non-negative integer (milliseconds)",
            )?;
            config.retry_delay = Duration::from_millis(millis);
        }
        if let Some(v) = section.get("max_relaxed_retries") {
            let reason = "must be an integer between 0 and 2";
            let retries: u32 = parse_value("tracking", "max_relaxed_retries", v, reason)?;
            if retries > MAX_RELAXED_RETRIES {
                return Err(invalid("tracking", "max_relaxed_retries", v, reason));
            }
            config.max_relaxed_retries = retries;
        }
        if let Some(v) = section.get("staleness_override_secs") {
            let secs: u64 =
                parse_value("tracking", "staleness_override_secs", v, NON_NEGATIVE_SECONDS)?;
            config.staleness_override = Duration::from_secs(secs);
        }
    }

    // [notifications] section
    if let Some(section) = ini.section(Some("notifications")) {
        if let Some(v) = section.get("accepted_interval_secs") {
            let secs: u64 =
                parse_value("notifications", "accepted_interval_secs", v, NON_NEGATIVE_SECONDS)?;
            config.accepted_notify_interval = Duration::from_secs(secs);
        }
        if let Some(v) = section.get("error_interval_secs") {
            let secs: u64 =
                parse_value("notifications", "error_interval_secs", v, NON_NEGATIVE_SECONDS)?;
            config.error_notify_interval = Duration::from_secs(secs);
        }
        if let Some(v) = section.get("event_channel_capacity") {
            let reason = "must be a positive integer";
            let capacity: usize = parse_value("notifications", "event_channel_capacity", v, reason)?;
            if capacity == 0 {
                return Err(invalid("notifications", "event_channel_capacity", v, reason));
            }
            config.event_channel_capacity = capacity;
        }
    }

    Ok(config)
}

const POSITIVE_NUMBER: &str = "must be a positive number (meters)";
const POSITIVE_SECONDS: &str = "must be a positive integer (seconds)";
const NON_NEGATIVE_SECONDS: &str = "must be a non-negative integer (seconds)";

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
