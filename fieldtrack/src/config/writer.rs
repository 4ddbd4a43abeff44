//! INI serialization: `TrackerConfig` → commented INI string.

use super::settings::TrackerConfig;

/// Convert a `TrackerConfig` to a commented INI string for saving.
pub(super) fn to_config_string(config: &TrackerConfig) -> String {
    format!(
        r#"[tracking]
; Readings with a larger accuracy radius (meters) are dropped
min_accuracy_meters = {min_accuracy}
; Timeout of the first, high-accuracy fix attempt
high_accuracy_timeout_secs = {high_timeout}
; Delay before each relaxed retry after a failed attempt
retry_delay_ms = {retry_delay}
; Relaxed retries per session before the first fix (0-2)
max_relaxed_retries = {max_retries}
; A held reading older than this may be replaced by a worse one
staleness_override_secs = {staleness}

[notifications]
; Minimum spacing between accepted-reading notifications
accepted_interval_secs = {accepted}
; Minimum spacing between error notifications
error_interval_secs = {errors}
; Buffered events per subscriber before the slowest one lags
event_channel_capacity = {capacity}
"#,
        min_accuracy = config.min_accuracy_meters,
        high_timeout = config.high_accuracy_timeout.as_secs(),
        retry_delay = config.retry_delay.as_millis(),
        max_retries = config.max_relaxed_retries,
        staleness = config.staleness_override.as_secs(),
        accepted = config.accepted_notify_interval.as_secs(),
        errors = config.error_notify_interval.as_secs(),
        capacity = config.event_channel_capacity,
    )
}
