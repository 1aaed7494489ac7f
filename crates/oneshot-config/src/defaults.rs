use crate::logging::LogFormat;

/// Default filter: only warnings and errors reach stderr so response payloads
/// stay readable.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value for serde defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default diagnostic format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
