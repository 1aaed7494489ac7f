use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Formats available for diagnostics written to stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Single-line human-readable events; the default for interactive use.
    #[default]
    Compact,
    /// One JSON object per event for log collectors.
    Json,
}

/// Error returned when a [`LogFormat`] cannot be parsed.
pub type LogFormatParseError = strum::ParseError;
