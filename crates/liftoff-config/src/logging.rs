use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::{DEFAULT_LOG_FILTER, LOG_FORMAT_KEY, LOG_LEVEL_KEY};
use crate::{ConfigError, ConfigurationEnvironment};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
    /// Human-readable single line output.
    #[default]
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Logging settings read from a resolved environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    filter: String,
    format: LogFormat,
}

impl LogSettings {
    /// Reads `logging.level` and `logging.format`, falling back to defaults.
    pub fn from_environment(environment: &ConfigurationEnvironment) -> Result<Self, ConfigError> {
        let filter = environment
            .get_property(LOG_LEVEL_KEY)
            .map_or_else(|| DEFAULT_LOG_FILTER.to_owned(), |value| value.trim().to_owned());
        let format = match environment.get_property(LOG_FORMAT_KEY) {
            Some(raw) => raw
                .trim()
                .parse::<LogFormat>()
                .map_err(|error: LogFormatParseError| ConfigError::InvalidValue {
                    key: LOG_FORMAT_KEY.to_owned(),
                    value: raw.into_owned(),
                    reason: error.to_string(),
                })?,
            None => LogFormat::default(),
        };
        Ok(Self { filter, format })
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_owned(),
            format: LogFormat::default(),
        }
    }
}
