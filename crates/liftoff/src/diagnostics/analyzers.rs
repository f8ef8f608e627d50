//! Analyzers shipped by default.

use std::error::Error;

use liftoff_config::ConfigError;
use thiserror::Error;

use super::{CauseAnalyzer, FailureAnalysis};

/// Raised by components that fail to bind a listening port.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("port {port} is already in use")]
pub struct PortInUseError {
    port: u16,
}

impl PortInUseError {
    /// Creates the error for `port`.
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self { port }
    }

    /// The contested port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

/// Diagnoses configuration files that could not be parsed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLoadAnalyzer;

impl CauseAnalyzer for ConfigLoadAnalyzer {
    type Cause = ConfigError;

    fn analyze_cause(
        &self,
        _root: &(dyn Error + 'static),
        cause: &ConfigError,
    ) -> Option<FailureAnalysis> {
        let (description, action) = match cause {
            ConfigError::Load { location, source } => (
                format!("Configuration file '{location}' could not be loaded:\n\n    {source}"),
                format!(
                    "Fix the syntax of '{location}' or remove it from the configured search locations."
                ),
            ),
            ConfigError::Read { location, source } => (
                format!("Configuration file '{location}' could not be read:\n\n    {source}"),
                format!("Check that '{location}' is readable UTF-8 text."),
            ),
            _ => return None,
        };
        Some(FailureAnalysis::new(description, Some(action), cause.to_string()))
    }
}

/// Diagnoses malformed profile lists, placeholders and arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvalidProfileAnalyzer;

impl CauseAnalyzer for InvalidProfileAnalyzer {
    type Cause = ConfigError;

    fn analyze_cause(
        &self,
        _root: &(dyn Error + 'static),
        cause: &ConfigError,
    ) -> Option<FailureAnalysis> {
        let action = match cause {
            ConfigError::InvalidProfile { key, .. } => {
                format!("Review the profile names listed under '{key}'.")
            }
            ConfigError::UnresolvablePlaceholder { placeholder, .. } => {
                format!("Define '{placeholder}' or give the placeholder a default value.")
            }
            ConfigError::CircularPlaceholder { placeholder, .. } => {
                format!("Break the reference cycle through '{placeholder}'.")
            }
            ConfigError::InvalidArgument { .. } => {
                "Pass options as --name=value or --name.".to_owned()
            }
            ConfigError::InvalidValue { key, .. } => {
                format!("Update '{key}' to a supported value.")
            }
            _ => return None,
        };
        Some(FailureAnalysis::new(
            format!("Configuration could not be bound:\n\n    {cause}"),
            Some(action),
            cause.to_string(),
        ))
    }
}

/// Diagnoses [`PortInUseError`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortInUseAnalyzer;

impl CauseAnalyzer for PortInUseAnalyzer {
    type Cause = PortInUseError;

    fn analyze_cause(
        &self,
        _root: &(dyn Error + 'static),
        cause: &PortInUseError,
    ) -> Option<FailureAnalysis> {
        let port = cause.port();
        Some(FailureAnalysis::new(
            format!("The application tried to listen on port {port}, which is already in use."),
            Some(format!(
                "Stop the process listening on port {port} or configure a different port."
            )),
            cause.to_string(),
        ))
    }
}
