//! Error types raised while probing, parsing, and resolving configuration.

use std::io;

use thiserror::Error;

/// Boxed failure reported by a pluggable layer loader.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while probing a candidate resource.
///
/// A missing resource is not an error. During resolution an unsupported
/// location is logged at trace level and skipped, while a resource that
/// exists but cannot be read aborts the run as [`ConfigError::Read`].
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The resource exists but could not be read.
    #[error("failed to read resource '{location}': {source}")]
    Read {
        /// Location that was probed.
        location: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The location uses a prefix that the loader does not understand.
    #[error("unsupported resource location '{location}'")]
    UnsupportedLocation {
        /// Location that was probed.
        location: String,
    },
}

/// Errors surfaced while resolving the configuration environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// An existing, readable resource could not be parsed into a layer.
    #[error("failed to load configuration layer from location '{location}': {source}")]
    Load {
        /// Location of the failing resource.
        location: String,
        /// Loader failure.
        #[source]
        source: LoaderError,
    },
    /// An existing resource could not be read.
    #[error("failed to read configuration file from location '{location}'")]
    Read {
        /// Location of the failing resource.
        location: String,
        /// Probe failure.
        #[source]
        source: ResourceError,
    },
    /// A profile list contained an entry that is not a valid profile name.
    #[error("invalid profile '{profile}' in '{key}': {reason}")]
    InvalidProfile {
        /// Key the profile list was read from.
        key: String,
        /// Offending entry.
        profile: String,
        /// Why the entry was rejected.
        reason: &'static str,
    },
    /// A placeholder had neither a value nor a default.
    #[error("could not resolve placeholder '{placeholder}' in value \"{value}\"")]
    UnresolvablePlaceholder {
        /// Placeholder key.
        placeholder: String,
        /// Value containing the placeholder.
        value: String,
    },
    /// A placeholder refers back to itself.
    #[error("circular placeholder reference '{placeholder}' in value \"{value}\"")]
    CircularPlaceholder {
        /// Placeholder key.
        placeholder: String,
        /// Value containing the placeholder.
        value: String,
    },
    /// A command-line argument did not follow the `--name=value` syntax.
    #[error("invalid command-line argument '{argument}'")]
    InvalidArgument {
        /// Offending argument.
        argument: String,
    },
    /// A setting held a value that could not be converted.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        /// Key holding the value.
        key: String,
        /// Offending value.
        value: String,
        /// Conversion failure.
        reason: String,
    },
}

impl ConfigError {
    /// Location of the resource that failed to load, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Load { location, .. } | Self::Read { location, .. } => Some(location),
            _ => None,
        }
    }
}
