//! Well-known keys, layer names, and search defaults.

/// Comma separated list of active profiles.
pub const ACTIVE_PROFILES_KEY: &str = "liftoff.profiles.active";

/// Comma separated list of profiles included alongside the active ones.
pub const INCLUDE_PROFILES_KEY: &str = "liftoff.profiles.include";

/// Profile expression restricting a YAML document to specific profiles.
pub const DOCUMENT_PROFILES_KEY: &str = "liftoff.profiles";

/// Overrides the list of configuration file base names.
pub const CONFIG_NAME_KEY: &str = "liftoff.config.name";

/// Adds search locations ahead of the defaults.
pub const CONFIG_LOCATION_KEY: &str = "liftoff.config.location";

/// Application name used in startup logs.
pub const APPLICATION_NAME_KEY: &str = "liftoff.main.application-name";

/// Target path of the PID file.
pub const PID_FILE_KEY: &str = "liftoff.pid.file";

/// Tracing filter expression.
pub const LOG_LEVEL_KEY: &str = "logging.level";

/// Log output format (`json` or `compact`).
pub const LOG_FORMAT_KEY: &str = "logging.format";

/// Search locations probed when none are configured, lowest precedence first.
pub const DEFAULT_SEARCH_LOCATIONS: [&str; 4] =
    ["classpath:/", "classpath:/config/", "file:./", "file:./config/"];

/// Base name probed when no names are configured.
pub const DEFAULT_SEARCH_NAME: &str = "application";

/// Profile applied when nothing else activates one.
pub const DEFAULT_PROFILE: &str = "default";

/// Name of the programmatic, lowest-precedence layer.
pub const DEFAULT_PROPERTIES_LAYER: &str = "defaultProperties";

/// Name of the layer exposing process environment variables.
pub const SYSTEM_ENVIRONMENT_LAYER: &str = "systemEnvironment";

/// Name of the layer answering `random.*` keys.
pub const RANDOM_LAYER: &str = "random";

/// Name of the layer holding command-line arguments.
pub const COMMAND_LINE_LAYER: &str = "commandLineArgs";

/// Key collecting arguments that do not start with `--`.
pub const NON_OPTION_ARGS_KEY: &str = "nonOptionArgs";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default application name.
pub const DEFAULT_APPLICATION_NAME: &str = "application";

/// Default PID file path.
pub const DEFAULT_PID_FILE: &str = "application.pid";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default search locations as owned strings.
#[must_use]
pub fn default_search_locations() -> Vec<String> {
    DEFAULT_SEARCH_LOCATIONS
        .iter()
        .map(|location| (*location).to_owned())
        .collect()
}

/// Default search names as owned strings.
#[must_use]
pub fn default_search_names() -> Vec<String> {
    vec![DEFAULT_SEARCH_NAME.to_owned()]
}
