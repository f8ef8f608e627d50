//! Tracing subscriber installation driven by the resolved configuration.
//!
//! [`TelemetryObserver`] runs first at `environment_prepared`, so
//! `logging.level` and `logging.format` may come from any configuration
//! layer. The global subscriber is installed at most once per process; later
//! runs keep the settings of the first.

use std::io::{self, IsTerminal};

use liftoff_config::{ConfigurationEnvironment, LogFormat, LogSettings};
use once_cell::sync::OnceCell;
use tracing::debug;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::{BoxError, LifecycleObserver};

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

static INSTALLED: OnceCell<LogSettings> = OnceCell::new();

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors encountered while configuring telemetry.
///
/// Every message starts with "logging configuration error" so the exception
/// suppressor always passes these failures through.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `logging.level` is not a valid filter expression.
    #[error("logging configuration error: invalid log filter '{filter}': {source}")]
    Filter {
        /// Rejected expression.
        filter: String,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// Another subscriber already owns the process.
    #[error("logging configuration error: failed to install telemetry subscriber: {0}")]
    Install(#[source] TryInitError),
}

/// Installs the global subscriber for `settings` unless one was installed
/// by an earlier call, and returns the settings in effect.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a foreign
/// subscriber is already registered.
pub fn initialise(settings: &LogSettings) -> Result<&'static LogSettings, TelemetryError> {
    INSTALLED.get_or_try_init(|| {
        let filter = parse_filter(settings)?;
        tracing_subscriber::registry()
            .with(output_layer(settings.format()).with_filter(filter))
            .try_init()
            .map_err(TelemetryError::Install)?;
        Ok(settings.clone())
    })
}

fn parse_filter(settings: &LogSettings) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(settings.filter()).map_err(|source| TelemetryError::Filter {
        filter: settings.filter().to_owned(),
        source,
    })
}

/// Stderr output with UTC timestamps; colour only on a terminal.
fn output_layer(format: LogFormat) -> OutputLayer {
    let base = fmt::layer()
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());
    match format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

/// Installs telemetry from `logging.level` and `logging.format` once the
/// environment has been resolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryObserver;

impl LifecycleObserver for TelemetryObserver {
    fn name(&self) -> &str {
        "telemetry"
    }

    fn priority(&self) -> i32 {
        i32::MIN
    }

    fn environment_prepared(
        &self,
        environment: &mut ConfigurationEnvironment,
    ) -> Result<(), BoxError> {
        let requested = LogSettings::from_environment(environment)?;
        let active = initialise(&requested)?;
        if *active != requested {
            debug!(
                target: TELEMETRY_TARGET,
                filter = active.filter(),
                format = %active.format(),
                "telemetry already installed, keeping earlier settings"
            );
        }
        Ok(())
    }
}
