//! Run failures and the shared boxed error type.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use liftoff_config::ConfigError;
use thiserror::Error;

use crate::Phase;

/// Boxed failure raised by collaborators: containers, observers, runners and
/// initializers.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Errors that abort a bootstrap run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The configuration environment could not be prepared.
    #[error("failed to prepare the configuration environment: {source}")]
    Environment {
        /// Resolution or binding failure.
        #[source]
        source: ConfigError,
    },
    /// A lifecycle observer failed during a notification that is fatal.
    #[error("lifecycle observer '{observer}' failed during {phase}: {source}")]
    Observer {
        /// Observer name.
        observer: String,
        /// Notification phase.
        phase: Phase,
        /// Observer failure.
        #[source]
        source: BoxError,
    },
    /// The container factory failed.
    #[error("failed to create the application container: {source}")]
    Container {
        /// Factory failure.
        #[source]
        source: BoxError,
    },
    /// A container initializer failed.
    #[error("container initializer '{initializer}' failed: {source}")]
    Initializer {
        /// Initializer name.
        initializer: String,
        /// Initializer failure.
        #[source]
        source: BoxError,
    },
    /// Registering singletons or loading component sources failed.
    #[error("failed to load the application container: {source}")]
    Load {
        /// Container failure.
        #[source]
        source: BoxError,
    },
    /// The container failed to refresh.
    #[error("failed to refresh the application container: {source}")]
    Refresh {
        /// Container failure.
        #[source]
        source: BoxError,
    },
    /// The shutdown hook could not be installed.
    #[error("failed to register the shutdown hook: {source}")]
    ShutdownHook {
        /// Installation failure.
        #[source]
        source: BoxError,
    },
    /// A runner failed.
    #[error("runner '{runner}' failed: {source}")]
    Runner {
        /// Runner name.
        runner: String,
        /// Runner failure.
        #[source]
        source: BoxError,
    },
    /// A phase was entered out of order.
    #[error("cannot enter phase {next} from {current}")]
    PhaseOrder {
        /// Current phase, or `none` before the run started.
        current: String,
        /// Requested phase.
        next: Phase,
    },
}

impl RunError {
    /// Phase the failure belongs to, when known.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::Environment { .. } => Some(Phase::EnvironmentPrepared),
            Self::Observer { phase, .. } => Some(*phase),
            Self::Container { .. } | Self::Initializer { .. } => Some(Phase::ContextPrepared),
            Self::Load { .. } => Some(Phase::ContextLoaded),
            Self::Refresh { .. } | Self::ShutdownHook { .. } => Some(Phase::ContextRefreshed),
            Self::Runner { .. } => Some(Phase::Runners),
            Self::PhaseOrder { .. } => None,
        }
    }
}

/// A reported run failure together with its computed exit code.
///
/// Clones share the same underlying [`RunError`], which lets the
/// [`ExceptionSuppressor`](crate::ExceptionSuppressor) recognise a failure
/// that was already reported.
#[derive(Debug, Clone)]
pub struct RunFailure {
    error: Arc<RunError>,
    exit_code: i32,
}

impl RunFailure {
    pub(crate) const fn new(error: Arc<RunError>, exit_code: i32) -> Self {
        Self { error, exit_code }
    }

    /// Underlying run error.
    #[must_use]
    pub fn error(&self) -> &RunError {
        &self.error
    }

    /// Exit code computed on the failure path; zero when nothing mapped the
    /// failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns whether both failures wrap the same run error.
    #[must_use]
    pub fn is_same_failure(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.error, &other.error)
    }

    pub(crate) fn shared(&self) -> &Arc<RunError> {
        &self.error
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.error, f)
    }
}

impl Error for RunFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}

/// Iterates an error and its sources, outermost first.
pub fn cause_chain<'a>(
    error: &'a (dyn Error + 'static),
) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(error), |&current| current.source())
}
