//! Startup phases and per-invocation run state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use liftoff_config::{CommandLineArgs, ConfigurationEnvironment};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::{ApplicationContainer, RunError};

/// Startup phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// The run has started and observers are constructed.
    Starting,
    /// Configuration has been resolved into the environment.
    EnvironmentPrepared,
    /// The container exists and initializers have run.
    ContextPrepared,
    /// Singletons and component sources are registered.
    ContextLoaded,
    /// The container has refreshed.
    ContextRefreshed,
    /// Runners are executing.
    Runners,
    /// The run is over, successfully or not.
    Finished,
}

impl Phase {
    /// Phase that follows this one on the success path.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Starting => Some(Self::EnvironmentPrepared),
            Self::EnvironmentPrepared => Some(Self::ContextPrepared),
            Self::ContextPrepared => Some(Self::ContextLoaded),
            Self::ContextLoaded => Some(Self::ContextRefreshed),
            Self::ContextRefreshed => Some(Self::Runners),
            Self::Runners => Some(Self::Finished),
            Self::Finished => None,
        }
    }
}

/// Ephemeral state of one orchestration call.
pub struct BootstrapRun {
    args: Vec<String>,
    sources: Vec<String>,
    started: Instant,
    phase: Option<Phase>,
    arguments: Option<CommandLineArgs>,
    environment: Option<ConfigurationEnvironment>,
    container: Option<Arc<dyn ApplicationContainer>>,
}

impl BootstrapRun {
    /// Creates the state for a run over `args` loading `sources`.
    #[must_use]
    pub fn new(args: Vec<String>, sources: Vec<String>) -> Self {
        Self {
            args,
            sources,
            started: Instant::now(),
            phase: None,
            arguments: None,
            environment: None,
            container: None,
        }
    }

    /// Moves to `next`.
    ///
    /// Phases advance one step at a time; `Finished` may be entered from any
    /// phase so failures can short-circuit.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::PhaseOrder`] for any other transition.
    pub fn advance(&mut self, next: Phase) -> Result<(), RunError> {
        let allowed = match self.phase {
            None => next == Phase::Starting,
            Some(Phase::Finished) => false,
            Some(_) if next == Phase::Finished => true,
            Some(current) => current.next() == Some(next),
        };
        if !allowed {
            return Err(RunError::PhaseOrder {
                current: self
                    .phase
                    .map_or_else(|| String::from("none"), |phase| phase.to_string()),
                next,
            });
        }
        self.phase = Some(next);
        Ok(())
    }

    /// Current phase, `None` before `Starting`.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Raw process arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Declared component sources.
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Time since the run was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Parsed arguments, once the environment is prepared.
    #[must_use]
    pub const fn arguments(&self) -> Option<&CommandLineArgs> {
        self.arguments.as_ref()
    }

    /// Prepared environment.
    #[must_use]
    pub const fn environment(&self) -> Option<&ConfigurationEnvironment> {
        self.environment.as_ref()
    }

    /// Container, once created.
    #[must_use]
    pub fn container(&self) -> Option<&Arc<dyn ApplicationContainer>> {
        self.container.as_ref()
    }

    pub(crate) fn set_arguments(&mut self, arguments: CommandLineArgs) {
        self.arguments = Some(arguments);
    }

    pub(crate) fn set_environment(&mut self, environment: ConfigurationEnvironment) {
        self.environment = Some(environment);
    }

    pub(crate) fn set_container(&mut self, container: Arc<dyn ApplicationContainer>) {
        self.container = Some(container);
    }
}

impl std::fmt::Debug for BootstrapRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapRun")
            .field("args", &self.args)
            .field("sources", &self.sources)
            .field("phase", &self.phase)
            .field("has_container", &self.container.is_some())
            .finish_non_exhaustive()
    }
}
