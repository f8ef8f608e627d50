//! Bootstrap runtime for liftoff applications.
//!
//! An [`Application`] takes a process from its raw arguments to a refreshed
//! [`ApplicationContainer`] through a fixed sequence of [`Phase`]s. Along the
//! way it resolves the layered configuration with
//! [`liftoff_config::ConfigResolver`], notifies [`LifecycleObserver`]s over an
//! [`ObserverBus`], and drives the container's [`Runner`]s.
//!
//! When a phase fails the orchestrator:
//!
//! 1. computes an exit code from the container's [`ExitCodeMapper`]s, or from
//!    an [`ExitCodeError`] in the failure's cause chain;
//! 2. notifies `finished` exactly once;
//! 3. reports the failure through the [`FailureAnalyzers`] chain, falling back
//!    to logging the raw cause chain;
//! 4. closes the container and returns a [`RunFailure`].
//!
//! The outermost entry point hands that failure to an
//! [`ExceptionSuppressor`], which recognises failures that were already
//! reported and yields the exit code computed for them.
//!
//! ## Exit codes
//!
//! [`ExitCodeContributors`] folds contributions starting from zero: a
//! positive value wins when it exceeds the current code, and a negative value
//! wins when it is below it. A later negative value therefore overrides an
//! earlier positive one.

mod application;
mod container;
mod diagnostics;
mod error;
mod exit_code;
mod lifecycle;
mod phase;
mod process;
mod suppressor;
pub mod telemetry;

pub use application::Application;
pub use container::{
    ARGUMENTS_SINGLETON, ApplicationContainer, ContainerError, ContainerFactory,
    ContainerInitializer, ENVIRONMENT_SINGLETON, Runner, SimpleContainer, SimpleContainerFactory,
    Singleton,
};
pub use diagnostics::{
    CauseAnalyzer, ConfigLoadAnalyzer, FailureAnalysis, FailureAnalysisReporter, FailureAnalyzer,
    FailureAnalyzers, InvalidProfileAnalyzer, LoggingFailureAnalysisReporter, PortInUseAnalyzer,
    PortInUseError, find_cause,
};
pub use error::{BoxError, RunError, RunFailure, cause_chain};
pub use exit_code::{
    ExitCodeContributor, ExitCodeContributors, ExitCodeError, ExitCodeEvent, ExitCodeMapper, exit,
};
pub use lifecycle::{LifecycleObserver, LoggingLifecycleObserver, ObserverBus};
pub use phase::{BootstrapRun, Phase};
pub use process::{
    ApplicationPid, PidError, PidFileObserver, ShutdownError, ShutdownHook, TERMINATION_SIGNALS,
};
pub use suppressor::ExceptionSuppressor;

#[cfg(test)]
mod tests;
