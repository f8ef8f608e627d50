//! Contract between the orchestrator and the component container, plus an
//! in-memory reference container.
//!
//! The orchestrator never wires application objects itself. It creates a
//! container through a [`ContainerFactory`], feeds it the resolved
//! environment and startup singletons, asks it to refresh, and finally drives
//! the [`Runner`]s and exit code collaborators the container exposes.

mod simple;

use std::any::Any;
use std::sync::Arc;

use liftoff_config::{CommandLineArgs, ConfigurationEnvironment};

use crate::{BoxError, ExitCodeContributor, ExitCodeEvent, ExitCodeMapper};

pub use simple::{ContainerError, SimpleContainer, SimpleContainerFactory};

/// Singleton name under which the parsed command line is registered.
pub const ARGUMENTS_SINGLETON: &str = "applicationArguments";

/// Singleton name under which the resolved environment is registered.
pub const ENVIRONMENT_SINGLETON: &str = "environment";

/// Shared singleton value.
pub type Singleton = Arc<dyn Any + Send + Sync>;

/// Component container driven through the startup phases.
pub trait ApplicationContainer: Send + Sync {
    /// Snapshot of the environment the container was created with.
    fn environment(&self) -> ConfigurationEnvironment;

    /// Registers a named singleton.
    ///
    /// # Errors
    ///
    /// Fails when the name is taken or the container is closed.
    fn register_singleton(&self, name: &str, value: Singleton) -> Result<(), BoxError>;

    /// Looks up a registered singleton.
    fn singleton(&self, name: &str) -> Option<Singleton>;

    /// Loads the declared component sources.
    ///
    /// # Errors
    ///
    /// Fails when a source cannot be loaded.
    fn load_sources(&self, sources: &[String]) -> Result<(), BoxError>;

    /// Performs the container's own wiring. The container is active once
    /// this succeeds.
    ///
    /// # Errors
    ///
    /// Fails when wiring fails or the container was already refreshed.
    fn refresh(&self) -> Result<(), BoxError>;

    /// Returns whether the container refreshed and has not been closed.
    fn is_active(&self) -> bool;

    /// Arranges for the container to close when the process is asked to
    /// terminate.
    ///
    /// # Errors
    ///
    /// Fails when the hook cannot be installed.
    fn register_shutdown_hook(&self) -> Result<(), BoxError>;

    /// Run callbacks, in the order they should be invoked.
    fn runners(&self) -> Vec<Arc<dyn Runner>>;

    /// Mappers consulted when a run fails.
    fn exit_code_mappers(&self) -> Vec<Arc<dyn ExitCodeMapper>>;

    /// Contributors consulted by [`exit`](crate::exit).
    fn exit_code_contributors(&self) -> Vec<Arc<dyn ExitCodeContributor>>;

    /// Receives the exit code computed for the process.
    fn publish_exit_code(&self, event: ExitCodeEvent);

    /// Releases everything the container holds. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Fails when a held resource cannot be released.
    fn close(&self) -> Result<(), BoxError>;
}

impl std::fmt::Debug for dyn ApplicationContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContainer").finish_non_exhaustive()
    }
}

impl<T: ApplicationContainer + ?Sized> ApplicationContainer for Arc<T> {
    fn environment(&self) -> ConfigurationEnvironment {
        (**self).environment()
    }

    fn register_singleton(&self, name: &str, value: Singleton) -> Result<(), BoxError> {
        (**self).register_singleton(name, value)
    }

    fn singleton(&self, name: &str) -> Option<Singleton> {
        (**self).singleton(name)
    }

    fn load_sources(&self, sources: &[String]) -> Result<(), BoxError> {
        (**self).load_sources(sources)
    }

    fn refresh(&self) -> Result<(), BoxError> {
        (**self).refresh()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn register_shutdown_hook(&self) -> Result<(), BoxError> {
        (**self).register_shutdown_hook()
    }

    fn runners(&self) -> Vec<Arc<dyn Runner>> {
        (**self).runners()
    }

    fn exit_code_mappers(&self) -> Vec<Arc<dyn ExitCodeMapper>> {
        (**self).exit_code_mappers()
    }

    fn exit_code_contributors(&self) -> Vec<Arc<dyn ExitCodeContributor>> {
        (**self).exit_code_contributors()
    }

    fn publish_exit_code(&self, event: ExitCodeEvent) {
        (**self).publish_exit_code(event);
    }

    fn close(&self) -> Result<(), BoxError> {
        (**self).close()
    }
}

/// Creates the container for a run.
#[cfg_attr(test, mockall::automock)]
pub trait ContainerFactory: Send + Sync {
    /// Builds a container around the resolved environment.
    ///
    /// # Errors
    ///
    /// Fails when the container cannot be constructed.
    fn create(
        &self,
        environment: &ConfigurationEnvironment,
    ) -> Result<Arc<dyn ApplicationContainer>, BoxError>;
}

impl<F> ContainerFactory for F
where
    F: Fn(&ConfigurationEnvironment) -> Result<Arc<dyn ApplicationContainer>, BoxError>
        + Send
        + Sync,
{
    fn create(
        &self,
        environment: &ConfigurationEnvironment,
    ) -> Result<Arc<dyn ApplicationContainer>, BoxError> {
        self(environment)
    }
}

/// Callback applied to a freshly created container before it is loaded.
pub trait ContainerInitializer: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Application order; lower values run first.
    fn priority(&self) -> i32 {
        0
    }

    /// Prepares the container.
    ///
    /// # Errors
    ///
    /// A failure aborts the run.
    fn initialize(&self, container: &dyn ApplicationContainer) -> Result<(), BoxError>;
}

/// Callback invoked once the container has refreshed.
pub trait Runner: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Invocation order; lower values run first.
    fn priority(&self) -> i32 {
        0
    }

    /// Runs with the parsed command line.
    ///
    /// # Errors
    ///
    /// A failure aborts the run.
    fn run(&self, arguments: &CommandLineArgs) -> Result<(), BoxError>;
}

/// Stable sort by ascending priority.
pub(crate) fn sort_by_priority<T: ?Sized>(items: &mut [Arc<T>], priority: impl Fn(&T) -> i32) {
    items.sort_by_key(|item| priority(item.as_ref()));
}
