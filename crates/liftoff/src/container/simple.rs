//! In-memory reference container.

use std::collections::BTreeMap;
use std::ffi::c_int;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use liftoff_config::ConfigurationEnvironment;
use thiserror::Error;
use tracing::debug;

use super::{ApplicationContainer, ContainerFactory, Runner, Singleton, sort_by_priority};
use crate::process::{ShutdownHook, TERMINATION_SIGNALS};
use crate::{BoxError, ExitCodeContributor, ExitCodeEvent, ExitCodeMapper};

const CONTAINER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::container");

/// Errors raised by [`SimpleContainer`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerError {
    /// The container was closed.
    #[error("the container is closed")]
    Closed,
    /// `refresh` was called twice.
    #[error("the container was already refreshed")]
    AlreadyRefreshed,
    /// A singleton with the same name exists.
    #[error("a singleton named '{name}' is already registered")]
    DuplicateSingleton {
        /// Singleton name.
        name: String,
    },
}

#[derive(Default)]
struct State {
    active: bool,
    closed: bool,
    singletons: BTreeMap<String, Singleton>,
    sources: Vec<String>,
    published: Vec<ExitCodeEvent>,
    shutdown_hook: Option<ShutdownHook>,
}

struct Inner {
    environment: ConfigurationEnvironment,
    runners: Vec<Arc<dyn Runner>>,
    mappers: Vec<Arc<dyn ExitCodeMapper>>,
    contributors: Vec<Arc<dyn ExitCodeContributor>>,
    state: Mutex<State>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        let mut state = self.state();
        if state.closed {
            return;
        }
        state.closed = true;
        state.active = false;
        state.singletons.clear();
        if let Some(hook) = state.shutdown_hook.take() {
            hook.disarm();
        }
        debug!(target: CONTAINER_TARGET, "container closed");
    }
}

/// Container keeping singletons in memory.
///
/// Runners and exit code collaborators are fixed by the
/// [`SimpleContainerFactory`] that built it. Clones share the same state.
#[derive(Clone)]
pub struct SimpleContainer {
    inner: Arc<Inner>,
}

impl SimpleContainer {
    /// Creates an empty container around `environment`.
    #[must_use]
    pub fn new(environment: ConfigurationEnvironment) -> Self {
        Self::assemble(environment, Vec::new(), Vec::new(), Vec::new())
    }

    fn assemble(
        environment: ConfigurationEnvironment,
        mut runners: Vec<Arc<dyn Runner>>,
        mappers: Vec<Arc<dyn ExitCodeMapper>>,
        contributors: Vec<Arc<dyn ExitCodeContributor>>,
    ) -> Self {
        sort_by_priority(&mut runners, |runner| runner.priority());
        Self {
            inner: Arc::new(Inner {
                environment,
                runners,
                mappers,
                contributors,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Sources loaded so far, in load order.
    #[must_use]
    pub fn sources(&self) -> Vec<String> {
        self.inner.state().sources.clone()
    }

    /// Exit code events received so far.
    #[must_use]
    pub fn published_exit_codes(&self) -> Vec<ExitCodeEvent> {
        self.inner.state().published.clone()
    }

    /// Returns whether the container was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state().closed
    }

    /// Returns whether a shutdown hook is listening.
    #[must_use]
    pub fn has_shutdown_hook(&self) -> bool {
        self.inner.state().shutdown_hook.is_some()
    }

    /// The hook holds the container weakly so that a container dropped
    /// without `close` also drops its listener.
    fn install_shutdown_hook(&self, signals: &[c_int]) -> Result<(), BoxError> {
        let mut state = self.open_state()?;
        if state.shutdown_hook.is_some() {
            return Ok(());
        }
        let inner = Arc::downgrade(&self.inner);
        let hook = ShutdownHook::install_for(signals, move || {
            if let Some(live) = inner.upgrade() {
                live.close();
            }
        })?;
        state.shutdown_hook = Some(hook);
        Ok(())
    }

    fn open_state(&self) -> Result<MutexGuard<'_, State>, ContainerError> {
        let state = self.inner.state();
        if state.closed {
            return Err(ContainerError::Closed);
        }
        Ok(state)
    }
}

impl fmt::Debug for SimpleContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("SimpleContainer")
            .field("active", &state.active)
            .field("closed", &state.closed)
            .field("singletons", &state.singletons.keys().collect::<Vec<_>>())
            .field("runners", &self.inner.runners.len())
            .finish_non_exhaustive()
    }
}

impl ApplicationContainer for SimpleContainer {
    fn environment(&self) -> ConfigurationEnvironment {
        self.inner.environment.clone()
    }

    fn register_singleton(&self, name: &str, value: Singleton) -> Result<(), BoxError> {
        let mut state = self.open_state()?;
        if state.singletons.contains_key(name) {
            return Err(ContainerError::DuplicateSingleton {
                name: name.to_owned(),
            }
            .into());
        }
        state.singletons.insert(name.to_owned(), value);
        Ok(())
    }

    fn singleton(&self, name: &str) -> Option<Singleton> {
        self.inner.state().singletons.get(name).cloned()
    }

    fn load_sources(&self, sources: &[String]) -> Result<(), BoxError> {
        let mut state = self.open_state()?;
        state.sources.extend(sources.iter().cloned());
        debug!(target: CONTAINER_TARGET, count = sources.len(), "loaded sources");
        Ok(())
    }

    fn refresh(&self) -> Result<(), BoxError> {
        let mut state = self.open_state()?;
        if state.active {
            return Err(ContainerError::AlreadyRefreshed.into());
        }
        state.active = true;
        debug!(target: CONTAINER_TARGET, "container refreshed");
        Ok(())
    }

    fn is_active(&self) -> bool {
        let state = self.inner.state();
        state.active && !state.closed
    }

    fn register_shutdown_hook(&self) -> Result<(), BoxError> {
        self.install_shutdown_hook(&TERMINATION_SIGNALS)
    }

    fn runners(&self) -> Vec<Arc<dyn Runner>> {
        self.inner.runners.clone()
    }

    fn exit_code_mappers(&self) -> Vec<Arc<dyn ExitCodeMapper>> {
        self.inner.mappers.clone()
    }

    fn exit_code_contributors(&self) -> Vec<Arc<dyn ExitCodeContributor>> {
        self.inner.contributors.clone()
    }

    fn publish_exit_code(&self, event: ExitCodeEvent) {
        debug!(target: CONTAINER_TARGET, exit_code = event.exit_code(), "exit code published");
        self.inner.state().published.push(event);
    }

    fn close(&self) -> Result<(), BoxError> {
        self.inner.close();
        Ok(())
    }
}

/// Builds [`SimpleContainer`]s carrying a fixed set of collaborators.
#[derive(Default, Clone)]
pub struct SimpleContainerFactory {
    runners: Vec<Arc<dyn Runner>>,
    mappers: Vec<Arc<dyn ExitCodeMapper>>,
    contributors: Vec<Arc<dyn ExitCodeContributor>>,
}

impl SimpleContainerFactory {
    /// Factory producing containers without collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a runner.
    #[must_use]
    pub fn with_runner(mut self, runner: impl Runner + 'static) -> Self {
        self.runners.push(Arc::new(runner));
        self
    }

    /// Adds an exit code mapper.
    #[must_use]
    pub fn with_exit_code_mapper(mut self, mapper: impl ExitCodeMapper + 'static) -> Self {
        self.mappers.push(Arc::new(mapper));
        self
    }

    /// Adds an exit code contributor.
    #[must_use]
    pub fn with_exit_code_contributor(
        mut self,
        contributor: impl ExitCodeContributor + 'static,
    ) -> Self {
        self.contributors.push(Arc::new(contributor));
        self
    }
}

impl fmt::Debug for SimpleContainerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleContainerFactory")
            .field("runners", &self.runners.len())
            .field("mappers", &self.mappers.len())
            .field("contributors", &self.contributors.len())
            .finish()
    }
}

impl ContainerFactory for SimpleContainerFactory {
    fn create(
        &self,
        environment: &ConfigurationEnvironment,
    ) -> Result<Arc<dyn ApplicationContainer>, BoxError> {
        Ok(Arc::new(SimpleContainer::assemble(
            environment.clone(),
            self.runners.clone(),
            self.mappers.clone(),
            self.contributors.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use signal_hook::consts::signal::SIGWINCH;
    use signal_hook::low_level::raise;

    use super::*;
    use crate::process::shutdown::eventually;
    use rstest::{fixture, rstest};

    #[fixture]
    fn container() -> SimpleContainer {
        SimpleContainer::new(ConfigurationEnvironment::new())
    }

    #[rstest]
    fn refresh_activates_once(container: SimpleContainer) {
        assert!(!container.is_active());
        container.refresh().expect("first refresh");
        assert!(container.is_active());
        let error = container.refresh().expect_err("second refresh must fail");
        assert_eq!(
            error.downcast_ref::<ContainerError>(),
            Some(&ContainerError::AlreadyRefreshed)
        );
    }

    #[rstest]
    fn duplicate_singletons_are_rejected(container: SimpleContainer) {
        container
            .register_singleton("answer", Arc::new(42_u32))
            .expect("register singleton");
        assert!(container.register_singleton("answer", Arc::new(0_u32)).is_err());
        let value = container.singleton("answer").expect("singleton present");
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));
    }

    #[rstest]
    fn close_is_idempotent_and_deactivates(container: SimpleContainer) {
        container.refresh().expect("refresh");
        container.close().expect("first close");
        container.close().expect("second close");
        assert!(container.is_closed());
        assert!(!container.is_active());
        assert!(container.load_sources(&["late".to_owned()]).is_err());
    }

    #[rstest]
    fn closing_disarms_the_shutdown_hook(container: SimpleContainer) {
        container.register_shutdown_hook().expect("install hook");
        assert!(container.has_shutdown_hook());
        container.close().expect("close");
        assert!(!container.has_shutdown_hook());
    }

    #[rstest]
    fn shutdown_hook_holds_the_container_weakly(container: SimpleContainer) {
        container.register_shutdown_hook().expect("install hook");
        assert_eq!(Arc::strong_count(&container.inner), 1);
    }

    // SIGWINCH is ignored by default, so the default action that follows the
    // close leaves the test process running.
    #[rstest]
    fn signal_closes_the_container(container: SimpleContainer) {
        container.refresh().expect("refresh");
        container
            .install_shutdown_hook(&[SIGWINCH])
            .expect("install hook");

        raise(SIGWINCH).expect("raise signal");

        assert!(eventually(|| container.is_closed()));
        assert!(!container.is_active());
        assert!(!container.has_shutdown_hook());
    }

    struct Named(&'static str, i32);

    impl Runner for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn priority(&self) -> i32 {
            self.1
        }

        fn run(&self, _arguments: &liftoff_config::CommandLineArgs) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[rstest]
    fn factory_orders_runners_by_priority() {
        let factory = SimpleContainerFactory::new()
            .with_runner(Named("late", 10))
            .with_runner(Named("early", -1))
            .with_runner(Named("middle", 0));
        let container = factory
            .create(&ConfigurationEnvironment::new())
            .expect("create container");
        let names: Vec<String> = container
            .runners()
            .iter()
            .map(|runner| runner.name().to_owned())
            .collect();
        assert_eq!(names, ["early", "middle", "late"]);
    }
}
