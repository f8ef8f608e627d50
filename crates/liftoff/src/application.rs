//! The bootstrap orchestrator.
//!
//! [`Application::run`] drives one run through the [`Phase`]s in order:
//!
//! 1. `STARTING`: observers are notified.
//! 2. `ENVIRONMENT_PREPARED`: the base environment receives defaults,
//!    additional profiles and the command-line layer, then the
//!    [`ConfigResolver`] inserts configuration files.
//! 3. `CONTEXT_PREPARED`: the container is created and initializers run.
//! 4. `CONTEXT_LOADED`: startup singletons and component sources are loaded.
//! 5. `CONTEXT_REFRESHED`: the container refreshes and the shutdown hook is
//!    registered.
//! 6. `RUNNERS`: the container's runners are invoked by priority.
//! 7. `FINISHED`: startup info is logged and observers are notified.
//!
//! Any failure jumps to the failure path, which computes the exit code,
//! notifies `finished` once, reports the failure, closes the container and
//! returns a [`RunFailure`].

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use liftoff_config::defaults::{
    APPLICATION_NAME_KEY, DEFAULT_APPLICATION_NAME, DEFAULT_PROPERTIES_LAYER,
};
use liftoff_config::{
    CommandLineArgs, ConfigResolver, ConfigurationEnvironment, ConfigurationLayer,
    FileSystemResourceLoader, ResourceLoader,
};
use tracing::{debug, error, info, warn};

use crate::container::{ARGUMENTS_SINGLETON, ENVIRONMENT_SINGLETON, sort_by_priority};
use crate::error::cause_chain;
use crate::{
    ApplicationContainer, BootstrapRun, ContainerFactory, ContainerInitializer,
    ExceptionSuppressor, ExitCodeContributors, ExitCodeError, ExitCodeEvent, FailureAnalysisReporter,
    FailureAnalyzers, LifecycleObserver, LoggingFailureAnalysisReporter, ObserverBus, Phase,
    RunError, RunFailure,
};

const RUN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::run");

type SharedResources = Box<dyn ResourceLoader + Send + Sync>;

/// Orchestrates the startup of one application.
pub struct Application {
    factory: Arc<dyn ContainerFactory>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
    initializers: Vec<Arc<dyn ContainerInitializer>>,
    resources: SharedResources,
    resolver: ConfigResolver,
    environment: Option<ConfigurationEnvironment>,
    default_properties: Option<ConfigurationLayer>,
    additional_profiles: Vec<String>,
    sources: Vec<String>,
    add_command_line_layer: bool,
    log_startup_info: bool,
    register_shutdown_hook: bool,
    analyzers: FailureAnalyzers,
    reporter: Arc<dyn FailureAnalysisReporter>,
    suppressor: Option<Arc<ExceptionSuppressor>>,
}

impl Application {
    /// Creates an orchestrator building its container with `factory`.
    ///
    /// Configuration files are searched relative to the current directory
    /// with the default search locations, the process environment forms the
    /// base environment, and failures are analysed by the default analyzers.
    pub fn new(factory: impl ContainerFactory + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            observers: Vec::new(),
            initializers: Vec::new(),
            resources: Box::new(FileSystemResourceLoader::current_dir()),
            resolver: ConfigResolver::new(),
            environment: None,
            default_properties: None,
            additional_profiles: Vec::new(),
            sources: Vec::new(),
            add_command_line_layer: true,
            log_startup_info: true,
            register_shutdown_hook: true,
            analyzers: FailureAnalyzers::default(),
            reporter: Arc::new(LoggingFailureAnalysisReporter),
            suppressor: None,
        }
    }

    /// Registers a lifecycle observer.
    #[must_use]
    pub fn with_observer(mut self, observer: impl LifecycleObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Registers a shared lifecycle observer.
    #[must_use]
    pub fn with_shared_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Registers a container initializer.
    #[must_use]
    pub fn with_initializer(mut self, initializer: impl ContainerInitializer + 'static) -> Self {
        self.initializers.push(Arc::new(initializer));
        sort_by_priority(&mut self.initializers, |initializer| initializer.priority());
        self
    }

    /// Replaces the resource access used to probe configuration files.
    #[must_use]
    pub fn with_resources(mut self, resources: impl ResourceLoader + Send + Sync + 'static) -> Self {
        self.resources = Box::new(resources);
        self
    }

    /// Replaces the configuration resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ConfigResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Uses `environment` as the base environment instead of
    /// [`ConfigurationEnvironment::standard`].
    #[must_use]
    pub fn with_environment(mut self, environment: ConfigurationEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets the lowest-precedence `defaultProperties` layer.
    #[must_use]
    pub fn with_default_properties<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.default_properties = Some(ConfigurationLayer::new(DEFAULT_PROPERTIES_LAYER, entries));
        self
    }

    /// Activates `profiles` in addition to any configured ones.
    #[must_use]
    pub fn with_additional_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_profiles.extend(profiles.into_iter().map(Into::into));
        self
    }

    /// Declares component sources loaded at `CONTEXT_LOADED`.
    #[must_use]
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Controls whether process arguments become the `commandLineArgs`
    /// layer.
    #[must_use]
    pub const fn with_command_line_layer(mut self, enabled: bool) -> Self {
        self.add_command_line_layer = enabled;
        self
    }

    /// Controls startup info logging.
    #[must_use]
    pub const fn with_startup_info(mut self, enabled: bool) -> Self {
        self.log_startup_info = enabled;
        self
    }

    /// Controls whether the container's shutdown hook is registered.
    #[must_use]
    pub const fn with_shutdown_hook(mut self, enabled: bool) -> Self {
        self.register_shutdown_hook = enabled;
        self
    }

    /// Replaces the failure analyzers.
    #[must_use]
    pub fn with_analyzers(mut self, analyzers: FailureAnalyzers) -> Self {
        self.analyzers = analyzers;
        self
    }

    /// Replaces the failure reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl FailureAnalysisReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Registers reported failures and exit codes with `suppressor`.
    #[must_use]
    pub fn with_exception_suppressor(mut self, suppressor: Arc<ExceptionSuppressor>) -> Self {
        self.suppressor = Some(suppressor);
        self
    }

    /// Runs the application over `args`, excluding the program name.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] carrying the first failure and the exit code
    /// computed for it. The failure has already been reported and the
    /// container, if any, closed.
    pub fn run<I, S>(&self, args: I) -> Result<Arc<dyn ApplicationContainer>, RunFailure>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut run = BootstrapRun::new(
            args.into_iter().map(Into::into).collect(),
            self.sources.clone(),
        );
        let bus = ObserverBus::new(self.observers.clone());
        let container = match self.drive(&mut run, &bus) {
            Ok(container) => container,
            Err(failure) => return Err(self.fail(&mut run, &bus, failure, false)),
        };
        if let Err(failure) = run.advance(Phase::Finished) {
            return Err(self.fail(&mut run, &bus, failure, false));
        }
        if self.log_startup_info {
            log_started(&run, &container.environment());
        }
        match bus.finished(Some(container.as_ref()), None) {
            Ok(()) => Ok(container),
            Err(promoted) => Err(self.fail(&mut run, &bus, promoted, true)),
        }
    }

    fn drive(
        &self,
        run: &mut BootstrapRun,
        bus: &ObserverBus,
    ) -> Result<Arc<dyn ApplicationContainer>, RunError> {
        run.advance(Phase::Starting)?;
        if self.log_startup_info {
            info!(target: RUN_TARGET, sources = ?run.sources(), "starting application");
        }
        bus.starting(run);

        run.advance(Phase::EnvironmentPrepared)?;
        let (arguments, environment) = self.prepare_environment(run.args(), bus)?;
        run.set_arguments(arguments.clone());
        run.set_environment(environment.clone());

        run.advance(Phase::ContextPrepared)?;
        let container = self
            .factory
            .create(&environment)
            .map_err(|source| RunError::Container { source })?;
        run.set_container(Arc::clone(&container));
        self.prepare_container(container.as_ref(), &environment, bus)?;

        run.advance(Phase::ContextLoaded)?;
        load_container(container.as_ref(), &arguments, &environment, run.sources())?;
        bus.context_loaded(container.as_ref());

        run.advance(Phase::ContextRefreshed)?;
        container
            .refresh()
            .map_err(|source| RunError::Refresh { source })?;
        if self.register_shutdown_hook {
            container
                .register_shutdown_hook()
                .map_err(|source| RunError::ShutdownHook { source })?;
        }

        run.advance(Phase::Runners)?;
        call_runners(container.as_ref(), &arguments)?;
        Ok(container)
    }

    fn prepare_environment(
        &self,
        args: &[String],
        bus: &ObserverBus,
    ) -> Result<(CommandLineArgs, ConfigurationEnvironment), RunError> {
        let mut environment = self
            .environment
            .clone()
            .unwrap_or_else(ConfigurationEnvironment::standard);
        if let Some(defaults) = &self.default_properties {
            let merged = environment
                .layer(DEFAULT_PROPERTIES_LAYER)
                .map_or_else(|| defaults.clone(), |existing| existing.overlaid_by(defaults));
            environment.add_last(merged);
        }
        for profile in &self.additional_profiles {
            environment.add_active_profile(profile.as_str());
        }
        let arguments =
            CommandLineArgs::parse(args).map_err(|source| RunError::Environment { source })?;
        if self.add_command_line_layer {
            arguments.apply_to(&mut environment);
        }
        let summary = self
            .resolver
            .resolve(&mut environment, self.resources.as_ref())
            .map_err(|source| RunError::Environment { source })?;
        debug!(
            target: RUN_TARGET,
            loaded = ?summary.loaded_layers(),
            profiles = ?summary.processed_profiles(),
            "configuration resolved"
        );
        bus.environment_prepared(&mut environment);
        Ok((arguments, environment))
    }

    fn prepare_container(
        &self,
        container: &dyn ApplicationContainer,
        environment: &ConfigurationEnvironment,
        bus: &ObserverBus,
    ) -> Result<(), RunError> {
        for initializer in &self.initializers {
            initializer
                .initialize(container)
                .map_err(|source| RunError::Initializer {
                    initializer: initializer.name().to_owned(),
                    source,
                })?;
        }
        if self.log_startup_info {
            log_profiles(environment);
        }
        bus.context_prepared(container);
        Ok(())
    }

    fn fail(
        &self,
        run: &mut BootstrapRun,
        bus: &ObserverBus,
        failure: RunError,
        finished_notified: bool,
    ) -> RunFailure {
        let error = Arc::new(failure);
        let container = run.container().cloned();
        let exit_code = failure_exit_code(container.as_deref(), &error);
        if exit_code != 0 {
            if let Some(active) = container.as_deref().filter(|candidate| candidate.is_active()) {
                active.publish_exit_code(ExitCodeEvent::new(exit_code));
            }
            if let Some(suppressor) = &self.suppressor {
                suppressor.register_exit_code(exit_code);
            }
        }
        if !finished_notified {
            if let Err(order) = run.advance(Phase::Finished) {
                debug!(target: RUN_TARGET, error = %order, "run already finished");
            }
            if let Err(observer) = bus.finished(container.as_deref(), Some(error.as_ref())) {
                warn!(target: RUN_TARGET, error = %observer, "finished notification failed");
            }
        }
        self.report(&error);
        let reported = RunFailure::new(error, exit_code);
        if let Some(suppressor) = &self.suppressor {
            suppressor.register_failure(&reported);
        }
        if let Some(owned) = container {
            if let Err(close) = owned.close() {
                warn!(target: RUN_TARGET, error = %close, "failed to close the application container");
            }
        }
        reported
    }

    fn report(&self, failure: &RunError) {
        if let Some(analysis) = self.analyzers.analyze(failure) {
            self.reporter.report(&analysis);
            return;
        }
        let causes: Vec<String> = cause_chain(failure).map(ToString::to_string).collect();
        error!(
            target: RUN_TARGET,
            phase = ?failure.phase(),
            error = %failure,
            causes = ?causes,
            "application run failed"
        );
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("observers", &self.observers.len())
            .field("initializers", &self.initializers.len())
            .field("resolver", &self.resolver)
            .field("additional_profiles", &self.additional_profiles)
            .field("sources", &self.sources)
            .field("add_command_line_layer", &self.add_command_line_layer)
            .field("log_startup_info", &self.log_startup_info)
            .field("register_shutdown_hook", &self.register_shutdown_hook)
            .field("analyzers", &self.analyzers)
            .finish_non_exhaustive()
    }
}

fn load_container(
    container: &dyn ApplicationContainer,
    arguments: &CommandLineArgs,
    environment: &ConfigurationEnvironment,
    sources: &[String],
) -> Result<(), RunError> {
    container
        .register_singleton(ARGUMENTS_SINGLETON, Arc::new(arguments.clone()))
        .and_then(|()| {
            container.register_singleton(ENVIRONMENT_SINGLETON, Arc::new(environment.clone()))
        })
        .and_then(|()| container.load_sources(sources))
        .map_err(|source| RunError::Load { source })
}

fn call_runners(
    container: &dyn ApplicationContainer,
    arguments: &CommandLineArgs,
) -> Result<(), RunError> {
    let mut runners = container.runners();
    sort_by_priority(&mut runners, |runner| runner.priority());
    for runner in runners {
        debug!(target: RUN_TARGET, runner = runner.name(), "invoking runner");
        runner.run(arguments).map_err(|source| RunError::Runner {
            runner: runner.name().to_owned(),
            source,
        })?;
    }
    Ok(())
}

/// Exit code for a failed run.
///
/// The container's mappers are consulted only when it became active. When
/// they yield zero, an [`ExitCodeError`] in the cause chain decides.
fn failure_exit_code(container: Option<&dyn ApplicationContainer>, failure: &RunError) -> i32 {
    let mut exit_code = 0;
    if let Some(active) = container.filter(|candidate| candidate.is_active()) {
        let mappers = active.exit_code_mappers();
        let mut contributors = ExitCodeContributors::new();
        for mapper in &mappers {
            contributors.add_mapped(mapper.as_ref(), failure);
        }
        exit_code = contributors.exit_code();
    }
    if exit_code == 0 {
        exit_code = ExitCodeError::find_in(failure).unwrap_or(0);
    }
    exit_code
}

fn application_name(environment: &ConfigurationEnvironment) -> Cow<'_, str> {
    environment
        .get_property(APPLICATION_NAME_KEY)
        .unwrap_or(Cow::Borrowed(DEFAULT_APPLICATION_NAME))
}

fn log_profiles(environment: &ConfigurationEnvironment) {
    let active = environment.active_profiles();
    if active.is_empty() {
        info!(
            target: RUN_TARGET,
            defaults = ?environment.default_profiles(),
            "no active profile set, falling back to the default profiles"
        );
    } else {
        info!(target: RUN_TARGET, profiles = ?active, "the following profiles are active");
    }
}

fn log_started(run: &BootstrapRun, environment: &ConfigurationEnvironment) {
    let elapsed = run.elapsed();
    info!(
        target: RUN_TARGET,
        application = %application_name(environment),
        profiles = ?environment.active_profiles(),
        elapsed_ms = elapsed.as_millis(),
        "started {} in {:.3} seconds",
        application_name(environment),
        elapsed.as_secs_f64()
    );
}
