use std::sync::{Arc, Mutex};

use liftoff_config::{CommandLineArgs, ConfigurationEnvironment};

use super::Journal;
use crate::{
    ApplicationContainer, BoxError, ContainerFactory, ContainerInitializer, ExitCodeContributor,
    ExitCodeError, ExitCodeEvent, ExitCodeMapper, Runner, SimpleContainerFactory, Singleton,
};

/// Container delegating to a [`crate::SimpleContainer`] and journaling the
/// calls the orchestrator makes.
pub struct RecordingContainer {
    inner: Arc<dyn ApplicationContainer>,
    journal: Journal,
    fail_refresh: bool,
}

impl RecordingContainer {
    pub fn is_closed(&self) -> bool {
        self.journal.count("container:close") > 0
    }
}

impl ApplicationContainer for RecordingContainer {
    fn environment(&self) -> ConfigurationEnvironment {
        self.inner.environment()
    }

    fn register_singleton(&self, name: &str, value: Singleton) -> Result<(), BoxError> {
        self.journal.record(format!("container:singleton {name}"));
        self.inner.register_singleton(name, value)
    }

    fn singleton(&self, name: &str) -> Option<Singleton> {
        self.inner.singleton(name)
    }

    fn load_sources(&self, sources: &[String]) -> Result<(), BoxError> {
        self.journal
            .record(format!("container:sources {}", sources.join(",")));
        self.inner.load_sources(sources)
    }

    fn refresh(&self) -> Result<(), BoxError> {
        self.journal.record("container:refresh");
        if self.fail_refresh {
            return Err("wiring failed".into());
        }
        self.inner.refresh()
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn register_shutdown_hook(&self) -> Result<(), BoxError> {
        self.journal.record("container:shutdown-hook");
        Ok(())
    }

    fn runners(&self) -> Vec<Arc<dyn Runner>> {
        self.inner.runners()
    }

    fn exit_code_mappers(&self) -> Vec<Arc<dyn ExitCodeMapper>> {
        self.inner.exit_code_mappers()
    }

    fn exit_code_contributors(&self) -> Vec<Arc<dyn ExitCodeContributor>> {
        self.inner.exit_code_contributors()
    }

    fn publish_exit_code(&self, event: ExitCodeEvent) {
        self.journal
            .record(format!("container:exit-code {}", event.exit_code()));
        self.inner.publish_exit_code(event);
    }

    fn close(&self) -> Result<(), BoxError> {
        self.journal.record("container:close");
        self.inner.close()
    }
}

/// Factory producing [`RecordingContainer`]s and remembering the last one.
#[derive(Clone)]
pub struct RecordingFactory {
    journal: Journal,
    inner: SimpleContainerFactory,
    fail_create: bool,
    fail_refresh: bool,
    created: Arc<Mutex<Option<Arc<RecordingContainer>>>>,
}

impl RecordingFactory {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            inner: SimpleContainerFactory::new(),
            fail_create: false,
            fail_refresh: false,
            created: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_runner(mut self, runner: impl Runner + 'static) -> Self {
        self.inner = self.inner.with_runner(runner);
        self
    }

    pub fn with_mapper(mut self, mapper: impl ExitCodeMapper + 'static) -> Self {
        self.inner = self.inner.with_exit_code_mapper(mapper);
        self
    }

    pub fn with_contributor(mut self, contributor: impl ExitCodeContributor + 'static) -> Self {
        self.inner = self.inner.with_exit_code_contributor(contributor);
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    pub fn created(&self) -> Option<Arc<RecordingContainer>> {
        self.created.lock().expect("factory mutex poisoned").clone()
    }
}

impl ContainerFactory for RecordingFactory {
    fn create(
        &self,
        environment: &ConfigurationEnvironment,
    ) -> Result<Arc<dyn ApplicationContainer>, BoxError> {
        self.journal.record("factory:create");
        if self.fail_create {
            return Err("factory unavailable".into());
        }
        let container = Arc::new(RecordingContainer {
            inner: self.inner.create(environment)?,
            journal: self.journal.clone(),
            fail_refresh: self.fail_refresh,
        });
        *self.created.lock().expect("factory mutex poisoned") = Some(Arc::clone(&container));
        Ok(container)
    }
}

/// Runner journaling `runner:{name} {args}`.
pub struct RecordingRunner {
    name: String,
    priority: i32,
    journal: Journal,
    fail: bool,
}

impl RecordingRunner {
    pub fn new(name: &str, priority: i32, journal: Journal) -> Self {
        Self {
            name: name.to_owned(),
            priority,
            journal,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Runner for RecordingRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn run(&self, arguments: &CommandLineArgs) -> Result<(), BoxError> {
        self.journal.record(format!(
            "runner:{} {}",
            self.name,
            arguments.non_option_args().join(",")
        ));
        if self.fail {
            return Err(format!("{} failed", self.name).into());
        }
        Ok(())
    }
}

/// Initializer failing with an explicit exit code.
pub struct FailingInitializer {
    pub code: i32,
}

impl ContainerInitializer for FailingInitializer {
    fn name(&self) -> &str {
        "failing-initializer"
    }

    fn initialize(&self, _container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        Err(ExitCodeError::new(self.code, "initializer refused the container").into())
    }
}
