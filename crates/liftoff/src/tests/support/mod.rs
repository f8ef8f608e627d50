//! Test doubles shared by the orchestrator suites.
//!
//! Every double writes into one [`Journal`] so tests can assert on the
//! interleaving of observer notifications and container calls.

mod container;
mod journal;
mod observer;
mod reporter;

pub use container::{FailingInitializer, RecordingContainer, RecordingFactory, RecordingRunner};
pub use journal::Journal;
pub use observer::RecordingObserver;
pub use reporter::RecordingReporter;

use std::sync::Arc;

use liftoff_config::{ConfigResolver, ConfigurationEnvironment, MemoryResourceLoader};

use crate::{Application, ExceptionSuppressor};

/// Collaborators for one orchestrator run.
pub struct Harness {
    pub journal: Journal,
    pub reporter: RecordingReporter,
    pub suppressor: Arc<ExceptionSuppressor>,
    pub factory: RecordingFactory,
    pub resources: MemoryResourceLoader,
}

impl Harness {
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            factory: RecordingFactory::new(journal.clone()),
            journal,
            reporter: RecordingReporter::default(),
            suppressor: Arc::new(ExceptionSuppressor::new()),
            resources: MemoryResourceLoader::new(),
        }
    }

    /// Adds a classpath file.
    pub fn file(&mut self, name: &str, contents: &str) {
        self.resources.insert(format!("classpath:/{name}"), contents);
    }

    /// Observer named `name` writing into the journal.
    pub fn observer(&self, name: &str) -> RecordingObserver {
        RecordingObserver::new(name, self.journal.clone())
    }

    /// Application searching only `classpath:/`, with an empty base
    /// environment and no shutdown hook.
    pub fn application(&self) -> Application {
        Application::new(self.factory.clone())
            .with_environment(ConfigurationEnvironment::new())
            .with_resources(self.resources.clone())
            .with_resolver(ConfigResolver::new().with_search_locations(["classpath:/"]))
            .with_reporter(self.reporter.clone())
            .with_exception_suppressor(Arc::clone(&self.suppressor))
            .with_shutdown_hook(false)
    }
}
