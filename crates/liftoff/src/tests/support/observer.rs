use liftoff_config::ConfigurationEnvironment;

use super::Journal;
use crate::{ApplicationContainer, BootstrapRun, BoxError, LifecycleObserver, Phase, RunError};

/// Observer journaling `{name}:{PHASE}` for every notification.
#[derive(Debug, Clone)]
pub struct RecordingObserver {
    name: String,
    priority: i32,
    journal: Journal,
    fail_at: Option<Phase>,
}

impl RecordingObserver {
    pub fn new(name: &str, journal: Journal) -> Self {
        Self {
            name: name.to_owned(),
            priority: 0,
            journal,
            fail_at: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn failing_at(mut self, phase: Phase) -> Self {
        self.fail_at = Some(phase);
        self
    }

    fn notify(&self, phase: Phase, detail: &str) -> Result<(), BoxError> {
        self.journal.record(format!("{}:{phase}{detail}", self.name));
        if self.fail_at == Some(phase) {
            return Err(format!("{} refused {phase}", self.name).into());
        }
        Ok(())
    }
}

impl LifecycleObserver for RecordingObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn starting(&self, _run: &BootstrapRun) -> Result<(), BoxError> {
        self.notify(Phase::Starting, "")
    }

    fn environment_prepared(
        &self,
        _environment: &mut ConfigurationEnvironment,
    ) -> Result<(), BoxError> {
        self.notify(Phase::EnvironmentPrepared, "")
    }

    fn context_prepared(&self, _container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        self.notify(Phase::ContextPrepared, "")
    }

    fn context_loaded(&self, _container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        self.notify(Phase::ContextLoaded, "")
    }

    fn finished(
        &self,
        container: Option<&dyn ApplicationContainer>,
        error: Option<&RunError>,
    ) -> Result<(), BoxError> {
        let detail = format!(
            " container={} error={}",
            container.is_some(),
            error.map_or_else(|| "none".to_owned(), ToString::to_string)
        );
        self.notify(Phase::Finished, &detail)
    }
}
