//! Lifecycle observers and the synchronous bus that notifies them.

use std::sync::Arc;

use liftoff_config::ConfigurationEnvironment;
use tracing::{info, warn};

use crate::{ApplicationContainer, BootstrapRun, BoxError, Phase, RunError};

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer notified at each phase transition of a run.
///
/// Every notification defaults to a no-op. A failure in any notification but
/// [`finished`](LifecycleObserver::finished) is logged and ignored.
pub trait LifecycleObserver: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Notification order; lower values are notified first.
    fn priority(&self) -> i32 {
        0
    }

    /// The run has started.
    fn starting(&self, _run: &BootstrapRun) -> Result<(), BoxError> {
        Ok(())
    }

    /// Configuration is resolved. Observers may adjust the environment before
    /// the container is created.
    fn environment_prepared(
        &self,
        _environment: &mut ConfigurationEnvironment,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// The container exists and initializers have run.
    fn context_prepared(&self, _container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        Ok(())
    }

    /// Component sources are loaded.
    fn context_loaded(&self, _container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        Ok(())
    }

    /// The run is over. `error` is `None` on success.
    fn finished(
        &self,
        _container: Option<&dyn ApplicationContainer>,
        _error: Option<&RunError>,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<T> LifecycleObserver for Arc<T>
where
    T: LifecycleObserver + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn priority(&self) -> i32 {
        (**self).priority()
    }

    fn starting(&self, run: &BootstrapRun) -> Result<(), BoxError> {
        (**self).starting(run)
    }

    fn environment_prepared(
        &self,
        environment: &mut ConfigurationEnvironment,
    ) -> Result<(), BoxError> {
        (**self).environment_prepared(environment)
    }

    fn context_prepared(&self, container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        (**self).context_prepared(container)
    }

    fn context_loaded(&self, container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        (**self).context_loaded(container)
    }

    fn finished(
        &self,
        container: Option<&dyn ApplicationContainer>,
        error: Option<&RunError>,
    ) -> Result<(), BoxError> {
        (**self).finished(container, error)
    }
}

/// Ordered multicast of lifecycle notifications.
///
/// Observers are sorted once by ascending priority; observers sharing a
/// priority keep their registration order.
#[derive(Clone, Default)]
pub struct ObserverBus {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl ObserverBus {
    /// Builds a bus over `observers`.
    #[must_use]
    pub fn new(mut observers: Vec<Arc<dyn LifecycleObserver>>) -> Self {
        observers.sort_by_key(|observer| observer.priority());
        Self { observers }
    }

    /// Observers in notification order.
    #[must_use]
    pub fn observers(&self) -> &[Arc<dyn LifecycleObserver>] {
        &self.observers
    }

    /// Notifies `starting`.
    pub fn starting(&self, run: &BootstrapRun) {
        for observer in &self.observers {
            tolerate(observer.as_ref(), Phase::Starting, observer.starting(run));
        }
    }

    /// Notifies `environment_prepared`.
    pub fn environment_prepared(&self, environment: &mut ConfigurationEnvironment) {
        for observer in &self.observers {
            let outcome = observer.environment_prepared(environment);
            tolerate(observer.as_ref(), Phase::EnvironmentPrepared, outcome);
        }
    }

    /// Notifies `context_prepared`.
    pub fn context_prepared(&self, container: &dyn ApplicationContainer) {
        for observer in &self.observers {
            let outcome = observer.context_prepared(container);
            tolerate(observer.as_ref(), Phase::ContextPrepared, outcome);
        }
    }

    /// Notifies `context_loaded`.
    pub fn context_loaded(&self, container: &dyn ApplicationContainer) {
        for observer in &self.observers {
            let outcome = observer.context_loaded(container);
            tolerate(observer.as_ref(), Phase::ContextLoaded, outcome);
        }
    }

    /// Notifies `finished` to every observer.
    ///
    /// When the run already failed, observer failures are logged and
    /// swallowed. On success the first observer failure is returned so the
    /// caller can fail the run; the remaining observers are still notified.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Observer`] for the first failing observer of a
    /// successful run.
    pub fn finished(
        &self,
        container: Option<&dyn ApplicationContainer>,
        error: Option<&RunError>,
    ) -> Result<(), RunError> {
        let mut promoted = None;
        for observer in &self.observers {
            let Err(source) = observer.finished(container, error) else {
                continue;
            };
            if error.is_some() || promoted.is_some() {
                log_swallowed(observer.as_ref(), Phase::Finished, &source);
            } else {
                promoted = Some(RunError::Observer {
                    observer: observer.name().to_owned(),
                    phase: Phase::Finished,
                    source,
                });
            }
        }
        promoted.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for ObserverBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.observers.iter().map(|observer| observer.name()).collect();
        f.debug_struct("ObserverBus").field("observers", &names).finish()
    }
}

fn tolerate(observer: &dyn LifecycleObserver, phase: Phase, outcome: Result<(), BoxError>) {
    if let Err(error) = outcome {
        log_swallowed(observer, phase, &error);
    }
}

fn log_swallowed(observer: &dyn LifecycleObserver, phase: Phase, error: &BoxError) {
    warn!(
        target: LIFECYCLE_TARGET,
        observer = observer.name(),
        phase = %phase,
        error = %error,
        "lifecycle observer failed"
    );
}

/// Observer that records every transition with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingLifecycleObserver;

impl LoggingLifecycleObserver {
    /// Builds a new observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleObserver for LoggingLifecycleObserver {
    fn name(&self) -> &str {
        "logging"
    }

    fn starting(&self, run: &BootstrapRun) -> Result<(), BoxError> {
        info!(
            target: LIFECYCLE_TARGET,
            event = "starting",
            args = run.args().len(),
            sources = run.sources().len(),
            "application starting"
        );
        Ok(())
    }

    fn environment_prepared(
        &self,
        environment: &mut ConfigurationEnvironment,
    ) -> Result<(), BoxError> {
        info!(
            target: LIFECYCLE_TARGET,
            event = "environment_prepared",
            layers = environment.layers().len(),
            profiles = ?environment.active_profiles(),
            "configuration environment prepared"
        );
        Ok(())
    }

    fn context_prepared(&self, container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        info!(
            target: LIFECYCLE_TARGET,
            event = "context_prepared",
            active = container.is_active(),
            "application container prepared"
        );
        Ok(())
    }

    fn context_loaded(&self, container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        info!(
            target: LIFECYCLE_TARGET,
            event = "context_loaded",
            active = container.is_active(),
            "application container loaded"
        );
        Ok(())
    }

    fn finished(
        &self,
        _container: Option<&dyn ApplicationContainer>,
        error: Option<&RunError>,
    ) -> Result<(), BoxError> {
        match error {
            None => info!(target: LIFECYCLE_TARGET, event = "finished", "application run finished"),
            Some(error) => tracing::error!(
                target: LIFECYCLE_TARGET,
                event = "failed",
                error = %error,
                "application run failed"
            ),
        }
        Ok(())
    }
}
