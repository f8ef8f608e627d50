//! Deduplicates failures that the orchestrator already reported.
//!
//! The orchestrator registers every failure it logs together with the exit
//! code it computed. When that failure reaches the outermost entry point, the
//! suppressor recognises it, stays quiet, and hands back the exit code. Any
//! other failure is passed on to the parent handler, which logs it.

use std::error::Error;
use std::panic;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::OnceCell;
use tracing::error;

use crate::error::cause_chain;
use crate::{RunError, RunFailure};

const SUPPRESSOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::suppressor");
const LOG_CONFIGURATION_MESSAGE: &str = "logging configuration error";

static PANIC_HOOK: OnceCell<()> = OnceCell::new();

#[derive(Default)]
struct SuppressorState {
    registered: Vec<Arc<RunError>>,
    exit_code: i32,
}

/// Handler for failures escaping a run.
#[derive(Default)]
pub struct ExceptionSuppressor {
    state: Mutex<SuppressorState>,
}

impl ExceptionSuppressor {
    /// Creates a suppressor with nothing registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SuppressorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `failure` as already reported.
    pub fn register_failure(&self, failure: &RunFailure) {
        let mut state = self.state();
        if !state
            .registered
            .iter()
            .any(|registered| Arc::ptr_eq(registered, failure.shared()))
        {
            state.registered.push(Arc::clone(failure.shared()));
        }
    }

    /// Records the exit code the process should end with.
    pub fn register_exit_code(&self, exit_code: i32) {
        self.state().exit_code = exit_code;
    }

    /// Last registered exit code.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.state().exit_code
    }

    /// Returns whether `failure` was already reported.
    #[must_use]
    pub fn is_registered(&self, failure: &(dyn Error + 'static)) -> bool {
        let Some(reported) = failure.downcast_ref::<RunFailure>() else {
            return false;
        };
        self.state()
            .registered
            .iter()
            .any(|registered| Arc::ptr_eq(registered, reported.shared()))
    }

    /// Handles a failure that reached the outermost entry point.
    ///
    /// Failures not registered beforehand, and logging configuration
    /// failures, are logged at error level. The registered set is then
    /// cleared. Returns the registered exit code when it is non-zero.
    pub fn handle_uncaught(&self, failure: &(dyn Error + 'static)) -> Option<i32> {
        if is_log_configuration_failure(failure) || !self.is_registered(failure) {
            log_parent(failure);
        }
        let mut state = self.state();
        state.registered.clear();
        (state.exit_code != 0).then_some(state.exit_code)
    }

    /// Installs a panic hook that logs the panic through `tracing` before
    /// delegating to the previous hook. Installing twice is a no-op.
    pub fn install_panic_hook() {
        PANIC_HOOK.get_or_init(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                error!(target: SUPPRESSOR_TARGET, panic = %info, "application panicked");
                previous(info);
            }));
        });
    }
}

impl std::fmt::Debug for ExceptionSuppressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ExceptionSuppressor")
            .field("registered", &state.registered.len())
            .field("exit_code", &state.exit_code)
            .finish()
    }
}

fn is_log_configuration_failure(failure: &(dyn Error + 'static)) -> bool {
    cause_chain(failure).any(|cause| cause.to_string().contains(LOG_CONFIGURATION_MESSAGE))
}

fn log_parent(failure: &(dyn Error + 'static)) {
    let chain: Vec<String> = cause_chain(failure).map(ToString::to_string).collect();
    error!(
        target: SUPPRESSOR_TARGET,
        error = %failure,
        causes = ?chain,
        "application failed"
    );
}
