//! Signal-driven shutdown hook.
//!
//! The hook replaces the default disposition of the termination signals, so
//! after the callback has run the listener re-enacts that disposition and
//! the process still terminates the way it would have without the hook.

use std::ffi::c_int;
use std::io;
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use signal_hook::low_level::emulate_default_handler;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::PROCESS_TARGET;

/// Signals the hook listens for by default.
pub const TERMINATION_SIGNALS: [c_int; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Errors reported while installing the shutdown hook.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener thread could not be spawned.
    #[error("failed to spawn the shutdown listener: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Background listener that runs a callback on the first termination signal
/// and then applies the signal's default action.
///
/// Dropping or [`disarm`](ShutdownHook::disarm)ing the hook stops the
/// listener without running the callback.
#[derive(Debug)]
pub struct ShutdownHook {
    handle: Handle,
    listener: JoinHandle<()>,
}

impl ShutdownHook {
    /// Installs handlers for [`TERMINATION_SIGNALS`] and spawns a thread that
    /// invokes `on_signal` when one arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the handlers or thread cannot be set up.
    pub fn install<F>(on_signal: F) -> Result<Self, ShutdownError>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::install_for(&TERMINATION_SIGNALS, on_signal)
    }

    /// Installs the hook for an explicit set of signals.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the handlers or thread cannot be set up.
    pub fn install_for<F>(signals: &[c_int], on_signal: F) -> Result<Self, ShutdownError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut registered =
            Signals::new(signals).map_err(|source| ShutdownError::Install { source })?;
        let handle = registered.handle();
        let listener = thread::Builder::new()
            .name("liftoff-shutdown".to_owned())
            .spawn(move || {
                let Some(signal) = registered.forever().next() else {
                    return;
                };
                info!(target: PROCESS_TARGET, signal, "shutdown signal received");
                on_signal();
                if let Err(error) = emulate_default_handler(signal) {
                    warn!(
                        target: PROCESS_TARGET,
                        signal,
                        error = %error,
                        "failed to apply the default signal action"
                    );
                }
            })
            .map_err(|source| ShutdownError::Spawn { source })?;
        debug!(target: PROCESS_TARGET, ?signals, "shutdown hook installed");
        Ok(Self { handle, listener })
    }

    /// Stops listening. The callback will not run afterwards.
    pub fn disarm(&self) {
        if !self.handle.is_closed() {
            self.handle.close();
            debug!(target: PROCESS_TARGET, "shutdown hook disarmed");
        }
    }

    /// Returns whether the hook stopped listening.
    #[must_use]
    pub fn is_disarmed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Returns whether the listener thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.listener.is_finished()
    }
}

impl Drop for ShutdownHook {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Polls `condition` for up to two seconds.
#[cfg(test)]
pub(crate) fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(std::time::Duration::from_millis(10));
    }
    condition()
}
