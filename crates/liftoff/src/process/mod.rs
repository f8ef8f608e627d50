//! Process-level collaborators: PID persistence and the signal-driven
//! shutdown hook.

mod pid;
pub(crate) mod shutdown;

pub use pid::{ApplicationPid, PidError, PidFileObserver};
pub use shutdown::{ShutdownError, ShutdownHook, TERMINATION_SIGNALS};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
