//! Command-line entry point for the liftoff bootstrap runtime.

use std::process::ExitCode;
use std::sync::Arc;

use liftoff::telemetry::TelemetryObserver;
use liftoff::{
    Application, ExceptionSuppressor, LoggingLifecycleObserver, SimpleContainerFactory, exit,
};

fn main() -> ExitCode {
    ExceptionSuppressor::install_panic_hook();
    let suppressor = Arc::new(ExceptionSuppressor::new());
    let application = Application::new(SimpleContainerFactory::new())
        .with_observer(TelemetryObserver)
        .with_observer(LoggingLifecycleObserver::new())
        .with_exception_suppressor(Arc::clone(&suppressor));
    let code = match application.run(std::env::args().skip(1)) {
        Ok(container) => exit(container.as_ref(), &[]),
        Err(failure) => suppressor.handle_uncaught(&failure).unwrap_or(1),
    };
    ExitCode::from(u8::try_from(code.rem_euclid(256)).unwrap_or(u8::MAX))
}
