//! Writes the current process identifier to a file.

use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use liftoff_config::defaults::{DEFAULT_PID_FILE, PID_FILE_KEY};
use tempfile::Builder;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;
use crate::{ApplicationContainer, BoxError, LifecycleObserver};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Errors raised while persisting the process identifier.
#[derive(Debug, Error)]
pub enum PidError {
    /// The identifier is not known.
    #[error("no process identifier is available")]
    Unavailable,
    /// The target directory could not be created.
    #[error("failed to create the directory for '{path}': {source}")]
    Directory {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file could not be written.
    #[error("failed to write the process identifier to '{path}': {source}")]
    Write {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Process identifier of the running application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationPid {
    pid: Option<u32>,
}

impl ApplicationPid {
    /// Identifier of the current process.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Some(std::process::id()))
    }

    /// Wraps a known or unknown identifier.
    #[must_use]
    pub const fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    /// The identifier, when known.
    #[must_use]
    pub const fn value(&self) -> Option<u32> {
        self.pid
    }

    /// Writes the identifier to `path`, creating parent directories.
    ///
    /// Readers never observe a partially written file: the contents are
    /// flushed to a temporary sibling which is then renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`PidError::Unavailable`] when the identifier is unknown, or
    /// an IO failure.
    pub fn write(&self, path: &Utf8Path) -> Result<(), PidError> {
        let pid = self.pid.ok_or(PidError::Unavailable)?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(directory).map_err(|source| PidError::Directory {
            path: path.to_owned(),
            source,
        })?;
        atomic_write(directory, path, pid.to_string().as_bytes()).map_err(|source| {
            PidError::Write {
                path: path.to_owned(),
                source,
            }
        })
    }
}

fn atomic_write(directory: &Utf8Path, path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let mut builder = Builder::new();
    builder.prefix(path.file_name().unwrap_or("liftoff"));
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        builder.permissions(Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

/// Writes the PID file once the container has loaded.
///
/// The target comes from an explicit path or else the
/// `liftoff.pid.file` property, defaulting to `application.pid`.
#[derive(Debug, Default, Clone)]
pub struct PidFileObserver {
    path: Option<Utf8PathBuf>,
}

impl PidFileObserver {
    /// Observer reading its target from the environment.
    #[must_use]
    pub const fn new() -> Self {
        Self { path: None }
    }

    /// Observer writing to a fixed path.
    #[must_use]
    pub fn with_path(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl LifecycleObserver for PidFileObserver {
    fn name(&self) -> &str {
        "pid-file"
    }

    fn context_loaded(&self, container: &dyn ApplicationContainer) -> Result<(), BoxError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => container
                .environment()
                .get_property(PID_FILE_KEY)
                .map_or_else(
                    || Utf8PathBuf::from(DEFAULT_PID_FILE),
                    |value| Utf8PathBuf::from(value.into_owned()),
                ),
        };
        let pid = ApplicationPid::current();
        pid.write(&path)?;
        info!(target: PROCESS_TARGET, path = %path, pid = ?pid.value(), "wrote PID file");
        Ok(())
    }
}
