//! Exit code resolution.
//!
//! Contributors are evaluated in order starting from zero. A positive value
//! replaces the current code when it is greater; a negative value replaces it
//! when it is smaller. Because the comparison is against the signed current
//! code, a later negative contribution overrides an earlier positive one. A
//! contributor that fails counts as `1`, unless a code was already set.

use std::error::Error;
use std::fmt;

use tracing::{error, warn};

use crate::error::cause_chain;
use crate::{ApplicationContainer, BoxError};

const EXIT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::exit");

/// Supplies an exit code on demand.
#[cfg_attr(test, mockall::automock)]
pub trait ExitCodeContributor: Send + Sync {
    /// Computes the exit code.
    ///
    /// # Errors
    ///
    /// A failure is treated as code `1` by [`ExitCodeContributors`].
    fn exit_code(&self) -> Result<i32, BoxError>;
}

impl<F> ExitCodeContributor for F
where
    F: Fn() -> Result<i32, BoxError> + Send + Sync,
{
    fn exit_code(&self) -> Result<i32, BoxError> {
        self()
    }
}

/// Maps a run failure to an exit code; zero means "not mapped".
pub trait ExitCodeMapper: Send + Sync {
    /// Exit code for `error`.
    fn exit_code(&self, error: &(dyn Error + 'static)) -> i32;
}

impl<F> ExitCodeMapper for F
where
    F: Fn(&(dyn Error + 'static)) -> i32 + Send + Sync,
{
    fn exit_code(&self, error: &(dyn Error + 'static)) -> i32 {
        self(error)
    }
}

enum Contribution<'a> {
    Direct(&'a dyn ExitCodeContributor),
    Mapped(&'a dyn ExitCodeMapper, &'a (dyn Error + 'static)),
    Fixed(i32),
}

/// Ordered set of exit code contributions.
#[derive(Default)]
pub struct ExitCodeContributors<'a> {
    contributions: Vec<Contribution<'a>>,
}

impl<'a> ExitCodeContributors<'a> {
    /// Creates an empty set resolving to `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a contributor.
    pub fn add(&mut self, contributor: &'a dyn ExitCodeContributor) -> &mut Self {
        self.contributions.push(Contribution::Direct(contributor));
        self
    }

    /// Appends a fixed code.
    pub fn add_code(&mut self, code: i32) -> &mut Self {
        self.contributions.push(Contribution::Fixed(code));
        self
    }

    /// Appends `mapper` applied to `error`.
    pub fn add_mapped(
        &mut self,
        mapper: &'a dyn ExitCodeMapper,
        error: &'a (dyn Error + 'static),
    ) -> &mut Self {
        self.contributions.push(Contribution::Mapped(mapper, error));
        self
    }

    /// Number of contributions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    /// Returns whether no contribution was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    /// Aggregates the contributions into one code.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        let mut code = 0;
        for contribution in &self.contributions {
            let value = match contribution {
                Contribution::Direct(contributor) => match contributor.exit_code() {
                    Ok(value) => value,
                    Err(failure) => {
                        warn!(
                            target: EXIT_TARGET,
                            error = %failure,
                            "exit code contributor failed"
                        );
                        code = if code == 0 { 1 } else { code };
                        continue;
                    }
                },
                Contribution::Mapped(mapper, error) => mapper.exit_code(*error),
                Contribution::Fixed(value) => *value,
            };
            if (value > 0 && value > code) || (value < 0 && value < code) {
                code = value;
            }
        }
        code
    }
}

impl fmt::Debug for ExitCodeContributors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitCodeContributors")
            .field("len", &self.contributions.len())
            .finish()
    }
}

/// Error carrying an explicit exit code.
///
/// When no exit code mapper recognises a run failure, the failure's cause
/// chain is searched for this type.
#[derive(Debug)]
pub struct ExitCodeError {
    code: i32,
    message: String,
    source: Option<BoxError>,
}

impl ExitCodeError {
    /// Creates an error exiting with `code`.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying failure.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Exit code carried by the error.
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.code
    }

    /// First exit code found in `error`'s cause chain.
    #[must_use]
    pub fn find_in(error: &(dyn Error + 'static)) -> Option<i32> {
        cause_chain(error)
            .find_map(|cause| cause.downcast_ref::<Self>())
            .map(Self::code)
    }
}

impl fmt::Display for ExitCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (exit code {})", self.message, self.code)
    }
}

impl Error for ExitCodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

/// Published into the container when a non-zero exit code is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodeEvent {
    exit_code: i32,
}

impl ExitCodeEvent {
    /// Creates an event for `exit_code`.
    #[must_use]
    pub const fn new(exit_code: i32) -> Self {
        Self { exit_code }
    }

    /// Published exit code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

/// Computes the exit code of a finished application and closes its
/// container.
///
/// The container's own contributors are consulted first, then `contributors`.
/// A non-zero code is published as an [`ExitCodeEvent`]. If closing the
/// container fails, a non-zero code is kept and zero becomes `1`.
pub fn exit(container: &dyn ApplicationContainer, contributors: &[&dyn ExitCodeContributor]) -> i32 {
    let registered = container.exit_code_contributors();
    let mut set = ExitCodeContributors::new();
    for contributor in &registered {
        set.add(contributor.as_ref());
    }
    for contributor in contributors {
        set.add(*contributor);
    }
    let code = set.exit_code();
    if code != 0 {
        container.publish_exit_code(ExitCodeEvent::new(code));
    }
    match container.close() {
        Ok(()) => code,
        Err(failure) => {
            error!(
                target: EXIT_TARGET,
                error = %failure,
                "failed to close the application container"
            );
            if code == 0 { 1 } else { code }
        }
    }
}
