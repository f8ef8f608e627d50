//! Failure analysis: turning a run failure into a human-readable diagnosis.
//!
//! Each [`FailureAnalyzer`] looks for one cause in the failure's
//! [`cause_chain`](crate::cause_chain). [`FailureAnalyzers`] consults them in
//! order and the first diagnosis wins. Analyzers never mutate the failure.

mod analyzers;
mod reporter;

use std::error::Error;
use std::fmt;
use std::sync::Arc;

pub use analyzers::{ConfigLoadAnalyzer, InvalidProfileAnalyzer, PortInUseAnalyzer, PortInUseError};
pub use reporter::{FailureAnalysisReporter, LoggingFailureAnalysisReporter};

use crate::error::cause_chain;

const DIAGNOSTICS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::diagnostics");

/// Structured diagnosis of a run failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureAnalysis {
    description: String,
    action: Option<String>,
    cause: String,
}

impl FailureAnalysis {
    /// Creates an analysis. `cause` is the rendered cause it was derived
    /// from.
    pub fn new(
        description: impl Into<String>,
        action: Option<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            action,
            cause: cause.into(),
        }
    }

    /// What went wrong.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Suggested remedy.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// The cause the analysis was derived from.
    #[must_use]
    pub fn cause(&self) -> &str {
        &self.cause
    }
}

/// Produces a diagnosis for failures it recognises.
pub trait FailureAnalyzer: Send + Sync {
    /// Analyses `failure`, returning `None` when it is not recognised.
    fn analyze(&self, failure: &(dyn Error + 'static)) -> Option<FailureAnalysis>;
}

/// Analyzer keyed on one concrete cause type.
///
/// Implementors get a [`FailureAnalyzer`] implementation that searches the
/// cause chain for the first `Cause`.
pub trait CauseAnalyzer: Send + Sync {
    /// Recognised cause type.
    type Cause: Error + 'static;

    /// Builds the analysis for a recognised cause.
    fn analyze_cause(
        &self,
        root: &(dyn Error + 'static),
        cause: &Self::Cause,
    ) -> Option<FailureAnalysis>;
}

impl<A: CauseAnalyzer> FailureAnalyzer for A {
    fn analyze(&self, failure: &(dyn Error + 'static)) -> Option<FailureAnalysis> {
        let cause = find_cause::<A::Cause>(failure)?;
        self.analyze_cause(failure, cause)
    }
}

/// First link of `failure`'s cause chain, `failure` included, of type `E`.
#[must_use]
pub fn find_cause<'a, E: Error + 'static>(failure: &'a (dyn Error + 'static)) -> Option<&'a E> {
    cause_chain(failure).find_map(|cause| cause.downcast_ref::<E>())
}

/// Ordered chain of analyzers.
#[derive(Clone)]
pub struct FailureAnalyzers {
    analyzers: Vec<Arc<dyn FailureAnalyzer>>,
}

impl FailureAnalyzers {
    /// Chain without analyzers.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    /// Appends an analyzer.
    #[must_use]
    pub fn with(mut self, analyzer: impl FailureAnalyzer + 'static) -> Self {
        self.analyzers.push(Arc::new(analyzer));
        self
    }

    /// Number of analyzers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    /// Returns whether the chain holds no analyzer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Diagnosis from the first analyzer recognising `failure`.
    #[must_use]
    pub fn analyze(&self, failure: &(dyn Error + 'static)) -> Option<FailureAnalysis> {
        self.analyzers
            .iter()
            .find_map(|analyzer| analyzer.analyze(failure))
    }
}

impl Default for FailureAnalyzers {
    /// Configuration load, invalid profile and port-in-use analyzers.
    fn default() -> Self {
        Self::empty()
            .with(ConfigLoadAnalyzer)
            .with(InvalidProfileAnalyzer)
            .with(PortInUseAnalyzer)
    }
}

impl fmt::Debug for FailureAnalyzers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureAnalyzers")
            .field("len", &self.analyzers.len())
            .finish()
    }
}
