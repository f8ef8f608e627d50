use tracing::error;

use super::{DIAGNOSTICS_TARGET, FailureAnalysis};

/// Presents a [`FailureAnalysis`] to the operator.
pub trait FailureAnalysisReporter: Send + Sync {
    /// Reports the analysis.
    fn report(&self, analysis: &FailureAnalysis);
}

/// Logs the analysis at error level under a banner.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFailureAnalysisReporter;

impl LoggingFailureAnalysisReporter {
    /// Text logged for `analysis`.
    #[must_use]
    pub fn render(analysis: &FailureAnalysis) -> String {
        let mut report = String::from(
            "\n\n***************************\nAPPLICATION FAILED TO START\n***************************\n\n",
        );
        report.push_str("Description:\n\n");
        report.push_str(analysis.description());
        report.push('\n');
        if let Some(action) = analysis.action() {
            report.push_str("\nAction:\n\n");
            report.push_str(action);
            report.push('\n');
        }
        report
    }
}

impl FailureAnalysisReporter for LoggingFailureAnalysisReporter {
    fn report(&self, analysis: &FailureAnalysis) {
        error!(
            target: DIAGNOSTICS_TARGET,
            cause = analysis.cause(),
            "{}",
            Self::render(analysis)
        );
    }
}
