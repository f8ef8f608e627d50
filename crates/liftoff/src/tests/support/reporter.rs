use std::sync::{Arc, Mutex};

use crate::{FailureAnalysis, FailureAnalysisReporter};

/// Reporter keeping every analysis it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    analyses: Arc<Mutex<Vec<FailureAnalysis>>>,
}

impl RecordingReporter {
    pub fn analyses(&self) -> Vec<FailureAnalysis> {
        self.analyses.lock().expect("reporter mutex poisoned").clone()
    }
}

impl FailureAnalysisReporter for RecordingReporter {
    fn report(&self, analysis: &FailureAnalysis) {
        self.analyses
            .lock()
            .expect("reporter mutex poisoned")
            .push(analysis.clone());
    }
}
