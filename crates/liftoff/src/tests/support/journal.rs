use std::sync::{Arc, Mutex};

/// Ordered, shared record of calls made during a run.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .expect("journal mutex poisoned")
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("journal mutex poisoned").clone()
    }

    /// Entries starting with `prefix`, in order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.starts_with(prefix))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.matching(prefix).len()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|known| known == entry)
    }
}
