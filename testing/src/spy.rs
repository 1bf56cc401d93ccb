//! Call recorder for asserting invocation order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared, ordered record of calls.
///
/// Clones share the same record, so one spy can be handed to several
/// capabilities and inspected after dispatch.
///
/// # Example
///
/// ```
/// use courier_testing::Spy;
///
/// let spy = Spy::new();
/// let handle = spy.clone();
/// handle.record("validator:high");
/// handle.record("handler");
///
/// assert_eq!(spy.calls(), vec!["validator:high", "handler"]);
/// assert!(spy.was_called("handler"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Spy {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Spy {
    /// Create an empty spy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call to the record
    pub fn record(&self, call: impl Into<String>) {
        self.lock().push(call.into());
    }

    /// Every recorded call, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Number of recorded calls
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Whether `call` was recorded at least once
    #[must_use]
    pub fn was_called(&self, call: &str) -> bool {
        self.lock().iter().any(|recorded| recorded == call)
    }

    /// Forget every recorded call
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_record() {
        let spy = Spy::new();
        spy.clone().record("a");
        spy.clone().record("b");
        assert_eq!(spy.count(), 2);
        assert!(!spy.was_called("c"));

        spy.clear();
        assert!(spy.calls().is_empty());
    }

    #[test]
    fn records_across_threads() {
        let spy = Spy::new();
        let workers: Vec<_> = (0..4)
            .map(|i| {
                let spy = spy.clone();
                std::thread::spawn(move || spy.record(format!("worker-{i}")))
            })
            .collect();
        for worker in workers {
            let _ = worker.join();
        }
        assert_eq!(spy.count(), 4);
    }
}
