//! Per-label in-flight tracking

use std::collections::HashSet;
use std::sync::Mutex;

/// Set of label keys with a pass currently running
#[derive(Default)]
pub(crate) struct InFlight {
    labels: Mutex<HashSet<String>>,
}

impl InFlight {
    /// Claim `key`, or `None` if a pass for it is already running
    pub(crate) fn try_claim(&self, key: &str) -> Option<InFlightGuard<'_>> {
        let inserted = self.labels.lock().unwrap().insert(key.to_string());
        inserted.then(|| InFlightGuard {
            owner: self,
            key: key.to_string(),
        })
    }
}

/// Releases its label key when dropped
pub(crate) struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut labels) = self.owner.labels.lock() {
            labels.remove(&self.key);
        }
    }
}
