use std::collections::{BTreeMap, HashMap, VecDeque};

use parking_lot::Mutex;

use crate::model::ClassResult;

/// Work pool of classes awaiting analysis. Deduplicates by binary class
/// name; FIFO relative to first enqueue, so classes discovered during
/// analysis join the tail.
pub struct JobRegistry {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    statuses: HashMap<String, JobStatus>,
    queue: VecDeque<String>,
    pending: HashMap<String, ClassResult>,
    done: BTreeMap<String, ClassResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobStatus {
    Pending,
    InProgress,
    Done,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Registers a class for analysis. A class already known to the registry
    /// is left untouched, whatever its status.
    pub fn enqueue(&self, binary_name: &str) {
        let mut inner = self.inner.lock();
        if inner.statuses.contains_key(binary_name) {
            return;
        }
        inner
            .statuses
            .insert(binary_name.to_string(), JobStatus::Pending);
        inner.queue.push_back(binary_name.to_string());
        inner
            .pending
            .insert(binary_name.to_string(), ClassResult::new(binary_name));
    }

    /// Pops the oldest pending entry and marks it in-progress. The caller
    /// owns the `ClassResult` until it hands it back via [`mark_done`].
    ///
    /// [`mark_done`]: JobRegistry::mark_done
    pub fn next_pending(&self) -> Option<(String, ClassResult)> {
        let mut inner = self.inner.lock();
        while let Some(name) = inner.queue.pop_front() {
            if inner.statuses.get(&name) != Some(&JobStatus::Pending) {
                continue;
            }
            inner.statuses.insert(name.clone(), JobStatus::InProgress);
            let result = inner
                .pending
                .remove(&name)
                .unwrap_or_else(|| ClassResult::new(&name));
            return Some((name, result));
        }
        None
    }

    pub fn mark_done(&self, binary_name: &str, result: ClassResult) {
        let mut inner = self.inner.lock();
        inner
            .statuses
            .insert(binary_name.to_string(), JobStatus::Done);
        inner.done.insert(binary_name.to_string(), result);
    }

    /// All finished results, sorted by binary class name.
    pub fn into_results(self) -> Vec<ClassResult> {
        let inner = self.inner.into_inner();
        inner.done.into_values().collect()
    }
}
