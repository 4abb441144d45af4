// src/dispatch/queue.rs

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::types::JobId;

/// Jobs known to be queued but not yet claimed by the dispatch loop.
///
/// Semantics:
/// - `pending` holds job ids in notification order. A job id is held at most
///   once, whether pending or deferred.
/// - A job refused by admission control is moved to `deferred`. Deferred
///   jobs go back to the front of `pending` when [`PendingJobs::retry_deferred`]
///   is called (after another job completed, or after the retry interval).
///
/// Pure bookkeeping: no channels, no Tokio, no dispatcher access.
#[derive(Debug, Default)]
pub struct PendingJobs {
    pending: VecDeque<JobId>,
    deferred: VecDeque<JobId>,
    known: HashSet<JobId>,
}

impl PendingJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a queued job. Returns false if it was already held.
    pub fn push(&mut self, id: JobId) -> bool {
        if !self.known.insert(id) {
            debug!(job = id, "job already pending; ignoring duplicate notification");
            return false;
        }
        self.pending.push_back(id);
        true
    }

    /// Next pending job, removed from the set.
    pub fn pop(&mut self) -> Option<JobId> {
        let id = self.pending.pop_front()?;
        self.known.remove(&id);
        Some(id)
    }

    pub fn defer(&mut self, id: JobId) {
        if self.known.insert(id) {
            self.deferred.push_back(id);
        }
    }

    /// Move every deferred job back in front of the pending ones, keeping
    /// their relative order.
    pub fn retry_deferred(&mut self) -> usize {
        let count = self.deferred.len();
        while let Some(id) = self.deferred.pop_back() {
            self.pending.push_front(id);
        }
        if count > 0 {
            debug!(count, "retrying deferred jobs");
        }
        count
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.deferred.is_empty()
    }
}
