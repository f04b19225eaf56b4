//! In-process cancellation tokens
//!
//! The job record is the authoritative cancellation signal. The registry adds
//! a `watch` flag per running job so a cancel issued in this process is seen
//! at the next step boundary without waiting on a repository read, and it
//! tells recovery which unfinished jobs still have a live execution.

use crate::domain::JobId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Receiving side handed to one job execution
#[derive(Debug, Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Registry of running executions
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    inner: Arc<Mutex<HashMap<JobId, watch::Sender<bool>>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, watch::Sender<bool>>> {
        // The map holds no invariants a panicking holder could break
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a running job and return its token
    pub fn register(&self, job_id: JobId) -> CancellationToken {
        let (tx, rx) = watch::channel(false);
        self.lock().insert(job_id, tx);
        CancellationToken { rx }
    }

    /// Flag a running job as cancelled; returns false if it is not running here
    pub fn cancel(&self, job_id: &JobId) -> bool {
        match self.lock().get(job_id) {
            Some(tx) => {
                tx.send_replace(true);
                true
            }
            None => false,
        }
    }

    /// Drop a job once its execution finished
    pub fn remove(&self, job_id: &JobId) {
        self.lock().remove(job_id);
    }

    /// Whether a job has a live execution in this process
    pub fn is_active(&self, job_id: &JobId) -> bool {
        self.lock().contains_key(job_id)
    }

    /// Ids of jobs with a live execution
    pub fn active(&self) -> Vec<JobId> {
        self.lock().keys().copied().collect()
    }
}

/// Removes a job from the registry when dropped
pub(crate) struct Registration {
    registry: CancellationRegistry,
    job_id: JobId,
}

impl Registration {
    pub(crate) fn new(registry: CancellationRegistry, job_id: JobId) -> (Self, CancellationToken) {
        let token = registry.register(job_id);
        (Self { registry, job_id }, token)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(&self.job_id);
    }
}
