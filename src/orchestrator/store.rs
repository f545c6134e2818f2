//! In-memory scan job store.

use crate::core::ScanJob;

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Scan jobs keyed by id.
///
/// Stands in for an external datastore: every read hands out a snapshot
/// and every write goes through [`update`](Self::update), so callers never
/// hold a job across an await point.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, ScanJob>>,
}

impl JobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, ScanJob>> {
        self.jobs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, ScanJob>> {
        self.jobs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts or replaces a job.
    pub fn insert(&self, job: ScanJob) {
        self.write().insert(job.id, job);
    }

    /// Returns a snapshot of the job.
    pub fn get(&self, id: &Uuid) -> Option<ScanJob> {
        self.read().get(id).cloned()
    }

    /// Applies `f` to the stored job. Returns `None` if there is no such job.
    pub fn update<R>(&self, id: &Uuid, f: impl FnOnce(&mut ScanJob) -> R) -> Option<R> {
        self.write().get_mut(id).map(f)
    }

    /// Removes a job and returns it.
    pub fn remove(&self, id: &Uuid) -> Option<ScanJob> {
        self.write().remove(id)
    }

    /// Returns snapshots of every job, oldest first.
    pub fn list(&self) -> Vec<ScanJob> {
        let mut jobs: Vec<ScanJob> = self.read().values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Returns the number of stored jobs.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
