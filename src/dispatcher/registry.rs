//! Worker Registry
//!
//! Hands out worker identities and answers "may this worker poll?".
//! Workers are never removed: there is no heartbeat or expiry, so
//! `active_count` only grows until the process restarts.

use super::types::*;

use dashmap::DashMap;

pub struct WorkerRegistry {
    workers: DashMap<WorkerId, Worker>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            workers: DashMap::new(),
        }
    }

    /// Registers a worker under a fresh random id. Always succeeds.
    pub fn register(&self, hostname: &str, core_count: u32) -> Worker {
        let worker = Worker {
            id: WorkerId::new(),
            hostname: hostname.to_string(),
            core_count,
            authorized: true,
            registered_at: now_ms(),
        };

        self.workers.insert(worker.id.clone(), worker.clone());

        tracing::info!(
            "Registered worker {} ({} cores on {})",
            worker.id.0,
            core_count,
            hostname
        );

        worker
    }

    pub fn is_authorized(&self, worker_id: &WorkerId) -> bool {
        self.workers
            .get(worker_id)
            .map(|entry| entry.authorized)
            .unwrap_or(false)
    }

    pub fn get(&self, worker_id: &WorkerId) -> Option<Worker> {
        self.workers.get(worker_id).map(|entry| entry.value().clone())
    }

    /// Number of workers ever registered. Stale workers are still counted.
    pub fn active_count(&self) -> usize {
        self.workers.len()
    }

    /// Sum of advertised cores, for status logging.
    pub fn total_cores(&self) -> u64 {
        self.workers
            .iter()
            .map(|entry| entry.value().core_count as u64)
            .sum()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
