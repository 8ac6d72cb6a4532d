//! Job Record Store
//!
//! External persistence collaborator keyed by task id. The scheduler writes to
//! it on submit and on result, best-effort: a failing store is logged and never
//! turns into a scheduling error.

use super::types::*;

use anyhow::Result;
use axum::http::HeaderMap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Header carrying the caller id stamped on job records.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Owner id used when the request carries no identity.
pub const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub task_id: TaskId,
    pub task_type: String,
    pub status: TaskStatus,
    pub owner_id: String,
    pub priority: Priority,
    pub submitted_at: u64,
    pub completed_at: Option<u64>,
}

pub trait JobStore: Send + Sync {
    fn record_submitted(&self, record: JobRecord) -> Result<()>;

    fn record_finished(&self, task_id: &TaskId, status: TaskStatus, completed_at: u64)
    -> Result<()>;

    fn get(&self, task_id: &TaskId) -> Option<JobRecord>;
}

/// Default store: an in-process map.
pub struct InMemoryJobStore {
    records: DashMap<TaskId, JobRecord>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for InMemoryJobStore {
    fn record_submitted(&self, record: JobRecord) -> Result<()> {
        self.records.insert(record.task_id.clone(), record);
        Ok(())
    }

    fn record_finished(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        completed_at: u64,
    ) -> Result<()> {
        let mut record = self
            .records
            .get_mut(task_id)
            .ok_or_else(|| anyhow::anyhow!("No job record for task {}", task_id.0))?;

        record.status = status;
        record.completed_at = Some(completed_at);
        Ok(())
    }

    fn get(&self, task_id: &TaskId) -> Option<JobRecord> {
        self.records.get(task_id).map(|entry| entry.value().clone())
    }
}

/// Resolves the caller id from request headers, defaulting to `"anonymous"`.
///
/// Only used to stamp job records. Clients are never authorized.
pub fn caller_identity(headers: &HeaderMap) -> String {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}
