//! Result Broker
//!
//! One single-resolution slot per submitted task id. A worker resolves the
//! slot with its `TaskResult`; a waiting client consumes it exactly once.
//!
//! Each slot is a `watch` channel holding `Option<TaskResult>`:
//! - `resolve` flips `None -> Some` once and wakes every waiter.
//! - `await_and_consume` waits for `Some` under a deadline, then removes the
//!   slot. Only the caller that wins the removal gets the result.
//! - A timed-out wait leaves the slot in place. If the result arrives later it
//!   stays in memory until someone consumes it (no TTL eviction).

use super::types::*;
use crate::error::SchedulerError;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;
use tokio::sync::watch;

type Slot = watch::Sender<Option<TaskResult>>;

pub struct ResultBroker {
    slots: DashMap<TaskId, Slot>,
}

impl ResultBroker {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Allocates the slot for a freshly submitted task.
    ///
    /// Fails if the id already has a slot (queued, executing or resolved but
    /// not yet consumed).
    pub fn create_pending(&self, task_id: &TaskId) -> Result<(), SchedulerError> {
        match self.slots.entry(task_id.clone()) {
            Entry::Occupied(_) => Err(SchedulerError::Validation(format!(
                "task id {} is already in use",
                task_id.0
            ))),
            Entry::Vacant(vacant) => {
                let (tx, _rx) = watch::channel(None);
                vacant.insert(tx);
                Ok(())
            }
        }
    }

    /// Drops a slot without resolving it (used when the queue rejects a task).
    pub fn discard(&self, task_id: &TaskId) {
        self.slots.remove(task_id);
    }

    /// Resolves the slot for `result.task_id`.
    ///
    /// Returns `false` when there is no slot (unknown or already consumed) or
    /// the slot was already resolved; the result is dropped in both cases.
    pub fn resolve(&self, result: TaskResult) -> bool {
        let task_id = result.task_id.clone();

        let Some(slot) = self.slots.get(&task_id) else {
            tracing::debug!("No pending slot for task {}, dropping result", task_id.0);
            return false;
        };

        let resolved = slot.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(result);
                true
            } else {
                false
            }
        });

        if !resolved {
            tracing::warn!("Task {} was already resolved, ignoring duplicate", task_id.0);
        }

        resolved
    }

    /// Waits until the slot is resolved or `deadline` elapses, then consumes it.
    ///
    /// Dropping the returned future (e.g. on client disconnect) abandons the
    /// wait without touching the slot.
    pub async fn await_and_consume(
        &self,
        task_id: &TaskId,
        deadline: Duration,
    ) -> Result<TaskResult, SchedulerError> {
        let mut rx = match self.slots.get(task_id) {
            Some(slot) => slot.subscribe(),
            None => return Err(SchedulerError::NotFound(task_id.0.clone())),
        };

        let waited = tokio::time::timeout(deadline, async {
            rx.wait_for(Option::is_some).await.map(|_| ())
        })
        .await;

        match waited {
            Err(_) => {
                tracing::debug!("Wait for task {} timed out after {:?}", task_id.0, deadline);
                return Err(SchedulerError::Timeout(deadline));
            }
            // Sender dropped: another caller consumed the slot.
            Ok(Err(_)) => return Err(SchedulerError::NotFound(task_id.0.clone())),
            Ok(Ok(())) => {}
        }

        match self.slots.remove(task_id) {
            Some((_, slot)) => slot
                .send_replace(None)
                .ok_or_else(|| SchedulerError::NotFound(task_id.0.clone())),
            None => Err(SchedulerError::NotFound(task_id.0.clone())),
        }
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.slots.contains_key(task_id)
    }

    pub fn is_resolved(&self, task_id: &TaskId) -> bool {
        self.slots
            .get(task_id)
            .map(|slot| slot.borrow().is_some())
            .unwrap_or(false)
    }

    /// Slots not yet consumed, resolved or not.
    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for ResultBroker {
    fn default() -> Self {
        Self::new()
    }
}
