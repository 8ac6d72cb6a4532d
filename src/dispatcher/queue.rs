//! Priority Task Queue
//!
//! Holds submitted tasks until a worker polls for one. Ordering is
//! priority-descending, then submission-ascending (strict FIFO inside a
//! priority bucket).
//!
//! ## Responsibilities
//! - **Ordering**: a max-heap over `(priority, Reverse(enqueue stamp), Reverse(sequence))`.
//! - **Atomic hand-off**: `pop` removes the head under the same lock that
//!   observed it, so a task is never returned twice or skipped.
//! - **Capacity**: unbounded by default; an optional limit rejects pushes.
//!
//! Once popped, a task is gone. There is no lease and no redelivery.

use super::types::*;
use crate::error::SchedulerError;

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// A task sitting in the heap together with its ordering keys.
#[derive(Debug)]
struct QueuedTask {
    task: Task,
    /// Monotonic stamp taken under the queue lock.
    enqueued_at: Instant,
    /// Tie-break for identical `Instant`s on coarse clocks.
    seq: u64,
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.task
            .priority
            .cmp(&other.task.priority)
            .then_with(|| other.enqueued_at.cmp(&self.enqueued_at))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

#[derive(Debug, Default)]
struct QueueState {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
}

/// Thread-safe priority queue of pending tasks.
#[derive(Debug)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    capacity: Option<usize>,
}

impl TaskQueue {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Creates a queue that rejects pushes once `capacity` tasks are waiting.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            capacity,
        }
    }

    /// Enqueues a task. Fails only when a capacity is configured and reached.
    pub fn push(&self, task: Task) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();

        if let Some(capacity) = self.capacity {
            if state.heap.len() >= capacity {
                return Err(SchedulerError::QueueFull(format!(
                    "{} tasks already queued",
                    capacity
                )));
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;

        tracing::trace!(
            "Enqueued task {} (priority {:?}, seq {})",
            task.id.0,
            task.priority,
            seq
        );

        state.heap.push(QueuedTask {
            task,
            enqueued_at: Instant::now(),
            seq,
        });

        Ok(())
    }

    /// Removes and returns the highest priority, oldest task.
    pub fn pop(&self) -> Option<Task> {
        self.state.lock().heap.pop().map(|queued| queued.task)
    }

    /// Returns a copy of the head without removing it.
    pub fn peek(&self) -> Option<Task> {
        self.state.lock().heap.peek().map(|queued| queued.task.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
