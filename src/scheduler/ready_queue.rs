//! Ready queue.
//!
//! Holds processes that are eligible to run but have no CPU. All ordering
//! work happens at enqueue time, so dequeue is always head-first.
//!
//! # Ordering
//! - **Arrival**: append at the tail (FCFS, Round-Robin).
//! - **Priority**: descending `static_priority`; a new process goes behind
//!   every queued process of equal or higher priority (static priority).
//!
//! # Complexity
//! Dequeue O(1). Priority insertion O(log n) search plus O(n) shift.

use log::trace;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::models::{Pid, ProcessRef, ProcessState};

/// Queue ordering discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOrder {
    /// Arrival order.
    Fifo,
    /// Priority order, ties in arrival order.
    Priority,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<ProcessRef>,
    closed: bool,
}

/// Lock-protected ready queue with a "became non-empty" condition.
#[derive(Debug)]
pub struct ReadyQueue {
    order: QueueOrder,
    state: Mutex<QueueState>,
    not_empty: Condvar,
}

impl ReadyQueue {
    /// Creates an empty queue.
    pub fn new(order: QueueOrder) -> Self {
        Self {
            order,
            state: Mutex::new(QueueState::default()),
            not_empty: Condvar::new(),
        }
    }

    /// Inserts a `Ready` process according to the queue order.
    ///
    /// Wakes every waiter if the queue was empty.
    ///
    /// # Panics
    /// If the process is not `Ready`.
    pub fn enqueue(&self, process: ProcessRef) {
        assert_eq!(
            process.state(),
            ProcessState::Ready,
            "process {} enqueued while not READY",
            process.id()
        );

        let mut state = self.lock();
        let was_empty = state.entries.is_empty();
        let pid = process.id();

        match self.order {
            QueueOrder::Fifo => state.entries.push_back(process),
            QueueOrder::Priority => {
                let priority = process.static_priority();
                let at = state
                    .entries
                    .partition_point(|queued| queued.static_priority() >= priority);
                state.entries.insert(at, process);
            }
        }
        trace!("ready queue: enqueued pid {pid} (len {})", state.entries.len());

        if was_empty {
            self.not_empty.notify_all();
        }
    }

    /// Removes and returns the head, or `None` when empty.
    pub fn dequeue(&self) -> Option<ProcessRef> {
        let mut state = self.lock();
        let head = state.entries.pop_front();
        if let Some(p) = &head {
            trace!("ready queue: dequeued pid {} (len {})", p.id(), state.entries.len());
        }
        head
    }

    /// Blocks until the queue is non-empty or closed.
    ///
    /// Returns `true` when a process is available. The predicate is
    /// re-checked after every wake-up; another waiter may already have
    /// taken the process by the time the caller dequeues.
    pub fn wait_until_ready(&self) -> bool {
        let mut state = self.lock();
        while state.entries.is_empty() && !state.closed {
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !state.entries.is_empty()
    }

    /// Releases all current and future waiters.
    ///
    /// Waits on an empty closed queue return `false` immediately.
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued processes.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Static priority of the process at the head, if any.
    pub fn head_priority(&self) -> Option<i32> {
        self.lock().entries.front().map(|p| p.static_priority())
    }

    /// Queued process IDs, front to back.
    pub fn pids(&self) -> Vec<Pid> {
        self.lock().entries.iter().map(|p| p.id()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
