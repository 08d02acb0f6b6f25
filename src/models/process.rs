//! Process record model.
//!
//! A process record is the scheduler's view of one simulated process:
//! an immutable identity and priority plus a mutable lifecycle state.
//! Records are created and owned by the driver; the scheduler only holds
//! shared references while a process is queued or running.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Process identifier.
pub type Pid = u32;

/// Shared handle to a process record.
pub type ProcessRef = Arc<ProcessRecord>;

/// Lifecycle state of a process.
///
/// # Transitions
///
/// | From | To |
/// |------|----|
/// | `New`, `Waiting` | `Ready` |
/// | `Ready` | `Running` |
/// | `Running` | `Ready`, `Waiting` |
/// | any but `Terminated` | `Terminated` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    /// Created, not yet admitted to the ready queue.
    New,
    /// Waiting in the ready queue for a CPU.
    Ready,
    /// Installed on a CPU.
    Running,
    /// Blocked on I/O.
    Waiting,
    /// Finished. Final.
    Terminated,
}

impl ProcessState {
    /// Whether `self → to` is a legal lifecycle transition.
    pub fn can_transition_to(self, to: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, to),
            (New, Ready)
                | (Waiting, Ready)
                | (Ready, Running)
                | (Running, Ready)
                | (Running, Waiting)
                | (New | Ready | Running | Waiting, Terminated)
        )
    }

    /// Upper-case label, as printed by the simulator.
    pub fn label(self) -> &'static str {
        match self {
            ProcessState::New => "NEW",
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Waiting => "WAITING",
            ProcessState::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A simulated process as seen by the scheduler.
#[derive(Debug)]
pub struct ProcessRecord {
    id: Pid,
    name: String,
    static_priority: i32,
    state: Mutex<ProcessState>,
}

impl ProcessRecord {
    /// Creates a record in the `New` state with priority 0.
    pub fn new(id: Pid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            static_priority: 0,
            state: Mutex::new(ProcessState::New),
        }
    }

    /// Sets the static priority (larger = more urgent).
    pub fn with_priority(mut self, static_priority: i32) -> Self {
        self.static_priority = static_priority;
        self
    }

    /// Wraps the record in a shared handle.
    pub fn into_ref(self) -> ProcessRef {
        Arc::new(self)
    }

    pub fn id(&self) -> Pid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static priority. Only consulted under the static-priority policy.
    pub fn static_priority(&self) -> i32 {
        self.static_priority
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the process to `to`.
    ///
    /// # Panics
    /// If the transition is not legal. An illegal transition means the
    /// scheduling state is already corrupt.
    pub(crate) fn transition(&self, to: ProcessState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(
            state.can_transition_to(to),
            "process {} ({}): illegal transition {} -> {}",
            self.id,
            self.name,
            *state,
            to
        );
        *state = to;
    }
}
