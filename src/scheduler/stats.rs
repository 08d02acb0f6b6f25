//! Scheduler event counters.
//!
//! Counted by the core as handlers run; read at any time through a
//! [`StatsSnapshot`].
//!
//! # Counters
//!
//! | Counter | Incremented on |
//! |---------|---------------|
//! | context_switches | every dispatch, idle included |
//! | idle_dispatches | dispatch of the idle process |
//! | preemptions | `preempt` |
//! | force_preemptions | force-preempt request to the driver |
//! | yields | `yield` |
//! | terminations | `terminate` |
//! | wake_ups | `wake_up` |

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated concurrently by the handlers.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    context_switches: AtomicU64,
    idle_dispatches: AtomicU64,
    preemptions: AtomicU64,
    force_preemptions: AtomicU64,
    yields: AtomicU64,
    terminations: AtomicU64,
    wake_ups: AtomicU64,
}

/// Point-in-time copy of [`SchedulerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub context_switches: u64,
    pub idle_dispatches: u64,
    pub preemptions: u64,
    pub force_preemptions: u64,
    pub yields: u64,
    pub terminations: u64,
    pub wake_ups: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl SchedulerStats {
    pub(crate) fn record_dispatch(&self, idle: bool) {
        bump(&self.context_switches);
        if idle {
            bump(&self.idle_dispatches);
        }
    }

    pub(crate) fn record_preempt(&self) {
        bump(&self.preemptions);
    }

    pub(crate) fn record_force_preempt(&self) {
        bump(&self.force_preemptions);
    }

    pub(crate) fn record_yield(&self) {
        bump(&self.yields);
    }

    pub(crate) fn record_terminate(&self) {
        bump(&self.terminations);
    }

    pub(crate) fn record_wake_up(&self) {
        bump(&self.wake_ups);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            context_switches: self.context_switches.load(Ordering::Relaxed),
            idle_dispatches: self.idle_dispatches.load(Ordering::Relaxed),
            preemptions: self.preemptions.load(Ordering::Relaxed),
            force_preemptions: self.force_preemptions.load(Ordering::Relaxed),
            yields: self.yields.load(Ordering::Relaxed),
            terminations: self.terminations.load(Ordering::Relaxed),
            wake_ups: self.wake_ups.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Dispatches of real processes.
    pub fn process_dispatches(&self) -> u64 {
        self.context_switches - self.idle_dispatches
    }
}
