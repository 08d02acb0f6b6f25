//! Scheduling policies and timeslices.
//!
//! # Policies
//!
//! | Policy | Queue order | Timeslice | Preemption |
//! |--------|-------------|-----------|------------|
//! | FCFS | arrival | unlimited | none |
//! | Round-Robin | arrival | fixed quantum | on quantum expiry |
//! | Static-Priority | priority desc, then arrival | unlimited | more urgent wake-up |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Active scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SchedulingPolicy {
    /// First-Come-First-Served.
    #[default]
    Fcfs,
    /// Round-Robin with a fixed quantum (ticks).
    RoundRobin {
        /// Ticks a process may run before it is preempted. Must be positive.
        quantum: u32,
    },
    /// Static priority with priority-based preemption.
    StaticPriority,
}

/// How long a dispatched process may run before the driver preempts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeslice {
    /// Run until the process yields or terminates.
    Unlimited,
    /// Run at most this many ticks.
    Ticks(u32),
}

impl SchedulingPolicy {
    /// Round-Robin with the given quantum.
    pub fn round_robin(quantum: u32) -> Self {
        SchedulingPolicy::RoundRobin { quantum }
    }

    /// Timeslice handed to the driver on every dispatch.
    pub fn timeslice(&self) -> Timeslice {
        match self {
            SchedulingPolicy::RoundRobin { quantum } => Timeslice::Ticks(*quantum),
            SchedulingPolicy::Fcfs | SchedulingPolicy::StaticPriority => Timeslice::Unlimited,
        }
    }

    /// Whether the ready queue is kept in priority order.
    pub fn is_priority_ordered(&self) -> bool {
        matches!(self, SchedulingPolicy::StaticPriority)
    }

    /// Short policy name.
    pub fn name(&self) -> &'static str {
        match self {
            SchedulingPolicy::Fcfs => "FCFS",
            SchedulingPolicy::RoundRobin { .. } => "RR",
            SchedulingPolicy::StaticPriority => "SP",
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingPolicy::RoundRobin { quantum } => write!(f, "RR(quantum={quantum})"),
            other => f.write_str(other.name()),
        }
    }
}

impl Timeslice {
    /// Tick limit, or `None` when unlimited.
    pub fn limit(&self) -> Option<u32> {
        match self {
            Timeslice::Unlimited => None,
            Timeslice::Ticks(t) => Some(*t),
        }
    }
}
