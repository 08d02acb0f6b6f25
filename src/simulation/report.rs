//! Simulation results.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Elapsed | Ticks until the last process terminated |
//! | Context switches | Dispatches requested by the core, idle included |
//! | Ready time | Sum over processes of ticks spent READY |
//! | Utilization | Busy ticks / elapsed ticks, per CPU |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Pid, ProcessState, SchedulingPolicy};
use crate::scheduler::StatsSnapshot;

/// Final state of one simulated process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
    /// Ticks spent in the ready queue.
    pub ready_ticks: u64,
    /// Tick at which the process terminated.
    pub finished_at: Option<u64>,
}

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub policy: SchedulingPolicy,
    pub cpu_count: usize,
    /// Logical ticks elapsed.
    pub elapsed_ticks: u64,
    /// Processes that reached `Terminated`.
    pub completed: usize,
    /// The run hit its tick limit before every process terminated.
    pub timed_out: bool,
    /// Ticks each CPU spent running a real process.
    pub cpu_busy_ticks: Vec<u64>,
    /// Core event counters at the end of the run.
    pub stats: StatsSnapshot,
    pub processes: Vec<ProcessOutcome>,
}

impl SimulationReport {
    /// Sum of ready-queue ticks across all processes.
    pub fn total_ready_ticks(&self) -> u64 {
        self.processes.iter().map(|p| p.ready_ticks).sum()
    }

    /// Busy fraction of each CPU (0.0..1.0).
    pub fn utilization(&self) -> Vec<f64> {
        self.cpu_busy_ticks
            .iter()
            .map(|&busy| {
                if self.elapsed_ticks == 0 {
                    0.0
                } else {
                    busy as f64 / self.elapsed_ticks as f64
                }
            })
            .collect()
    }

    /// Mean utilization across CPUs.
    pub fn avg_utilization(&self) -> f64 {
        let u = self.utilization();
        if u.is_empty() {
            0.0
        } else {
            u.iter().sum::<f64>() / u.len() as f64
        }
    }

    /// Whether every process terminated.
    pub fn all_terminated(&self) -> bool {
        self.processes
            .iter()
            .all(|p| p.state == ProcessState::Terminated)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Simulation Complete ({} on {} CPU(s))", self.policy, self.cpu_count)?;
        if self.timed_out {
            writeln!(
                f,
                "# Tick limit reached: {} of {} processes completed",
                self.completed,
                self.processes.len()
            )?;
        }
        writeln!(f, "# of Context Switches: {}", self.stats.context_switches)?;
        writeln!(f, "Total execution time: {} ticks", self.elapsed_ticks)?;
        writeln!(f, "Total time spent in READY state: {} ticks", self.total_ready_ticks())?;
        write!(f, "Average CPU utilization: {:.1}%", self.avg_utilization() * 100.0)
    }
}
