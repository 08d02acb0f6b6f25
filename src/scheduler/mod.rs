//! Scheduler core.
//!
//! Decides which ready process runs on which CPU and for how long, under
//! FCFS, Round-Robin, or Static-Priority. Driver threads (one per CPU)
//! call the event handlers on a shared [`SchedulerContext`]; the context
//! calls back through [`Driver`](crate::driver::Driver) to perform
//! context switches and force-preemptions.
//!
//! # Components
//!
//! - [`ReadyQueue`]: policy-ordered queue with an idle wait condition
//! - [`CpuTable`]: CPU → running process slots
//! - [`SchedulerContext`]: dispatcher and event handlers
//! - [`SchedulerStats`]: event counters
//!
//! # Priority Convention
//! A larger `static_priority` number is more urgent, both when ordering
//! the ready queue and when choosing a preemption victim.

mod context;
mod cpu_table;
mod ready_queue;
mod stats;

pub use context::SchedulerContext;
pub use cpu_table::CpuTable;
pub use ready_queue::{QueueOrder, ReadyQueue};
pub use stats::{SchedulerStats, StatsSnapshot};
