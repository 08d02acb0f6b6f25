//! Multi-processor process scheduler core.
//!
//! Given a pool of simulated CPUs and a stream of process lifecycle events
//! (arrival, preemption, I/O yield, termination, I/O completion), decides
//! which ready process runs on which CPU and for how long.
//!
//! # Policies
//!
//! - **FCFS**: arrival order, no preemption
//! - **Round-Robin**: arrival order, fixed quantum
//! - **Static-Priority**: priority order, preemption when a more urgent
//!   process wakes and every CPU is busy
//!
//! # Modules
//!
//! - **`models`**: `ProcessRecord`, `ProcessState`, `SchedulingPolicy`, `Timeslice`
//! - **`config`**: `SchedulerConfig`, argument parsing and validation
//! - **`driver`**: the `Driver` call-out trait and a recording driver
//! - **`scheduler`**: ready queue, CPU table, dispatcher and event handlers
//! - **`simulation`**: threaded reference driver with random workloads
//!
//! # Architecture
//!
//! One driver thread per CPU calls the event handlers on a shared
//! `SchedulerContext`. Handlers update process state, the CPU table and the
//! ready queue under short lock sections, then dispatch through the driver.
//! The only blocking call is `idle`.

pub mod config;
pub mod driver;
pub mod models;
pub mod scheduler;
pub mod simulation;
