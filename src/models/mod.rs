//! Scheduler domain models.
//!
//! # Domain Mappings
//!
//! | cpu-sched | Operating system | Job shop |
//! |-----------|------------------|----------|
//! | ProcessRecord | PCB | Job |
//! | CPU slot | Processor | Machine |
//! | SchedulingPolicy | Scheduling class | Dispatching rule |

mod policy;
mod process;

pub use policy::{SchedulingPolicy, Timeslice};
pub use process::{Pid, ProcessRecord, ProcessRef, ProcessState};
