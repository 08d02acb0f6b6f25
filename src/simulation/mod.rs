//! Simulation driver.
//!
//! A concrete harness for the scheduler core: generates workloads, runs
//! one thread per simulated CPU, and reports what happened.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use cpu_sched::config::SchedulerConfig;
//! use cpu_sched::models::SchedulingPolicy;
//! use cpu_sched::simulation::{SimulationOptions, Simulator, Workload, WorkloadParams};
//!
//! let workload = Workload::generate(4, &WorkloadParams::default(), 1);
//! let config = SchedulerConfig::new(2).with_policy(SchedulingPolicy::StaticPriority);
//! let options = SimulationOptions::default().with_tick(Duration::from_micros(100));
//!
//! let report = Simulator::new(config, options).run(&workload).unwrap();
//! assert_eq!(report.completed, 4);
//! ```

mod report;
mod simulator;
mod workload;

pub use report::{ProcessOutcome, SimulationReport};
pub use simulator::{SimulationOptions, Simulator};
pub use workload::{Burst, ProcessSpec, Workload, WorkloadParams};
