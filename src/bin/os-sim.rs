//! Command line front end for the simulator.
//!
//! ```text
//! os-sim <# CPUs> [ -r <time slice> | -p ]
//! ```

use std::process::ExitCode;
use std::time::Duration;

use cpu_sched::config::{SchedulerConfig, USAGE};
use cpu_sched::simulation::{SimulationOptions, Simulator, Workload, WorkloadParams};

const PROCESS_COUNT: usize = 8;
const WORKLOAD_SEED: u64 = 2200;

fn main() -> ExitCode {
    let config = match SchedulerConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let workload = Workload::generate(PROCESS_COUNT, &WorkloadParams::default(), WORKLOAD_SEED);
    let options = SimulationOptions::default().with_tick(Duration::from_millis(10));

    println!("starting simulator");
    match Simulator::new(config, options).run(&workload) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(errors) => {
            for e in errors {
                eprintln!("{e}");
            }
            ExitCode::FAILURE
        }
    }
}
