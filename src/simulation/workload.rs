//! Simulated workloads.
//!
//! A workload is a list of process specifications. Each process arrives at
//! a given tick and alternates CPU bursts and I/O bursts, starting and
//! ending with a CPU burst.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigErrorKind, ValidationResult};

const NAMES: [&str; 8] = ["init", "bash", "emacs", "cc", "vi", "make", "sshd", "cron"];

/// One burst of a process's execution, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Burst {
    Cpu(u32),
    Io(u32),
}

/// Specification of one simulated process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub name: String,
    /// Larger = more urgent. Only used by static priority.
    pub static_priority: i32,
    /// Tick at which the process is created.
    pub arrival_tick: u64,
    pub bursts: Vec<Burst>,
}

impl ProcessSpec {
    /// Creates a process arriving at tick 0 with no bursts.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            static_priority: 0,
            arrival_tick: 0,
            bursts: Vec::new(),
        }
    }

    pub fn with_priority(mut self, static_priority: i32) -> Self {
        self.static_priority = static_priority;
        self
    }

    pub fn arriving_at(mut self, tick: u64) -> Self {
        self.arrival_tick = tick;
        self
    }

    pub fn with_cpu_burst(mut self, ticks: u32) -> Self {
        self.bursts.push(Burst::Cpu(ticks));
        self
    }

    pub fn with_io_burst(mut self, ticks: u32) -> Self {
        self.bursts.push(Burst::Io(ticks));
        self
    }

    /// Total CPU demand (ticks).
    pub fn cpu_ticks(&self) -> u64 {
        self.bursts
            .iter()
            .map(|b| match b {
                Burst::Cpu(t) => u64::from(*t),
                Burst::Io(_) => 0,
            })
            .sum()
    }

    /// Checks burst structure: non-empty, positive lengths, alternating,
    /// first and last burst on the CPU.
    fn check(&self) -> Result<(), String> {
        let (Some(first), Some(last)) = (self.bursts.first(), self.bursts.last()) else {
            return Err(format!("Process '{}' has no bursts", self.name));
        };
        if !matches!(first, Burst::Cpu(_)) || !matches!(last, Burst::Cpu(_)) {
            return Err(format!(
                "Process '{}' must start and end with a CPU burst",
                self.name
            ));
        }
        for pair in self.bursts.windows(2) {
            if matches!(
                (pair[0], pair[1]),
                (Burst::Cpu(_), Burst::Cpu(_)) | (Burst::Io(_), Burst::Io(_))
            ) {
                return Err(format!(
                    "Process '{}' has consecutive bursts of the same kind",
                    self.name
                ));
            }
        }
        if self
            .bursts
            .iter()
            .any(|b| matches!(b, Burst::Cpu(0) | Burst::Io(0)))
        {
            return Err(format!("Process '{}' has a zero-length burst", self.name));
        }
        Ok(())
    }
}

/// Parameters for random workload generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadParams {
    /// Priorities are drawn from `0..=max_priority`.
    pub max_priority: i32,
    /// Arrivals are drawn from `0..=max_arrival_tick`.
    pub max_arrival_tick: u64,
    /// CPU bursts per process, `1..=max_cpu_bursts`.
    pub max_cpu_bursts: usize,
    /// CPU burst length, `1..=max_cpu_burst_ticks`.
    pub max_cpu_burst_ticks: u32,
    /// I/O burst length, `1..=max_io_burst_ticks`.
    pub max_io_burst_ticks: u32,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            max_priority: 9,
            max_arrival_tick: 20,
            max_cpu_bursts: 3,
            max_cpu_burst_ticks: 8,
            max_io_burst_ticks: 6,
        }
    }
}

/// A set of processes to simulate. Process `i` gets PID `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub processes: Vec<ProcessSpec>,
}

impl Workload {
    pub fn new(processes: Vec<ProcessSpec>) -> Self {
        Self { processes }
    }

    pub fn with_process(mut self, process: ProcessSpec) -> Self {
        self.processes.push(process);
        self
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Generates `count` random processes, reproducible for a given seed.
    pub fn generate(count: usize, params: &WorkloadParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let processes = (0..count)
            .map(|i| {
                let mut spec = ProcessSpec::new(format!("{}{}", NAMES[i % NAMES.len()], i))
                    .with_priority(rng.random_range(0..=params.max_priority.max(0)))
                    .arriving_at(rng.random_range(0..=params.max_arrival_tick));

                let cpu_bursts = rng.random_range(1..=params.max_cpu_bursts.max(1));
                let io_ticks = 1..=params.max_io_burst_ticks.max(1);
                let cpu_ticks = 1..=params.max_cpu_burst_ticks.max(1);
                for n in 0..cpu_bursts {
                    if n > 0 {
                        spec = spec.with_io_burst(rng.random_range(io_ticks.clone()));
                    }
                    spec = spec.with_cpu_burst(rng.random_range(cpu_ticks.clone()));
                }
                spec
            })
            .collect();

        Self { processes }
    }

    /// Validates every process specification.
    ///
    /// # Returns
    /// `Ok(())` if all processes are well formed, `Err(errors)` otherwise.
    pub fn validate(&self) -> ValidationResult {
        let errors: Vec<ConfigError> = self
            .processes
            .iter()
            .filter_map(|p| p.check().err())
            .map(|message| ConfigError {
                kind: ConfigErrorKind::InvalidWorkload,
                message,
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_spec_builder() {
        let spec = ProcessSpec::new("bash")
            .with_priority(3)
            .arriving_at(5)
            .with_cpu_burst(4)
            .with_io_burst(2)
            .with_cpu_burst(1);

        assert_eq!(spec.static_priority, 3);
        assert_eq!(spec.arrival_tick, 5);
        assert_eq!(spec.bursts, vec![Burst::Cpu(4), Burst::Io(2), Burst::Cpu(1)]);
        assert_eq!(spec.cpu_ticks(), 5);
        assert!(spec.check().is_ok());
    }

    #[test]
    fn test_malformed_specs() {
        let empty = ProcessSpec::new("empty");
        let io_first = ProcessSpec::new("io").with_io_burst(1).with_cpu_burst(1);
        let io_last = ProcessSpec::new("tail").with_cpu_burst(1).with_io_burst(1);
        let doubled = ProcessSpec::new("dup").with_cpu_burst(1).with_cpu_burst(1);
        let zero = ProcessSpec::new("zero").with_cpu_burst(0);

        let workload = Workload::new(vec![empty, io_first, io_last, doubled, zero]);
        let errors = workload.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors
            .iter()
            .all(|e| e.kind == ConfigErrorKind::InvalidWorkload));
    }

    #[test]
    fn test_generate_is_reproducible_and_valid() {
        let params = WorkloadParams::default();
        let a = Workload::generate(25, &params, 7);
        let b = Workload::generate(25, &params, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 25);
        assert!(a.validate().is_ok());

        for p in &a.processes {
            assert!((0..=params.max_priority).contains(&p.static_priority));
            assert!(p.arrival_tick <= params.max_arrival_tick);
            let cpu_bursts = p.bursts.iter().filter(|b| matches!(b, Burst::Cpu(_))).count();
            assert!((1..=params.max_cpu_bursts).contains(&cpu_bursts));
        }
    }

    #[test]
    fn test_workload_serde() {
        let workload = Workload::default().with_process(
            ProcessSpec::new("cc").with_cpu_burst(2).with_io_burst(1).with_cpu_burst(2),
        );
        let json = serde_json::to_string(&workload).unwrap();
        let back: Workload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, workload);
    }
}
