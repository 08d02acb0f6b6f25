//! Scheduler configuration and input validation.
//!
//! A configuration names the CPU count and the scheduling policy. It is
//! validated before a [`SchedulerContext`](crate::scheduler::SchedulerContext)
//! is built; malformed configurations never reach the core.
//!
//! Detects:
//! - Zero CPUs
//! - Zero Round-Robin quantum
//! - Malformed command-line arguments
//! - Malformed simulation workloads
//!   (see [`Workload::validate`](crate::simulation::Workload::validate))

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::SchedulingPolicy;

/// Command-line usage text.
pub const USAGE: &str = "Multithreaded OS Simulator\n\
Usage: os-sim <# CPUs> [ -r <time slice> | -p ]\n    \
Default : FCFS Scheduler\n         \
-r : Round-Robin Scheduler\n         \
-p : Static Priority Scheduler\n";

/// Validation result.
pub type ValidationResult = Result<(), Vec<ConfigError>>;

/// A configuration error.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Error category.
    pub kind: ConfigErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// No CPU count given.
    MissingCpuCount,
    /// CPU count is not a positive integer.
    InvalidCpuCount,
    /// `-r` without a quantum.
    MissingQuantum,
    /// Quantum is not a positive integer.
    InvalidQuantum,
    /// Unrecognized option.
    UnknownOption,
    /// Trailing argument after a complete configuration.
    UnexpectedArgument,
    /// A simulated process specification is malformed.
    InvalidWorkload,
}

impl ConfigError {
    fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Startup configuration for the scheduler core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of simulated CPUs.
    pub cpu_count: usize,
    /// Active policy.
    #[serde(default)]
    pub policy: SchedulingPolicy,
}

impl SchedulerConfig {
    /// Creates an FCFS configuration with `cpu_count` CPUs.
    pub fn new(cpu_count: usize) -> Self {
        Self {
            cpu_count,
            policy: SchedulingPolicy::Fcfs,
        }
    }

    /// Sets the scheduling policy.
    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Parses `<# CPUs> [ -r <time slice> | -p ]`.
    ///
    /// `args` excludes the program name. Returns the first problem found;
    /// a parsed configuration always passes [`validate`](Self::validate).
    ///
    /// # Example
    /// ```
    /// use cpu_sched::config::SchedulerConfig;
    /// use cpu_sched::models::SchedulingPolicy;
    ///
    /// let config = SchedulerConfig::from_args(["4", "-r", "2"]).unwrap();
    /// assert_eq!(config.cpu_count, 4);
    /// assert_eq!(config.policy, SchedulingPolicy::round_robin(2));
    /// ```
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let mut args = args.iter().map(|a| a.as_ref());

        let cpu_arg = args.next().ok_or_else(|| {
            ConfigError::new(ConfigErrorKind::MissingCpuCount, "Missing number of CPUs")
        })?;
        let cpu_count = cpu_arg
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                ConfigError::new(
                    ConfigErrorKind::InvalidCpuCount,
                    format!("Invalid number of CPUs: '{cpu_arg}'"),
                )
            })?;

        let policy = match args.next() {
            None => SchedulingPolicy::Fcfs,
            Some("-p") => SchedulingPolicy::StaticPriority,
            Some("-r") => {
                let quantum_arg = args.next().ok_or_else(|| {
                    ConfigError::new(
                        ConfigErrorKind::MissingQuantum,
                        "Option -r requires a time slice",
                    )
                })?;
                let quantum = quantum_arg
                    .parse::<u32>()
                    .ok()
                    .filter(|&q| q > 0)
                    .ok_or_else(|| {
                        ConfigError::new(
                            ConfigErrorKind::InvalidQuantum,
                            format!("Invalid time slice: '{quantum_arg}'"),
                        )
                    })?;
                SchedulingPolicy::round_robin(quantum)
            }
            Some(other) => {
                return Err(ConfigError::new(
                    ConfigErrorKind::UnknownOption,
                    format!("Unknown option: '{other}'"),
                ))
            }
        };

        if let Some(extra) = args.next() {
            return Err(ConfigError::new(
                ConfigErrorKind::UnexpectedArgument,
                format!("Unexpected argument: '{extra}'"),
            ));
        }

        Ok(Self { cpu_count, policy })
    }

    /// Validates the configuration.
    ///
    /// # Returns
    /// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.cpu_count == 0 {
            errors.push(ConfigError::new(
                ConfigErrorKind::InvalidCpuCount,
                "CPU count must be at least 1",
            ));
        }

        if let SchedulingPolicy::RoundRobin { quantum: 0 } = self.policy {
            errors.push(ConfigError::new(
                ConfigErrorKind::InvalidQuantum,
                "Round-Robin quantum must be at least 1",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
