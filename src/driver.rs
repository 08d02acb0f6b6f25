//! Driver interface.
//!
//! The driver is the harness around the scheduler core: it owns process
//! lifetimes, runs one thread per CPU, enforces timeslices, and performs
//! the actual context switches. The core calls back into it through the
//! [`Driver`] trait.
//!
//! # Call Convention
//! The core never holds one of its own locks while calling a driver method,
//! so implementations may call handlers on the scheduler synchronously.

use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

use crate::models::{Pid, ProcessRef, Timeslice};

/// CPU identifier (index into the CPU table).
pub type CpuId = usize;

/// Call-outs from the scheduler core to its driver.
pub trait Driver: Send + Sync + Debug {
    /// Runs `process` on `cpu`, or the idle process when `None`.
    ///
    /// `timeslice` is `Unlimited` for the idle process and for the FCFS
    /// and static-priority policies.
    fn context_switch(&self, cpu: CpuId, process: Option<ProcessRef>, timeslice: Timeslice);

    /// Interrupts whatever is running on `cpu` right now.
    ///
    /// The driver answers by calling `preempt(cpu)` on the scheduler from
    /// that CPU's thread, independent of any timeslice.
    fn force_preempt(&self, cpu: CpuId);
}

/// A call-out captured by [`RecordingDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverRequest {
    /// `context_switch(cpu, process, timeslice)`; `pid` is `None` for idle.
    ContextSwitch {
        cpu: CpuId,
        pid: Option<Pid>,
        timeslice: Timeslice,
    },
    /// `force_preempt(cpu)`.
    ForcePreempt { cpu: CpuId },
}

/// Driver that records every request and performs nothing.
///
/// Useful for driving the core step by step: the caller plays the role
/// of the CPU threads and inspects what the core asked for.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    requests: Mutex<Vec<DriverRequest>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests so far, oldest first.
    pub fn requests(&self) -> Vec<DriverRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns all requests so far.
    pub fn drain(&self) -> Vec<DriverRequest> {
        std::mem::take(&mut *self.requests.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// CPUs that received a force-preempt request, in request order.
    pub fn force_preempted(&self) -> Vec<CpuId> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                DriverRequest::ForcePreempt { cpu } => Some(cpu),
                DriverRequest::ContextSwitch { .. } => None,
            })
            .collect()
    }

    /// Most recent context switch requested for `cpu`.
    pub fn last_switch(&self, cpu: CpuId) -> Option<(Option<Pid>, Timeslice)> {
        self.requests().into_iter().rev().find_map(|r| match r {
            DriverRequest::ContextSwitch {
                cpu: c,
                pid,
                timeslice,
            } if c == cpu => Some((pid, timeslice)),
            _ => None,
        })
    }

    fn push(&self, request: DriverRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

impl Driver for RecordingDriver {
    fn context_switch(&self, cpu: CpuId, process: Option<ProcessRef>, timeslice: Timeslice) {
        self.push(DriverRequest::ContextSwitch {
            cpu,
            pid: process.map(|p| p.id()),
            timeslice,
        });
    }

    fn force_preempt(&self, cpu: CpuId) {
        self.push(DriverRequest::ForcePreempt { cpu });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessRecord;

    #[test]
    fn test_recording_driver() {
        let driver = RecordingDriver::new();
        let p = ProcessRecord::new(3, "vi").into_ref();

        driver.context_switch(0, Some(p), Timeslice::Ticks(2));
        driver.force_preempt(1);
        driver.context_switch(0, None, Timeslice::Unlimited);

        assert_eq!(driver.requests().len(), 3);
        assert_eq!(driver.force_preempted(), vec![1]);
        assert_eq!(driver.last_switch(0), Some((None, Timeslice::Unlimited)));
        assert_eq!(driver.last_switch(1), None);

        assert_eq!(driver.drain().len(), 3);
        assert!(driver.requests().is_empty());
    }
}
