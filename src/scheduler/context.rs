//! Scheduler context: dispatcher and event handlers.
//!
//! # State Machine
//!
//! | Handler | Effect | Then |
//! |---------|--------|------|
//! | `idle(cpu)` | block until the ready queue is non-empty | dispatch |
//! | `preempt(cpu)` | RUNNING → READY, clear slot, enqueue | dispatch |
//! | `yield_cpu(cpu)` | RUNNING → WAITING, clear slot | dispatch |
//! | `terminate(cpu)` | RUNNING → TERMINATED, clear slot | dispatch |
//! | `wake_up(p)` | NEW/WAITING → READY, enqueue | static priority: maybe force-preempt |
//!
//! # Locking
//! The ready-queue lock and the CPU-table lock are never held together,
//! and neither is held while calling the driver. A process leaves its CPU
//! slot before it can reach the ready queue, so it is never queued and
//! running at once.

use log::{debug, info};
use std::sync::Arc;

use super::{CpuTable, QueueOrder, ReadyQueue, SchedulerStats, StatsSnapshot};
use crate::config::{ConfigError, SchedulerConfig};
use crate::driver::{CpuId, Driver};
use crate::models::{Pid, ProcessRef, ProcessState, SchedulingPolicy, Timeslice};

/// Shared scheduling state for one simulated machine.
///
/// Handlers take `&self`; share the context between CPU threads with an
/// `Arc`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use cpu_sched::config::SchedulerConfig;
/// use cpu_sched::driver::RecordingDriver;
/// use cpu_sched::models::{ProcessRecord, ProcessState};
/// use cpu_sched::scheduler::SchedulerContext;
///
/// let driver = Arc::new(RecordingDriver::new());
/// let ctx = SchedulerContext::new(&SchedulerConfig::new(1), driver.clone()).unwrap();
///
/// let p = ProcessRecord::new(1, "init").into_ref();
/// ctx.wake_up(&p);
/// ctx.idle(0);
/// assert_eq!(p.state(), ProcessState::Running);
/// assert_eq!(driver.last_switch(0).unwrap().0, Some(1));
/// ```
#[derive(Debug)]
pub struct SchedulerContext {
    policy: SchedulingPolicy,
    ready: ReadyQueue,
    cpus: CpuTable,
    driver: Arc<dyn Driver>,
    stats: SchedulerStats,
}

impl SchedulerContext {
    /// Builds a context from a validated configuration.
    ///
    /// # Errors
    /// Every problem reported by [`SchedulerConfig::validate`].
    pub fn new(
        config: &SchedulerConfig,
        driver: Arc<dyn Driver>,
    ) -> Result<Self, Vec<ConfigError>> {
        config.validate()?;

        let order = if config.policy.is_priority_ordered() {
            QueueOrder::Priority
        } else {
            QueueOrder::Fifo
        };

        info!(
            "scheduler context: {} CPU(s), policy {}",
            config.cpu_count, config.policy
        );

        Ok(Self {
            policy: config.policy,
            ready: ReadyQueue::new(order),
            cpus: CpuTable::new(config.cpu_count),
            driver,
            stats: SchedulerStats::default(),
        })
    }

    /// Active scheduling policy.
    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// Number of CPUs.
    pub fn cpu_count(&self) -> usize {
        self.cpus.len()
    }

    /// Process running on `cpu`, if any.
    pub fn current(&self, cpu: CpuId) -> Option<ProcessRef> {
        self.cpus.get(cpu)
    }

    /// Running process IDs by CPU index.
    pub fn running_pids(&self) -> Vec<Option<Pid>> {
        self.cpus.pids()
    }

    /// Queued process IDs, front to back.
    pub fn ready_pids(&self) -> Vec<Pid> {
        self.ready.pids()
    }

    /// Event counters so far.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether the head of the ready queue is strictly more urgent than the
    /// process running on `cpu`.
    ///
    /// Always `false` outside static priority, and for an idle CPU. Drivers
    /// check it before answering a force-preempt request, since the CPU may
    /// have switched processes after the request was issued.
    pub fn is_outranked(&self, cpu: CpuId) -> bool {
        if self.policy != SchedulingPolicy::StaticPriority {
            return false;
        }
        let Some(running) = self.cpus.get(cpu) else {
            return false;
        };
        self.ready
            .head_priority()
            .is_some_and(|head| head > running.static_priority())
    }

    /// Releases CPUs blocked in [`idle`](Self::idle) without dispatching.
    ///
    /// Used by drivers to stop their CPU threads.
    pub fn shutdown(&self) {
        debug!("scheduler context: shutdown");
        self.ready.close();
    }

    /// Dispatches the next ready process on `cpu`, or the idle process.
    fn schedule(&self, cpu: CpuId) {
        let timeslice = self.policy.timeslice();

        match self.ready.dequeue() {
            None => {
                debug!("cpu {cpu}: dispatch idle");
                self.stats.record_dispatch(true);
                self.driver.context_switch(cpu, None, Timeslice::Unlimited);
            }
            Some(process) => {
                debug!("cpu {cpu}: dispatch pid {} ({timeslice:?})", process.id());
                process.transition(ProcessState::Running);
                self.cpus.set(cpu, Some(Arc::clone(&process)));
                self.stats.record_dispatch(false);
                self.driver.context_switch(cpu, Some(process), timeslice);
            }
        }
    }

    /// Clears `cpu` and moves its process to `to`.
    ///
    /// # Panics
    /// If `cpu` runs nothing.
    fn evict(&self, cpu: CpuId, to: ProcessState, event: &str) -> ProcessRef {
        let process = self
            .cpus
            .take(cpu)
            .unwrap_or_else(|| panic!("cpu {cpu}: {event} with no running process"));
        process.transition(to);
        debug!("cpu {cpu}: {event} pid {} -> {to}", process.id());
        process
    }

    /// Called when `cpu` runs the idle process.
    ///
    /// Blocks until a process is ready, then dispatches. Returns without
    /// dispatching only after [`shutdown`](Self::shutdown).
    ///
    /// # Panics
    /// If `cpu` still has a running process.
    pub fn idle(&self, cpu: CpuId) {
        assert!(
            self.cpus.is_idle(cpu),
            "cpu {cpu}: idle while a process is installed"
        );
        if self.ready.wait_until_ready() {
            self.schedule(cpu);
        }
    }

    /// The running process on `cpu` exhausted its timeslice, or the driver
    /// is answering a force-preempt request.
    pub fn preempt(&self, cpu: CpuId) {
        let process = self.evict(cpu, ProcessState::Ready, "preempt");
        self.stats.record_preempt();
        self.ready.enqueue(process);
        self.schedule(cpu);
    }

    /// The running process on `cpu` blocks for I/O. It is not re-queued
    /// until [`wake_up`](Self::wake_up).
    pub fn yield_cpu(&self, cpu: CpuId) {
        self.evict(cpu, ProcessState::Waiting, "yield");
        self.stats.record_yield();
        self.schedule(cpu);
    }

    /// The running process on `cpu` finished.
    pub fn terminate(&self, cpu: CpuId) {
        self.evict(cpu, ProcessState::Terminated, "terminate");
        self.stats.record_terminate();
        self.schedule(cpu);
    }

    /// A new process arrived or a waiting process finished its I/O.
    ///
    /// Under static priority, when every CPU is busy and the weakest
    /// running process has a strictly smaller priority number, that CPU
    /// is force-preempted (lowest CPU index on ties). No request is made
    /// if another CPU dispatched the process before the scan.
    ///
    /// # Panics
    /// If the process is not `New` or `Waiting`.
    pub fn wake_up(&self, process: &ProcessRef) {
        assert!(
            matches!(process.state(), ProcessState::New | ProcessState::Waiting),
            "pid {}: wake_up from {}",
            process.id(),
            process.state()
        );
        process.transition(ProcessState::Ready);
        self.stats.record_wake_up();
        debug!("wake_up pid {} (priority {})", process.id(), process.static_priority());
        self.ready.enqueue(Arc::clone(process));

        if self.policy != SchedulingPolicy::StaticPriority {
            return;
        }

        if let Some(victim) = self.cpus.preemption_victim(process) {
            debug!("wake_up pid {}: force preempt cpu {victim}", process.id());
            self.stats.record_force_preempt();
            self.driver.force_preempt(victim);
        }
    }
}
