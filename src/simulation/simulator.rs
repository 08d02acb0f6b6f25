//! Threaded simulation driver.
//!
//! Runs one thread per CPU plus a clock on the calling thread.
//!
//! # Protocol
//!
//! - The clock advances a logical tick counter and delivers arrivals and
//!   I/O completions through `wake_up`.
//! - A CPU thread with nothing to run calls `idle` and blocks there.
//! - A CPU thread with a process runs it one tick at a time, then calls
//!   `terminate` (last burst done), `yield_cpu` (I/O burst next), or
//!   `preempt` (quantum used up, or a pending force-preempt request).
//! - A CPU tick completes only when the clock advances, so a CPU is never
//!   busy for more ticks than have elapsed.
//! - Context switches land in a per-CPU mailbox read by the CPU's own thread.
//!   A force-preempt request is dropped if the CPU changed processes since
//!   it was issued.

use log::{debug, info, warn};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use super::{Burst, ProcessOutcome, SimulationReport, Workload};
use crate::config::{ConfigError, SchedulerConfig};
use crate::driver::{CpuId, Driver};
use crate::models::{Pid, ProcessRecord, ProcessRef, Timeslice};
use crate::scheduler::SchedulerContext;

/// Run-time knobs of the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOptions {
    /// Wall-clock length of one tick.
    pub tick: Duration,
    /// Stop after this many ticks even if processes remain.
    pub max_ticks: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1),
            max_ticks: 1_000_000,
        }
    }
}

impl SimulationOptions {
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct Assignment {
    process: ProcessRef,
    timeslice: Timeslice,
}

#[derive(Debug, Default)]
struct CpuMailbox {
    assignment: Mutex<Option<Assignment>>,
    preempt_requested: AtomicBool,
    busy_ticks: AtomicU64,
}

#[derive(Debug)]
struct Progress {
    bursts: VecDeque<Burst>,
    ready_since: Option<u64>,
    ready_ticks: u64,
    finished_at: Option<u64>,
}

/// What a process does after running for one tick.
enum Step {
    Continue,
    Io(u32),
    Exit,
}

impl Progress {
    fn advance(&mut self) -> Step {
        // validated workloads never run a process during I/O
        let Some(Burst::Cpu(left)) = self.bursts.front_mut() else {
            return Step::Exit;
        };
        if *left > 1 {
            *left -= 1;
            return Step::Continue;
        }
        self.bursts.pop_front();
        match self.bursts.front().copied() {
            None => Step::Exit,
            Some(Burst::Io(t)) => {
                self.bursts.pop_front();
                Step::Io(t)
            }
            Some(Burst::Cpu(_)) => Step::Continue,
        }
    }
}

#[derive(Debug)]
struct SimProcess {
    record: ProcessRef,
    progress: Mutex<Progress>,
}

/// State shared by the clock, the CPU threads, and the driver.
#[derive(Debug)]
struct Shared {
    /// Logical tick counter. Leaf lock.
    clock: Mutex<u64>,
    ticked: Condvar,
    stop: AtomicBool,
    completed: AtomicUsize,
    cpus: Vec<CpuMailbox>,
    procs: Vec<SimProcess>,
    /// (due tick, pid) of pending arrivals and I/O completions.
    pending: Mutex<BinaryHeap<Reverse<(u64, Pid)>>>,
}

impl Shared {
    fn new(workload: &Workload, cpu_count: usize) -> Self {
        let procs = workload
            .processes
            .iter()
            .enumerate()
            .map(|(i, spec)| SimProcess {
                record: ProcessRecord::new(i as Pid, spec.name.clone())
                    .with_priority(spec.static_priority)
                    .into_ref(),
                progress: Mutex::new(Progress {
                    bursts: spec.bursts.iter().copied().collect(),
                    ready_since: None,
                    ready_ticks: 0,
                    finished_at: None,
                }),
            })
            .collect();
        let pending = workload
            .processes
            .iter()
            .enumerate()
            .map(|(i, spec)| Reverse((spec.arrival_tick, i as Pid)))
            .collect();

        Self {
            clock: Mutex::new(0),
            ticked: Condvar::new(),
            stop: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
            cpus: (0..cpu_count).map(|_| CpuMailbox::default()).collect(),
            procs,
            pending: Mutex::new(pending),
        }
    }

    fn now(&self) -> u64 {
        *lock(&self.clock)
    }

    fn advance_clock(&self) {
        *lock(&self.clock) += 1;
        self.ticked.notify_all();
    }

    /// Blocks until the clock moves past `tick`. Returns `false` if the run
    /// was halted first.
    fn wait_past(&self, tick: u64) -> bool {
        let mut now = lock(&self.clock);
        while *now <= tick && !self.stop.load(Ordering::Acquire) {
            now = self
                .ticked
                .wait(now)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *now > tick
    }

    /// Stops the CPU threads, including those waiting for a tick.
    fn halt(&self) {
        let _clock = lock(&self.clock);
        self.stop.store(true, Ordering::Release);
        self.ticked.notify_all();
    }

    fn process(&self, pid: Pid) -> &SimProcess {
        &self.procs[pid as usize]
    }

    /// Starts the ready-time clock of `pid`.
    fn mark_ready(&self, pid: Pid) {
        let now = self.now();
        lock(&self.process(pid).progress).ready_since = Some(now);
    }

    fn schedule_wake(&self, at: u64, pid: Pid) {
        lock(&self.pending).push(Reverse((at, pid)));
    }

    /// Pops every event due at or before `now`.
    fn due(&self, now: u64) -> Vec<Pid> {
        let mut pending = lock(&self.pending);
        let mut due = Vec::new();
        while let Some(&Reverse((at, pid))) = pending.peek() {
            if at > now {
                break;
            }
            pending.pop();
            due.push(pid);
        }
        due
    }
}

/// Driver half of the simulator: receives the core's call-outs.
#[derive(Debug)]
struct SimDriver {
    shared: Arc<Shared>,
}

impl Driver for SimDriver {
    fn context_switch(&self, cpu: CpuId, process: Option<ProcessRef>, timeslice: Timeslice) {
        if let Some(p) = &process {
            let now = self.shared.now();
            let mut progress = lock(&self.shared.process(p.id()).progress);
            if let Some(since) = progress.ready_since.take() {
                progress.ready_ticks += now.saturating_sub(since);
            }
        }
        let mailbox = &self.shared.cpus[cpu];
        // a pending request targeted the previous occupant
        mailbox.preempt_requested.store(false, Ordering::Release);
        *lock(&mailbox.assignment) = process.map(|process| Assignment { process, timeslice });
    }

    fn force_preempt(&self, cpu: CpuId) {
        self.shared.cpus[cpu]
            .preempt_requested
            .store(true, Ordering::Release);
    }
}

/// Multi-threaded simulator around a [`SchedulerContext`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use cpu_sched::config::SchedulerConfig;
/// use cpu_sched::models::SchedulingPolicy;
/// use cpu_sched::simulation::{ProcessSpec, SimulationOptions, Simulator, Workload};
///
/// let config = SchedulerConfig::new(2).with_policy(SchedulingPolicy::round_robin(2));
/// let workload = Workload::default()
///     .with_process(ProcessSpec::new("bash").with_cpu_burst(3).with_io_burst(2).with_cpu_burst(1))
///     .with_process(ProcessSpec::new("cc").arriving_at(1).with_cpu_burst(4));
///
/// let options = SimulationOptions::default().with_tick(Duration::from_micros(100));
/// let report = Simulator::new(config, options).run(&workload).unwrap();
/// assert_eq!(report.completed, 2);
/// assert!(report.all_terminated());
/// ```
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SchedulerConfig,
    options: SimulationOptions,
}

impl Simulator {
    pub fn new(config: SchedulerConfig, options: SimulationOptions) -> Self {
        Self { config, options }
    }

    /// Simulates `workload` to completion (or the tick limit).
    ///
    /// # Errors
    /// Configuration and workload validation errors; nothing runs then.
    pub fn run(&self, workload: &Workload) -> Result<SimulationReport, Vec<ConfigError>> {
        workload.validate()?;

        let shared = Arc::new(Shared::new(workload, self.config.cpu_count));
        let driver = Arc::new(SimDriver {
            shared: Arc::clone(&shared),
        });
        let ctx = Arc::new(SchedulerContext::new(&self.config, driver)?);

        info!(
            "simulation: {} processes, {} CPU(s), policy {}",
            workload.len(),
            self.config.cpu_count,
            self.config.policy
        );

        let cpu_threads: Vec<_> = (0..self.config.cpu_count)
            .map(|cpu| {
                let ctx = Arc::clone(&ctx);
                let shared = Arc::clone(&shared);
                thread::spawn(move || run_cpu(&ctx, &shared, cpu))
            })
            .collect();

        let timed_out = self.run_clock(&ctx, &shared, workload.len());

        shared.halt();
        ctx.shutdown();
        for handle in cpu_threads {
            if let Err(panic) = handle.join() {
                std::panic::resume_unwind(panic);
            }
        }

        let report = SimulationReport {
            policy: self.config.policy,
            cpu_count: self.config.cpu_count,
            elapsed_ticks: shared.now(),
            completed: shared.completed.load(Ordering::Acquire),
            timed_out,
            cpu_busy_ticks: shared
                .cpus
                .iter()
                .map(|c| c.busy_ticks.load(Ordering::Acquire))
                .collect(),
            stats: ctx.stats(),
            processes: shared
                .procs
                .iter()
                .map(|p| {
                    let progress = lock(&p.progress);
                    ProcessOutcome {
                        pid: p.record.id(),
                        name: p.record.name().to_string(),
                        state: p.record.state(),
                        ready_ticks: progress.ready_ticks,
                        finished_at: progress.finished_at,
                    }
                })
                .collect(),
        };
        info!(
            "simulation: finished after {} ticks, {} context switches",
            report.elapsed_ticks, report.stats.context_switches
        );
        Ok(report)
    }

    /// Drives the logical clock. Returns `true` if the tick limit was hit.
    fn run_clock(&self, ctx: &SchedulerContext, shared: &Shared, total: usize) -> bool {
        loop {
            let now = shared.now();
            for pid in shared.due(now) {
                let record = Arc::clone(&shared.process(pid).record);
                debug!("tick {now}: wake pid {pid}");
                shared.mark_ready(pid);
                ctx.wake_up(&record);
            }

            if shared.completed.load(Ordering::Acquire) >= total {
                return false;
            }
            if now >= self.options.max_ticks {
                warn!(
                    "simulation: tick limit {} reached with {} process(es) unfinished",
                    self.options.max_ticks,
                    total - shared.completed.load(Ordering::Acquire)
                );
                return true;
            }

            thread::sleep(self.options.tick);
            shared.advance_clock();
        }
    }
}

/// Consumes a pending force-preempt request for `cpu`.
///
/// Returns `true` only if a queued process still outranks the one running
/// there.
fn take_force_preempt(ctx: &SchedulerContext, mailbox: &CpuMailbox, cpu: CpuId) -> bool {
    if !mailbox.preempt_requested.swap(false, Ordering::AcqRel) {
        return false;
    }
    if ctx.is_outranked(cpu) {
        return true;
    }
    debug!("cpu {cpu}: stale force preempt dropped");
    false
}

/// Body of one CPU thread.
fn run_cpu(ctx: &SchedulerContext, shared: &Shared, cpu: CpuId) {
    let mailbox = &shared.cpus[cpu];
    let mut used: u32 = 0;

    while !shared.stop.load(Ordering::Acquire) {
        let current = lock(&mailbox.assignment).clone();

        let Some(Assignment { process, timeslice }) = current else {
            if mailbox.preempt_requested.swap(false, Ordering::AcqRel) {
                warn!("cpu {cpu}: force preempt arrived while idle, ignored");
            }
            ctx.idle(cpu);
            used = 0;
            continue;
        };
        let pid = process.id();

        if take_force_preempt(ctx, mailbox, cpu) {
            shared.mark_ready(pid);
            ctx.preempt(cpu);
            used = 0;
            continue;
        }

        if !shared.wait_past(shared.now()) {
            break;
        }
        mailbox.busy_ticks.fetch_add(1, Ordering::AcqRel);
        used += 1;

        let step = lock(&shared.process(pid).progress).advance();
        match step {
            Step::Exit => {
                lock(&shared.process(pid).progress).finished_at = Some(shared.now());
                ctx.terminate(cpu);
                shared.completed.fetch_add(1, Ordering::AcqRel);
                used = 0;
            }
            Step::Io(ticks) => {
                ctx.yield_cpu(cpu);
                shared.schedule_wake(shared.now() + u64::from(ticks), pid);
                used = 0;
            }
            Step::Continue => {
                if timeslice.limit().is_some_and(|quantum| used >= quantum) {
                    shared.mark_ready(pid);
                    ctx.preempt(cpu);
                    used = 0;
                }
            }
        }
    }
    debug!("cpu {cpu}: stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigErrorKind;
    use crate::models::{ProcessState, SchedulingPolicy};
    use crate::simulation::{ProcessSpec, WorkloadParams};

    fn fast() -> SimulationOptions {
        SimulationOptions::default()
            .with_tick(Duration::from_micros(200))
            .with_max_ticks(100_000)
    }

    fn simulate(cpus: usize, policy: SchedulingPolicy, workload: &Workload) -> SimulationReport {
        let config = SchedulerConfig::new(cpus).with_policy(policy);
        Simulator::new(config, fast()).run(workload).unwrap()
    }

    #[test]
    fn test_progress_advance() {
        let mut p = Progress {
            bursts: [Burst::Cpu(2), Burst::Io(3), Burst::Cpu(1)].into_iter().collect(),
            ready_since: None,
            ready_ticks: 0,
            finished_at: None,
        };
        assert!(matches!(p.advance(), Step::Continue));
        assert!(matches!(p.advance(), Step::Io(3)));
        assert!(matches!(p.advance(), Step::Exit));
        assert!(matches!(p.advance(), Step::Exit));
    }

    #[test]
    fn test_all_policies_complete_random_workload() {
        let workload = Workload::generate(12, &WorkloadParams::default(), 2024);
        for policy in [
            SchedulingPolicy::Fcfs,
            SchedulingPolicy::round_robin(2),
            SchedulingPolicy::StaticPriority,
        ] {
            let report = simulate(3, policy, &workload);
            assert!(!report.timed_out, "{policy} timed out");
            assert_eq!(report.completed, 12);
            assert!(report.all_terminated());
            assert_eq!(report.stats.terminations, 12);

            // every CPU burst tick was executed exactly once
            let demand: u64 = workload.processes.iter().map(|p| p.cpu_ticks()).sum();
            assert_eq!(report.cpu_busy_ticks.iter().sum::<u64>(), demand);

            // one wake-up per arrival plus one per I/O completion
            let io_bursts = workload
                .processes
                .iter()
                .flat_map(|p| &p.bursts)
                .filter(|b| matches!(b, Burst::Io(_)))
                .count() as u64;
            assert_eq!(report.stats.wake_ups, 12 + io_bursts);
            assert_eq!(report.stats.yields, io_bursts);
        }
    }

    #[test]
    fn test_fcfs_never_preempts() {
        let workload = Workload::generate(6, &WorkloadParams::default(), 11);
        let report = simulate(2, SchedulingPolicy::Fcfs, &workload);
        assert_eq!(report.stats.preemptions, 0);
        assert_eq!(report.stats.force_preemptions, 0);
    }

    #[test]
    fn test_round_robin_preempts_long_burst() {
        let workload =
            Workload::default().with_process(ProcessSpec::new("spin").with_cpu_burst(10));
        let report = simulate(1, SchedulingPolicy::round_robin(3), &workload);
        // 10 ticks with quantum 3: preempted after ticks 3, 6, 9
        assert_eq!(report.stats.preemptions, 3);
        assert!(report.all_terminated());
    }

    #[test]
    fn test_static_priority_preempts_for_urgent_arrival() {
        let workload = Workload::default()
            .with_process(ProcessSpec::new("batch").with_priority(1).with_cpu_burst(400))
            .with_process(
                ProcessSpec::new("urgent")
                    .with_priority(9)
                    .arriving_at(50)
                    .with_cpu_burst(2),
            );
        let report = simulate(1, SchedulingPolicy::StaticPriority, &workload);

        assert_eq!(report.stats.force_preemptions, 1);
        assert_eq!(report.stats.preemptions, 1);
        let finished: Vec<u64> = report
            .processes
            .iter()
            .map(|p| p.finished_at.unwrap())
            .collect();
        assert!(finished[1] < finished[0], "urgent process must finish first");
    }

    #[test]
    fn test_empty_workload() {
        let report = simulate(2, SchedulingPolicy::Fcfs, &Workload::default());
        assert_eq!(report.completed, 0);
        assert_eq!(report.elapsed_ticks, 0);
        assert!(!report.timed_out);
    }

    #[test]
    fn test_tick_limit() {
        let workload =
            Workload::default().with_process(ProcessSpec::new("long").with_cpu_burst(1_000));
        let config = SchedulerConfig::new(1);
        let options = fast().with_max_ticks(5);
        let report = Simulator::new(config, options).run(&workload).unwrap();
        assert!(report.timed_out);
        assert_eq!(report.completed, 0);
        assert_ne!(report.processes[0].state, ProcessState::Terminated);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let workload = Workload::default().with_process(ProcessSpec::new("none"));
        let errors = Simulator::new(SchedulerConfig::new(1), fast())
            .run(&workload)
            .unwrap_err();
        assert_eq!(errors[0].kind, ConfigErrorKind::InvalidWorkload);

        let errors = Simulator::new(SchedulerConfig::new(0), fast())
            .run(&Workload::default())
            .unwrap_err();
        assert_eq!(errors[0].kind, ConfigErrorKind::InvalidCpuCount);
    }

    /// Shared state, driver-backed context, and process records for a
    /// single-CPU static-priority machine, driven by hand.
    fn manual_sp(workload: &Workload) -> (Arc<Shared>, SchedulerContext) {
        let shared = Arc::new(Shared::new(workload, 1));
        let driver = Arc::new(SimDriver {
            shared: Arc::clone(&shared),
        });
        let config = SchedulerConfig::new(1).with_policy(SchedulingPolicy::StaticPriority);
        let ctx = SchedulerContext::new(&config, driver).unwrap();
        (shared, ctx)
    }

    fn batch_and_urgent() -> Workload {
        Workload::default()
            .with_process(ProcessSpec::new("batch").with_priority(1).with_cpu_burst(10))
            .with_process(ProcessSpec::new("urgent").with_priority(9).with_cpu_burst(2))
    }

    #[test]
    fn test_force_preempt_request_is_answered() {
        let (shared, ctx) = manual_sp(&batch_and_urgent());
        let batch = Arc::clone(&shared.process(0).record);
        let urgent = Arc::clone(&shared.process(1).record);

        ctx.wake_up(&batch);
        ctx.idle(0);
        ctx.wake_up(&urgent);
        assert!(take_force_preempt(&ctx, &shared.cpus[0], 0));
    }

    #[test]
    fn test_force_preempt_dropped_after_cpu_switches_process() {
        let (shared, ctx) = manual_sp(&batch_and_urgent());
        let mailbox = &shared.cpus[0];
        let batch = Arc::clone(&shared.process(0).record);
        let urgent = Arc::clone(&shared.process(1).record);

        ctx.wake_up(&batch);
        ctx.idle(0);
        ctx.wake_up(&urgent);
        assert!(mailbox.preempt_requested.load(Ordering::Acquire));

        // batch finishes before the CPU thread sees the request
        ctx.terminate(0);
        assert_eq!(ctx.current(0).map(|p| p.id()), Some(1));
        assert!(!mailbox.preempt_requested.load(Ordering::Acquire));
        assert!(!take_force_preempt(&ctx, mailbox, 0));

        // a request landing after the switch is dropped as well
        mailbox.preempt_requested.store(true, Ordering::Release);
        assert!(!take_force_preempt(&ctx, mailbox, 0));
        assert!(!mailbox.preempt_requested.load(Ordering::Acquire));
        assert_eq!(ctx.stats().preemptions, 0);
        assert_eq!(urgent.state(), ProcessState::Running);
    }

    #[test]
    fn test_busy_ticks_never_exceed_elapsed() {
        let workload = Workload::generate(10, &WorkloadParams::default(), 99);
        for cpus in [1, 4] {
            let report = simulate(cpus, SchedulingPolicy::round_robin(2), &workload);
            assert!(report.all_terminated());
            for &busy in &report.cpu_busy_ticks {
                assert!(busy <= report.elapsed_ticks);
            }
            assert!(report.utilization().iter().all(|&u| u <= 1.0));
        }
    }

    #[test]
    fn test_halt_releases_tick_waiters() {
        let shared = Arc::new(Shared::new(&Workload::default(), 1));
        let waiter = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || shared.wait_past(0))
        };
        thread::sleep(Duration::from_millis(20));
        shared.halt();
        assert!(!waiter.join().unwrap());

        shared.advance_clock();
        assert!(shared.wait_past(0));
    }
}
