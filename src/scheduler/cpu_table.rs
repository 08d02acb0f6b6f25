//! CPU assignment table.
//!
//! One slot per CPU, each empty (idle) or holding the process running
//! there. Sized once at startup; never resized.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::driver::CpuId;
use crate::models::{Pid, ProcessRecord, ProcessRef, ProcessState};

/// Lock-protected CPU → running process table.
#[derive(Debug)]
pub struct CpuTable {
    slots: Mutex<Vec<Option<ProcessRef>>>,
}

impl CpuTable {
    /// Creates a table of `cpu_count` idle CPUs.
    pub fn new(cpu_count: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; cpu_count]),
        }
    }

    /// Number of CPUs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the table has no CPUs. Never true for a validated configuration.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Process running on `cpu`, if any.
    pub fn get(&self, cpu: CpuId) -> Option<ProcessRef> {
        self.lock()[cpu].clone()
    }

    /// Whether `cpu` runs nothing.
    pub fn is_idle(&self, cpu: CpuId) -> bool {
        self.lock()[cpu].is_none()
    }

    /// Sets the occupant of `cpu`.
    ///
    /// # Panics
    /// When installing a process on an occupied CPU, or a process that
    /// already occupies another CPU.
    pub fn set(&self, cpu: CpuId, process: Option<ProcessRef>) {
        let mut slots = self.lock();
        if let Some(p) = &process {
            assert!(
                slots[cpu].is_none(),
                "cpu {cpu}: already running a process, cannot install pid {}",
                p.id()
            );
            assert!(
                !slots.iter().flatten().any(|q| q.id() == p.id()),
                "pid {} is already running on another cpu",
                p.id()
            );
        }
        slots[cpu] = process;
    }

    /// Clears `cpu` and returns its previous occupant.
    pub fn take(&self, cpu: CpuId) -> Option<ProcessRef> {
        self.lock()[cpu].take()
    }

    /// Running process IDs by CPU index.
    pub fn pids(&self) -> Vec<Option<Pid>> {
        self.lock()
            .iter()
            .map(|slot| slot.as_ref().map(|p| p.id()))
            .collect()
    }

    /// Chooses the CPU to force-preempt for the woken `process`.
    ///
    /// Scans under a single lock acquisition:
    /// 1. `process` no longer `Ready` → `None` (a CPU already took it).
    /// 2. Any idle CPU → `None` (that CPU will pick up the process).
    /// 3. Otherwise find the running process with the smallest priority
    ///    number; ties go to the lowest CPU index.
    /// 4. Return its CPU only if that priority is strictly below the woken
    ///    process's priority.
    ///
    /// Another CPU may dequeue `process` between its enqueue and this scan.
    /// A process that was dequeued but not yet installed is still `Ready`,
    /// and the CPU dispatching it shows an empty slot, so step 2 covers
    /// that window; once installed, step 1 does.
    pub fn preemption_victim(&self, process: &ProcessRecord) -> Option<CpuId> {
        let slots = self.lock();
        if process.state() != ProcessState::Ready {
            return None;
        }
        let priority = process.static_priority();
        let mut weakest: Option<(CpuId, i32)> = None;

        for (cpu, slot) in slots.iter().enumerate() {
            // an idle CPU will pick the process up on its own
            let running = slot.as_ref()?;
            let p = running.static_priority();
            if weakest.map_or(true, |(_, w)| p < w) {
                weakest = Some((cpu, p));
            }
        }

        weakest
            .filter(|&(_, p)| p < priority)
            .map(|(cpu, _)| cpu)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<ProcessRef>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(id: Pid, priority: i32) -> ProcessRef {
        ProcessRecord::new(id, format!("p{id}"))
            .with_priority(priority)
            .into_ref()
    }

    /// A freshly woken process of `priority`.
    fn woken(priority: i32) -> ProcessRef {
        let p = proc(999, priority);
        p.transition(ProcessState::Ready);
        p
    }

    fn table_with(priorities: &[i32]) -> CpuTable {
        let table = CpuTable::new(priorities.len());
        for (cpu, &prio) in priorities.iter().enumerate() {
            table.set(cpu, Some(proc(cpu as Pid + 100, prio)));
        }
        table
    }

    #[test]
    fn test_new_table_is_idle() {
        let table = CpuTable::new(3);
        assert_eq!(table.len(), 3);
        assert!((0..3).all(|cpu| table.is_idle(cpu)));
        assert_eq!(table.pids(), vec![None, None, None]);
    }

    #[test]
    fn test_set_get_take() {
        let table = CpuTable::new(2);
        table.set(1, Some(proc(5, 0)));
        assert!(!table.is_idle(1));
        assert_eq!(table.get(1).map(|p| p.id()), Some(5));
        assert_eq!(table.pids(), vec![None, Some(5)]);

        assert_eq!(table.take(1).map(|p| p.id()), Some(5));
        assert!(table.is_idle(1));
        assert!(table.take(1).is_none());
    }

    #[test]
    #[should_panic(expected = "already running a process")]
    fn test_double_assignment_panics() {
        let table = CpuTable::new(1);
        table.set(0, Some(proc(1, 0)));
        table.set(0, Some(proc(2, 0)));
    }

    #[test]
    #[should_panic(expected = "already running on another cpu")]
    fn test_process_on_two_cpus_panics() {
        let table = CpuTable::new(2);
        let p = proc(1, 0);
        table.set(0, Some(p.clone()));
        table.set(1, Some(p));
    }

    #[test]
    fn test_victim_is_weakest() {
        let table = table_with(&[3, 5, 7]);
        assert_eq!(table.preemption_victim(&woken(9)), Some(0));

        let table = table_with(&[7, 5, 3]);
        assert_eq!(table.preemption_victim(&woken(9)), Some(2));
    }

    #[test]
    fn test_no_victim_when_idle_cpu_exists() {
        let table = table_with(&[3, 5, 7]);
        table.take(1);
        assert_eq!(table.preemption_victim(&woken(100)), None);
    }

    #[test]
    fn test_no_victim_unless_strictly_more_urgent() {
        let table = table_with(&[3, 5, 7]);
        assert_eq!(table.preemption_victim(&woken(3)), None);
        assert_eq!(table.preemption_victim(&woken(1)), None);
        assert_eq!(table.preemption_victim(&woken(4)), Some(0));
    }

    #[test]
    fn test_victim_tie_breaks_to_lowest_cpu() {
        let table = table_with(&[6, 2, 2, 2]);
        assert_eq!(table.preemption_victim(&woken(5)), Some(1));
    }

    #[test]
    fn test_no_victim_once_woken_process_is_running() {
        let table = CpuTable::new(3);
        table.set(0, Some(proc(1, 3)));
        table.set(1, Some(proc(2, 5)));

        // another CPU dispatched the woken process before the scan
        let p = woken(9);
        p.transition(ProcessState::Running);
        table.set(2, Some(p.clone()));
        assert_eq!(table.preemption_victim(&p), None);
    }
}
