// kernel/src/process/scheduler.rs
//
// Ready queue + scheduling policies.
//
// Every policy drives the same outer shape: dequeue, execute some number
// of instructions, then terminate the process or put it back according to
// the policy. The queue orders processes at insertion time; AGING is the
// one policy that re-evaluates the ordering after every instruction.
//
// Page faults are control transitions, not errors: under the quantised
// policies a fault loads the page and costs the process the rest of its
// turn (PC unchanged); under the run-to-completion policies the fault is
// resolved inline before the fetch. Either way an executed instruction
// costs the frame exactly one LRU tick.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::kernel::Kernel;

use super::{Pcb, PcbHandle, ProcessState};

// ============================================================================
// READY QUEUE
// ============================================================================

/// FIFO of runnable processes with policy-specific insertion points.
/// A PCB is in at most one queue, at most once.
pub struct ReadyQueue {
    queue: VecDeque<PcbHandle>,
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Append to the tail. FCFS, RR and RR30 insertion.
    pub fn enqueue(&mut self, pcb: PcbHandle) {
        pcb.lock().state = ProcessState::Ready;
        self.queue.push_back(pcb);
    }

    /// Push onto the head. AGING uses this to keep the incumbent running.
    pub fn enqueue_head(&mut self, pcb: PcbHandle) {
        pcb.lock().state = ProcessState::Ready;
        self.queue.push_front(pcb);
    }

    /// Insert before the first strictly longer script; equal lengths keep
    /// arrival order.
    pub fn enqueue_sjf(&mut self, pcb: PcbHandle) {
        self.insert_sorted(pcb, |p| p.length);
    }

    /// Same discipline, ordered by `job_length_score`.
    pub fn enqueue_sjf_aging(&mut self, pcb: PcbHandle) {
        self.insert_sorted(pcb, |p| p.job_length_score);
    }

    fn insert_sorted(&mut self, pcb: PcbHandle, key: impl Fn(&Pcb) -> usize) {
        pcb.lock().state = ProcessState::Ready;
        let new_key = key(&*pcb.lock());
        match self
            .queue
            .iter()
            .position(|other| key(&*other.lock()) > new_key)
        {
            Some(i) => self.queue.insert(i, pcb),
            None => self.queue.push_back(pcb),
        }
    }

    pub fn dequeue(&mut self) -> Option<PcbHandle> {
        let pcb = self.queue.pop_front()?;
        pcb.lock().state = ProcessState::Running;
        Some(pcb)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Aging pass: every queued process other than the one that just ran
    /// loses one point, floored at zero.
    pub fn age_all(&mut self, current: &PcbHandle) {
        for other in self.queue.iter() {
            if Arc::ptr_eq(other, current) {
                continue;
            }
            let mut p = other.lock();
            if p.job_length_score > 0 {
                p.job_length_score -= 1;
            }
        }
    }

    /// Queued process with the lowest score; `current` is the baseline
    /// and wins ties.
    pub fn lowest_score_job(&self, current: &PcbHandle) -> PcbHandle {
        let mut lowest = Arc::clone(current);
        let mut lowest_score = current.lock().job_length_score;
        for other in self.queue.iter() {
            let score = other.lock().job_length_score;
            if score < lowest_score {
                lowest_score = score;
                lowest = Arc::clone(other);
            }
        }
        lowest
    }
}

// ============================================================================
// POLICIES
// ============================================================================

/// Scheduling policy selected by `exec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Fcfs,
    Sjf,
    Rr { quantum: usize },
    Aging,
}

impl Policy {
    /// Parse an `exec` policy token.
    pub fn parse(token: &str) -> Option<Policy> {
        match token {
            "FCFS" => Some(Policy::Fcfs),
            "SJF" => Some(Policy::Sjf),
            "RR" => Some(Policy::Rr { quantum: 2 }),
            "RR30" => Some(Policy::Rr { quantum: 30 }),
            "AGING" => Some(Policy::Aging),
            _ => None,
        }
    }

    /// Queue insertion discipline for freshly loaded processes.
    pub fn admit(&self, queue: &mut ReadyQueue, pcb: PcbHandle) {
        match self {
            Policy::Fcfs | Policy::Rr { .. } => queue.enqueue(pcb),
            Policy::Sjf => queue.enqueue_sjf(pcb),
            Policy::Aging => queue.enqueue_sjf_aging(pcb),
        }
    }

    /// Only the round-robin flavours run on the worker pool.
    pub fn supports_workers(&self) -> bool {
        matches!(self, Policy::Rr { .. })
    }
}

// ============================================================================
// EXECUTION LOOPS
// ============================================================================

enum Quantum {
    Ran,     // quantum spent or process finished
    Yielded, // page fault; the PCB is already back in the queue
    Aborted, // unrecoverable fetch, process must die
}

/// Drain the ready queue under `policy`. Returns when the queue is empty.
pub fn run(kernel: &Arc<Kernel>, policy: Policy) {
    match policy {
        Policy::Fcfs | Policy::Sjf => run_to_completion(kernel),
        Policy::Rr { quantum } => run_quantised(kernel, quantum),
        Policy::Aging => run_aging(kernel),
    }
}

/// FCFS and SJF: ordering was fixed at insertion, each process then runs
/// to completion.
fn run_to_completion(kernel: &Arc<Kernel>) {
    while let Some(pcb) = kernel.dequeue() {
        loop {
            if pcb.lock().finished() {
                break;
            }
            match fetch_or_fault(kernel, &pcb) {
                Some(line) => {
                    execute_line(kernel, &line);
                    pcb.lock().pc += 1;
                }
                None => {
                    report_fetch_error(&pcb);
                    break;
                }
            }
        }
        kernel.destroy_pcb(&pcb);
    }
}

/// RR and RR30: up to `quantum` instructions per turn. A page fault loads
/// the page but yields the rest of the turn to the tail of the queue.
fn run_quantised(kernel: &Arc<Kernel>, quantum: usize) {
    while let Some(pcb) = kernel.dequeue() {
        match run_quantum(kernel, &pcb, quantum) {
            Quantum::Yielded => {}
            Quantum::Aborted => kernel.destroy_pcb(&pcb),
            Quantum::Ran => {
                if pcb.lock().finished() {
                    kernel.destroy_pcb(&pcb);
                } else {
                    kernel.enqueue(Arc::clone(&pcb));
                }
            }
        }
    }
}

fn run_quantum(kernel: &Arc<Kernel>, pcb: &PcbHandle, quantum: usize) -> Quantum {
    let mut executed = 0;
    while executed < quantum {
        if pcb.lock().finished() {
            return Quantum::Ran;
        }
        let page = pcb.lock().current_page();
        if !kernel.ensure_resident(pcb, page) {
            // Fault handled; yield with the PC unchanged. The fault does
            // not count against the quantum.
            kernel.enqueue(Arc::clone(pcb));
            return Quantum::Yielded;
        }
        match kernel.fetch_line(pcb) {
            Some(line) => {
                execute_line(kernel, &line);
                pcb.lock().pc += 1;
                executed += 1;
            }
            None => {
                report_fetch_error(pcb);
                return Quantum::Aborted;
            }
        }
    }
    Quantum::Ran
}

/// SJF with aging, quantum 1: run one instruction, age every waiting
/// process, then let the lowest score run next (ties keep the incumbent
/// at the head).
fn run_aging(kernel: &Arc<Kernel>) {
    while let Some(pcb) = kernel.dequeue() {
        if !pcb.lock().finished() {
            match fetch_or_fault(kernel, &pcb) {
                Some(line) => {
                    execute_line(kernel, &line);
                    pcb.lock().pc += 1;
                }
                None => {
                    report_fetch_error(&pcb);
                    kernel.enqueue_sjf_aging(Arc::clone(&pcb));
                    continue;
                }
            }
        }

        kernel.age_queue(&pcb);
        let lowest = kernel.lowest_score_job(&pcb);

        if pcb.lock().finished() {
            kernel.destroy_pcb(&pcb);
        } else if Arc::ptr_eq(&lowest, &pcb) {
            kernel.enqueue_head(Arc::clone(&pcb));
        } else {
            kernel.enqueue_sjf_aging(Arc::clone(&pcb));
        }
    }
}

/// Make the current page resident — resolving at most one page fault
/// inline — and fetch the next instruction. A hit refreshes the frame's
/// LRU tick; `None` from the fetch is unrecoverable for this process.
fn fetch_or_fault(kernel: &Arc<Kernel>, pcb: &PcbHandle) -> Option<String> {
    let page = pcb.lock().current_page();
    kernel.ensure_resident(pcb, page);
    kernel.fetch_line(pcb)
}

/// Feed a fetched instruction back through the command interpreter, as if
/// it had been typed at the prompt.
fn execute_line(kernel: &Arc<Kernel>, line: &str) {
    crate::repl::parse_input(kernel, line, true);
}

fn report_fetch_error(pcb: &PcbHandle) {
    let p = pcb.lock();
    print!(
        "Error: Unable to load instruction for process {} at PC {}.\n",
        p.pid, p.pc
    );
}
