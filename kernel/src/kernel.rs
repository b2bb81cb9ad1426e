// kernel/src/kernel.rs
//
// The whole machine in one value: paged memory, ready queue, variable
// store, backing store and the worker pool. Shell commands end up as
// method calls on `Kernel`; nothing lives in process-wide statics, so
// tests can build as many kernels as they like.
//
// Locking rules (MT mode):
//   - `memory` covers the frame store, the script arena, the PCB registry
//     and the pid counter. One acquisition per pager/loader operation.
//   - `ready` covers the queue and the queue walks (aging, lowest-score).
//   - `variables` is independent.
//   - A PCB lock is only ever taken while holding at most one of the
//     above, and never the other way round: holding a PCB lock while
//     acquiring `memory` or `ready` is forbidden.
//   - `ready` and `memory` are never nested.
// Instructions execute with no lock held.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use spin::Mutex;

use crate::cfg;
use crate::memory::backing_store::BackingStore;
use crate::memory::demand_paging;
use crate::memory::variable_store::VariableStore;
use crate::memory::{LoadError, Memory};
use crate::process::scheduler::{self, Policy, ReadyQueue};
use crate::process::{PcbHandle, ProcessState};

pub struct KernelConfig {
    /// Frame store size in lines; the frame count is this over FRAME_SIZE.
    pub frame_store_size: usize,
    pub variable_store_size: usize,
    pub script_capacity: usize,
    pub backing_dir: PathBuf,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            frame_store_size: cfg::FRAME_STORE_SIZE,
            variable_store_size: cfg::VARIABLE_STORE_SIZE,
            script_capacity: cfg::MAX_SCRIPTS,
            backing_dir: PathBuf::from(cfg::BACKING_STORE_DIR),
        }
    }
}

pub struct Kernel {
    memory: Mutex<Memory>,
    ready: Mutex<ReadyQueue>,
    variables: Mutex<VariableStore>,
    backing: BackingStore,
    frame_store_size: usize,
    variable_store_size: usize,
    quit_requested: AtomicBool,
    multithread_enabled: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Kernel {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            memory: Mutex::new(Memory::new(
                config.frame_store_size / cfg::FRAME_SIZE,
                config.script_capacity,
            )),
            ready: Mutex::new(ReadyQueue::new()),
            variables: Mutex::new(VariableStore::new(config.variable_store_size)),
            backing: BackingStore::new(config.backing_dir),
            frame_store_size: config.frame_store_size,
            variable_store_size: config.variable_store_size,
            quit_requested: AtomicBool::new(false),
            multithread_enabled: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Startup banner with the configured store sizes.
    pub fn print_banner(&self) {
        println!(
            "Frame Store Size = {}; Variable Store Size = {}",
            self.frame_store_size, self.variable_store_size
        );
    }

    // ── Backing store ──────────────────────────────────────────────────

    pub fn init_backing_store(&self) -> io::Result<()> {
        self.backing.init()
    }

    pub fn remove_backing_store(&self) {
        self.backing.remove()
    }

    // ── Paged memory ───────────────────────────────────────────────────

    pub fn load_script(&self, filename: &str) -> Result<PcbHandle, LoadError> {
        self.memory.lock().load_script(&self.backing, filename)
    }

    pub fn handle_page_fault(&self, pcb: &PcbHandle, page_number: usize) {
        demand_paging::handle_page_fault(&mut self.memory.lock(), pcb, page_number)
    }

    pub fn ensure_resident(&self, pcb: &PcbHandle, page_number: usize) -> bool {
        demand_paging::ensure_resident(&mut self.memory.lock(), pcb, page_number)
    }

    pub fn fetch_line(&self, pcb: &PcbHandle) -> Option<String> {
        demand_paging::fetch_line(&self.memory.lock(), pcb)
    }

    /// Drop a process from the registry. Its frames stay loaded until
    /// eviction or shutdown reclaims them.
    pub fn destroy_pcb(&self, pcb: &PcbHandle) {
        self.memory.lock().unregister(pcb);
        let mut p = pcb.lock();
        p.state = ProcessState::Terminated;
        log::debug!("PID {} terminated at pc {}", p.pid, p.pc);
    }

    /// Live processes, for inspection.
    pub fn process_count(&self) -> usize {
        self.memory.lock().registry().len()
    }

    // ── Ready queue ────────────────────────────────────────────────────

    pub fn enqueue(&self, pcb: PcbHandle) {
        self.ready.lock().enqueue(pcb)
    }

    pub fn enqueue_head(&self, pcb: PcbHandle) {
        self.ready.lock().enqueue_head(pcb)
    }

    pub fn enqueue_sjf(&self, pcb: PcbHandle) {
        self.ready.lock().enqueue_sjf(pcb)
    }

    pub fn enqueue_sjf_aging(&self, pcb: PcbHandle) {
        self.ready.lock().enqueue_sjf_aging(pcb)
    }

    pub fn dequeue(&self) -> Option<PcbHandle> {
        self.ready.lock().dequeue()
    }

    pub fn admit(&self, policy: Policy, pcb: PcbHandle) {
        policy.admit(&mut self.ready.lock(), pcb)
    }

    pub fn age_queue(&self, current: &PcbHandle) {
        self.ready.lock().age_all(current)
    }

    pub fn lowest_score_job(&self, current: &PcbHandle) -> PcbHandle {
        self.ready.lock().lowest_score_job(current)
    }

    pub fn ready_is_empty(&self) -> bool {
        self.ready.lock().is_empty()
    }

    // ── Variable store ─────────────────────────────────────────────────

    pub fn set_variable(&self, var: &str, value: &str) {
        self.variables.lock().set(var, value)
    }

    pub fn get_variable(&self, var: &str) -> Option<String> {
        self.variables.lock().get(var)
    }

    // ── Quit & workers ─────────────────────────────────────────────────

    pub fn request_quit(&self) {
        self.quit_requested.store(true, Ordering::SeqCst);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::SeqCst)
    }

    pub fn workers_active(&self) -> bool {
        self.multithread_enabled.load(Ordering::SeqCst)
    }

    /// Spawn the round-robin worker pool. Only the first call does
    /// anything; the pool is never re-created within a shell session.
    pub fn start_workers(self: &Arc<Self>, policy: Policy) {
        if self.multithread_enabled.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut workers = self.workers.lock();
        for _ in 0..cfg::NUM_WORKERS {
            let kernel = Arc::clone(self);
            workers.push(std::thread::spawn(move || {
                scheduler::run(&kernel, policy);
            }));
        }
        log::debug!("spawned {} workers for {:?}", cfg::NUM_WORKERS, policy);
    }

    /// Wait for every worker to drain the queue and return.
    pub fn join_workers(&self) {
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }
}
