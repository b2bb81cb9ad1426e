// kernel/src/memory/mod.rs
//
// Paged shell memory. The script-line arena, the frame store and the PCB
// registry live together in `Memory` so one lock covers the pager, the
// loader and eviction fix-up — see `kernel.rs` for the locking rules.

use std::sync::Arc;

use spin::Mutex;
use thiserror::Error;

use crate::cfg::MAX_LINE_LENGTH;
use crate::process::{Pcb, PcbHandle, Pid};

pub mod backing_store;
pub mod demand_paging;
pub mod frame_store;
pub mod script_store;
pub mod variable_store;

use backing_store::BackingStore;
use frame_store::FrameStore;
use script_store::ScriptStore;

/// Script loading failures. The display text is printed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Error: Cannot open script file {0}")]
    NotFound(String),
    #[error("Error: Cannot create backing store file {0}")]
    BackingStore(String),
    #[error("Error: Script memory is full")]
    ScriptStoreFull,
}

pub struct Memory {
    pub scripts: ScriptStore,
    pub frames: FrameStore,
    registry: Vec<PcbHandle>,
    next_pid: usize,
}

impl Memory {
    pub fn new(frame_count: usize, script_capacity: usize) -> Self {
        Self {
            scripts: ScriptStore::new(script_capacity),
            frames: FrameStore::new(frame_count),
            registry: Vec::new(),
            next_pid: 0,
        }
    }

    fn allocate_pid(&mut self) -> Pid {
        let pid = Pid(self.next_pid);
        self.next_pid += 1;
        pid
    }

    /// Every live PCB, for eviction fix-up.
    pub fn registry(&self) -> &[PcbHandle] {
        &self.registry
    }

    pub(crate) fn register(&mut self, pcb: &PcbHandle) {
        self.registry.push(Arc::clone(pcb));
    }

    pub(crate) fn unregister(&mut self, pcb: &PcbHandle) {
        self.registry.retain(|other| !Arc::ptr_eq(other, pcb));
    }

    /// Load a script as a new process: mirror the file into the backing
    /// store, re-read the copy into the script arena, create and register
    /// the PCB, then prime its first pages through the fault handler.
    pub fn load_script(
        &mut self,
        backing: &BackingStore,
        filename: &str,
    ) -> Result<PcbHandle, LoadError> {
        let copy = backing.store(filename)?;
        let lines = backing_store::read_script(&copy)
            .map_err(|_| LoadError::BackingStore(copy.display().to_string()))?;

        let start = self.scripts.next_index();
        let mut length = 0;
        for line in lines {
            for piece in split_line(line) {
                self.scripts.append(piece)?;
                length += 1;
            }
        }

        let pid = self.allocate_pid();
        let pcb: PcbHandle = Arc::new(Mutex::new(Pcb::new(pid, start, length)));
        self.register(&pcb);

        let pages_to_load = pcb.lock().pages_max.min(2);
        for page in 0..pages_to_load {
            demand_paging::handle_page_fault(self, &pcb, page);
        }

        log::debug!(
            "loaded {} as PID {} ({} lines, {} primed pages)",
            filename,
            pid,
            length,
            pages_to_load
        );
        Ok(pcb)
    }
}

// Input lines longer than the store's line bound are split into
// MAX_LINE_LENGTH - 1 character pieces, the way a bounded line read
// chops them.
fn split_line(line: String) -> Vec<String> {
    const CHUNK: usize = MAX_LINE_LENGTH - 1;
    if line.chars().count() <= CHUNK {
        return vec![line];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in line.chars() {
        current.push(ch);
        count += 1;
        if count == CHUNK {
            pieces.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
