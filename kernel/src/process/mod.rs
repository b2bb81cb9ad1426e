// kernel/src/process/mod.rs

use std::fmt;
use std::sync::Arc;

use spin::Mutex;

use crate::cfg::FRAME_SIZE;

pub mod scheduler;

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pid(pub usize);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Estado del proceso
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,      // Esperando en la ready queue
    Running,    // Ejecutándose actualmente
    Terminated, // pc llegó al final del script
}

/// Process Control Block (PCB)
///
/// A process is a slice `[start, start + length)` of the script store plus
/// a program counter and a page table mapping script pages to frames
/// (`None` = not resident). `job_length_score` starts at the script length
/// and is what the AGING policy decays while the process waits.
#[derive(Debug)]
pub struct Pcb {
    pub pid: Pid,
    pub state: ProcessState,
    pub start: usize,
    pub length: usize,
    pub pc: usize,
    pub job_length_score: usize,
    pub pages_max: usize,
    pub pages_loaded: usize,
    pub page_table: Vec<Option<usize>>,
}

/// Shared handle: the ready queue, the PCB registry and a running worker
/// all alias the same PCB.
pub type PcbHandle = Arc<Mutex<Pcb>>;

impl Pcb {
    pub fn new(pid: Pid, start: usize, length: usize) -> Self {
        let pages_max = length.div_ceil(FRAME_SIZE);
        Self {
            pid,
            state: ProcessState::Ready,
            start,
            length,
            pc: 0,
            job_length_score: length,
            pages_max,
            pages_loaded: 0,
            page_table: vec![None; pages_max],
        }
    }

    /// Page holding the next instruction.
    pub fn current_page(&self) -> usize {
        self.pc / FRAME_SIZE
    }

    /// Slot of the next instruction within its page.
    pub fn current_offset(&self) -> usize {
        self.pc % FRAME_SIZE
    }

    pub fn finished(&self) -> bool {
        self.pc >= self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_table_sized_from_length() {
        let pcb = Pcb::new(Pid(1), 10, 7);
        assert_eq!(pcb.pages_max, 3);
        assert_eq!(pcb.page_table, vec![None, None, None]);
        assert_eq!(pcb.job_length_score, 7);
        assert!(!pcb.finished());
    }

    #[test]
    fn empty_script_finishes_immediately() {
        let pcb = Pcb::new(Pid(2), 0, 0);
        assert_eq!(pcb.pages_max, 0);
        assert!(pcb.finished());
    }

    #[test]
    fn page_and_offset_track_pc() {
        let mut pcb = Pcb::new(Pid(3), 0, 9);
        assert_eq!((pcb.current_page(), pcb.current_offset()), (0, 0));
        pcb.pc = 5;
        assert_eq!((pcb.current_page(), pcb.current_offset()), (1, 2));
    }
}
