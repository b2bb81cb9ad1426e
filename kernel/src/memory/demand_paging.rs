// kernel/src/memory/demand_paging.rs
//
// Demand paging over the frame store.
//
// Three entry points:
//   1. `handle_page_fault(mem, pcb, page)` — free-frame search, LRU
//      eviction when full, page load, page-table update.
//   2. `ensure_resident(mem, pcb, page)` — check-or-fault in one step,
//      used by every scheduler; this is the one place a resident frame's
//      LRU tick gets refreshed, so each executed instruction costs
//      exactly one tick.
//   3. `fetch_line(mem, pcb)` — pure page-table walk for the next
//      instruction; never touches the LRU clock.
//
// After an eviction the fix-up walks the whole PCB registry and unmaps
// every page-table entry pointing at the victim frame. Callers must not
// hold any PCB lock while calling in here.

use crate::cfg::FRAME_SIZE;
use crate::process::PcbHandle;

use super::frame_store::{self, Page};
use super::Memory;

/// Resolve a fault for `page_number` of `pcb`.
///
/// The free-frame path prints `Page fault!`; the eviction path prints the
/// victim banner instead. Must only be called for a non-resident page.
/// The loaded frame ends up holding the newest LRU tick.
pub fn handle_page_fault(mem: &mut Memory, pcb: &PcbHandle, page_number: usize) {
    let frame = match mem.frames.find_free_frame() {
        Some(frame) => {
            print!("Page fault!\n");
            frame
        }
        None => match mem.frames.evict_lru() {
            Some(victim) => {
                fix_up_page_tables(mem, victim);
                victim
            }
            None => {
                // A frame store with zero frames: nothing can ever be
                // resident, so the process cannot make progress.
                print!("Error: No frames to evict.\n");
                std::process::exit(1);
            }
        },
    };

    let page = {
        let p = pcb.lock();
        read_page(mem, p.start, p.length, page_number)
    };
    mem.frames.load_page(frame, page);

    {
        let mut p = pcb.lock();
        p.page_table[page_number] = Some(frame);
        p.pages_loaded += 1;
        log::debug!("PID {}: page {} -> frame {}", p.pid, page_number, frame);
    }
    mem.frames.access(frame);
}

/// `true` when `page_number` is already mapped (its frame gets a fresh
/// tick), `false` when a fault had to be handled first.
pub fn ensure_resident(mem: &mut Memory, pcb: &PcbHandle, page_number: usize) -> bool {
    let mapped = pcb.lock().page_table[page_number];
    match mapped {
        Some(frame) => {
            mem.frames.access(frame);
            true
        }
        None => {
            handle_page_fault(mem, pcb, page_number);
            false
        }
    }
}

/// Fetch the instruction at `pc` through the page table. `None` when the
/// program has ended, the page is not resident, or the slot is vacant.
/// A pure read: the LRU clock belongs to `ensure_resident` and the fault
/// handler.
pub fn fetch_line(mem: &Memory, pcb: &PcbHandle) -> Option<String> {
    let (offset, mapped) = {
        let p = pcb.lock();
        if p.finished() {
            return None;
        }
        (p.current_offset(), p.page_table[p.current_page()])
    };
    let frame = mapped?;
    mem.frames.line(frame, offset).map(str::to_string)
}

// One script page, padded with empty slots past the script's end.
fn read_page(mem: &Memory, start: usize, length: usize, page_number: usize) -> Page {
    let mut page = frame_store::empty_page();
    let first = start + page_number * FRAME_SIZE;
    for (slot, entry) in page.iter_mut().enumerate() {
        let index = first + slot;
        if index < start + length {
            *entry = mem.scripts.get(index).map(str::to_string);
        }
    }
    page
}

fn fix_up_page_tables(mem: &mut Memory, evicted: usize) {
    for pcb in mem.registry() {
        let mut p = pcb.lock();
        let mut unmapped: usize = 0;
        for entry in p.page_table.iter_mut() {
            if *entry == Some(evicted) {
                *entry = None;
                unmapped += 1;
            }
        }
        p.pages_loaded -= unmapped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Pcb, Pid};
    use spin::Mutex;
    use std::sync::Arc;

    // A registered process over `length` fresh arena lines.
    fn process(mem: &mut Memory, length: usize) -> PcbHandle {
        let start = mem.scripts.next_index();
        for i in 0..length {
            mem.scripts.append(format!("echo {}\n", start + i)).unwrap();
        }
        let pcb: PcbHandle = Arc::new(Mutex::new(Pcb::new(Pid(start), start, length)));
        mem.register(&pcb);
        pcb
    }

    #[test]
    fn fault_maps_page_and_copies_lines() {
        let mut mem = Memory::new(2, 100);
        let pcb = process(&mut mem, 4);

        handle_page_fault(&mut mem, &pcb, 0);

        let p = pcb.lock();
        assert_eq!(p.page_table[0], Some(0));
        assert_eq!(p.pages_loaded, 1);
        drop(p);
        assert_eq!(mem.frames.line(0, 0), Some("echo 0\n"));
        assert_eq!(mem.frames.line(0, 2), Some("echo 2\n"));
        assert!(!mem.frames.is_free(0));
    }

    #[test]
    fn short_tail_page_is_padded() {
        let mut mem = Memory::new(2, 100);
        let pcb = process(&mut mem, 4);

        handle_page_fault(&mut mem, &pcb, 1);

        assert_eq!(mem.frames.line(0, 0), Some("echo 3\n"));
        assert_eq!(mem.frames.line(0, 1), None);
        assert_eq!(mem.frames.line(0, 2), None);
    }

    #[test]
    fn tail_page_never_leaks_the_next_script() {
        let mut mem = Memory::new(2, 100);
        let first = process(&mut mem, 4);
        let _second = process(&mut mem, 3);

        // Page 1 of the first script holds its line 3 only, even though
        // the arena continues with the second script's lines.
        handle_page_fault(&mut mem, &first, 1);
        assert_eq!(mem.frames.line(0, 0), Some("echo 3\n"));
        assert_eq!(mem.frames.line(0, 1), None);
    }

    #[test]
    fn eviction_fixes_up_every_page_table() {
        let mut mem = Memory::new(1, 100);
        let a = process(&mut mem, 3);
        let b = process(&mut mem, 3);

        handle_page_fault(&mut mem, &a, 0);
        // No free frame left: this fault evicts a's only page.
        handle_page_fault(&mut mem, &b, 0);

        let pa = a.lock();
        assert_eq!(pa.page_table[0], None);
        assert_eq!(pa.pages_loaded, 0);
        drop(pa);
        let pb = b.lock();
        assert_eq!(pb.page_table[0], Some(0));
        assert_eq!(pb.pages_loaded, 1);
    }

    #[test]
    fn ensure_resident_refreshes_on_hit_and_faults_on_miss() {
        let mut mem = Memory::new(2, 100);
        let pcb = process(&mut mem, 6);

        assert!(!ensure_resident(&mut mem, &pcb, 0));
        let tick = mem.frames.last_used(0).unwrap();
        assert!(ensure_resident(&mut mem, &pcb, 0));
        assert!(mem.frames.last_used(0).unwrap() > tick);
    }

    #[test]
    fn fetch_line_walks_the_page_table() {
        let mut mem = Memory::new(2, 100);
        let pcb = process(&mut mem, 4);

        assert_eq!(fetch_line(&mem, &pcb), None); // page 0 not resident
        handle_page_fault(&mut mem, &pcb, 0);
        assert_eq!(fetch_line(&mem, &pcb), Some("echo 0\n".to_string()));

        pcb.lock().pc = 3;
        handle_page_fault(&mut mem, &pcb, 1);
        assert_eq!(fetch_line(&mem, &pcb), Some("echo 3\n".to_string()));

        pcb.lock().pc = 4;
        assert_eq!(fetch_line(&mem, &pcb), None); // finished
    }

    #[test]
    fn fetch_line_leaves_the_lru_clock_alone() {
        let mut mem = Memory::new(2, 100);
        let pcb = process(&mut mem, 3);

        handle_page_fault(&mut mem, &pcb, 0);
        let tick = mem.frames.current_time();
        assert!(fetch_line(&mem, &pcb).is_some());
        assert_eq!(mem.frames.current_time(), tick);
    }

    #[test]
    fn lru_victim_is_the_coldest_frame() {
        let mut mem = Memory::new(2, 100);
        let pcb = process(&mut mem, 9);

        handle_page_fault(&mut mem, &pcb, 0); // frame 0
        handle_page_fault(&mut mem, &pcb, 1); // frame 1
        mem.frames.access(0); // page 0 is now hot

        handle_page_fault(&mut mem, &pcb, 2); // evicts frame 1
        let p = pcb.lock();
        assert_eq!(p.page_table[0], Some(0));
        assert_eq!(p.page_table[1], None);
        assert_eq!(p.page_table[2], Some(1));
        assert_eq!(p.pages_loaded, 2);
    }
}
