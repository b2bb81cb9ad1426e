// kernel/src/memory/frame_store.rs
//
// Fixed grid of frames, FRAME_SIZE lines each, with a per-frame last-use
// tick driving LRU eviction. Invariante: un frame está o bien libre
// (sin tick, todos los slots vacíos) o cargado (tick puesto, slots con
// una página del script store).

use crate::cfg::FRAME_SIZE;

pub type Page = [Option<String>; FRAME_SIZE];

pub fn empty_page() -> Page {
    std::array::from_fn(|_| None)
}

pub struct FrameStore {
    contents: Vec<Page>,
    last_used: Vec<Option<u64>>,
    current_time: u64,
}

impl FrameStore {
    pub fn new(frame_count: usize) -> Self {
        Self {
            contents: (0..frame_count).map(|_| empty_page()).collect(),
            last_used: vec![None; frame_count],
            current_time: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.last_used.len()
    }

    /// Lowest-index free frame, if any.
    pub fn find_free_frame(&self) -> Option<usize> {
        self.last_used.iter().position(Option::is_none)
    }

    /// Bump the LRU clock and stamp `frame` with the fresh tick.
    pub fn access(&mut self, frame: usize) {
        self.current_time += 1;
        self.last_used[frame] = Some(self.current_time);
    }

    /// Overwrite `frame` with one script page. The LRU clock is not
    /// touched here; callers stamp the frame once the load is done.
    pub fn load_page(&mut self, frame: usize, page: Page) {
        self.contents[frame] = page;
    }

    pub fn line(&self, frame: usize, offset: usize) -> Option<&str> {
        self.contents[frame][offset].as_deref()
    }

    pub fn is_free(&self, frame: usize) -> bool {
        self.last_used[frame].is_none()
    }

    pub fn last_used(&self, frame: usize) -> Option<u64> {
        self.last_used[frame]
    }

    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    /// Evict the least recently used frame: print the victim banner with
    /// the frame's lines verbatim, clear it and mark it free. The scan is
    /// index-ascending, so the lowest index wins a tick tie. `None` when
    /// no frame is loaded at all.
    pub fn evict_lru(&mut self) -> Option<usize> {
        let mut victim: Option<(usize, u64)> = None;
        for (frame, tick) in self.last_used.iter().enumerate() {
            let Some(tick) = tick else { continue };
            match victim {
                Some((_, best)) if *tick >= best => {}
                _ => victim = Some((frame, *tick)),
            }
        }
        let (frame, _) = victim?;

        print!("Page fault! Victim page contents:\n\n");
        for slot in self.contents[frame].iter_mut() {
            if let Some(line) = slot.take() {
                print!("{}", line);
            }
        }
        print!("\nEnd of victim page contents.\n");

        self.last_used[frame] = None;
        log::debug!("evicted frame {}", frame);
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(lines: &[String]) -> Page {
        let mut page = empty_page();
        for (i, line) in lines.iter().enumerate() {
            page[i] = Some(line.clone());
        }
        page
    }

    #[test]
    fn frames_start_free() {
        let frames = FrameStore::new(3);
        assert_eq!(frames.find_free_frame(), Some(0));
        assert!(frames.is_free(2));
        assert_eq!(frames.current_time(), 0);
    }

    #[test]
    fn access_ticks_are_unique_and_increasing() {
        let mut frames = FrameStore::new(3);
        frames.access(0);
        frames.access(1);
        frames.access(0);
        assert_eq!(frames.last_used(1), Some(2));
        assert_eq!(frames.last_used(0), Some(3));
        assert_eq!(frames.find_free_frame(), Some(2));
    }

    #[test]
    fn evict_picks_smallest_tick_and_clears() {
        let mut frames = FrameStore::new(3);
        for f in 0..3 {
            frames.load_page(f, page(&[format!("line {f}\n")]));
            frames.access(f);
        }
        frames.access(0); // frame 1 is now the oldest

        assert_eq!(frames.evict_lru(), Some(1));
        assert!(frames.is_free(1));
        assert_eq!(frames.line(1, 0), None);
        // The refreshed frame survived.
        assert_eq!(frames.line(0, 0), Some("line 0\n"));
    }

    #[test]
    fn evict_with_nothing_loaded_is_none() {
        let mut frames = FrameStore::new(2);
        assert_eq!(frames.evict_lru(), None);
    }
}
