// kernel/src/memory/script_store.rs
//
// Append-only arena of script source lines. Lines keep the trailing
// newline they were read with, and once appended they are never removed,
// so the `[start, start + length)` slice handed to a PCB stays valid and
// immutable for as long as the shell runs.

use super::LoadError;

pub struct ScriptStore {
    lines: Vec<String>,
    capacity: usize,
}

impl ScriptStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Vec::new(),
            capacity,
        }
    }

    /// Index the next append will land on.
    pub fn next_index(&self) -> usize {
        self.lines.len()
    }

    /// Append one line, or `ScriptStoreFull` once the arena is at capacity.
    pub fn append(&mut self, line: String) -> Result<usize, LoadError> {
        if self.lines.len() >= self.capacity {
            return Err(LoadError::ScriptStoreFull);
        }
        let index = self.lines.len();
        self.lines.push(line);
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_hands_out_consecutive_indices() {
        let mut store = ScriptStore::new(10);
        assert_eq!(store.append("echo a\n".into()), Ok(0));
        assert_eq!(store.append("echo b\n".into()), Ok(1));
        assert_eq!(store.next_index(), 2);
        assert_eq!(store.get(0), Some("echo a\n"));
        assert_eq!(store.get(1), Some("echo b\n"));
        assert_eq!(store.get(2), None);
    }

    #[test]
    fn full_arena_rejects_appends() {
        let mut store = ScriptStore::new(2);
        store.append("1\n".into()).unwrap();
        store.append("2\n".into()).unwrap();
        assert_eq!(store.append("3\n".into()), Err(LoadError::ScriptStoreFull));
        // Nothing was lost on the failed append.
        assert_eq!(store.len(), 2);
    }
}
