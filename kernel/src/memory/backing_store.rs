// kernel/src/memory/backing_store.rs
//
// On-disk mirror of every loaded script: one file per script, named by
// basename, under a scratch directory. Written once at load time and
// read straight back; execution itself only ever touches the frame
// store. The directory is wiped at startup and removed on clean exit.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::LoadError;

pub struct BackingStore {
    dir: PathBuf,
}

impl BackingStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory, clearing leftovers from a previous run.
    pub fn init(&self) -> io::Result<()> {
        if self.dir.exists() {
            self.clear()
        } else {
            fs::create_dir_all(&self.dir)
        }
    }

    fn clear(&self) -> io::Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    /// Remove the directory and everything in it.
    pub fn remove(&self) {
        if self.dir.exists() {
            let _ = self.clear();
            let _ = fs::remove_dir(&self.dir);
        }
    }

    /// Copy `filename` verbatim into the store; returns the copy's path.
    pub fn store(&self, filename: &str) -> Result<PathBuf, LoadError> {
        let mut source =
            File::open(filename).map_err(|_| LoadError::NotFound(filename.to_string()))?;
        let basename = Path::new(filename)
            .file_name()
            .ok_or_else(|| LoadError::NotFound(filename.to_string()))?;
        let dest_path = self.dir.join(basename);
        let backing_error = || LoadError::BackingStore(dest_path.display().to_string());

        let mut dest = File::create(&dest_path).map_err(|_| backing_error())?;
        io::copy(&mut source, &mut dest).map_err(|_| backing_error())?;
        Ok(dest_path)
    }
}

/// Read a stored copy line by line, each line keeping its newline.
pub fn read_script(path: &Path) -> io::Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        lines.push(line);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("so_kernel_bs_{}_{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn store_copies_by_basename() {
        let dir = scratch("copy");
        let script = dir.join("prog");
        fs::write(&script, "echo a\necho b\n").unwrap();

        let store = BackingStore::new(dir.join("backing"));
        store.init().unwrap();
        let copy = store.store(script.to_str().unwrap()).unwrap();

        assert_eq!(copy, dir.join("backing").join("prog"));
        assert_eq!(fs::read_to_string(&copy).unwrap(), "echo a\necho b\n");

        store.remove();
        assert!(!store.dir().exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn store_missing_file_is_not_found() {
        let dir = scratch("missing");
        let store = BackingStore::new(dir.join("backing"));
        store.init().unwrap();
        assert_eq!(
            store.store("no_such_script"),
            Err(LoadError::NotFound("no_such_script".to_string()))
        );
        store.remove();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn init_clears_previous_run() {
        let dir = scratch("clear");
        let store = BackingStore::new(dir.join("backing"));
        store.init().unwrap();
        let mut file = File::create(store.dir().join("stale")).unwrap();
        writeln!(file, "old").unwrap();
        drop(file);

        store.init().unwrap();
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 0);
        store.remove();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_script_keeps_newlines() {
        let dir = scratch("lines");
        let script = dir.join("prog");
        fs::write(&script, "one\ntwo\nlast without newline").unwrap();
        let lines = read_script(&script).unwrap();
        assert_eq!(lines, vec!["one\n", "two\n", "last without newline"]);
        let _ = fs::remove_dir_all(&dir);
    }
}
