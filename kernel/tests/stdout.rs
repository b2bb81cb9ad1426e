// kernel/tests/stdout.rs
//
// Bit-exact stdout checks: the real `so-shell` binary is spawned with
// piped stdio and its output compared against the literal page-fault and
// eviction banners. The store sizes come from `so_kernel::cfg`, so these
// tests stay valid when the sizes are overridden at build time.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use so_kernel::cfg::{FRAME_COUNT, FRAME_SIZE, FRAME_STORE_SIZE, MAX_SCRIPTS, VARIABLE_STORE_SIZE};

const SHELL: &str = env!("CARGO_BIN_EXE_so-shell");

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("so_shell_out_{}_{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

// Run the shell in `dir`, feed it `input`, return its whole stdout.
fn shell_output(dir: &PathBuf, input: &str) -> String {
    let mut child = Command::new(SHELL)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

fn banner() -> String {
    format!(
        "Frame Store Size = {}; Variable Store Size = {}\n",
        FRAME_STORE_SIZE, VARIABLE_STORE_SIZE
    )
}

#[test]
fn first_load_prints_the_page_fault_banner() {
    let dir = scratch("fault");
    fs::write(dir.join("prog"), "echo A\necho B\necho C\n").unwrap();

    let stdout = shell_output(&dir, "exec prog FCFS\n");

    // One page primed at load (free frame), then the three echoes.
    assert_eq!(stdout, format!("{}Page fault!\nA\nB\nC\n", banner()));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn eviction_prints_the_victim_page_verbatim() {
    let dir = scratch("evict");
    // One page more than the frame store holds: running the script walks
    // every page in order and the last page fault must evict the coldest
    // frame, which by then holds the script's first page.
    let lines = (FRAME_COUNT + 1) * FRAME_SIZE;
    assert!(lines <= MAX_SCRIPTS);
    let script: String = (0..lines).map(|i| format!("echo v{i}\n")).collect();
    fs::write(dir.join("big"), script).unwrap();

    let stdout = shell_output(&dir, "exec big FCFS\n");

    let victim_block = "Page fault! Victim page contents:\n\n\
                        echo v0\necho v1\necho v2\n\
                        \nEnd of victim page contents.\n";
    assert_eq!(stdout.matches(victim_block).count(), 1);
    // Every other fault found a free frame.
    assert_eq!(stdout.matches("Page fault!\n").count(), FRAME_COUNT);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn quit_prints_bye_and_removes_the_backing_store() {
    let dir = scratch("quit");
    let stdout = shell_output(&dir, "quit\n");
    assert_eq!(stdout, format!("{}Bye!\n", banner()));
    assert!(!dir.join("backing_store").exists());
    let _ = fs::remove_dir_all(&dir);
}
