// kernel/src/repl.rs
//
// Line-oriented front-end: prompt, tokenising, `;` chaining and the EOF
// shutdown path. Scheduled script lines re-enter `parse_input` with
// `nested = true`, so they execute exactly like typed input (minus the
// process-spawning commands).

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use crate::interpreter;
use crate::kernel::Kernel;

pub struct Repl {
    kernel: Arc<Kernel>,
    prompt: &'static str,
    interactive: bool,
}

impl Repl {
    pub fn new(kernel: Arc<Kernel>) -> Self {
        Self {
            kernel,
            prompt: "$ ",
            interactive: io::stdin().is_terminal(),
        }
    }

    /// Read-eval loop until EOF; the caller then shuts the kernel down.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        let mut handle = stdin.lock();
        let mut input = String::new();
        loop {
            if self.interactive {
                print!("{}", self.prompt);
                let _ = io::stdout().flush();
            }
            input.clear();
            match handle.read_line(&mut input) {
                Ok(0) | Err(_) => break, // EOF
                Ok(_) => {
                    parse_input(&self.kernel, &input, false);
                }
            }
        }
    }
}

/// Split the first `;`-delimited command off `input`, run it, and recurse
/// on the tail. An empty command — a blank line, or nothing after a
/// trailing `;` — is itself an unknown command.
pub fn parse_input(kernel: &Arc<Kernel>, input: &str, nested: bool) -> i32 {
    let (words, rest) = split_command(input);
    let code = interpreter::interpret(kernel, &words, nested);
    match rest {
        Some(rest) => parse_input(kernel, rest, nested),
        None => code,
    }
}

// Tokens of the first command, plus the unparsed tail after a `;`.
// A newline terminates the scan.
fn split_command(input: &str) -> (Vec<String>, Option<&str>) {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut rest = None;

    for (i, ch) in input.char_indices() {
        if ch == ';' {
            rest = Some(&input[i + ch.len_utf8()..]);
            break;
        }
        if ch == '\n' {
            break;
        }
        if ch.is_whitespace() {
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            continue;
        }
        word.push(ch);
    }
    if !word.is_empty() {
        words.push(word);
    }
    (words, rest)
}
