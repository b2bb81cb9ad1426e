// kernel/src/interpreter.rs
//
// Command dispatch for the shell. Scheduled script lines come back in
// through the same entry point with `nested = true`, where the
// process-spawning commands (`run`, `exec`) are refused.

use std::fs::{self, OpenOptions};
use std::sync::Arc;

use thiserror::Error;

use crate::cfg::MAX_ARGS_SIZE;
use crate::kernel::Kernel;
use crate::process::scheduler::{self, Policy};
use crate::process::PcbHandle;

/// User-facing command failures. The display text is printed verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown Command")]
    Unknown,
    #[error("Bad command: Too many tokens")]
    TooManyTokens,
    #[error("Bad command: File not found")]
    FileNotFound,
    #[error("Bad command: my_mkdir")]
    Mkdir,
    #[error("Bad command: my_cd")]
    Cd,
}

impl CommandError {
    pub fn code(&self) -> i32 {
        match self {
            CommandError::Unknown => 1,
            CommandError::TooManyTokens => 2,
            CommandError::FileNotFound => 3,
            CommandError::Mkdir => 4,
            CommandError::Cd => 5,
        }
    }
}

type CommandResult = Result<i32, CommandError>;

/// Dispatch one tokenised command. Errors are printed here; the returned
/// code is 0 for success or the error's code.
pub fn interpret(kernel: &Arc<Kernel>, words: &[String], nested: bool) -> i32 {
    match dispatch(kernel, words, nested) {
        Ok(code) => code,
        Err(err) => {
            println!("{}", err);
            err.code()
        }
    }
}

fn dispatch(kernel: &Arc<Kernel>, words: &[String], nested: bool) -> CommandResult {
    if words.is_empty() {
        return Err(CommandError::Unknown);
    }
    if words.len() > MAX_ARGS_SIZE {
        return Err(CommandError::TooManyTokens);
    }

    match (words[0].as_str(), words.len()) {
        ("help", 1) => help(),
        ("quit", 1) => quit(kernel),
        ("set", 3..=7) => set(kernel, &words[1], &words[2..]),
        ("print", 2) => print_var(kernel, &words[1]),
        ("echo", 2) => echo(kernel, &words[1]),
        ("my_ls", 1) => my_ls(),
        ("my_mkdir", 2) => my_mkdir(kernel, &words[1]),
        ("my_touch", 2) => my_touch(&words[1]),
        ("my_cd", 2) => my_cd(&words[1]),
        ("run", 2) if !nested => run(kernel, &words[1]),
        ("exec", 3..=7) if !nested => exec(kernel, &words[1..]),
        _ => Err(CommandError::Unknown),
    }
}

fn help() -> CommandResult {
    let help_string = "COMMAND            DESCRIPTION\n \
help                Displays all the commands\n \
quit                Exits / terminates the shell with “Bye!”\n \
set VAR STRING      Assigns a value to shell memory\n \
print VAR           Displays the STRING assigned to VAR\n \
run SCRIPT.TXT      Executes the file SCRIPT.TXT\n";
    println!("{}", help_string);
    Ok(0)
}

fn quit(kernel: &Arc<Kernel>) -> CommandResult {
    println!("Bye!");

    if kernel.workers_active() {
        // Workers may still be draining the queue; the shell exits on the
        // next exec, or on EOF once they are joined.
        kernel.request_quit();
        return Ok(0);
    }

    kernel.remove_backing_store();
    std::process::exit(0);
}

fn set(kernel: &Arc<Kernel>, var: &str, values: &[String]) -> CommandResult {
    kernel.set_variable(var, &values.join(" "));
    Ok(0)
}

fn print_var(kernel: &Arc<Kernel>, var: &str) -> CommandResult {
    match kernel.get_variable(var) {
        Some(value) => println!("{}", value),
        None => println!("Variable does not exist"),
    }
    Ok(0)
}

fn echo(kernel: &Arc<Kernel>, token: &str) -> CommandResult {
    if let Some(var) = token.strip_prefix('$') {
        println!("{}", kernel.get_variable(var).unwrap_or_default());
    } else {
        println!("{}", token);
    }
    Ok(0)
}

fn my_ls() -> CommandResult {
    let entries = match fs::read_dir(".") {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("my_ls couldn't scan the directory: {}", err);
            return Ok(0);
        }
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    for name in names {
        if !name.starts_with('.') {
            println!("{}", name);
        }
    }
    Ok(0)
}

fn my_mkdir(kernel: &Arc<Kernel>, name: &str) -> CommandResult {
    let name = if let Some(var) = name.strip_prefix('$') {
        match kernel.get_variable(var) {
            Some(value) => value,
            None => return Err(CommandError::Mkdir),
        }
    } else {
        name.to_string()
    };
    if !is_alphanumeric_name(&name) {
        return Err(CommandError::Mkdir);
    }
    if let Err(err) = fs::create_dir(&name) {
        eprintln!("Something went wrong in my_mkdir: {}", err);
    }
    Ok(0)
}

fn my_touch(path: &str) -> CommandResult {
    if !is_alphanumeric_name(path) {
        return Err(CommandError::Unknown);
    }
    if let Err(err) = OpenOptions::new().append(true).create(true).open(path) {
        log::warn!("my_touch {} failed: {}", path, err);
    }
    Ok(0)
}

fn my_cd(path: &str) -> CommandResult {
    if !is_alphanumeric_name(path) || std::env::set_current_dir(path).is_err() {
        return Err(CommandError::Cd);
    }
    Ok(0)
}

fn is_alphanumeric_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric())
}

// ============================================================================
// run / exec
// ============================================================================

fn run(kernel: &Arc<Kernel>, script: &str) -> CommandResult {
    let pcb = match kernel.load_script(script) {
        Ok(pcb) => pcb,
        Err(err) => {
            println!("{}", err);
            return Err(CommandError::FileNotFound);
        }
    };
    kernel.enqueue(pcb);
    scheduler::run(kernel, Policy::Fcfs);
    Ok(0)
}

/// Parsed `exec` arguments: 1–3 programs plus a policy, with the `MT` and
/// `#` flags accepted anywhere.
#[derive(Debug, PartialEq, Eq)]
struct ExecArgs {
    programs: Vec<String>,
    policy: Policy,
    multithread: bool,
    background: bool,
}

fn parse_exec_args(args: &[String]) -> Result<ExecArgs, CommandError> {
    let mut programs = Vec::new();
    let mut policy = None;
    let mut multithread = false;
    let mut background = false;

    for arg in args {
        match arg.as_str() {
            "MT" => multithread = true,
            "#" => background = true,
            token => {
                if let Some(parsed) = Policy::parse(token) {
                    policy = Some(parsed);
                } else if programs.len() < 3 {
                    programs.push(token.to_string());
                } else {
                    return Err(CommandError::Unknown);
                }
            }
        }
    }

    let policy = policy.ok_or(CommandError::Unknown)?;
    if programs.is_empty() {
        return Err(CommandError::Unknown);
    }
    Ok(ExecArgs {
        programs,
        policy,
        multithread,
        background,
    })
}

fn exec(kernel: &Arc<Kernel>, args: &[String]) -> CommandResult {
    // A quit issued while workers were active ends the shell on the next
    // exec.
    if kernel.quit_requested() {
        kernel.remove_backing_store();
        std::process::exit(0);
    }

    let parsed = parse_exec_args(args)?;
    // Background execution is accepted but not simulated.
    let _ = parsed.background;

    let mut loaded: Vec<PcbHandle> = Vec::new();
    for program in &parsed.programs {
        match kernel.load_script(program) {
            Ok(pcb) => loaded.push(pcb),
            Err(err) => {
                println!("{}", err);
                println!("Error: Could not load {}", program);
                for pcb in &loaded {
                    kernel.destroy_pcb(pcb);
                }
                return Ok(CommandError::FileNotFound.code());
            }
        }
    }

    for pcb in loaded {
        kernel.admit(parsed.policy, pcb);
    }

    if parsed.multithread && parsed.policy.supports_workers() {
        kernel.start_workers(parsed.policy);
        return Ok(0);
    }

    scheduler::run(kernel, parsed.policy);
    Ok(0)
}
