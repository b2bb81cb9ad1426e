// kernel/src/logger.rs
//
// Backend for the `log` facade: `[level] target: message` lines on
// stderr, so stdout stays reserved for the shell protocol (banner,
// page-fault output, command results). The level is fixed at compile
// time by the `debug`/`trace` cargo features.

use log::{Level, Log, Metadata, Record};

static LOGGER: Logger = Logger;

struct Logger;

// `return` statements and `#[allow]` required here because of the `cfg`s
// and how log levels work
#[allow(unreachable_code)]
const fn log_level() -> Level {
    #[cfg(feature = "trace")]
    return Level::Trace;

    #[cfg(feature = "debug")]
    return Level::Debug;

    Level::Warn
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let label = match record.level() {
                Level::Trace => "[trace]",
                Level::Debug => "[debug]",
                Level::Info => "[info] ",
                Level::Warn => "[warn] ",
                Level::Error => "[error]",
            };
            eprintln!("{} {}: {}", label, record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

pub fn init() {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(log_level().to_level_filter()))
        .expect("Error setting logger!");
}
