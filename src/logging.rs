//! Process-wide logger for the `log` facade.
//!
//! Progress (`Info` and below) goes to standard output, `Warn` and `Error`
//! go to standard error. Each line starts with its level tag.

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{self, Write};
use std::sync::Mutex;

pub struct StreamLogger<O, E> {
    level: LevelFilter,
    out: Mutex<O>,
    err: Mutex<E>,
}

impl<O, E> StreamLogger<O, E>
where
    O: Write + Send,
    E: Write + Send,
{
    pub fn new(level: LevelFilter, out: O, err: E) -> Self {
        StreamLogger {
            level,
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }
}

impl<O, E> Log for StreamLogger<O, E>
where
    O: Write + Send,
    E: Write + Send,
{
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format!("{:<5} [{}] {}\n", record.level(), record.target(), record.args());
        // Write errors are dropped.
        if record.level() <= Level::Warn {
            if let Ok(mut err) = self.err.lock() {
                let _ = err.write_all(line.as_bytes());
            }
        } else if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.flush();
        }
        if let Ok(mut err) = self.err.lock() {
            let _ = err.flush();
        }
    }
}

/// Installs a `StreamLogger` over the process's stdout and stderr.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(StreamLogger::new(level, io::stdout(), io::stderr())))?;
    log::set_max_level(level);

    Ok(())
}
