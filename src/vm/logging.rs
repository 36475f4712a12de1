use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use crate::common::*;

fn secs_since_unix_epoch() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|dur| dur.as_secs_f64())
        .unwrap_or(0.)
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct DummyLogger {
    sink: String,
}

/// Keeps the log in memory, every line prefixed with a tag.
#[derive(Debug)]
pub struct StringLogger {
    tag: String,
    log: String,
}

/// Appends timestamped lines to a file.
#[derive(Debug)]
pub struct FileLogger {
    tag: String,
    file: std::fs::File,
    // bytes of the line under construction
    line: String,
}

impl DummyLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StringLogger {
    pub fn new<S: ToString>(tag: S) -> Self {
        Self { tag: tag.to_string(), log: String::new() }
    }

    pub fn contents(&self) -> &str {
        &self.log
    }
}

impl FileLogger {
    pub fn new<S: ToString>(tag: S, file: std::fs::File) -> Self {
        Self { tag: tag.to_string(), file, line: String::new() }
    }

    fn flush_line(&mut self) {
        if !self.line.is_empty() {
            let _ = writeln!(self.file, "{}", self.line);
            self.line.clear();
        }
    }
}

/////////////////
impl Logger for DummyLogger {
    fn line_writer(&mut self) -> &mut dyn std::fmt::Write {
        self.sink.clear();
        &mut self.sink
    }
    fn dump_log(&self, _w: &mut dyn std::io::Write) {}
}

impl Logger for StringLogger {
    fn line_writer(&mut self) -> &mut dyn std::fmt::Write {
        if !self.log.is_empty() {
            self.log.push('\n');
        }
        let _ = write!(&mut self.log, "{}: ", self.tag);
        &mut self.log
    }
    fn dump_log(&self, w: &mut dyn std::io::Write) {
        let _ = w.write_all(self.log.as_bytes());
    }
}

impl Logger for FileLogger {
    fn line_writer(&mut self) -> &mut dyn std::fmt::Write {
        self.flush_line();
        let _ = write!(&mut self.line, "{} at {:.6} ", self.tag, secs_since_unix_epoch());
        &mut self.line
    }
    fn dump_log(&self, _w: &mut dyn std::io::Write) {
        // already on disk
    }
}

impl Drop for FileLogger {
    fn drop(&mut self) {
        self.flush_line();
    }
}
