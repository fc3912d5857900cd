use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::msg_fmt::colorize;
use crate::LogLevel;

/// Destination for formatted log lines.
pub trait LogTarget {
    fn log(&self,
           level: LogLevel,
           message: String
    );

    /// Pushes out anything the target buffers. The writer thread calls this
    /// after each drained batch.
    fn flush(&self) {}

    /// Console targets are silenced while the log queue is backed up.
    fn is_console(&self) -> bool {
        false
    }
}

pub struct NoopLogTarget;

impl LogTarget for NoopLogTarget {
    fn log(&self,
           _level: LogLevel,
           _message: String
    ) {}
}

pub struct ConsoleLogTarget;

impl LogTarget for ConsoleLogTarget {
    fn log(&self,
           level: LogLevel,
           message: String
    ) {
        let mut stdout = std::io::stdout().lock();
        if writeln!(stdout, "{}", colorize(level, message)).is_err() {
            eprintln!("Failed to write to stdout!");
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }

    fn is_console(&self) -> bool {
        true
    }
}

/// Appends plain, uncoloured lines to a file through a buffer.
pub struct FileLogTarget {
    path: PathBuf,
    out: Mutex<BufWriter<File>>,
}

impl FileLogTarget {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new().append(true).create(true).open(path)?;
        Ok(FileLogTarget {
            path: path.to_path_buf(),
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogTarget for FileLogTarget {
    fn log(&self,
           _level: LogLevel,
           message: String
    ) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if writeln!(out, "{}", message).is_err() {
            eprintln!("Failed to write to {}!", self.path.display());
        }
    }

    fn flush(&self) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if out.flush().is_err() {
            eprintln!("Failed to flush {}!", self.path.display());
        }
    }
}

impl Drop for FileLogTarget {
    fn drop(&mut self) {
        let out = self.out.get_mut().unwrap_or_else(PoisonError::into_inner);
        let _ = out.flush();
    }
}
