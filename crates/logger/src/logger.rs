use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use crate::log_queue::{LogQueue, LogSink};
use crate::targets::LogTarget;
use crate::thread_label::current_thread_label;
use crate::LogEntry;

#[derive(Debug, Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Notice,
    Warn,
    Error,
    Critical,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Notice => "NOTICE",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Fatal => "FATAL",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Notice,
            4 => LogLevel::Warn,
            5 => LogLevel::Error,
            6 => LogLevel::Critical,
            _ => LogLevel::Fatal,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "notice" => Ok(LogLevel::Notice),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            "fatal" => Ok(LogLevel::Fatal),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

type BoxedTarget = Box<dyn LogTarget + Send + Sync>;

/// Logging context shared by every thread of the process.
///
/// While no writer thread is running, entries are emitted on the calling
/// thread. Once `start_consumer_thread` has been called they go through the
/// log queue instead.
pub struct Logger {
    severity_level: AtomicU8,
    targets: RwLock<Vec<BoxedTarget>>,
    logging_mutex: Mutex<()>,
    queue: LogQueue,
    is_running: AtomicBool,
    next_index: AtomicU64,
}

impl Logger {
    pub fn new(level: LogLevel,
               queue_capacity: usize,
               target: BoxedTarget
    ) -> Self {
        Logger {
            severity_level: AtomicU8::new(level as u8),
            targets: RwLock::new(vec![target]),
            logging_mutex: Mutex::new(()),
            queue: LogQueue::with_capacity(queue_capacity),
            is_running: AtomicBool::new(false),
            next_index: AtomicU64::new(1),
        }
    }

    pub fn log(&self,
               level: LogLevel,
               message: &str
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let entry = self.create_log_entry(level, message);
        if self.is_running() && self.queue.push(&entry, self) {
            return;
        }
        self.log_now(&entry);
        self.flush_targets();
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.get_log_level()
    }

    pub fn update_level(&self, level: LogLevel) {
        self.severity_level.store(level as u8, Ordering::Release);
    }

    pub fn get_log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.severity_level.load(Ordering::Acquire))
    }

    pub fn add_target(&self, target: BoxedTarget) {
        self.targets.write().unwrap_or_else(PoisonError::into_inner).push(target);
    }

    pub fn update_target(&self, target: BoxedTarget) {
        *self.targets.write().unwrap_or_else(PoisonError::into_inner) = vec![target];
    }

    pub fn queue(&self) -> &LogQueue {
        &self.queue
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.is_running.store(running, Ordering::Release);
    }

    /// Emits everything currently queued. Returns how many entries were
    /// written.
    pub fn drain(&self) -> usize {
        let mut written = 0;
        while let Some(entry) = self.queue.pop() {
            self.log_now(&entry);
            written += 1;
        }
        if written > 0 {
            self.flush_targets();
        }
        written
    }

    pub fn flush_targets(&self) {
        let targets = self.targets.read().unwrap_or_else(PoisonError::into_inner);
        for target in targets.iter() {
            target.flush();
        }
    }
}

impl LogSink for Logger {
    fn create_log_entry(&self, level: LogLevel, message: &str) -> LogEntry {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        LogEntry::new(index, level, &current_thread_label(), message)
    }

    fn logging_lock(&self) -> &Mutex<()> {
        &self.logging_mutex
    }

    fn log_immediately(&self, _held: &MutexGuard<'_, ()>, entry: &LogEntry) {
        let line = entry.to_string();
        // while the queue is backed up only warnings and worse reach the console
        let quiet_console = self.queue.is_console_suspended() && entry.level < LogLevel::Warn;
        let targets = self.targets.read().unwrap_or_else(PoisonError::into_inner);
        for target in targets.iter() {
            if quiet_console && target.is_console() {
                continue;
            }
            target.log(entry.level, line.clone());
        }
    }
}
