use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam::utils::Backoff;
use rand::Rng;

use crate::ring_buffer::{PushAttempt, SlotRing};
use crate::{LogEntry, LogLevel};

pub const LOG_QUEUE_SIZE: usize = 0x8000;
pub const HIGH_WATERMARK: f64 = 0.99;
pub const LOW_WATERMARK: f64 = 0.60;

const MAX_PUSH_ATTEMPTS: u32 = 100;
const BACKOFF_BASE_MICROS: u64 = 1;
const BACKOFF_CEILING_SHIFT: u32 = 10;

pub const SUSPEND_NOTICE: &str = "Queue near capacity - suspending console output";
pub const RESUME_NOTICE: &str = "Queue capacity normalized - resuming console output";
pub const PURGE_COMPLETE_NOTICE: &str = "Log queue overflow. Purged complete";

/// The publish-now escape hatch the log queue needs from its owner.
///
/// `log_immediately` takes the logging guard as proof that the caller
/// already holds the logging lock.
pub trait LogSink: Sync {
    fn create_log_entry(&self, level: LogLevel, message: &str) -> LogEntry;

    fn logging_lock(&self) -> &Mutex<()>;

    fn log_immediately(&self, held: &MutexGuard<'_, ()>, entry: &LogEntry);

    fn log_now(&self, entry: &LogEntry) {
        let guard = lock_logging(self.logging_lock());
        self.log_immediately(&guard, entry);
    }
}

pub(crate) fn lock_logging(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bounded multi-producer log queue with watermark backpressure.
///
/// Pushing never blocks on a signal. When the ring is full the oldest tenth
/// of the records is published immediately through the sink, so nothing is
/// dropped silently.
pub struct LogQueue {
    ring: SlotRing<LogEntry>,
    console_suspended: AtomicBool,
}

impl LogQueue {
    pub fn new() -> Self {
        Self::with_capacity(LOG_QUEUE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        LogQueue {
            ring: SlotRing::with_capacity(capacity),
            console_suspended: AtomicBool::new(false),
        }
    }

    pub fn push(&self,
                entry: &LogEntry,
                sink: &dyn LogSink
    ) -> bool {
        if !entry.is_valid() {
            return false;
        }

        self.update_watermarks(sink);

        for attempt in 0..MAX_PUSH_ATTEMPTS {
            match self.ring.try_push(*entry) {
                PushAttempt::Pushed => return true,
                PushAttempt::Full => self.relieve_overflow(sink),
                PushAttempt::Contended => {}
            }
            thread::sleep(backoff_delay(attempt));
        }

        self.push_locked(entry, sink)
    }

    pub fn pop(&self) -> Option<LogEntry> {
        self.ring.pop()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn fill_ratio(&self) -> f64 {
        self.ring.fill_ratio()
    }

    pub fn is_console_suspended(&self) -> bool {
        self.console_suspended.load(Ordering::Acquire)
    }

    fn purge_count(&self) -> usize {
        (self.capacity() / 10).max(1)
    }

    fn update_watermarks(&self, sink: &dyn LogSink) {
        let fill = self.fill_ratio();
        if fill >= HIGH_WATERMARK {
            if self.console_suspended
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok() {
                sink.log_now(&sink.create_log_entry(LogLevel::Warn, SUSPEND_NOTICE));
            }
        } else if fill <= LOW_WATERMARK
            && self.console_suspended
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok() {
            sink.log_now(&sink.create_log_entry(LogLevel::Info, RESUME_NOTICE));
        }
    }

    fn relieve_overflow(&self, sink: &dyn LogSink) {
        let guard = lock_logging(sink.logging_lock());
        if self.ring.is_full() {
            self.purge_locked(&guard, sink);
        }
    }

    fn purge_locked(&self,
                    guard: &MutexGuard<'_, ()>,
                    sink: &dyn LogSink
    ) {
        let count = self.purge_count();
        let notice = format!("Log queue overflow. Publishing oldest {} log entries immediately", count);
        sink.log_immediately(guard, &sink.create_log_entry(LogLevel::Error, &notice));

        let mut purged = 0;
        while purged < count {
            match self.ring.pop() {
                Some(oldest) => sink.log_immediately(guard, &oldest),
                None => break,
            }
            purged += 1;
        }

        sink.log_immediately(guard, &sink.create_log_entry(LogLevel::Error, PURGE_COMPLETE_NOTICE));
    }

    /// Last resort after the lock-free attempts are exhausted.
    fn push_locked(&self,
                   entry: &LogEntry,
                   sink: &dyn LogSink
    ) -> bool {
        let guard = lock_logging(sink.logging_lock());
        let backoff = Backoff::new();
        loop {
            if self.ring.is_full() {
                sink.log_immediately(&guard, entry);
                return true;
            }
            if self.ring.try_push(*entry) == PushAttempt::Pushed {
                return true;
            }
            backoff.snooze();
        }
    }
}

impl Default for LogQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let delay = BACKOFF_BASE_MICROS << attempt.min(BACKOFF_CEILING_SHIFT);
    let jitter = rand::thread_rng().gen_range(0..=delay);
    Duration::from_micros(delay + jitter)
}
