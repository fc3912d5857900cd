use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// A successful wait consumes the signal; `set` wakes one waiter.
    Auto,
    /// The signal stays set until `reset`; `set` wakes every waiter.
    Manual,
}

pub struct Event {
    signalled: Mutex<bool>,
    cond: Condvar,
    mode: ResetMode,
}

impl Event {
    pub fn new(mode: ResetMode, initially_set: bool) -> Self {
        Event {
            signalled: Mutex::new(initially_set),
            cond: Condvar::new(),
            mode,
        }
    }

    pub fn set(&self) {
        let mut signalled = self.lock();
        *signalled = true;
        match self.mode {
            ResetMode::Auto => self.cond.notify_one(),
            ResetMode::Manual => self.cond.notify_all(),
        }
    }

    pub fn reset(&self) {
        *self.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Returns `true` if the event was signalled within `timeout`.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signalled = self.lock();
        while !*signalled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            signalled = self.cond
                .wait_timeout(signalled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        if self.mode == ResetMode::Auto {
            *signalled = false;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.signalled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
