use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use message_queue::{Event, ResetMode};
use signal_hook::consts::{SIGINT, SIGTERM};

// signal handlers can only flip the flag, so waiters recheck it this often
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Process-wide stop request. Clones share the same flag.
#[derive(Clone)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    event: Arc<Event>,
}

impl Shutdown {
    pub fn new() -> Self {
        Shutdown {
            flag: Arc::new(AtomicBool::new(false)),
            event: Arc::new(Event::new(ResetMode::Manual, false)),
        }
    }

    pub fn signal(&self) {
        self.flag.store(true, Ordering::Release);
        self.event.set();
    }

    pub fn is_signalled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Waits up to `timeout` for a stop request.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_signalled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.event.wait((deadline - now).min(SIGNAL_POLL_INTERVAL));
        }
    }

    /// Routes SIGINT and SIGTERM to this flag.
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, self.flag.clone())?;
        }
        Ok(())
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
