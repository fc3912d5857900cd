use std::sync::Arc;
use std::time::{Duration, Instant};

use error_handler::ThreadError;
use logger_proc_macro::log;
use thread_registry::ThreadRegistry;

use crate::lifecycle::{is_thread_suppressed, spawn_app_thread, AppThreadHandle, ThreadLifecycle};
use crate::Shutdown;

/// Owns a set of application threads sharing one registry and shutdown
/// flag. Dropping the group asks them to stop and joins them.
pub struct ThreadGroup {
    registry: Arc<ThreadRegistry>,
    shutdown: Shutdown,
    suppressed: String,
    threads: Vec<AppThreadHandle>,
}

impl ThreadGroup {
    pub fn new(registry: Arc<ThreadRegistry>, shutdown: Shutdown) -> ThreadGroup {
        ThreadGroup {
            registry,
            shutdown,
            suppressed: String::new(),
            threads: Vec::new(),
        }
    }

    pub fn with_suppressed(mut self, suppressed: &str) -> ThreadGroup {
        self.suppressed = suppressed.to_string();
        self
    }

    #[log(debug)]
    pub fn spawn<T: ThreadLifecycle>(&mut self, thread: T) -> Result<(), ThreadError> {
        let label = thread.label().to_string();
        if is_thread_suppressed(&self.suppressed, &label) {
            logger::info!("Thread {} is suppressed by configuration", label);
            return Err(ThreadError::Suppressed(label));
        }
        let handle = spawn_app_thread(thread, &self.registry, &self.shutdown, true)?;
        self.threads.push(handle);
        Ok(())
    }

    pub fn threads_count(&self) -> usize {
        self.threads.len()
    }

    pub fn labels(&self) -> Vec<String> {
        self.threads.iter().map(|thread| thread.label().to_string()).collect()
    }

    /// Joins every thread that finishes within `timeout`. Threads still
    /// running afterwards stay in the group.
    pub fn join_all(&mut self, timeout: Duration) -> Vec<(String, Result<(), ThreadError>)> {
        let deadline = Instant::now() + timeout;
        for thread in &self.threads {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let _ = self.registry.wait_for_thread(thread.label(), remaining);
        }

        let registry = &self.registry;
        let (finished, running): (Vec<_>, Vec<_>) = self.threads
            .drain(..)
            .partition(|thread| {
                thread.is_finished()
                    || registry.get_state(thread.label()).map_or(true, |state| state.is_terminal())
            });
        self.threads = running;

        finished
            .into_iter()
            .map(|thread| (thread.label().to_string(), thread.join()))
            .collect()
    }
}

impl Drop for ThreadGroup {
    fn drop(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        self.shutdown.signal();
        for thread in self.threads.drain(..) {
            logger::info!("Shutting down thread {}", thread.label());
            let label = thread.label().to_string();
            if let Err(err) = thread.join() {
                logger::warn!("Thread {} ended with error: {}", label, err);
            }
        }
    }
}
