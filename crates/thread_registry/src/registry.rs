use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use error_handler::RegistryError;
use logger_proc_macro::log;
use message_queue::{Event, Message, MessageQueue, ResetMode};

use crate::relay::RelayPort;
use crate::ThreadState;

pub const MAX_THREAD_LABEL_LENGTH: usize = 64;
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Copy of an entry's fields, taken under the registry lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub label: String,
    pub handle: Option<ThreadId>,
    pub state: ThreadState,
    pub auto_cleanup: bool,
    pub has_queue: bool,
    pub relay_target: Option<String>,
}

struct RegistryEntry {
    label: String,
    handle: Option<ThreadId>,
    state: ThreadState,
    auto_cleanup: bool,
    queue: Option<Arc<MessageQueue>>,
    relay: Arc<RelayPort>,
    completion: Arc<Event>,
}

impl RegistryEntry {
    fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            label: self.label.clone(),
            handle: self.handle,
            state: self.state,
            auto_cleanup: self.auto_cleanup,
            has_queue: self.queue.is_some(),
            relay_target: self.relay.foreign_owner(),
        }
    }
}

struct RegistryInner {
    initialized: bool,
    entries: Vec<RegistryEntry>,
}

impl RegistryInner {
    fn find(&self, label: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|entry| entry.label == label)
    }

    fn find_mut(&mut self, label: &str) -> Option<&mut RegistryEntry> {
        self.entries.iter_mut().find(|entry| entry.label == label)
    }

    fn owned_queue(&self, label: &str) -> Result<Arc<MessageQueue>, RegistryError> {
        let entry = self.find(label).ok_or(RegistryError::NotFound)?;
        entry.queue.clone().ok_or(RegistryError::QueueError)
    }

    /// Drops every relay port that points at `queue`.
    fn disconnect_relays_to(&self, queue: &Arc<MessageQueue>) {
        for entry in &self.entries {
            entry.relay.disconnect_from(queue);
        }
    }
}

/// Label-addressed directory of the process's threads.
///
/// One mutex guards the entry list and every state transition. Queue
/// operations look the queue up under that mutex and then run outside it,
/// so a blocked push or pop never stalls the registry.
pub struct ThreadRegistry {
    inner: Mutex<RegistryInner>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        ThreadRegistry {
            inner: Mutex::new(RegistryInner {
                initialized: true,
                entries: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryInner>, RegistryError> {
        let inner = self.inner.lock().map_err(|_| RegistryError::LockError)?;
        if !inner.initialized {
            return Err(RegistryError::NotInitialized);
        }
        Ok(inner)
    }

    #[log(debug)]
    pub fn register(&self,
                    label: &str,
                    handle: Option<ThreadId>,
                    auto_cleanup: bool
    ) -> Result<(), RegistryError> {
        if label.is_empty() || label.len() >= MAX_THREAD_LABEL_LENGTH {
            return Err(RegistryError::InvalidArgs);
        }
        let mut inner = self.lock()?;
        if inner.find(label).is_some() {
            logger::warn!("Thread {} is already registered", label);
            return Err(RegistryError::DuplicateThread);
        }
        inner.entries.push(RegistryEntry {
            label: label.to_string(),
            handle,
            state: ThreadState::Created,
            auto_cleanup,
            queue: None,
            relay: Arc::new(RelayPort::new(label)),
            completion: Arc::new(Event::new(ResetMode::Manual, false)),
        });
        logger::info!("Registered thread {}", label);
        Ok(())
    }

    /// Records the OS thread id once the thread has been spawned.
    pub fn attach_handle(&self,
                         label: &str,
                         handle: ThreadId
    ) -> Result<(), RegistryError> {
        let mut inner = self.lock()?;
        let entry = inner.find_mut(label).ok_or(RegistryError::NotFound)?;
        entry.handle = Some(handle);
        Ok(())
    }

    /// Removes `label`. With auto cleanup the queue is emptied and released;
    /// otherwise it is handed back to the caller.
    #[log(debug)]
    pub fn deregister(&self, label: &str) -> Result<Option<Arc<MessageQueue>>, RegistryError> {
        let mut inner = self.lock()?;
        let position = inner.entries
            .iter()
            .position(|entry| entry.label == label)
            .ok_or(RegistryError::NotFound)?;
        let entry = inner.entries.remove(position);

        entry.relay.disconnect();
        entry.completion.set();
        if let Some(queue) = &entry.queue {
            inner.disconnect_relays_to(queue);
        }
        logger::info!("Deregistered thread {}", label);

        if entry.auto_cleanup {
            if let Some(queue) = entry.queue {
                queue.clear();
            }
            Ok(None)
        } else {
            Ok(entry.queue)
        }
    }

    pub fn find_by_label(&self, label: &str) -> Option<EntrySnapshot> {
        let inner = self.lock().ok()?;
        inner.find(label).map(RegistryEntry::snapshot)
    }

    pub fn find_by_handle(&self, handle: ThreadId) -> Option<EntrySnapshot> {
        let inner = self.lock().ok()?;
        inner.entries
            .iter()
            .find(|entry| entry.handle == Some(handle))
            .map(RegistryEntry::snapshot)
    }

    pub fn is_registered(&self, label: &str) -> bool {
        self.find_by_label(label).is_some()
    }

    pub fn labels(&self) -> Vec<String> {
        match self.lock() {
            Ok(inner) => inner.entries.iter().map(|entry| entry.label.clone()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.lock().map_or(0, |inner| inner.entries.len())
    }

    /// Entries that have not reached a terminal state.
    pub fn active_count(&self) -> usize {
        self.lock().map_or(0, |inner| {
            inner.entries.iter().filter(|entry| !entry.state.is_terminal()).count()
        })
    }

    pub fn update_state(&self,
                        label: &str,
                        new_state: ThreadState
    ) -> Result<(), RegistryError> {
        let mut inner = self.lock()?;
        let entry = inner.find_mut(label).ok_or(RegistryError::InvalidStateTransition)?;
        if !entry.state.can_transition_to(new_state) {
            logger::warn!("Rejected state change of {}: {} -> {}", label, entry.state, new_state);
            return Err(RegistryError::InvalidStateTransition);
        }
        logger::debug!("Thread {} state {} -> {}", label, entry.state, new_state);
        entry.state = new_state;
        if new_state.is_terminal() {
            entry.completion.set();
        }
        Ok(())
    }

    pub fn get_state(&self, label: &str) -> Option<ThreadState> {
        self.lock().ok()?.find(label).map(|entry| entry.state)
    }

    /// Attaches a message queue of `max_size` slots to `label`. Fails
    /// without side effects if the entry already owns one.
    pub fn init_queue(&self,
                      label: &str,
                      max_size: usize
    ) -> Result<(), RegistryError> {
        if max_size == 0 {
            return Err(RegistryError::InvalidArgs);
        }
        let mut inner = self.lock()?;
        let entry = inner.find_mut(label).ok_or(RegistryError::NotFound)?;
        if entry.queue.is_some() {
            return Err(RegistryError::QueueError);
        }
        entry.queue = Some(Arc::new(MessageQueue::new(label, max_size)));
        Ok(())
    }

    pub fn queue(&self, label: &str) -> Result<Arc<MessageQueue>, RegistryError> {
        self.lock()?.owned_queue(label)
    }

    pub fn push_message(&self,
                        label: &str,
                        message: &Message,
                        timeout_ms: u32
    ) -> Result<(), RegistryError> {
        let queue = self.queue(label)?;
        if queue.push(message, timeout_ms) {
            Ok(())
        } else {
            Err(RegistryError::QueueFull)
        }
    }

    pub fn pop_message(&self,
                       label: &str,
                       timeout_ms: u32
    ) -> Result<Message, RegistryError> {
        let queue = self.queue(label)?;
        queue.pop(timeout_ms).ok_or(RegistryError::QueueEmpty)
    }

    pub fn queue_size(&self, label: &str) -> Result<usize, RegistryError> {
        Ok(self.queue(label)?.current_size())
    }

    pub fn clear_queue(&self, label: &str) -> Result<(), RegistryError> {
        self.queue(label)?.clear();
        Ok(())
    }

    /// Cross-wires two entries: whatever `source` receives is forwarded into
    /// `target`'s queue and the other way round.
    #[log(debug)]
    pub fn setup_relay(&self,
                       source: &str,
                       target: &str
    ) -> Result<(), RegistryError> {
        if source == target {
            return Err(RegistryError::InvalidArgs);
        }
        let inner = self.lock()?;
        let source_queue = inner.owned_queue(source)?;
        let target_queue = inner.owned_queue(target)?;
        let source_port = inner.find(source).ok_or(RegistryError::NotFound)?.relay.clone();
        let target_port = inner.find(target).ok_or(RegistryError::NotFound)?.relay.clone();
        drop(inner);

        source_port.connect(target_queue);
        target_port.connect(source_queue);
        Ok(())
    }

    /// Disconnects `label`'s port and every port feeding `label`'s queue.
    pub fn teardown_relay(&self, label: &str) -> Result<(), RegistryError> {
        let inner = self.lock()?;
        let entry = inner.find(label).ok_or(RegistryError::NotFound)?;
        entry.relay.disconnect();
        if let Some(queue) = &entry.queue {
            inner.disconnect_relays_to(queue);
        }
        Ok(())
    }

    pub fn relay_port(&self, label: &str) -> Result<Arc<RelayPort>, RegistryError> {
        let inner = self.lock()?;
        inner.find(label).map(|entry| entry.relay.clone()).ok_or(RegistryError::NotFound)
    }

    /// Blocks until `label` reaches a terminal state or is deregistered.
    pub fn wait_for_thread(&self,
                           label: &str,
                           timeout: Duration
    ) -> Result<(), RegistryError> {
        let completion = {
            let inner = self.lock()?;
            inner.find(label).ok_or(RegistryError::NotFound)?.completion.clone()
        };
        if completion.wait(timeout) {
            Ok(())
        } else {
            Err(RegistryError::Timeout)
        }
    }

    /// Blocks until every entry, except the one owned by `except`, is
    /// terminal.
    pub fn wait_all(&self,
                    timeout: Duration,
                    except: Option<ThreadId>
    ) -> Result<(), RegistryError> {
        let deadline = Instant::now() + timeout;
        loop {
            let pending: Vec<String> = {
                let inner = self.lock()?;
                inner.entries
                    .iter()
                    .filter(|entry| except.is_none() || entry.handle != except)
                    .filter(|entry| !entry.state.is_terminal())
                    .map(|entry| entry.label.clone())
                    .collect()
            };
            if pending.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                logger::warn!("Timed out waiting for threads: {}", pending.join(", "));
                return Err(RegistryError::Timeout);
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    /// Removes every entry and shuts the registry down. Any later call
    /// fails with `NotInitialized`.
    pub fn cleanup(&self) -> Result<(), RegistryError> {
        let mut inner = self.lock()?;
        for entry in inner.entries.drain(..) {
            entry.relay.disconnect();
            entry.completion.set();
            if entry.auto_cleanup {
                if let Some(queue) = &entry.queue {
                    queue.clear();
                }
            }
        }
        inner.initialized = false;
        logger::info!("Thread registry cleaned up");
        Ok(())
    }
}

impl Default for ThreadRegistry {
    fn default() -> Self {
        Self::new()
    }
}
