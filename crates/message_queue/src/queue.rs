use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::event::{Event, ResetMode};
use crate::message::Message;

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const MAX_QUEUE_CAPACITY: usize = 16384;

struct Ring {
    entries: Box<[Message]>,
    head: usize,
    tail: usize,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn is_full(&self) -> bool {
        (self.tail + 1) % self.capacity() == self.head
    }

    fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    fn len(&self) -> usize {
        (self.tail + self.capacity() - self.head) % self.capacity()
    }
}

/// Bounded FIFO of fixed-size messages with timed blocking.
///
/// Like the log queue, one slot stays free, so `capacity - 1` messages fit.
/// Both signals are auto-reset; a woken thread always rechecks the ring
/// under the mutex and waits again for whatever time is left.
pub struct MessageQueue {
    owner: String,
    ring: Mutex<Ring>,
    not_empty: Event,
    not_full: Event,
}

impl MessageQueue {
    pub fn new(owner: &str, capacity: usize) -> Self {
        let capacity = capacity.clamp(2, MAX_QUEUE_CAPACITY);
        MessageQueue {
            owner: owner.to_string(),
            ring: Mutex::new(Ring {
                entries: vec![Message::default(); capacity].into_boxed_slice(),
                head: 0,
                tail: 0,
            }),
            not_empty: Event::new(ResetMode::Auto, false),
            not_full: Event::new(ResetMode::Auto, true),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Copies `message` in. Waits up to `timeout_ms` for room; `0` never
    /// waits.
    pub fn push(&self,
                message: &Message,
                timeout_ms: u32
    ) -> bool {
        if !message.is_valid() {
            return false;
        }
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        loop {
            {
                let mut ring = self.lock();
                if !ring.is_full() {
                    let tail = ring.tail;
                    ring.entries[tail] = *message;
                    ring.tail = (tail + 1) % ring.capacity();
                    let room_left = !ring.is_full();
                    drop(ring);

                    self.not_empty.set();
                    if room_left {
                        self.not_full.set();
                    }
                    return true;
                }
            }

            let now = Instant::now();
            if now >= deadline || !self.not_full.wait(deadline - now) {
                logger::debug!("Queue full timeout (owner: {})", self.owner);
                return false;
            }
        }
    }

    /// Takes the oldest message, waiting up to `timeout_ms` for one.
    pub fn pop(&self, timeout_ms: u32) -> Option<Message> {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        loop {
            {
                let mut ring = self.lock();
                if !ring.is_empty() {
                    let head = ring.head;
                    let message = ring.entries[head];
                    ring.head = (head + 1) % ring.capacity();
                    let more_left = !ring.is_empty();
                    drop(ring);

                    self.not_full.set();
                    if more_left {
                        self.not_empty.set();
                    }
                    return Some(message);
                }
            }

            let now = Instant::now();
            if now >= deadline || !self.not_empty.wait(deadline - now) {
                return None;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    pub fn current_size(&self) -> usize {
        self.lock().len()
    }

    /// Drops every pending message and re-arms the signals.
    pub fn clear(&self) {
        let mut ring = self.lock();
        ring.head = 0;
        ring.tail = 0;
        self.not_empty.reset();
        self.not_full.set();
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
