use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crossbeam::utils::{Backoff, CachePadded};

const EMPTY: u8 = 0;
const RESERVED: u8 = 1;
const WRITTEN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    Empty,
    Reserved,
    Written,
}

impl From<u8> for SlotState {
    fn from(raw: u8) -> Self {
        match raw {
            RESERVED => SlotState::Reserved,
            WRITTEN => SlotState::Written,
            _ => SlotState::Empty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushAttempt {
    Pushed,
    Full,
    Contended,
}

struct Slot<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn state(&self) -> SlotState {
        SlotState::from(self.state.load(Ordering::Acquire))
    }
}

/// Fixed-capacity ring of `Copy` records guarded by per-slot state tags.
///
/// `head` and `tail` are monotonically increasing positions; the slot for a
/// position is `position % capacity`. One slot is always kept free, so at
/// most `capacity - 1` records are stored.
///
/// A writer owns a slot between the `EMPTY -> RESERVED` CAS and the
/// `WRITTEN` store. A reader only copies out of a `WRITTEN` slot, and only
/// after winning the CAS on `tail`.
pub struct SlotRing<T> {
    slots: Box<[Slot<T>]>,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for SlotRing<T> {}
unsafe impl<T: Send> Sync for SlotRing<T> {}

impl<T: Copy> SlotRing<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        let slots = (0..capacity)
            .map(|_| Slot {
                state: AtomicU8::new(EMPTY),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();
        SlotRing {
            slots,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Used slots. A snapshot, may be stale by the time it is read.
    pub fn len(&self) -> usize {
        // tail first: head only grows, so the difference cannot underflow
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.saturating_sub(tail).min(self.capacity() - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity() - 1
    }

    /// Used slots over usable slots, so a full ring reads 1.0 whatever its
    /// capacity.
    pub fn fill_ratio(&self) -> f64 {
        self.len() as f64 / (self.capacity() - 1) as f64
    }

    /// One lock-free publication attempt.
    pub(crate) fn try_push(&self, value: T) -> PushAttempt {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if tail > head {
            return PushAttempt::Contended;
        }
        if head - tail >= self.capacity() - 1 {
            return PushAttempt::Full;
        }

        let slot = &self.slots[head % self.capacity()];
        if slot.state
            .compare_exchange(EMPTY, RESERVED, Ordering::AcqRel, Ordering::Acquire)
            .is_err() {
            return PushAttempt::Contended;
        }

        if self.head
            .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err() {
            slot.state.store(EMPTY, Ordering::Release);
            return PushAttempt::Contended;
        }

        // SAFETY: the slot is RESERVED by this thread; no reader copies it
        // out before the WRITTEN store below.
        unsafe {
            (*slot.value.get()).write(value);
        }
        slot.state.store(WRITTEN, Ordering::Release);
        PushAttempt::Pushed
    }

    /// Takes the oldest record. Never blocks; spins while the record at
    /// `tail` has been reserved but not yet published.
    pub fn pop(&self) -> Option<T> {
        let backoff = Backoff::new();
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let head = self.head.load(Ordering::Acquire);
            if tail >= head {
                return None;
            }

            let slot = &self.slots[tail % self.capacity()];
            if slot.state() != SlotState::Written {
                backoff.snooze();
                continue;
            }

            if self.tail
                .compare_exchange(tail, tail + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok() {
                // SAFETY: the slot is WRITTEN and this thread won `tail`, so
                // no writer can reserve it until it is reset to EMPTY.
                let value = unsafe { (*slot.value.get()).assume_init() };
                slot.state.store(EMPTY, Ordering::Release);
                return Some(value);
            }
            backoff.spin();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn holds_capacity_minus_one() {
        let ring = SlotRing::<u32>::with_capacity(4);
        assert_eq!(ring.try_push(1), PushAttempt::Pushed);
        assert_eq!(ring.try_push(2), PushAttempt::Pushed);
        assert_eq!(ring.try_push(3), PushAttempt::Pushed);
        assert_eq!(ring.try_push(4), PushAttempt::Full);
        assert!(ring.is_full());
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn pop_empty_returns_none() {
        let ring = SlotRing::<u32>::with_capacity(8);
        assert_eq!(ring.pop(), None);
        assert!(ring.is_empty());
    }

    #[test]
    fn pop_is_fifo_across_wraparound() {
        let ring = SlotRing::<u32>::with_capacity(4);
        for round in 0..5u32 {
            for i in 0..3 {
                assert_eq!(ring.try_push(round * 10 + i), PushAttempt::Pushed);
            }
            for i in 0..3 {
                assert_eq!(ring.pop(), Some(round * 10 + i));
            }
        }
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn slot_returns_to_empty_after_pop() {
        let ring = SlotRing::<u32>::with_capacity(4);
        ring.try_push(7);
        assert_eq!(ring.slots[0].state(), SlotState::Written);
        assert_eq!(ring.pop(), Some(7));
        assert_eq!(ring.slots[0].state(), SlotState::Empty);
    }

    #[test]
    fn full_ring_reads_full_ratio() {
        for capacity in [2, 4, 64, 1000] {
            let ring = SlotRing::<u32>::with_capacity(capacity);
            while ring.try_push(1) == PushAttempt::Pushed {}
            assert_eq!(ring.fill_ratio(), 1.0);
        }
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let ring = Arc::new(SlotRing::<u64>::with_capacity(1024));
        let producers: Vec<_> = (0..4u64)
            .map(|p| {
                let ring = ring.clone();
                thread::spawn(move || {
                    for i in 0..200u64 {
                        let value = p * 1000 + i;
                        while ring.try_push(value) != PushAttempt::Pushed {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let mut seen = HashSet::new();
        while let Some(value) = ring.pop() {
            assert!(seen.insert(value));
        }
        assert_eq!(seen.len(), 800);
    }
}
