use core::fmt;
use core::sync::atomic::Ordering;

use crossbeam_utils::{Backoff, CachePadded};

use crate::loom_exports::sync::atomic::AtomicUsize;
use crate::slot::Slot;

/// Error returned by [`Queue::try_push`] when the queue is full, handing
/// the rejected value back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Recovers the value that could not be enqueued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

/// A bounded, lock-free MPMC queue.
///
/// Producers draw tickets from `head`, consumers from `tail`. A ticket `i`
/// targets slot `i % capacity` at generation `i / capacity`; the slot's
/// turn counter then serializes the single writer and single reader of
/// that (slot, generation) pair. The fetch-add (or successful CAS) that
/// grants a ticket is the only serialization point - everything after it
/// is a private conversation between one thread and one slot.
///
/// Values are moved in and moved out, so enqueueing and dequeueing cannot
/// fail mid-handshake. The one obligation left to the caller is that
/// `T::drop` and any closure passed to [`Queue::push_with`] /
/// [`Queue::try_push_with`] must not panic: the protocol has no rollback
/// path, and a panic there leaves the slot's turn permanently out of step
/// with its storage.
pub struct Queue<T> {
    slots: Box<[Slot<T>]>,
    capacity: usize,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

impl<T> Queue<T> {
    /// Creates a queue that holds at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");

        // One spare slot past the nominal capacity. It is never indexed
        // (tickets are reduced modulo `capacity`); it only pads the tail of
        // the allocation so the last live slot keeps its cache line to
        // itself.
        let slots: Box<[Slot<T>]> = (0..capacity + 1).map(|_| Slot::new()).collect();

        Queue {
            slots,
            capacity,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the fixed capacity this queue was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot_index(&self, ticket: usize) -> usize {
        ticket % self.capacity
    }

    fn generation(&self, ticket: usize) -> usize {
        ticket / self.capacity
    }

    /// Enqueues `value`, spinning while the queue is full.
    pub fn push(&self, value: T) {
        self.push_with(move || value)
    }

    /// Enqueues the value produced by `make`, spinning while the queue is
    /// full. The closure runs only once this thread's slot is writable, so
    /// the value is constructed directly for its slot.
    ///
    /// `make` must not panic; see the type-level docs.
    pub fn push_with(&self, make: impl FnOnce() -> T) {
        let ticket = self.head.fetch_add(1, Ordering::Relaxed);
        let slot = &self.slots[self.slot_index(ticket)];
        let write_turn = self.generation(ticket) * 2;

        // Wait for the slot to cycle back to empty at our generation.
        let backoff = Backoff::new();
        while slot.turn.load(Ordering::Acquire) != write_turn {
            backoff.snooze();
            #[cfg(loom)]
            loom::hint::spin_loop();
        }

        unsafe { slot.write(make()) };
        slot.turn.store(write_turn + 1, Ordering::Release);
    }

    /// Attempts to enqueue `value` without blocking. Returns the value
    /// inside [`Full`] if the queue is full.
    pub fn try_push(&self, value: T) -> Result<(), Full<T>> {
        match self.claim_write() {
            Some((slot, write_turn)) => {
                unsafe { slot.write(value) };
                slot.turn.store(write_turn + 1, Ordering::Release);
                Ok(())
            }
            None => Err(Full(value)),
        }
    }

    /// Attempts to enqueue the value produced by `make` without blocking.
    /// Returns `false` if the queue is full, in which case `make` is never
    /// called.
    pub fn try_push_with(&self, make: impl FnOnce() -> T) -> bool {
        match self.claim_write() {
            Some((slot, write_turn)) => {
                unsafe { slot.write(make()) };
                slot.turn.store(write_turn + 1, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Dequeues the oldest element, spinning while the queue is empty.
    pub fn pop(&self) -> T {
        let ticket = self.tail.fetch_add(1, Ordering::Relaxed);
        let slot = &self.slots[self.slot_index(ticket)];
        let read_turn = self.generation(ticket) * 2 + 1;

        // Wait for a producer to publish into the slot at our generation.
        let backoff = Backoff::new();
        while slot.turn.load(Ordering::Acquire) != read_turn {
            backoff.snooze();
            #[cfg(loom)]
            loom::hint::spin_loop();
        }

        let value = unsafe { slot.read() };
        slot.turn.store(read_turn + 1, Ordering::Release);
        value
    }

    /// Attempts to dequeue without blocking. Returns `None` if the queue
    /// is empty.
    pub fn try_pop(&self) -> Option<T> {
        let (slot, read_turn) = self.claim_read()?;
        let value = unsafe { slot.read() };
        slot.turn.store(read_turn + 1, Ordering::Release);
        Some(value)
    }

    /// Claims a write ticket if some slot is writable, returning the slot
    /// and its expected write turn.
    fn claim_write(&self) -> Option<(&Slot<T>, usize)> {
        let mut ticket = self.head.load(Ordering::Acquire);

        loop {
            let slot = &self.slots[self.slot_index(ticket)];
            let write_turn = self.generation(ticket) * 2;

            if slot.turn.load(Ordering::Acquire) == write_turn {
                // The slot is empty at our generation; race the other
                // producers for the ticket. The slot handshake carries the
                // data ordering, so the claim itself can be relaxed.
                match self.head.compare_exchange(
                    ticket,
                    ticket + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return Some((slot, write_turn)),
                    Err(current) => {
                        ticket = current;
                        #[cfg(loom)]
                        loom::hint::spin_loop();
                    }
                }
            } else {
                // Turn mismatch: either the queue is full or our view of
                // head is stale. If head has not moved since the mismatch
                // was observed, no consumer freed a slot in between - the
                // queue is genuinely full.
                let prev = ticket;
                ticket = self.head.load(Ordering::Acquire);
                if ticket == prev {
                    return None;
                }
            }
        }
    }

    /// Claims a read ticket if some slot is readable, returning the slot
    /// and its expected read turn. Mirrors [`Queue::claim_write`] on the
    /// consumer side.
    fn claim_read(&self) -> Option<(&Slot<T>, usize)> {
        let mut ticket = self.tail.load(Ordering::Acquire);

        loop {
            let slot = &self.slots[self.slot_index(ticket)];
            let read_turn = self.generation(ticket) * 2 + 1;

            if slot.turn.load(Ordering::Acquire) == read_turn {
                match self.tail.compare_exchange(
                    ticket,
                    ticket + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return Some((slot, read_turn)),
                    Err(current) => {
                        ticket = current;
                        #[cfg(loom)]
                        loom::hint::spin_loop();
                    }
                }
            } else {
                let prev = ticket;
                ticket = self.tail.load(Ordering::Acquire);
                if ticket == prev {
                    return None;
                }
            }
        }
    }

    /// Returns `head - tail` as a signed count.
    ///
    /// The two counters are read independently with relaxed ordering, so
    /// the result is advisory only: it can be stale under any concurrent
    /// activity and transiently negative while a consumer holds a ticket
    /// for an element that has not been published yet.
    pub fn size(&self) -> isize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail) as isize
    }

    /// Returns whether the queue appears empty. Advisory, like [`Queue::size`].
    pub fn is_empty(&self) -> bool {
        self.size() <= 0
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity)
            .field("size", &self.size())
            .finish()
    }
}
