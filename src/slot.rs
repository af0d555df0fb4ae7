use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::Ordering;

use crossbeam_utils::CachePadded;

use crate::loom_exports::sync::atomic::AtomicUsize;

/// One cell of the ring.
///
/// `turn` encodes both the slot's generation and whether it currently holds
/// a value: an even value `2g` means empty and writable at generation `g`,
/// an odd value `2g + 1` means full and readable at generation `g`. The
/// storage holds a live `T` exactly when `turn` is odd.
///
/// The turn counter sits behind `CachePadded` so that neighbouring slots
/// never share a cache line between a producer and a consumer.
pub(crate) struct Slot<T> {
    pub(crate) turn: CachePadded<AtomicUsize>,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Slot {
            turn: CachePadded::new(AtomicUsize::new(0)),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Places `value` into the slot's storage.
    ///
    /// SAFETY: the caller must own the write turn for this slot, i.e. hold
    /// the ticket whose generation matches the slot's current even `turn`.
    /// The ticket counters grant each ticket to exactly one thread, so no
    /// other thread is touching the storage.
    pub(crate) unsafe fn write(&self, value: T) {
        (*self.value.get()).write(value);
    }

    /// Moves the value out of the slot, leaving the storage uninitialized.
    ///
    /// SAFETY: the caller must own the read turn for this slot (current
    /// `turn` is odd and matches the caller's ticket generation), and must
    /// advance the turn afterwards so the storage is never read twice.
    pub(crate) unsafe fn read(&self) -> T {
        (*self.value.get()).assume_init_read()
    }
}

unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        // An odd turn means a value was published but never consumed.
        if self.turn.load(Ordering::Relaxed) % 2 == 1 {
            unsafe { (*self.value.get()).assume_init_drop() };
        }
    }
}
