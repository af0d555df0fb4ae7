//! A lock-free, bounded, multi-producer multi-consumer queue.
//!
//! Every enqueue and dequeue draws a ticket from one of two monotonically
//! increasing counters (`head` for producers, `tail` for consumers). The
//! ticket selects a slot in the ring (`ticket % capacity`) and an expected
//! generation (`ticket / capacity`); a per-slot "turn" counter then hands
//! the slot back and forth between exactly one writer and one reader per
//! generation. All coordination goes through those atomics - there are no
//! locks and no OS-level blocking.
//!
//! The blocking [`Queue::push`] and [`Queue::pop`] spin until their slot
//! comes around, so they never report fullness or emptiness but can wait
//! indefinitely. The non-blocking [`Queue::try_push`] and [`Queue::try_pop`]
//! return a definite full/empty answer instead. Callers that need bounded
//! waiting should build a retry loop with their own timeout on top of the
//! `try_` variants.

pub use queue::{Full, Queue};

mod loom_exports;
mod queue;
mod slot;
