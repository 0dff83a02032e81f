#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg, doc_cfg_hide))]
#![cfg_attr(docsrs, deny(missing_docs))]
//! Singly-linked FIFO queues with increasingly fine-grained locking.
//!
//! This crate provides three queues that share the same node type and the
//! same FIFO semantics, and differ only in how they synchronize:
//!
//! - [`UnsyncQueue`]: no synchronization at all. Mutation requires `&mut
//!   self`, so it can never be shared between threads.
//! - [`CoarseQueue`]: an [`UnsyncQueue`] behind a single lock, shared by
//!   producers and consumers alike.
//! - [`TwoLockQueue`]: a sentinel node decouples the front of the list from
//!   the back, so that producers take only a tail lock and consumers only a
//!   head lock.
//!
//! All three implement the [`Queue`] trait, which takes `&mut self`. The two
//! locked queues also implement [`SharedQueue`], which takes `&self` and can
//! be used from many threads at once through an [`Arc`].
//!
//! Dequeueing from an empty queue returns `None`. It never blocks, and it is
//! not an error.
//!
//! [`Arc`]: std::sync::Arc

#[macro_use]
pub(crate) mod util;

mod coarse;
mod error;
pub mod node;
mod two_lock;
mod unsync;

#[doc(inline)]
pub use self::{
    coarse::CoarseQueue,
    error::{Lock, Poisoned},
    node::Iter,
    two_lock::TwoLockQueue,
    unsync::UnsyncQueue,
};

pub(crate) mod loom;

/// A FIFO queue that is accessed through an exclusive reference.
///
/// This is implemented by every queue in this crate, including
/// [`UnsyncQueue`]. It is the interface for single-threaded use, and for
/// inspecting a queue once the threads that shared it have finished.
pub trait Queue<V> {
    /// Appends `value` to the back of the queue.
    fn enqueue(&mut self, value: V);

    /// Removes the value at the front of the queue, or returns `None` if the
    /// queue is empty.
    fn dequeue(&mut self) -> Option<V>;

    /// Returns an iterator over the values in the queue, from front to back,
    /// without removing them.
    ///
    /// Each call walks the list again from the current front.
    fn iter(&mut self) -> Iter<'_, V>;

    /// Returns `true` if the queue holds no values.
    fn is_empty(&mut self) -> bool {
        self.iter().next().is_none()
    }

    /// Returns the number of values in the queue.
    ///
    /// This walks the whole list.
    fn len(&mut self) -> usize {
        self.iter().count()
    }
}

/// A FIFO queue that can be shared between threads.
///
/// Implemented by [`CoarseQueue`] and [`TwoLockQueue`]. Every operation is
/// linearizable: it behaves as though it happened atomically at some instant
/// while the call was in progress.
pub trait SharedQueue<V>: Send + Sync {
    /// Appends `value` to the back of the queue, or returns an error if a lock
    /// the queue needs was poisoned.
    fn try_enqueue(&self, value: V) -> Result<(), Poisoned>;

    /// Removes the value at the front of the queue, or returns an error if a
    /// lock the queue needs was poisoned.
    ///
    /// An empty queue is `Ok(None)`.
    fn try_dequeue(&self) -> Result<Option<V>, Poisoned>;

    /// Appends `value` to the back of the queue.
    ///
    /// # Panics
    ///
    /// If a lock the queue needs was poisoned.
    #[track_caller]
    fn enqueue(&self, value: V) {
        if let Err(error) = self.try_enqueue(value) {
            panic!("{error}");
        }
    }

    /// Removes the value at the front of the queue, or returns `None` if the
    /// queue is empty.
    ///
    /// # Panics
    ///
    /// If a lock the queue needs was poisoned.
    #[track_caller]
    fn dequeue(&self) -> Option<V> {
        self.try_dequeue().unwrap_or_else(|error| panic!("{error}"))
    }
}
