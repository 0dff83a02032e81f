//! The list cell shared by every queue in this crate, and the traversal
//! iterator that walks a chain of them.
use crate::loom::{
    cell::UnsafeCell,
    sync::atomic::{AtomicPtr, Ordering::*},
};
use core::{
    fmt,
    iter::FusedIterator,
    marker::PhantomData,
    ptr::{self, NonNull},
};

pub(crate) type Link<V> = Option<NonNull<Node<V>>>;

/// A singly-linked list cell.
///
/// Nodes are heap-allocated by [`Node::alloc`] and owned by whichever queue
/// they are linked into, until [`Node::free`] hands their value back out.
///
/// `next` is atomic because in a [`TwoLockQueue`](crate::TwoLockQueue), the
/// enqueuer (holding the tail lock) links a node onto the same cell the
/// dequeuer (holding the head lock) is reading. In the other queues all access
/// is exclusive, and the atomic is never contended.
pub(crate) struct Node<V> {
    /// `None` only for a two-lock queue's sentinel.
    value: UnsafeCell<Option<V>>,
    next: AtomicPtr<Node<V>>,
}

/// A lazy iterator over the values in a queue, from front to back.
///
/// This is returned by each queue's `iter` method. Every call to `iter` walks
/// the list again from the queue's current front.
pub struct Iter<'a, V> {
    next: Link<V>,
    _list: PhantomData<&'a Node<V>>,
}

// === impl Node ===

impl<V> Node<V> {
    /// Allocates a new unlinked node, leaking it into a raw pointer.
    pub(crate) fn alloc(value: Option<V>) -> NonNull<Self> {
        let node = Box::new(Self {
            value: UnsafeCell::new(value),
            next: AtomicPtr::new(ptr::null_mut()),
        });
        NonNull::from(Box::leak(node))
    }

    /// Deallocates a node, returning its value.
    ///
    /// # Safety
    ///
    /// `node` must have been returned by [`Node::alloc`], must not already
    /// have been freed, and must no longer be reachable by any other thread.
    pub(crate) unsafe fn free(node: NonNull<Self>) -> Option<V> {
        let node = Box::from_raw(node.as_ptr());
        let value = node.value.with_mut(|value| (*value).take());
        drop(node);
        value
    }

    /// Deallocates every node in the chain starting at `link`.
    ///
    /// # Safety
    ///
    /// The caller must own the entire chain.
    pub(crate) unsafe fn free_chain(mut link: Link<V>) {
        while let Some(node) = link {
            link = node.as_ref().next();
            drop(Self::free(node));
        }
    }

    #[inline]
    pub(crate) fn next(&self) -> Link<V> {
        NonNull::new(self.next.load(Acquire))
    }

    #[inline]
    pub(crate) fn set_next(&self, next: Link<V>) {
        let next = next.map_or(ptr::null_mut(), NonNull::as_ptr);
        self.next.store(next, Release);
    }

    /// Moves this node's value out, leaving `None` behind.
    ///
    /// # Safety
    ///
    /// The caller must be the only thread accessing this node's value.
    pub(crate) unsafe fn take_value(&self) -> Option<V> {
        self.value.with_mut(|value| (*value).take())
    }

    /// # Safety
    ///
    /// No thread may move the value out while the returned reference lives.
    unsafe fn value<'a>(&self) -> Option<&'a V> {
        self.value.with(|value| (*value).as_ref())
    }
}

// === impl Iter ===

impl<'a, V> Iter<'a, V> {
    /// # Safety
    ///
    /// The chain starting at `first` must not be mutated for `'a`.
    pub(crate) unsafe fn new(first: Link<V>) -> Self {
        Self {
            next: first,
            _list: PhantomData,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.next {
            unsafe {
                // Safety: the queue that created this iterator is borrowed
                // for `'a`, so nothing can unlink or free its nodes.
                let node = node.as_ref();
                self.next = node.next();
                if let Some(value) = node.value() {
                    return Some(value);
                }
            }
        }
        None
    }
}

impl<V> FusedIterator for Iter<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Iter<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rest = Self {
            next: self.next,
            _list: PhantomData,
        };
        f.debug_list().entries(rest).finish()
    }
}
