//! A singly-linked FIFO queue with no synchronization at all.
//!
//! This is the baseline the locked queues are measured against.
use crate::{
    node::{Iter, Link, Node},
    Queue,
};
use core::{fmt, marker::PhantomData};

/// A singly-linked FIFO queue with no synchronization.
///
/// Both ends are plain pointers: `head` is the front node (the next to be
/// dequeued) and `tail` is the back node (the most recently enqueued). Both
/// are `None` when the queue is empty, and they point at the same node when it
/// holds exactly one value.
///
/// Mutation requires `&mut self`, and this type is [`Send`] but not [`Sync`],
/// so it can be handed to another thread but never shared between threads.
/// Racing two unsynchronized `enqueue`s would leave the list with a lost node
/// or a dangling tail; here, the compiler rejects that program instead. To
/// share a queue, wrap it in a [`CoarseQueue`](crate::CoarseQueue), or use a
/// [`TwoLockQueue`](crate::TwoLockQueue).
///
/// # Examples
///
/// ```
/// use hyphae::UnsyncQueue;
///
/// let mut q = UnsyncQueue::new();
/// q.enqueue(1);
/// q.enqueue(2);
/// assert_eq!(q.dequeue(), Some(1));
/// assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![2]);
/// ```
pub struct UnsyncQueue<V> {
    head: Link<V>,
    tail: Link<V>,
    _owns: PhantomData<Box<Node<V>>>,
}

// === impl UnsyncQueue ===

impl<V> UnsyncQueue<V> {
    /// Returns a new, empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            _owns: PhantomData,
        }
    }

    /// Appends `value` to the back of the queue.
    pub fn enqueue(&mut self, value: V) {
        let node = Node::alloc(Some(value));

        if self.head.is_none() {
            self.head = Some(node);
        }

        if let Some(tail) = self.tail {
            unsafe {
                // Safety: we own every node in the list.
                tail.as_ref().set_next(Some(node));
            }
        }

        race_window!("unsync::enqueue");
        self.tail = Some(node);
    }

    /// Removes the value at the front of the queue, or returns `None` if the
    /// queue is empty.
    pub fn dequeue(&mut self) -> Option<V> {
        let old_head = self.head?;
        unsafe {
            // Safety: we own every node in the list.
            let new_head = old_head.as_ref().next();
            self.head = new_head;

            race_window!("unsync::dequeue");

            // Don't let the returned node keep the rest of the list reachable.
            old_head.as_ref().set_next(None);

            if new_head.is_none() {
                self.tail = None;
            }

            let value = Node::free(old_head);
            debug_assert!(value.is_some(), "a queued node must hold a value");
            value
        }
    }

    /// Returns an iterator over the values in the queue, from front to back,
    /// without removing them.
    pub fn iter(&self) -> Iter<'_, V> {
        unsafe {
            // Safety: mutation requires `&mut self`, and this type is not
            // `Sync`, so nothing can change the list while it is borrowed.
            Iter::new(self.head)
        }
    }

    /// Returns `true` if the queue holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.head.is_none(), self.tail.is_none());
        self.head.is_none()
    }

    /// Returns the number of values in the queue.
    ///
    /// This walks the whole list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub(crate) fn front(&self) -> Link<V> {
        self.head
    }
}

impl<V> Queue<V> for UnsyncQueue<V> {
    fn enqueue(&mut self, value: V) {
        UnsyncQueue::enqueue(self, value)
    }

    fn dequeue(&mut self) -> Option<V> {
        UnsyncQueue::dequeue(self)
    }

    fn iter(&mut self) -> Iter<'_, V> {
        UnsyncQueue::iter(self)
    }
}

impl<V> Drop for UnsyncQueue<V> {
    fn drop(&mut self) {
        unsafe {
            // Safety: `Drop` is called with `&mut self`, so we own the list.
            Node::free_chain(self.head.take());
        }
        self.tail = None;
    }
}

impl<V> Default for UnsyncQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Extend<V> for UnsyncQueue<V> {
    fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        for value in iter {
            self.enqueue(value);
        }
    }
}

impl<V> FromIterator<V> for UnsyncQueue<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}

impl<V> fmt::Debug for UnsyncQueue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsyncQueue")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}

unsafe impl<V: Send> Send for UnsyncQueue<V> {}
