//! A FIFO queue with separate head and tail locks.
//!
//! Based on the two-lock queue from Michael and Scott's [_Simple, Fast, and
//! Practical Non-Blocking and Blocking Concurrent Queue Algorithms_][paper].
//!
//! [paper]: https://www.cs.rochester.edu/u/scott/papers/1996_PODC_queues.pdf
use crate::{
    error::{Lock, Poisoned},
    loom::sync::{Mutex, MutexGuard},
    node::{Iter, Node},
    util::CachePadded,
    Queue, SharedQueue,
};
use core::{fmt, marker::PhantomData, ptr::NonNull};
use std::sync::PoisonError;

/// A thread-safe FIFO queue with one lock for each end.
///
/// The list always begins with a _sentinel_ node that holds no value. `head`
/// points at the sentinel and `tail` points at the last node, which is the
/// sentinel itself when the queue is empty. Because the sentinel is always
/// there, `enqueue` only ever touches `tail` and the last node, and `dequeue`
/// only ever touches `head` and the node after it. Each end gets its own lock,
/// so one producer and one consumer never wait for each other; producers
/// only contend with producers, and consumers with consumers.
///
/// Dequeueing a value turns the node that held it into the new sentinel, and
/// frees the old one.
///
/// # Examples
///
/// ```
/// use hyphae::TwoLockQueue;
/// use std::{sync::Arc, thread};
///
/// let q = Arc::new(TwoLockQueue::new());
///
/// let producer = thread::spawn({
///     let q = q.clone();
///     move || {
///         for i in 0..100 {
///             q.enqueue(i);
///         }
///     }
/// });
///
/// let mut seen = Vec::new();
/// while seen.len() < 100 {
///     match q.dequeue() {
///         Some(i) => seen.push(i),
///         None => thread::yield_now(),
///     }
/// }
///
/// producer.join().unwrap();
/// assert_eq!(seen, (0..100).collect::<Vec<_>>());
/// ```
pub struct TwoLockQueue<V> {
    /// The sentinel. Only accessed while dequeueing.
    head: CachePadded<Mutex<NonNull<Node<V>>>>,

    /// The last node in the list. Only accessed while enqueueing.
    tail: CachePadded<Mutex<NonNull<Node<V>>>>,

    _owns: PhantomData<Box<Node<V>>>,
}

// === impl TwoLockQueue ===

impl<V> TwoLockQueue<V> {
    /// Returns a new, empty queue.
    #[must_use]
    pub fn new() -> Self {
        let sentinel = Node::alloc(None);
        Self {
            head: CachePadded(Mutex::new(sentinel)),
            tail: CachePadded(Mutex::new(sentinel)),
            _owns: PhantomData,
        }
    }

    /// Appends `value` to the back of the queue.
    ///
    /// This only waits for other threads that are enqueueing.
    ///
    /// # Panics
    ///
    /// If the tail lock was poisoned by a thread that panicked while holding
    /// it. Use [`TwoLockQueue::try_enqueue`] to handle that case instead.
    #[track_caller]
    pub fn enqueue(&self, value: V) {
        if let Err(error) = self.try_enqueue(value) {
            panic!("{error}");
        }
    }

    /// Removes the value at the front of the queue, or returns `None` if the
    /// queue is empty.
    ///
    /// This only waits for other threads that are dequeueing.
    ///
    /// # Panics
    ///
    /// If the head lock was poisoned by a thread that panicked while holding
    /// it. Use [`TwoLockQueue::try_dequeue`] to handle that case instead.
    #[track_caller]
    pub fn dequeue(&self) -> Option<V> {
        self.try_dequeue().unwrap_or_else(|error| panic!("{error}"))
    }

    /// Appends `value` to the back of the queue, or returns an error if the
    /// tail lock was poisoned.
    pub fn try_enqueue(&self, value: V) -> Result<(), Poisoned> {
        let mut tail = self.lock_tail()?;
        let node = Node::alloc(Some(value));

        // Link the node first, and only then advance `tail`. The `Release`
        // store publishes the node's value to a dequeuer that loads this link.
        unsafe {
            // Safety: the tail node is never freed while it is the tail, and
            // we hold the tail lock.
            tail.as_ref().set_next(Some(node));
        }

        race_window!("two_lock::enqueue");
        *tail = node;

        test_trace!(?node, "TwoLockQueue::enqueue");
        Ok(())
    }

    /// Removes the value at the front of the queue, or returns an error if the
    /// head lock was poisoned.
    ///
    /// An empty queue is `Ok(None)`, not an error.
    pub fn try_dequeue(&self) -> Result<Option<V>, Poisoned> {
        let mut head = self.lock_head()?;
        let sentinel = *head;

        let candidate = unsafe {
            // Safety: the sentinel is only freed by a dequeuer, and we hold
            // the head lock.
            sentinel.as_ref().next()
        };
        let Some(candidate) = candidate else {
            test_trace!(?sentinel, "TwoLockQueue::dequeue: empty");
            return Ok(None);
        };

        // Advance `head` first, and only then detach the old sentinel.
        *head = candidate;

        race_window!("two_lock::dequeue");

        let value = unsafe {
            // Safety: the old sentinel's successor was linked, so no enqueuer
            // will touch the old sentinel's link again.
            sentinel.as_ref().set_next(None);

            // Safety: we hold the head lock, so no other dequeuer can reach
            // the candidate's value. Enqueuers only write its link.
            candidate.as_ref().take_value()
        };
        drop(head);

        unsafe {
            // Safety: the old sentinel is no longer reachable from `head`,
            // and is not the tail, since it had a successor.
            let placeholder = Node::free(sentinel);
            debug_assert!(placeholder.is_none(), "the sentinel must not hold a value");
        }

        debug_assert!(value.is_some(), "a queued node must hold a value");
        test_trace!(new_sentinel = ?candidate, "TwoLockQueue::dequeue");
        Ok(value)
    }

    /// Returns an iterator over the values in the queue, from front to back,
    /// without removing them. The sentinel is skipped.
    ///
    /// This does not hold either lock while iterating. Instead, it requires
    /// exclusive access to the queue, which a thread holding an
    /// [`Arc`](std::sync::Arc) can get back with [`Arc::get_mut`] once every
    /// other thread has finished with it.
    ///
    /// # Panics
    ///
    /// If the head lock was poisoned.
    ///
    /// [`Arc::get_mut`]: std::sync::Arc::get_mut
    #[track_caller]
    pub fn iter(&mut self) -> Iter<'_, V> {
        let sentinel = *self.lock_head().unwrap_or_else(|error| panic!("{error}"));
        unsafe {
            // Safety: `&mut self` guarantees nothing else can lock the queue
            // and mutate it while the iterator is alive.
            Iter::new(sentinel.as_ref().next())
        }
    }

    fn lock_head(&self) -> Result<MutexGuard<'_, NonNull<Node<V>>>, Poisoned> {
        self.head.lock().map_err(Poisoned::on(Lock::Head))
    }

    fn lock_tail(&self) -> Result<MutexGuard<'_, NonNull<Node<V>>>, Poisoned> {
        self.tail.lock().map_err(Poisoned::on(Lock::Tail))
    }
}

impl<V> Queue<V> for TwoLockQueue<V> {
    fn enqueue(&mut self, value: V) {
        TwoLockQueue::enqueue(self, value)
    }

    fn dequeue(&mut self) -> Option<V> {
        TwoLockQueue::dequeue(self)
    }

    fn iter(&mut self) -> Iter<'_, V> {
        TwoLockQueue::iter(self)
    }
}

impl<V: Send> SharedQueue<V> for TwoLockQueue<V> {
    fn try_enqueue(&self, value: V) -> Result<(), Poisoned> {
        TwoLockQueue::try_enqueue(self, value)
    }

    fn try_dequeue(&self) -> Result<Option<V>, Poisoned> {
        TwoLockQueue::try_dequeue(self)
    }
}

impl<V> Drop for TwoLockQueue<V> {
    fn drop(&mut self) {
        // A poisoned lock still guards a pointer to a valid list; we are
        // tearing it down, not trusting its contents.
        let sentinel = *self.head.lock().unwrap_or_else(PoisonError::into_inner);
        unsafe {
            // Safety: `Drop` is called with `&mut self`, so we own the list,
            // including the sentinel.
            Node::free_chain(Some(sentinel));
        }
    }
}

impl<V> Default for TwoLockQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for TwoLockQueue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct End<'a, V>(&'a Mutex<NonNull<Node<V>>>);

        impl<V> fmt::Debug for End<'_, V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.0.try_lock() {
                    Ok(node) => fmt::Pointer::fmt(&*node, f),
                    Err(_) => f.write_str("<locked>"),
                }
            }
        }

        f.debug_struct("TwoLockQueue")
            .field("head", &End(&self.head))
            .field("tail", &End(&self.tail))
            .finish()
    }
}

// Safety: values are only ever moved between threads, never shared, and the
// node pointers are only dereferenced under the lock guarding that end.
unsafe impl<V: Send> Send for TwoLockQueue<V> {}
unsafe impl<V: Send> Sync for TwoLockQueue<V> {}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::{
        sync::{mpsc, Arc},
        thread,
        time::Duration,
    };

    fn collect(q: &mut TwoLockQueue<i32>) -> Vec<i32> {
        q.iter().copied().collect()
    }

    #[test]
    fn queue_is_send_sync() {
        crate::util::assert_send_sync::<TwoLockQueue<i32>>()
    }

    #[test]
    fn dequeue_empty() {
        let q = TwoLockQueue::<i32>::new();
        assert_eq!(q.dequeue(), None);
        assert_eq!(q.try_dequeue(), Ok(None));
    }

    #[test]
    fn walkthrough() {
        let mut q = TwoLockQueue::new();
        q.enqueue(1);
        q.enqueue(2);
        q.enqueue(3);
        assert_eq!(collect(&mut q), vec![1, 2, 3]);

        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(collect(&mut q), vec![2, 3]);

        assert_eq!(q.dequeue(), Some(2));
        assert_eq!(collect(&mut q), vec![3]);

        q.enqueue(4);
        assert_eq!(collect(&mut q), vec![3, 4]);

        assert_eq!(q.dequeue(), Some(3));
        assert_eq!(collect(&mut q), vec![4]);
    }

    #[test]
    fn zero_is_not_the_sentinel() {
        let mut q = TwoLockQueue::new();
        assert_eq!(collect(&mut q), Vec::<i32>::new());

        q.enqueue(0);
        assert_eq!(collect(&mut q), vec![0]);
        assert_eq!(q.dequeue(), Some(0));
        assert_eq!(q.dequeue(), None);
        assert_eq!(collect(&mut q), Vec::<i32>::new());
    }

    #[test]
    fn sentinel_never_holds_a_value() {
        let q = TwoLockQueue::new();
        for i in 0..8 {
            q.enqueue(i);
            if i % 3 == 0 {
                q.dequeue();
            }

            let sentinel = *q.head.lock().unwrap();
            let tail = *q.tail.lock().unwrap();
            unsafe {
                assert!(sentinel.as_ref().take_value().is_none());
                // The tail is the sentinel exactly when the queue is empty.
                assert_eq!(sentinel == tail, sentinel.as_ref().next().is_none());
            }
        }
    }

    #[test]
    fn empty_dequeue_releases_lock() {
        let q = TwoLockQueue::new();
        for _ in 0..3 {
            assert_eq!(q.dequeue(), None);
        }
        q.enqueue(1);
        assert_eq!(q.dequeue(), Some(1));
    }

    #[test]
    fn enqueue_while_head_is_locked() {
        let q = Arc::new(TwoLockQueue::new());
        let head = q.head.lock().unwrap();

        // A producer must not wait on the head lock.
        let (tx, rx) = mpsc::channel();
        let producer = thread::spawn({
            let q = q.clone();
            move || {
                q.enqueue(1);
                tx.send(()).unwrap();
            }
        });
        rx.recv_timeout(Duration::from_secs(10))
            .expect("enqueue should not wait for the head lock");
        producer.join().unwrap();

        drop(head);
        assert_eq!(q.dequeue(), Some(1));
    }

    #[test]
    fn dequeue_while_tail_is_locked() {
        let q = Arc::new(TwoLockQueue::new());
        q.enqueue(1);
        let tail = q.tail.lock().unwrap();

        // A consumer must not wait on the tail lock.
        let (tx, rx) = mpsc::channel();
        let consumer = thread::spawn({
            let q = q.clone();
            move || {
                tx.send(q.dequeue()).unwrap();
            }
        });
        let dequeued = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("dequeue should not wait for the tail lock");
        assert_eq!(dequeued, Some(1));
        consumer.join().unwrap();
        drop(tail);
    }

    #[test]
    fn poisoned_head_does_not_poison_tail() {
        let q = Arc::new(TwoLockQueue::new());
        let _ = thread::spawn({
            let q = q.clone();
            move || {
                let _guard = q.head.lock().unwrap();
                panic!("poisoning the head lock on purpose");
            }
        })
        .join();

        assert_eq!(q.try_enqueue(1), Ok(()));
        let err = q.try_dequeue().unwrap_err();
        assert_eq!(err.lock(), Lock::Head);
        assert_eq!(
            err.to_string(),
            "the head lock was poisoned by a panicking thread"
        );
    }

    #[test]
    fn drop_drops_values() {
        let value = Arc::new(());
        let q = TwoLockQueue::new();
        for _ in 0..4 {
            q.enqueue(value.clone());
        }
        drop(q.dequeue());
        assert_eq!(Arc::strong_count(&value), 4);

        drop(q);
        assert_eq!(Arc::strong_count(&value), 1);
    }
}

#[cfg(all(loom, test))]
mod loom {
    use super::*;
    use ::loom::{alloc::Track, model, sync::Arc, thread};

    #[test]
    fn spsc() {
        model(|| {
            let q = Arc::new(TwoLockQueue::new());

            let producer = thread::spawn({
                let q = q.clone();
                move || {
                    q.enqueue(Track::new(1));
                    q.enqueue(Track::new(2));
                }
            });

            let mut seen = Vec::new();
            while seen.len() < 2 {
                match q.dequeue() {
                    Some(value) => seen.push(value.into_inner()),
                    None => thread::yield_now(),
                }
            }

            producer.join().unwrap();
            assert_eq!(seen, vec![1, 2]);
            assert!(q.dequeue().is_none());
        })
    }

    #[test]
    fn singleton_transition() {
        // One value is queued; a dequeue of it races with the enqueue of a
        // second value, which links onto the node being dequeued.
        model(|| {
            let q = Arc::new(TwoLockQueue::new());
            q.enqueue(Track::new(1));

            let producer = thread::spawn({
                let q = q.clone();
                move || q.enqueue(Track::new(2))
            });

            let first = q.dequeue().map(Track::into_inner);
            producer.join().unwrap();
            let second = q.dequeue().map(Track::into_inner);

            assert_eq!(first, Some(1));
            assert_eq!(second, Some(2));
            assert!(q.dequeue().is_none());
        })
    }

    #[test]
    fn mpmc() {
        const THREADS: i32 = 2;

        model(|| {
            let q = Arc::new(TwoLockQueue::new());

            let producers: Vec<_> = (0..THREADS)
                .map(|thread| {
                    let q = q.clone();
                    thread::spawn(move || q.enqueue(Track::new(thread)))
                })
                .collect();

            let consumer = thread::spawn({
                let q = q.clone();
                move || q.dequeue().map(Track::into_inner)
            });

            let mut seen: Vec<_> = q.dequeue().map(Track::into_inner).into_iter().collect();

            for producer in producers {
                producer.join().unwrap();
            }
            seen.extend(consumer.join().unwrap());
            while let Some(value) = q.dequeue() {
                seen.push(value.into_inner());
            }

            seen.sort_unstable();
            assert_eq!(seen, vec![0, 1]);
        })
    }

    #[test]
    fn doesnt_leak() {
        model(|| {
            let q = Arc::new(TwoLockQueue::new());

            let producer = thread::spawn({
                let q = q.clone();
                move || {
                    q.enqueue(Track::new(1));
                    q.enqueue(Track::new(2));
                }
            });

            drop(q.dequeue());
            producer.join().unwrap();

            tracing::info!("dropping queue");
            drop(q);
        })
    }
}
