//! A FIFO queue serialized behind a single lock.
use crate::{
    error::{Lock, Poisoned},
    loom::sync::{Mutex, MutexGuard},
    node::Iter,
    unsync::UnsyncQueue,
    Queue, SharedQueue,
};
use core::fmt;

/// A thread-safe FIFO queue guarded by one coarse-grained lock.
///
/// Every `enqueue` and every `dequeue` runs the [`UnsyncQueue`] algorithm
/// while holding the same [`Mutex`], so at most one operation touches the list
/// at any instant. This makes every operation trivially linearizable, at the
/// cost of making producers and consumers contend with each other for the
/// lock.
///
/// # Examples
///
/// ```
/// use hyphae::CoarseQueue;
/// use std::{sync::Arc, thread};
///
/// let q = Arc::new(CoarseQueue::new());
///
/// let producer = thread::spawn({
///     let q = q.clone();
///     move || {
///         for i in 0..10 {
///             q.enqueue(i);
///         }
///     }
/// });
/// producer.join().unwrap();
///
/// let mut seen = Vec::new();
/// while let Some(i) = q.dequeue() {
///     seen.push(i);
/// }
/// assert_eq!(seen, (0..10).collect::<Vec<_>>());
/// ```
///
/// [`Mutex`]: std::sync::Mutex
pub struct CoarseQueue<V> {
    inner: Mutex<UnsyncQueue<V>>,
}

// === impl CoarseQueue ===

impl<V> CoarseQueue<V> {
    /// Returns a new, empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(UnsyncQueue::new()),
        }
    }

    /// Appends `value` to the back of the queue.
    ///
    /// # Panics
    ///
    /// If the lock was poisoned by a thread that panicked while holding it.
    /// Use [`CoarseQueue::try_enqueue`] to handle that case instead.
    #[track_caller]
    pub fn enqueue(&self, value: V) {
        if let Err(error) = self.try_enqueue(value) {
            panic!("{error}");
        }
    }

    /// Removes the value at the front of the queue, or returns `None` if the
    /// queue is empty.
    ///
    /// # Panics
    ///
    /// If the lock was poisoned by a thread that panicked while holding it.
    /// Use [`CoarseQueue::try_dequeue`] to handle that case instead.
    #[track_caller]
    pub fn dequeue(&self) -> Option<V> {
        self.try_dequeue().unwrap_or_else(|error| panic!("{error}"))
    }

    /// Appends `value` to the back of the queue, or returns an error if the
    /// lock was poisoned.
    pub fn try_enqueue(&self, value: V) -> Result<(), Poisoned> {
        let mut queue = self.lock()?;
        queue.enqueue(value);
        test_trace!(front = ?queue.front(), "CoarseQueue::enqueue");
        Ok(())
    }

    /// Removes the value at the front of the queue, or returns an error if the
    /// lock was poisoned.
    ///
    /// An empty queue is `Ok(None)`, not an error.
    pub fn try_dequeue(&self) -> Result<Option<V>, Poisoned> {
        let mut queue = self.lock()?;
        let value = queue.dequeue();
        test_trace!(dequeued = value.is_some(), "CoarseQueue::dequeue");
        Ok(value)
    }

    /// Returns an iterator over the values in the queue, from front to back,
    /// without removing them.
    ///
    /// This does not hold the lock while iterating. Instead, it requires
    /// exclusive access to the queue, which a thread holding an
    /// [`Arc`](std::sync::Arc) can get back with [`Arc::get_mut`] once every
    /// other thread has finished with it.
    ///
    /// # Panics
    ///
    /// If the lock was poisoned.
    ///
    /// [`Arc::get_mut`]: std::sync::Arc::get_mut
    #[track_caller]
    pub fn iter(&mut self) -> Iter<'_, V> {
        let front = self
            .lock()
            .unwrap_or_else(|error| panic!("{error}"))
            .front();
        unsafe {
            // Safety: `&mut self` guarantees nothing else can lock the queue
            // and mutate it while the iterator is alive.
            Iter::new(front)
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, UnsyncQueue<V>>, Poisoned> {
        self.inner.lock().map_err(Poisoned::on(Lock::Queue))
    }
}

impl<V> Queue<V> for CoarseQueue<V> {
    fn enqueue(&mut self, value: V) {
        CoarseQueue::enqueue(self, value)
    }

    fn dequeue(&mut self) -> Option<V> {
        CoarseQueue::dequeue(self)
    }

    fn iter(&mut self) -> Iter<'_, V> {
        CoarseQueue::iter(self)
    }
}

impl<V: Send> SharedQueue<V> for CoarseQueue<V> {
    fn try_enqueue(&self, value: V) -> Result<(), Poisoned> {
        CoarseQueue::try_enqueue(self, value)
    }

    fn try_dequeue(&self) -> Result<Option<V>, Poisoned> {
        CoarseQueue::try_dequeue(self)
    }
}

impl<V> Default for CoarseQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for CoarseQueue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("CoarseQueue");
        match self.inner.try_lock() {
            Ok(queue) => dbg.field("inner", &*queue),
            Err(_) => dbg.field("inner", &format_args!("<locked>")),
        };
        dbg.finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn queue_is_send_sync() {
        crate::util::assert_send_sync::<CoarseQueue<i32>>()
    }

    #[test]
    fn dequeue_empty() {
        let q = CoarseQueue::<i32>::new();
        assert_eq!(q.dequeue(), None);
        assert_eq!(q.try_dequeue(), Ok(None));
    }

    #[test]
    fn walkthrough() {
        let mut q = CoarseQueue::new();
        q.enqueue(1);
        q.enqueue(2);
        q.enqueue(3);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![2, 3]);

        assert_eq!(q.dequeue(), Some(2));
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![3]);

        q.enqueue(4);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![3, 4]);

        assert_eq!(q.dequeue(), Some(3));
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn empty_dequeue_releases_lock() {
        let q = CoarseQueue::new();
        for _ in 0..3 {
            assert_eq!(q.dequeue(), None);
        }
        // If the empty path leaked the guard, this would deadlock.
        q.enqueue(1);
        assert_eq!(q.dequeue(), Some(1));
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let q = Arc::new(CoarseQueue::new());
        q.enqueue(1);

        let poisoner = thread::spawn({
            let q = q.clone();
            move || {
                let _guard = q.inner.lock().unwrap();
                panic!("poisoning the lock on purpose");
            }
        });
        assert!(poisoner.join().is_err());

        let err = q.try_dequeue().unwrap_err();
        assert_eq!(err.lock(), Lock::Queue);
        assert_eq!(q.try_enqueue(2), Err(err));
        assert_eq!(
            err.to_string(),
            "the queue lock was poisoned by a panicking thread"
        );
    }

    #[test]
    #[should_panic(expected = "the queue lock was poisoned")]
    fn poisoned_dequeue_panics() {
        let q = Arc::new(CoarseQueue::<i32>::new());
        let _ = thread::spawn({
            let q = q.clone();
            move || {
                let _guard = q.inner.lock().unwrap();
                panic!("poisoning the lock on purpose");
            }
        })
        .join();

        q.dequeue();
    }

    #[test]
    fn iter_after_join() {
        const THREADS: i32 = 4;
        const MSGS: i32 = 100;

        let mut q = Arc::new(CoarseQueue::new());
        let threads: Vec<_> = (0..THREADS)
            .map(|thread| {
                let q = q.clone();
                thread::spawn(move || {
                    for i in 0..MSGS {
                        q.enqueue(thread * MSGS + i);
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }

        let q = Arc::get_mut(&mut q).expect("all other handles were dropped");
        let mut all = q.iter().copied().collect::<Vec<_>>();
        assert_eq!(all.len(), (THREADS * MSGS) as usize);

        // Each producer's values are in the order it enqueued them.
        for thread in 0..THREADS {
            let mine = all
                .iter()
                .copied()
                .filter(|v| v / MSGS == thread)
                .collect::<Vec<_>>();
            assert_eq!(mine, (thread * MSGS..(thread + 1) * MSGS).collect::<Vec<_>>());
        }

        all.sort_unstable();
        assert_eq!(all, (0..THREADS * MSGS).collect::<Vec<_>>());
    }
}

#[cfg(all(loom, test))]
mod loom {
    use super::*;
    use ::loom::{alloc::Track, model, sync::Arc, thread};

    #[test]
    fn enqueue_dequeue_race() {
        model(|| {
            let q = Arc::new(CoarseQueue::new());

            let producer = thread::spawn({
                let q = q.clone();
                move || {
                    q.enqueue(Track::new(1));
                    q.enqueue(Track::new(2));
                }
            });

            let mut seen = Vec::new();
            for _ in 0..2 {
                if let Some(value) = q.dequeue() {
                    seen.push(value.into_inner());
                }
            }

            producer.join().unwrap();

            while let Some(value) = q.dequeue() {
                seen.push(value.into_inner());
            }
            assert_eq!(seen, vec![1, 2]);
        })
    }

    #[test]
    fn doesnt_leak() {
        model(|| {
            let q = Arc::new(CoarseQueue::new());

            let producers: Vec<_> = (0..2)
                .map(|thread| {
                    let q = q.clone();
                    thread::spawn(move || q.enqueue(Track::new(thread)))
                })
                .collect();

            drop(q.dequeue());

            for producer in producers {
                producer.join().unwrap();
            }

            tracing::info!("dropping queue");
            drop(q);
        })
    }
}
