use core::fmt;
use std::sync::PoisonError;

/// Error returned when a queue's lock was poisoned by a thread that panicked
/// while holding it.
///
/// A panic in the middle of a critical section may have left the list
/// half-linked, so the queue cannot be trusted afterwards. This error is never
/// recovered from inside the queue; the infallible `enqueue` and `dequeue`
/// methods turn it into a panic.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("the {lock} lock was poisoned by a panicking thread")]
pub struct Poisoned {
    lock: Lock,
}

/// Which of a queue's locks was poisoned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Lock {
    /// The single lock of a [`CoarseQueue`](crate::CoarseQueue).
    Queue,
    /// The dequeue-side lock of a [`TwoLockQueue`](crate::TwoLockQueue).
    Head,
    /// The enqueue-side lock of a [`TwoLockQueue`](crate::TwoLockQueue).
    Tail,
}

// === impl Poisoned ===

impl Poisoned {
    pub(crate) fn on<G>(lock: Lock) -> impl FnOnce(PoisonError<G>) -> Self {
        move |_| Self { lock }
    }

    /// Returns which lock was poisoned.
    #[must_use]
    pub fn lock(&self) -> Lock {
        self.lock
    }
}

// === impl Lock ===

impl Lock {
    /// Returns the lock's name, as it appears in a [`Poisoned`] error message.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lock::Queue => "queue",
            Lock::Head => "head",
            Lock::Tail => "tail",
        }
    }
}

impl fmt::Display for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
