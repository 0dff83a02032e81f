//! Small scripted workloads that show each queue's behavior step by step.
use crate::{bench::Variant, Result};
use color_eyre::eyre::format_err;
use hyphae::{CoarseQueue, Queue, SharedQueue, TwoLockQueue, UnsyncQueue};
use std::{fmt, sync::Arc, thread};

/// One observable step of [`walkthrough`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Step {
    /// The result of a `dequeue`. `None` means the queue was empty.
    Dequeued(Option<i64>),
    /// The queue's contents, front to back.
    Traversal(Vec<i64>),
}

/// Enqueues 1, 2 and 3, then alternates dequeues and traversals, enqueueing
/// 4 partway through.
pub fn walkthrough(variant: Variant) -> Vec<Step> {
    match variant {
        Variant::Unsync => walk(UnsyncQueue::new()),
        Variant::Coarse => walk(CoarseQueue::new()),
        Variant::TwoLock => walk(TwoLockQueue::new()),
    }
}

/// Two threads enqueue 0 through 9 and 10 through 19 at the same time.
/// Returns the queue's contents after both have finished.
///
/// The [`Variant::Unsync`] queue cannot be shared, so its two workers run one
/// after the other.
pub fn concurrent_enqueues(variant: Variant) -> Result<Vec<i64>> {
    match variant {
        Variant::Unsync => Ok(in_sequence(|q, start| {
            for i in start..start + 10 {
                q.enqueue(i);
            }
        })),
        Variant::Coarse => on_two_threads(CoarseQueue::new(), enqueue_ten),
        Variant::TwoLock => on_two_threads(TwoLockQueue::new(), enqueue_ten),
    }
}

/// Like [`concurrent_enqueues`], but each thread dequeues ten values after
/// enqueueing its own. Returns whatever is left in the queue.
pub fn concurrent_round_trips(variant: Variant) -> Result<Vec<i64>> {
    match variant {
        Variant::Unsync => Ok(in_sequence(|q, start| {
            for i in start..start + 10 {
                q.enqueue(i);
            }
            for _ in 0..10 {
                q.dequeue();
            }
        })),
        Variant::Coarse => on_two_threads(CoarseQueue::new(), round_trip_ten),
        Variant::TwoLock => on_two_threads(TwoLockQueue::new(), round_trip_ten),
    }
}

/// Describes who runs the two workers of [`concurrent_enqueues`] and
/// [`concurrent_round_trips`] for `variant`.
pub fn workers(variant: Variant) -> &'static str {
    match variant {
        Variant::Unsync => "two sequential workers",
        Variant::Coarse | Variant::TwoLock => "two threads",
    }
}

fn walk(mut queue: impl Queue<i64>) -> Vec<Step> {
    fn traverse(queue: &mut impl Queue<i64>) -> Step {
        Step::Traversal(queue.iter().copied().collect())
    }

    let mut steps = Vec::new();
    for value in 1..=3 {
        queue.enqueue(value);
    }
    steps.push(traverse(&mut queue));
    steps.push(Step::Dequeued(queue.dequeue()));
    steps.push(traverse(&mut queue));
    steps.push(Step::Dequeued(queue.dequeue()));
    steps.push(traverse(&mut queue));
    queue.enqueue(4);
    steps.push(traverse(&mut queue));
    steps.push(Step::Dequeued(queue.dequeue()));
    steps.push(traverse(&mut queue));
    steps
}

fn in_sequence(work: impl Fn(&mut UnsyncQueue<i64>, i64)) -> Vec<i64> {
    let mut queue = UnsyncQueue::new();
    work(&mut queue, 0);
    work(&mut queue, 10);
    queue.iter().copied().collect()
}

fn on_two_threads<Q>(queue: Q, work: fn(&Q, i64)) -> Result<Vec<i64>>
where
    Q: SharedQueue<i64> + Queue<i64> + 'static,
{
    let mut queue = Arc::new(queue);
    let workers = [0, 10].map(|start| {
        let queue = queue.clone();
        thread::Builder::new()
            .name(format!("demo-{start}"))
            .spawn(move || work(&queue, start))
    });
    for worker in workers {
        worker?
            .join()
            .map_err(|_| format_err!("a demo thread panicked"))?;
    }

    let queue = Arc::get_mut(&mut queue)
        .ok_or_else(|| format_err!("the queue is still shared after joining every thread"))?;
    Ok(queue.iter().copied().collect())
}

fn enqueue_ten<Q: SharedQueue<i64>>(queue: &Q, start: i64) {
    for i in start..start + 10 {
        queue.enqueue(i);
    }
}

fn round_trip_ten<Q: SharedQueue<i64>>(queue: &Q, start: i64) {
    enqueue_ten(queue, start);
    for _ in 0..10 {
        queue.dequeue();
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Dequeued(Some(value)) => write!(f, "dequeued {value}"),
            Step::Dequeued(None) => f.write_str("dequeued nothing (empty)"),
            Step::Traversal(values) if values.is_empty() => f.write_str("(empty)"),
            Step::Traversal(values) => {
                let mut values = values.iter();
                if let Some(first) = values.next() {
                    write!(f, "{first}")?;
                }
                for value in values {
                    write!(f, " -> {value}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walkthrough_steps() {
        use Step::*;
        let expected = vec![
            Traversal(vec![1, 2, 3]),
            Dequeued(Some(1)),
            Traversal(vec![2, 3]),
            Dequeued(Some(2)),
            Traversal(vec![3]),
            Traversal(vec![3, 4]),
            Dequeued(Some(3)),
            Traversal(vec![4]),
        ];
        for variant in Variant::ALL {
            assert_eq!(walkthrough(variant), expected, "{variant}");
        }
    }

    #[test]
    fn concurrent_enqueues_keep_everything() {
        for variant in Variant::ALL {
            let mut values = concurrent_enqueues(variant).unwrap();
            assert_eq!(values.len(), 20, "{variant}");

            // Each thread's values stay in the order it enqueued them.
            let firsts: Vec<_> = values.iter().copied().filter(|&v| v < 10).collect();
            assert_eq!(firsts, (0..10).collect::<Vec<_>>(), "{variant}");
            let seconds: Vec<_> = values.iter().copied().filter(|&v| v >= 10).collect();
            assert_eq!(seconds, (10..20).collect::<Vec<_>>(), "{variant}");

            values.sort_unstable();
            assert_eq!(values, (0..20).collect::<Vec<_>>(), "{variant}");
        }
    }

    #[test]
    fn concurrent_round_trips_drain() {
        for variant in Variant::ALL {
            // Every `dequeue` happens after that thread's own ten enqueues,
            // so none of them can find the queue empty.
            let left = concurrent_round_trips(variant).unwrap();
            assert_eq!(left, Vec::<i64>::new(), "{variant}");
        }
    }

    #[test]
    fn unsync_workers_are_sequential() {
        assert_eq!(workers(Variant::Unsync), "two sequential workers");
        assert_eq!(workers(Variant::Coarse), "two threads");
        assert_eq!(workers(Variant::TwoLock), "two threads");
    }

    #[test]
    fn step_display() {
        assert_eq!(Step::Traversal(vec![1, 2, 3]).to_string(), "1 -> 2 -> 3");
        assert_eq!(Step::Traversal(vec![]).to_string(), "(empty)");
        assert_eq!(Step::Dequeued(Some(0)).to_string(), "dequeued 0");
        assert_eq!(Step::Dequeued(None).to_string(), "dequeued nothing (empty)");
    }
}
