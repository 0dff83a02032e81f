//! Times the queues with paired producer and consumer threads.
use crate::Result;
use color_eyre::{
    eyre::{ensure, format_err, WrapErr},
    Help,
};
use hyphae::{CoarseQueue, Poisoned, Queue, SharedQueue, TwoLockQueue, UnsyncQueue};
use std::{
    fmt,
    ops::RangeInclusive,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

/// Which queue to benchmark.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, clap::ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum Variant {
    /// [`UnsyncQueue`]: no synchronization. Run on a single thread.
    Unsync,
    /// [`CoarseQueue`]: one lock for the whole queue.
    Coarse,
    /// [`TwoLockQueue`]: separate head and tail locks.
    TwoLock,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BenchConfig {
    /// Each pair count in this range is benchmarked in turn.
    pub pairs: RangeInclusive<usize>,
    /// How many operations each producer and each consumer performs.
    pub ops: u64,
    /// How many values to enqueue before starting the clock.
    pub prefill: u64,
    pub variants: Vec<Variant>,
}

/// The time one queue took to run a workload with a given number of thread
/// pairs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Measurement {
    pub variant: Variant,
    pub pairs: usize,
    pub elapsed: Duration,
    /// How many `dequeue` calls returned a value.
    pub dequeued: u64,
    /// How many `dequeue` calls found the queue empty.
    pub empty: u64,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct Run {
    elapsed: Duration,
    dequeued: u64,
    empty: u64,
}

/// Benchmarks every variant in `config` with every pair count in
/// `config.pairs`, using a fresh queue each time.
pub fn run(config: &BenchConfig) -> Result<Vec<Measurement>> {
    config.validate()?;
    tracing::debug!(?config, "starting benchmark");

    let mut measurements = Vec::with_capacity(config.pairs.clone().count() * config.variants.len());
    for pairs in config.pairs.clone() {
        for &variant in &config.variants {
            let _span = tracing::info_span!("bench", %variant, pairs).entered();
            let run = measure(variant, pairs, config.ops, config.prefill)
                .with_context(|| format!("benchmarking the {variant} queue with {pairs} pairs"))?;
            tracing::info!(
                elapsed = ?run.elapsed,
                dequeued = run.dequeued,
                empty = run.empty,
                "measured {}",
                variant.label(),
            );
            measurements.push(Measurement {
                variant,
                pairs,
                elapsed: run.elapsed,
                dequeued: run.dequeued,
                empty: run.empty,
            });
        }
    }

    Ok(measurements)
}

fn measure(variant: Variant, pairs: usize, ops: u64, prefill: u64) -> Result<Run> {
    match variant {
        Variant::Unsync => {
            let mut queue = UnsyncQueue::new();
            initialize(&mut queue, prefill);
            Ok(run_serial(&mut queue, pairs, ops))
        }
        Variant::Coarse => {
            let mut queue = CoarseQueue::new();
            initialize(&mut queue, prefill);
            spawn_pairs(Arc::new(queue), pairs, ops)
        }
        Variant::TwoLock => {
            let mut queue = TwoLockQueue::new();
            initialize(&mut queue, prefill);
            spawn_pairs(Arc::new(queue), pairs, ops)
        }
    }
}

/// Enqueues `n` values into `queue`.
pub fn initialize(queue: &mut impl Queue<u64>, n: u64) {
    for value in 0..n {
        queue.enqueue(value);
    }
}

/// Runs `pairs` producers and `pairs` consumers against `queue` at once, and
/// returns how long it took for all of them to finish.
///
/// Producer `i` enqueues `ops` values counting up from `i`. Each consumer
/// calls `dequeue` `ops` times, whether or not the queue has anything in it.
fn spawn_pairs<Q>(queue: Arc<Q>, pairs: usize, ops: u64) -> Result<Run>
where
    Q: SharedQueue<u64> + 'static,
{
    let start = Instant::now();

    let mut producers = Vec::with_capacity(pairs);
    let mut consumers = Vec::with_capacity(pairs);
    for pair in 0..pairs {
        let queue2 = queue.clone();
        let producer = thread::Builder::new()
            .name(format!("producer-{pair}"))
            .spawn(move || enqueue_n(&*queue2, ops, pair as u64))
            .context("spawning a producer thread")?;
        producers.push(producer);

        let queue2 = queue.clone();
        let consumer = thread::Builder::new()
            .name(format!("consumer-{pair}"))
            .spawn(move || dequeue_n(&*queue2, ops))
            .context("spawning a consumer thread")?;
        consumers.push(consumer);
    }

    for producer in producers {
        producer
            .join()
            .map_err(|_| format_err!("a producer thread panicked"))?
            .context("a producer thread failed")?;
    }

    let mut run = Run::default();
    for consumer in consumers {
        let (dequeued, empty) = consumer
            .join()
            .map_err(|_| format_err!("a consumer thread panicked"))?
            .context("a consumer thread failed")?;
        run.dequeued += dequeued;
        run.empty += empty;
    }
    run.elapsed = start.elapsed();

    Ok(run)
}

/// Runs the same work as [`spawn_pairs`] on the current thread: each pair's
/// producer runs to completion, then its consumer.
///
/// An [`UnsyncQueue`] cannot be shared between threads, so this is how it is
/// measured.
fn run_serial(queue: &mut UnsyncQueue<u64>, pairs: usize, ops: u64) -> Run {
    let start = Instant::now();
    let mut run = Run::default();
    for pair in 0..pairs as u64 {
        for i in 0..ops {
            queue.enqueue(pair + i);
        }
        for _ in 0..ops {
            match queue.dequeue() {
                Some(_) => run.dequeued += 1,
                None => run.empty += 1,
            }
        }
    }
    run.elapsed = start.elapsed();
    run
}

fn enqueue_n(queue: &impl SharedQueue<u64>, n: u64, start: u64) -> Result<(), Poisoned> {
    for i in 0..n {
        queue.try_enqueue(start + i)?;
    }
    Ok(())
}

fn dequeue_n(queue: &impl SharedQueue<u64>, n: u64) -> Result<(u64, u64), Poisoned> {
    let mut dequeued = 0;
    for _ in 0..n {
        if queue.try_dequeue()?.is_some() {
            dequeued += 1;
        }
    }
    Ok((dequeued, n - dequeued))
}

// === impl Variant ===

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Unsync, Variant::Coarse, Variant::TwoLock];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Unsync => "unsync",
            Variant::Coarse => "coarse",
            Variant::TwoLock => "two-lock",
        }
    }

    /// A human-readable name, for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Unsync => "Standard Queue",
            Variant::Coarse => "Standard Thread-Safe Queue",
            Variant::TwoLock => "Optimized Thread-Safe Queue",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// === impl BenchConfig ===

impl BenchConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            *self.pairs.start() > 0,
            "at least one producer/consumer pair is required, but the pair range was {:?}",
            self.pairs,
        );
        if self.pairs.is_empty() {
            return Err(format_err!("the pair range {:?} is empty", self.pairs))
                .suggestion("the smaller number goes first, like `1..=8`");
        }
        ensure!(!self.variants.is_empty(), "no queue variants to benchmark");
        Ok(())
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            pairs: 1..=8,
            ops: 100_000,
            prefill: 0,
            variants: Variant::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: RangeInclusive<usize>, ops: u64) -> BenchConfig {
        BenchConfig {
            pairs,
            ops,
            ..Default::default()
        }
    }

    #[test]
    fn rejects_zero_pairs() {
        let err = config(0..=4, 10).validate().unwrap_err();
        assert!(err.to_string().contains("at least one"), "{err}");
    }

    #[test]
    #[allow(clippy::reversed_empty_ranges)]
    fn rejects_backwards_range() {
        let err = config(4..=1, 10).validate().unwrap_err();
        assert!(err.to_string().contains("is empty"), "{err}");
    }

    #[test]
    fn rejects_no_variants() {
        let config = BenchConfig {
            variants: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn one_measurement_per_combination() {
        let measurements = run(&config(1..=3, 100)).unwrap();
        assert_eq!(measurements.len(), 3 * Variant::ALL.len());

        for pairs in 1..=3 {
            for variant in Variant::ALL {
                let m = measurements
                    .iter()
                    .find(|m| m.pairs == pairs && m.variant == variant)
                    .expect("every combination is measured");
                // Every consumer's call is either a hit or an empty signal.
                assert_eq!(m.dequeued + m.empty, pairs as u64 * 100);
            }
        }
    }

    #[test]
    fn variant_names() {
        let names = Variant::ALL.map(|v| v.to_string());
        assert_eq!(names, ["unsync", "coarse", "two-lock"]);
        assert_eq!(Variant::TwoLock.label(), "Optimized Thread-Safe Queue");
    }

    #[test]
    fn serial_baseline_drains_everything() {
        let mut queue = UnsyncQueue::new();
        let run = run_serial(&mut queue, 4, 50);
        assert_eq!(run.dequeued, 200);
        assert_eq!(run.empty, 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn prefill_is_dequeued_first() {
        let mut queue = TwoLockQueue::new();
        initialize(&mut queue, 3);
        assert_eq!(queue.dequeue(), Some(0));

        let run = spawn_pairs(Arc::new(queue), 2, 10).unwrap();
        assert_eq!(run.dequeued + run.empty, 20);
    }
}
