use crate::{
    bench::{self, BenchConfig, Variant},
    demo,
    report::{self, Format},
    term::{style, ColorMode, OutputOptions, OwoColorize},
    Result,
};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use std::{io::Write, ops::RangeInclusive};

/// Times three FIFO queues against each other with paired producer and
/// consumer threads.
///
/// With no subcommand, runs the benchmark.
#[derive(Debug, Parser)]
#[command(name = "hyphae-bench", version, args_conflicts_with_subcommands = true)]
pub struct Options {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    #[command(flatten)]
    pub bench: BenchArgs,

    #[command(flatten)]
    pub output: OutputOptions,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the benchmark and print the results. This is the default.
    Bench(BenchArgs),
    /// Walk through each queue's behavior step by step.
    Demo(DemoArgs),
}

#[derive(Clone, Debug, Args)]
#[command(next_help_heading = "Benchmark Options")]
pub struct BenchArgs {
    /// The numbers of producer/consumer thread pairs to run with, as
    /// `MIN..=MAX`, `MIN..MAX`, or a single count.
    #[clap(long, short, default_value = "1..=8", value_parser = parse_pairs)]
    pub pairs: RangeInclusive<usize>,

    /// How many operations each producer and each consumer performs.
    #[clap(long, short = 'n', default_value_t = 100_000)]
    pub ops: u64,

    /// Which queues to benchmark. May be repeated. Defaults to all of them.
    #[clap(long = "variant", short = 'v', value_enum)]
    pub variants: Vec<Variant>,

    /// How many values to enqueue before the clock starts.
    #[clap(long, default_value_t = 0)]
    pub prefill: u64,

    /// How to print the results.
    #[clap(long, short, value_enum, default_value_t = Format::Table)]
    pub format: Format,
}

#[derive(Clone, Debug, Args)]
pub struct DemoArgs {
    /// Which queues to walk through. May be repeated. Defaults to all of them.
    #[clap(long = "variant", short = 'v', value_enum)]
    pub variants: Vec<Variant>,
}

// === impl Options ===

impl Options {
    pub fn run(self) -> Result<()> {
        let color = self.output.color;
        match self.cmd {
            Some(Command::Bench(args)) => args.run(color),
            Some(Command::Demo(args)) => args.run(color),
            None => self.bench.run(color),
        }
    }
}

// === impl BenchArgs ===

impl BenchArgs {
    pub fn config(&self) -> BenchConfig {
        BenchConfig {
            pairs: self.pairs.clone(),
            ops: self.ops,
            prefill: self.prefill,
            variants: variants_or_all(&self.variants),
        }
    }

    fn run(&self, color: ColorMode) -> Result<()> {
        let measurements = bench::run(&self.config())?;
        let stdout = std::io::stdout();
        let mut stdout = stdout.lock();
        report::write(&measurements, self.format, color, &mut stdout)
            .context("writing benchmark report")?;
        stdout.flush().context("flushing stdout")?;
        Ok(())
    }
}

// === impl DemoArgs ===

impl DemoArgs {
    fn run(&self, color: ColorMode) -> Result<()> {
        let heading = color.if_color(style().bold().underline());
        let dim = color.if_color(style().dimmed());

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for variant in variants_or_all(&self.variants) {
            tracing::debug!(%variant, "running demo");
            writeln!(out, "{}", variant.label().style(heading))?;
            for step in demo::walkthrough(variant) {
                writeln!(out, "  {step}")?;
            }

            let enqueued = demo::concurrent_enqueues(variant)
                .with_context(|| format!("running concurrent enqueues on the {variant} queue"))?;
            writeln!(
                out,
                "  {} {}",
                format!("after {} enqueue 10 values each:", demo::workers(variant)).style(dim),
                demo::Step::Traversal(enqueued),
            )?;

            let left = demo::concurrent_round_trips(variant)
                .with_context(|| format!("running round trips on the {variant} queue"))?;
            writeln!(
                out,
                "  {} {}",
                format!(
                    "after {} enqueue and dequeue 10 values each:",
                    demo::workers(variant)
                )
                .style(dim),
                demo::Step::Traversal(left),
            )?;
            writeln!(out)?;
        }
        Ok(())
    }
}

fn variants_or_all(variants: &[Variant]) -> Vec<Variant> {
    if variants.is_empty() {
        Variant::ALL.to_vec()
    } else {
        variants.to_vec()
    }
}

/// Parses a pair count range. Whether the range is usable is checked later,
/// by [`BenchConfig::validate`].
fn parse_pairs(s: &str) -> Result<RangeInclusive<usize>, String> {
    fn count(s: &str) -> Result<usize, String> {
        s.trim()
            .parse()
            .map_err(|e| format!("invalid pair count {s:?}: {e}"))
    }

    if let Some((min, max)) = s.split_once("..=") {
        Ok(count(min)?..=count(max)?)
    } else if let Some((min, max)) = s.split_once("..") {
        let max = count(max)?
            .checked_sub(1)
            .ok_or_else(|| format!("the pair range {s:?} is empty"))?;
        Ok(count(min)?..=max)
    } else {
        let n = count(s)?;
        Ok(n..=n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_valid() {
        Options::command().debug_assert();
    }

    #[test]
    fn pair_ranges() {
        assert_eq!(parse_pairs("1..=8"), Ok(1..=8));
        assert_eq!(parse_pairs("2..5"), Ok(2..=4));
        assert_eq!(parse_pairs("3"), Ok(3..=3));
        assert!(parse_pairs("0..0").is_err());
        assert!(parse_pairs("one..=two").is_err());
    }

    #[test]
    fn defaults_to_bench() {
        let opts = Options::try_parse_from(["hyphae-bench"]).unwrap();
        assert!(opts.cmd.is_none());
        assert_eq!(opts.bench.config(), BenchConfig::default());
        assert_eq!(opts.bench.format, Format::Table);
    }

    #[test]
    fn bench_flags() {
        let opts = Options::try_parse_from([
            "hyphae-bench",
            "bench",
            "--pairs",
            "2..=4",
            "--ops",
            "10",
            "--variant",
            "two-lock",
            "--format",
            "csv",
        ])
        .unwrap();
        let Some(Command::Bench(args)) = opts.cmd else {
            panic!("expected the bench subcommand, got {:?}", opts.cmd);
        };
        let config = args.config();
        assert_eq!(config.pairs, 2..=4);
        assert_eq!(config.ops, 10);
        assert_eq!(config.variants, vec![Variant::TwoLock]);
        assert_eq!(args.format, Format::Csv);
    }

    #[test]
    fn zero_pairs_fail_validation() {
        let opts = Options::try_parse_from(["hyphae-bench", "--pairs", "0..=2"]).unwrap();
        assert!(opts.bench.config().validate().is_err());
    }

    #[test]
    fn demo_variants() {
        let opts =
            Options::try_parse_from(["hyphae-bench", "demo", "-v", "coarse", "-v", "unsync"])
                .unwrap();
        let Some(Command::Demo(args)) = opts.cmd else {
            panic!("expected the demo subcommand, got {:?}", opts.cmd);
        };
        assert_eq!(args.variants, vec![Variant::Coarse, Variant::Unsync]);
    }
}
