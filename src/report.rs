use crate::{
    bench::{Measurement, Variant},
    term::{style, ColorMode, OwoColorize},
};
use std::{collections::BTreeSet, io};

/// How to print benchmark results.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum Format {
    /// A table with one row per pair count and one column per queue, in
    /// seconds.
    #[default]
    Table,
    /// Comma-separated values, one line per measurement.
    Csv,
}

const TITLE: &str = "Comparison between multiple queue implementations";
const PAIRS_HEADER: &str = "pairs";

/// Writes `measurements` to `out` in the given format.
pub fn write(
    measurements: &[Measurement],
    format: Format,
    color: ColorMode,
    out: &mut impl io::Write,
) -> io::Result<()> {
    match format {
        Format::Table => write_table(measurements, color, out),
        Format::Csv => write_csv(measurements, out),
    }
}

fn write_csv(measurements: &[Measurement], out: &mut impl io::Write) -> io::Result<()> {
    writeln!(out, "variant,pairs,elapsed_secs,dequeued,empty")?;
    for m in measurements {
        writeln!(
            out,
            "{},{},{:.6},{},{}",
            m.variant,
            m.pairs,
            m.elapsed.as_secs_f64(),
            m.dequeued,
            m.empty
        )?;
    }
    Ok(())
}

fn write_table(
    measurements: &[Measurement],
    color: ColorMode,
    out: &mut impl io::Write,
) -> io::Result<()> {
    let heading = color.if_color(style().bold());
    let fastest = color.if_color(style().green());

    // Columns appear in the order their variant was first measured.
    let mut variants = Vec::new();
    for m in measurements {
        if !variants.contains(&m.variant) {
            variants.push(m.variant);
        }
    }
    let pair_counts: BTreeSet<usize> = measurements.iter().map(|m| m.pairs).collect();
    let widths: Vec<usize> = variants.iter().map(|v| v.label().len()).collect();

    writeln!(out, "{}", TITLE.style(heading))?;
    write!(out, "{:>5}", PAIRS_HEADER.style(heading))?;
    for (variant, &width) in variants.iter().zip(&widths) {
        write!(out, "  {:>width$}", variant.label().style(heading))?;
    }
    writeln!(out)?;

    for pairs in pair_counts {
        let row: Vec<Option<&Measurement>> = variants
            .iter()
            .map(|&v| find(measurements, v, pairs))
            .collect();
        let best = row
            .iter()
            .flatten()
            .map(|m| m.elapsed)
            .min();

        write!(out, "{pairs:>5}")?;
        for (m, &width) in row.iter().zip(&widths) {
            match m {
                Some(m) => {
                    let secs = format!("{:.3}s", m.elapsed.as_secs_f64());
                    if Some(m.elapsed) == best && row.len() > 1 {
                        write!(out, "  {:>width$}", secs.style(fastest))?;
                    } else {
                        write!(out, "  {secs:>width$}")?;
                    }
                }
                None => write!(out, "  {:>width$}", "-")?,
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

fn find(measurements: &[Measurement], variant: Variant, pairs: usize) -> Option<&Measurement> {
    measurements
        .iter()
        .find(|m| m.variant == variant && m.pairs == pairs)
}
