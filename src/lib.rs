//! Benchmarks and demonstrations for the [`hyphae`] queues.
pub use color_eyre::eyre::Result;

pub mod bench;
pub mod cli;
pub mod demo;
pub mod report;
pub mod term;
mod trace;

#[doc(inline)]
pub use self::cli::Options;
