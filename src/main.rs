use clap::Parser;
use hyphae_bench::{Options, Result};

fn main() -> Result<()> {
    color_eyre::install()?;
    let mut opts = Options::parse();
    opts.output.init()?;

    tracing::debug!(?opts, "configured");
    opts.run()
}
