use crate::{term::OutputOptions, Result};

impl OutputOptions {
    /// Installs the global `tracing` subscriber.
    ///
    /// Logs go to stderr, so that they never interleave with a report written
    /// to stdout. The `ErrorLayer` lets `color-eyre` attach span traces to
    /// errors.
    pub(crate) fn trace_init(&mut self) -> Result<()> {
        use tracing_subscriber::prelude::*;

        let fmt = tracing_subscriber::fmt::layer()
            .with_ansi(self.color.should_color_stderr())
            .with_target(false)
            .with_thread_names(true)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(fmt)
            .with(tracing_error::ErrorLayer::default())
            .with(std::mem::take(&mut self.log))
            .try_init()?;
        Ok(())
    }
}
