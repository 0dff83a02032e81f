use clap::{ArgGroup, Args};
use std::fmt;

pub use owo_colors::{style, OwoColorize, Style};
const ARG_GROUP: &str = "output-opts";

#[derive(Debug, Args)]
#[command(
    next_help_heading = "Output Options",
    group = ArgGroup::new(ARG_GROUP).multiple(true),
)]
pub struct OutputOptions {
    /// Whether to emit colors in output.
    #[clap(
        long,
        env = "HYPHAE_COLOR",
        default_value_t = ColorMode::Auto,
        global = true,
        group = ARG_GROUP,
    )]
    pub color: ColorMode,

    /// Configures benchmark logging.
    #[clap(
        short,
        long,
        env = "RUST_LOG",
        default_value = "hyphae_bench=info,warn",
        global = true,
        group = ARG_GROUP,
    )]
    pub log: tracing_subscriber::filter::Targets,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum ColorMode {
    /// Determine whether to color output based on whether or not the output
    /// stream is a TTY.
    Auto,
    /// Always color output.
    Always,
    /// Never color output.
    Never,
}

// === impl OutputOptions ===

impl OutputOptions {
    pub fn init(&mut self) -> color_eyre::Result<()> {
        self.trace_init()
    }
}

// === impl ColorMode ===

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl ColorMode {
    /// Returns `style` if stdout should be colored, or a plain style if not.
    pub fn if_color(self, style: Style) -> Style {
        if self.should_color_stdout() {
            style
        } else {
            owo_colors::style()
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Auto => "auto",
            ColorMode::Always => "always",
            ColorMode::Never => "never",
        }
    }

    pub fn should_color_stdout(self) -> bool {
        match self {
            ColorMode::Auto => atty::is(atty::Stream::Stdout),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }

    pub fn should_color_stderr(self) -> bool {
        match self {
            ColorMode::Auto => atty::is(atty::Stream::Stderr),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}
