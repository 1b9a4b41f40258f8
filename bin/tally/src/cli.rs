use std::{num::NonZeroUsize, path::PathBuf};

use clap::{ArgAction, Parser};
use tracing::level_filters::LevelFilter;

/// Reads metrics in line protocol from standard input, applies the vCenter multiplier, and writes them to standard
/// output.
#[derive(Parser)]
#[command(name = "tally", version)]
pub struct Cli {
    /// Enable verbose output. (Specify twice for more verbosity.)
    #[arg(short = 'v', long, action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,

    /// Path to the YAML configuration file.
    ///
    /// Settings can also be given as environment variables prefixed with `TALLY_`, such as
    /// `TALLY_MULTIPLIER_VERBOSE_MODE=true`. Environment variables take precedence over the file.
    #[arg(short = 'c', long = "config")]
    pub config_file: Option<PathBuf>,

    /// Number of metrics handed to the transform at once.
    #[arg(long, default_value = "1000")]
    pub batch_size: NonZeroUsize,

    /// Print a sample configuration file and exit.
    #[arg(long)]
    pub sample_config: bool,
}

impl Cli {
    /// Gets the configured log level based on the user-supplied verbosity level.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}
