//! Applies the vCenter multiplier to metrics in line protocol, reading from standard input and writing to standard
//! output.

#![deny(missing_docs)]

use std::io::{self, BufWriter};

use clap::Parser as _;
use tally_app::logging::initialize_logging;
use tally_components::transforms::{VCenterMultiplierConfiguration, SAMPLE_CONFIGURATION};
use tally_config::ConfigurationLoader;
use tally_core::components::transforms::SynchronousTransformBuilder as _;
use tally_error::{ErrorContext as _, GenericError};
use tracing::{error, info};

mod cli;
use self::cli::Cli;

mod pipeline;
use self::pipeline::run_pipeline;

fn main() {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", SAMPLE_CONFIGURATION);
        return;
    }

    if let Err(e) = initialize_logging(Some(cli.log_level())) {
        eprintln!("FATAL: {}", e);
        std::process::exit(1);
    }

    match run(cli) {
        Ok(()) => info!("tally stopped."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<(), GenericError> {
    let mut loader = ConfigurationLoader::default();
    if let Some(config_file) = &cli.config_file {
        loader = loader
            .from_yaml(config_file)
            .with_error_context(|| format!("Failed to load configuration from '{}'.", config_file.display()))?;
    }
    let configuration = loader.from_environment("TALLY")?.into_generic();

    let multiplier_config = VCenterMultiplierConfiguration::from_configuration(&configuration)?;
    info!(
        factor_lines = multiplier_config.factor_lines().len(),
        verbose_mode = multiplier_config.verbose_mode(),
        batch_size = cli.batch_size.get(),
        "tally starting..."
    );

    let mut transform = multiplier_config.build()?;

    let stdin = io::stdin().lock();
    let mut stdout = BufWriter::new(io::stdout().lock());
    let stats = run_pipeline(stdin, &mut stdout, &mut *transform, cli.batch_size.get())
        .error_context("Failed to process metrics.")?;

    info!(
        metrics_written = stats.metrics_written,
        lines_skipped = stats.lines_skipped,
        batches = stats.batches,
        "Reached end of input."
    );

    Ok(())
}
