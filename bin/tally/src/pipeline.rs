use std::io::{BufRead, Write};

use tally_core::{components::transforms::SynchronousTransform, topology::interconnect::MetricBuffer};
use tally_error::{ErrorContext as _, GenericError};
use tally_io::codec::line_protocol::{encode_metric, is_metric_line, parse_line};
use tracing::{debug, warn};

/// Counts of what a pipeline run did.
#[derive(Debug, Default, PartialEq)]
pub struct PipelineStats {
    /// Metrics written to the output.
    pub metrics_written: usize,

    /// Input lines skipped because they could not be parsed.
    pub lines_skipped: usize,

    /// Batches handed to the transform.
    pub batches: usize,
}

/// Moves metrics from `reader` through `transform` to `writer`, `batch_size` metrics at a time.
///
/// Blank lines and `#` comments are ignored. Lines that fail to parse are logged and skipped. The output is flushed
/// after every batch.
///
/// # Errors
///
/// If reading from `reader` or writing to `writer` fails, an error is returned.
pub fn run_pipeline<R, W>(
    reader: R, writer: &mut W, transform: &mut dyn SynchronousTransform, batch_size: usize,
) -> Result<PipelineStats, GenericError>
where
    R: BufRead,
    W: Write,
{
    let mut stats = PipelineStats::default();
    let mut buffer = MetricBuffer::with_capacity(batch_size);
    let mut encoded = String::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.error_context("Failed to read input.")?;
        if !is_metric_line(&line) {
            continue;
        }

        match parse_line(&line) {
            Ok(metric) => buffer.push(metric),
            Err(e) => {
                warn!(error = %e, line_number = index + 1, "Skipping invalid input line.");
                stats.lines_skipped += 1;
                continue;
            }
        }

        if buffer.len() >= batch_size {
            flush_batch(&mut buffer, writer, transform, &mut encoded, &mut stats)?;
        }
    }

    if !buffer.is_empty() {
        flush_batch(&mut buffer, writer, transform, &mut encoded, &mut stats)?;
    }

    Ok(stats)
}

fn flush_batch<W: Write>(
    buffer: &mut MetricBuffer, writer: &mut W, transform: &mut dyn SynchronousTransform, encoded: &mut String,
    stats: &mut PipelineStats,
) -> Result<(), GenericError> {
    transform.transform_buffer(buffer);

    encoded.clear();
    for metric in buffer.iter() {
        encode_metric(metric, encoded);
        encoded.push('\n');
    }

    writer
        .write_all(encoded.as_bytes())
        .and_then(|()| writer.flush())
        .error_context("Failed to write output.")?;

    debug!(metrics = buffer.len(), "Flushed batch.");

    stats.metrics_written += buffer.len();
    stats.batches += 1;
    buffer.clear();

    Ok(())
}
