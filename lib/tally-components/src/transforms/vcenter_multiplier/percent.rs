use tally_core::{
    data_model::metric::{FieldValue, Fields},
    topology::interconnect::MetricBuffer,
};
use tracing::{debug, warn};

use super::{coercion::to_float, telemetry::Telemetry};

/// Field holding the total CPU capacity, in MHz.
pub const CAPACITY_FIELD: &str = "totalmhz_average";

/// Field holding the CPU capacity in use, in MHz. Rewritten to a percentage of [`CAPACITY_FIELD`].
pub const UTILIZATION_FIELD: &str = "effectivecpu_average";

/// The most recently observed capacity and utilization values.
///
/// Both start at zero and keep their last observed value across batches. Despite the field names, nothing is
/// averaged here.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningAverages {
    capacity: f64,
    utilization: f64,
}

impl RunningAverages {
    /// Returns the last observed capacity.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Returns the last observed utilization.
    pub fn utilization(&self) -> f64 {
        self.utilization
    }

    /// Records the capacity and utilization values present in the batch.
    ///
    /// When a field shows up more than once, the last occurrence wins.
    pub fn observe(&mut self, buffer: &MetricBuffer) {
        for metric in buffer {
            if let Some(value) = metric.field(CAPACITY_FIELD) {
                self.capacity = to_float(value);
            }
            if let Some(value) = metric.field(UTILIZATION_FIELD) {
                self.utilization = to_float(value);
            }
        }
    }

    /// Returns utilization as a whole percentage of capacity, or `None` if no non-zero capacity has been seen.
    pub fn utilization_percent(&self) -> Option<i64> {
        if self.capacity == 0.0 {
            return None;
        }

        Some(((self.utilization * 100.0) / self.capacity).floor() as i64)
    }

    /// Observes the batch, then rewrites every utilization field in it to the utilization percentage.
    ///
    /// The rewritten value is always a 64-bit signed integer, whatever kind the field had before. Nothing is rewritten
    /// until a non-zero capacity has been observed.
    pub(super) fn derive(&mut self, buffer: &mut MetricBuffer, telemetry: &Telemetry) {
        self.observe(buffer);

        let Some(percent) = self.utilization_percent() else {
            return;
        };

        debug!(
            capacity = self.capacity,
            utilization = self.utilization,
            percent,
            "Rewriting utilization as a percentage of capacity."
        );

        for metric in buffer {
            if metric.field(UTILIZATION_FIELD).is_none() {
                continue;
            }

            let fields = metric
                .fields()
                .iter()
                .map(|(name, value)| {
                    let value = if name == UTILIZATION_FIELD {
                        FieldValue::I64(percent)
                    } else {
                        value.clone()
                    };
                    (name.clone(), value)
                })
                .collect::<Fields>();

            match metric.with_fields(fields) {
                Ok(rewritten) => {
                    *metric = rewritten;
                    telemetry.percent_rewrites().increment(1);
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        metric_name = metric.name(),
                        "Failed to rebuild metric with utilization percentage. Keeping original."
                    );
                    telemetry.rewrite_failures().increment(1);
                }
            }
        }
    }
}
