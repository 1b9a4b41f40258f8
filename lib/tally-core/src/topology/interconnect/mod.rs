//! Batches handed between the host pipeline and components.

mod metric_buffer;
pub use self::metric_buffer::MetricBuffer;
