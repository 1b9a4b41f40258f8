//! Transform components.

mod builder;
pub use self::builder::SynchronousTransformBuilder;

use crate::topology::interconnect::MetricBuffer;

/// A synchronous transform.
///
/// Synchronous transforms rewrite a batch in place, on the caller's thread, and must not add or remove metrics. The
/// host calls `transform_buffer` once per batch, and never concurrently for the same instance.
pub trait SynchronousTransform {
    /// Transforms the metrics in the given buffer.
    fn transform_buffer(&mut self, buffer: &mut MetricBuffer);
}
