use crate::data_model::metric::Metric;

/// An ordered batch of metrics.
///
/// Components may replace metrics in place, but a batch keeps its length and order while it moves through synchronous
/// transforms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricBuffer {
    metrics: Vec<Metric>,
}

impl MetricBuffer {
    /// Creates an empty buffer with room for at least `capacity` metrics.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            metrics: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of metrics in the buffer.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns `true` if the buffer contains no metrics.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Appends a metric to the back of the buffer.
    pub fn push(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }

    /// Removes all metrics from the buffer, keeping its allocation.
    pub fn clear(&mut self) {
        self.metrics.clear();
    }

    /// Returns an iterator over the metrics in the buffer.
    pub fn iter(&self) -> std::slice::Iter<'_, Metric> {
        self.metrics.iter()
    }

    /// Returns a mutable iterator over the metrics in the buffer.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Metric> {
        self.metrics.iter_mut()
    }

    /// Consumes the buffer, returning the metrics it held.
    pub fn into_metrics(self) -> Vec<Metric> {
        self.metrics
    }
}

impl From<Vec<Metric>> for MetricBuffer {
    fn from(metrics: Vec<Metric>) -> Self {
        Self { metrics }
    }
}

impl FromIterator<Metric> for MetricBuffer {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MetricBuffer {
    type Item = Metric;
    type IntoIter = std::vec::IntoIter<Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetricBuffer {
    type Item = &'a Metric;
    type IntoIter = std::slice::Iter<'a, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}

impl<'a> IntoIterator for &'a mut MetricBuffer {
    type Item = &'a mut Metric;
    type IntoIter = std::slice::IterMut<'a, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter_mut()
    }
}
