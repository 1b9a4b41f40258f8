//! Metric types.

use std::{collections::BTreeMap, fmt};

use indexmap::IndexMap;
use snafu::{ensure, Snafu};

mod value;
pub use self::value::FieldValue;

/// Metric tags, keyed by tag name.
pub type Tags = BTreeMap<String, String>;

/// Metric fields, keyed by field name, in the order they were added.
pub type Fields = IndexMap<String, FieldValue>;

/// A metric construction error.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum MetricError {
    /// Metric name was empty.
    #[snafu(display("Metric name must not be empty."))]
    EmptyName,

    /// Metric had no fields.
    #[snafu(display("Metric '{}' must have at least one field.", name))]
    NoFields {
        /// Name of the metric.
        name: String,
    },

    /// A field had an empty name.
    #[snafu(display("Metric '{}' has a field with an empty name.", name))]
    EmptyFieldName {
        /// Name of the metric.
        name: String,
    },

    /// A floating point field was NaN or infinite.
    #[snafu(display("Field '{}' of metric '{}' is not a finite number: {}", field, name, value))]
    NonFiniteField {
        /// Name of the metric.
        name: String,

        /// Name of the field.
        field: String,

        /// Offending value.
        value: FieldValue,
    },
}

/// Metric type.
///
/// Carried through transforms untouched. It only describes how the metric should be interpreted downstream.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum MetricType {
    /// A monotonically increasing value.
    Counter,

    /// A point-in-time value.
    Gauge,

    /// No particular interpretation.
    #[default]
    Untyped,

    /// A precomputed summary.
    Summary,

    /// A precomputed histogram.
    Histogram,
}

impl MetricType {
    /// Returns the type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Untyped => "untyped",
            Self::Summary => "summary",
            Self::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric.
///
/// A metric is a named, tagged and timestamped set of fields. Its name, tags, timestamp and type are fixed once it is
/// constructed: transforms that need to change the fields build a replacement with [`Metric::with_fields`], which
/// carries the identity over and runs the same validation as the original construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    name: String,
    tags: Tags,
    fields: Fields,
    timestamp: u64,
    metric_type: MetricType,
}

impl Metric {
    /// Creates a metric from its individual parts.
    ///
    /// `timestamp` is in nanoseconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// If the name is empty, there are no fields, a field name is empty, or a floating point field is not finite, an
    /// error is returned.
    pub fn try_from_parts<N>(
        name: N, tags: Tags, fields: Fields, timestamp: u64, metric_type: MetricType,
    ) -> Result<Self, MetricError>
    where
        N: Into<String>,
    {
        let name = name.into();
        ensure!(!name.is_empty(), EmptyName);
        ensure!(!fields.is_empty(), NoFields { name });

        for (field, value) in &fields {
            ensure!(!field.is_empty(), EmptyFieldName { name });
            ensure!(
                value.is_finite(),
                NonFiniteField {
                    name,
                    field,
                    value: value.clone(),
                }
            );
        }

        Ok(Self {
            name,
            tags,
            fields,
            timestamp,
            metric_type,
        })
    }

    /// Creates a replacement for this metric with the given fields.
    ///
    /// The name, tags, timestamp and type are copied from `self`.
    ///
    /// # Errors
    ///
    /// If the new fields would not make a valid metric, an error is returned.
    pub fn with_fields(&self, fields: Fields) -> Result<Self, MetricError> {
        Self::try_from_parts(
            self.name.clone(),
            self.tags.clone(),
            fields,
            self.timestamp,
            self.metric_type,
        )
    }

    /// Returns the metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the metric tags.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Returns the metric fields.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Returns the value of the given field, if present.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns the metric timestamp, in nanoseconds since the Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the metric type.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }
}
