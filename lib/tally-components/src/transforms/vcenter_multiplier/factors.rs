use std::collections::HashMap;

use tally_io::codec::line_protocol::{is_metric_line, parse_line_with_default_timestamp};
use tracing::{debug, warn};

use super::coercion::to_float;

/// Multiplication factors, keyed by metric name and then field name.
///
/// Lookups are exact matches on both names. Tags play no part.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FactorTable {
    factors: HashMap<String, HashMap<String, f64>>,
}

impl FactorTable {
    /// Builds a factor table from configuration lines in line protocol, such as `mem used_percent=100`.
    ///
    /// Every field of a line becomes a factor for that field of the named metric. Later lines overwrite earlier
    /// factors for the same metric and field. Leading whitespace is ignored. Lines that fail to parse are logged and
    /// skipped, and blank or `#` comment lines are skipped with a debug message.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::default();

        for line in lines {
            let line = line.as_ref().trim_start();
            if !is_metric_line(line) {
                debug!(line, "Skipping blank or comment multiplier configuration line.");
                continue;
            }

            // The timestamp of a factor line is meaningless.
            let metric = match parse_line_with_default_timestamp(line, 0) {
                Ok(metric) => metric,
                Err(e) => {
                    warn!(error = %e, "Skipping invalid multiplier configuration line.");
                    continue;
                }
            };

            for (field, value) in metric.fields() {
                table.insert(metric.name(), field, to_float(value));
            }
        }

        debug!(metrics = table.len(), "Built multiplier factor table.");

        table
    }

    /// Sets the factor for the given metric and field, replacing any existing factor.
    pub fn insert(&mut self, metric_name: &str, field_name: &str, factor: f64) {
        self.factors
            .entry(metric_name.to_string())
            .or_default()
            .insert(field_name.to_string(), factor);
    }

    /// Sets the factor for the given metric and field, returning the updated table.
    pub fn with_factor(mut self, metric_name: &str, field_name: &str, factor: f64) -> Self {
        self.insert(metric_name, field_name, factor);
        self
    }

    /// Returns the field factors configured for the given metric, if any.
    pub fn factors_for(&self, metric_name: &str) -> Option<&HashMap<String, f64>> {
        self.factors.get(metric_name)
    }

    /// Returns the factor configured for the given metric and field, if any.
    pub fn factor(&self, metric_name: &str, field_name: &str) -> Option<f64> {
        self.factors_for(metric_name)?.get(field_name).copied()
    }

    /// Returns the number of metrics with at least one factor.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Returns `true` if no factors are configured.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_lines() {
        let table = FactorTable::from_lines(["mem used_percent=100,available_percent=100", "swap used_percent=100"]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.factor("mem", "used_percent"), Some(100.0));
        assert_eq!(table.factor("mem", "available_percent"), Some(100.0));
        assert_eq!(table.factor("swap", "used_percent"), Some(100.0));
        assert_eq!(table.factor("swap", "free"), None);
        assert_eq!(table.factor("cpu", "used_percent"), None);
    }

    #[test]
    fn repeated_metric_merges_and_overwrites() {
        let table = FactorTable::from_lines(["cpu a=1,b=2", "cpu b=3,c=4i"]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.factor("cpu", "a"), Some(1.0));
        assert_eq!(table.factor("cpu", "b"), Some(3.0));
        assert_eq!(table.factor("cpu", "c"), Some(4.0));
    }

    #[test]
    fn invalid_lines_are_skipped() {
        let table = FactorTable::from_lines(["not a factor line", "cpu value=10", "mem", "# comment", ""]);

        assert_eq!(table, FactorTable::default().with_factor("cpu", "value", 10.0));
    }

    #[test]
    fn tags_and_timestamps_are_ignored() {
        let table = FactorTable::from_lines(["cpu,host=esx-01 value=0.5 1700000000000000000"]);
        assert_eq!(table.factor("cpu", "value"), Some(0.5));
        assert!(table.factors_for("cpu,host=esx-01").is_none());
    }

    #[test]
    fn non_numeric_factor_is_zero() {
        let table = FactorTable::from_lines([r#"cpu value="ten",enabled=true"#]);
        assert_eq!(table.factor("cpu", "value"), Some(0.0));
        assert_eq!(table.factor("cpu", "enabled"), Some(0.0));
    }

    #[test]
    fn leading_whitespace_is_ignored() {
        let table = FactorTable::from_lines(["  cpu x=2", "\tmem used=3", "   # indented comment"]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.factor("cpu", "x"), Some(2.0));
        assert_eq!(table.factor("mem", "used"), Some(3.0));
    }

    #[test]
    fn no_lines() {
        let table = FactorTable::from_lines(Vec::<String>::new());
        assert!(table.is_empty());
    }
}
