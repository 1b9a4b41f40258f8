use serde::Deserialize;
use tally_config::GenericConfiguration;
use tally_core::{
    components::transforms::{SynchronousTransform, SynchronousTransformBuilder},
    data_model::metric::{Fields, Metric},
    topology::interconnect::MetricBuffer,
};
use tally_error::GenericError;
use tracing::{info, warn};

mod coercion;
pub use self::coercion::{scale, to_float};

mod factors;
pub use self::factors::FactorTable;

mod percent;
pub use self::percent::{RunningAverages, CAPACITY_FIELD, UTILIZATION_FIELD};

mod telemetry;
use self::telemetry::Telemetry;

/// Sample configuration for the vCenter multiplier transform.
pub const SAMPLE_CONFIGURATION: &str = r#"# Multiplication factors, one metric per line, in line protocol.
#
# Every field listed for a metric is multiplied by the given factor.
multiplier_factors:
  - "mem used_percent=100,available_percent=100"
  - "swap used_percent=100"

# Logs every individual field rewrite.
multiplier_verbose_mode: false

# `totalmhz_average` and `effectivecpu_average` are always used to report `effectivecpu_average` as a percentage of
# `totalmhz_average` instead of in MHz.
"#;

/// vCenter multiplier synchronous transform.
///
/// Multiplies configured metric fields by fixed factors, keeping each field's numeric kind, and reports
/// `effectivecpu_average` as a percentage of the most recently seen `totalmhz_average`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VCenterMultiplierConfiguration {
    /// Factor lines, in line protocol: `<metric> <field>=<factor>[,<field>=<factor>...]`.
    #[serde(default, rename = "multiplier_factors")]
    factors: Vec<String>,

    /// Whether to log every individual field rewrite.
    #[serde(default, rename = "multiplier_verbose_mode")]
    verbose_mode: bool,
}

impl VCenterMultiplierConfiguration {
    /// Creates a new `VCenterMultiplierConfiguration` from the given configuration.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        Ok(config.as_typed()?)
    }

    /// Creates a new `VCenterMultiplierConfiguration` from the given factor lines.
    pub fn from_factor_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            factors: lines.into_iter().map(Into::into).collect(),
            verbose_mode: false,
        }
    }

    /// Sets whether every individual field rewrite is logged.
    pub fn with_verbose_mode(mut self, verbose_mode: bool) -> Self {
        self.verbose_mode = verbose_mode;
        self
    }

    /// Returns the configured factor lines.
    pub fn factor_lines(&self) -> &[String] {
        &self.factors
    }

    /// Returns `true` if verbose mode is enabled.
    pub fn verbose_mode(&self) -> bool {
        self.verbose_mode
    }
}

impl SynchronousTransformBuilder for VCenterMultiplierConfiguration {
    fn build(&self) -> Result<Box<dyn SynchronousTransform + Send>, GenericError> {
        Ok(Box::new(VCenterMultiplier::new(self.factors.clone(), self.verbose_mode)))
    }
}

enum FactorState {
    Uninitialized { lines: Vec<String> },
    Ready(FactorTable),
}

/// Multiplies configured fields and derives the CPU utilization percentage.
///
/// The factor table is built from the configuration lines when the first batch arrives. Capacity and utilization
/// observations persist for the lifetime of the instance.
pub struct VCenterMultiplier {
    factors: FactorState,
    verbose_mode: bool,
    averages: RunningAverages,
    telemetry: Telemetry,
}

impl VCenterMultiplier {
    /// Creates a transform that builds its factor table from `lines` on first use.
    pub fn new(lines: Vec<String>, verbose_mode: bool) -> Self {
        Self {
            factors: FactorState::Uninitialized { lines },
            verbose_mode,
            averages: RunningAverages::default(),
            telemetry: Telemetry::new(),
        }
    }

    /// Creates a transform with an already built factor table.
    pub fn from_factor_table(table: FactorTable, verbose_mode: bool) -> Self {
        Self {
            factors: FactorState::Ready(table),
            verbose_mode,
            averages: RunningAverages::default(),
            telemetry: Telemetry::new(),
        }
    }

    /// Returns the current capacity and utilization observations.
    pub fn running_averages(&self) -> RunningAverages {
        self.averages
    }

    fn initialize(&mut self) {
        if let FactorState::Uninitialized { lines } = &self.factors {
            self.factors = FactorState::Ready(FactorTable::from_lines(lines));
        }
    }

    /// Rewrites the configured fields of `metric`, returning how many numeric fields were scaled.
    ///
    /// Returns zero when the metric is unmatched, or when the rebuilt metric is rejected and the original is kept.
    fn multiply_metric(&self, table: &FactorTable, metric: &mut Metric) -> usize {
        let Some(factors) = table.factors_for(metric.name()) else {
            return 0;
        };

        // Skip the rebuild entirely when none of the configured fields are present.
        if !metric.fields().keys().any(|field| factors.contains_key(field)) {
            return 0;
        }

        let mut scaled_count = 0;
        let mut fields = Fields::with_capacity(metric.fields().len());
        for (field, value) in metric.fields() {
            let new_value = match factors.get(field) {
                Some(&factor) => {
                    let scaled = scale(value, factor);
                    if self.verbose_mode {
                        info!("{}.{}: {} * {} => {}", metric.name(), field, value, factor, scaled);
                    }
                    if value.is_numeric() {
                        scaled_count += 1;
                    }
                    scaled
                }
                None => value.clone(),
            };
            fields.insert(field.clone(), new_value);
        }

        match metric.with_fields(fields) {
            Ok(scaled) => {
                *metric = scaled;
                scaled_count
            }
            Err(e) => {
                warn!(
                    error = %e,
                    metric_name = metric.name(),
                    "Failed to rebuild metric with scaled fields. Keeping original."
                );
                self.telemetry.rewrite_failures().increment(1);
                0
            }
        }
    }
}

impl SynchronousTransform for VCenterMultiplier {
    fn transform_buffer(&mut self, buffer: &mut MetricBuffer) {
        self.initialize();

        if let FactorState::Ready(table) = &self.factors {
            for metric in &mut *buffer {
                let scaled_count = self.multiply_metric(table, metric);
                self.telemetry.fields_scaled().increment(scaled_count as u64);
            }
        }

        self.averages.derive(buffer, &self.telemetry);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use similar_asserts::assert_eq;
    use tally_config::ConfigurationLoader;
    use tally_core::data_model::metric::{FieldValue, MetricType, Tags};
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Runs `f` with a thread-local subscriber, returning everything logged at `INFO` or above.
    fn capture_logs<F: FnOnce()>(f: F) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(LevelFilter::INFO)
            .with_target(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);

        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn metric(name: &str, tags: &[(&str, &str)], fields: &[(&str, FieldValue)]) -> Metric {
        let tags = tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<Tags>();
        let fields = fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Metric::try_from_parts(name, tags, fields, 1_700_000_000_000_000_000, MetricType::Gauge).unwrap()
    }

    fn idle_time(value: FieldValue) -> Metric {
        metric("cpu", &[("name", "idle_time")], &[("value", value)])
    }

    #[test]
    fn no_configuration_leaves_metrics_unchanged() {
        let mut transform = VCenterMultiplier::new(Vec::new(), false);
        let mut buffer = MetricBuffer::from(vec![idle_time(FieldValue::I64(128))]);

        transform.transform_buffer(&mut buffer);

        assert_eq!(buffer, MetricBuffer::from(vec![idle_time(FieldValue::I64(128))]));
    }

    #[test]
    fn multiply_by_ten() {
        let table = FactorTable::default().with_factor("cpu", "value", 10.0);
        let mut transform = VCenterMultiplier::from_factor_table(table, true);
        let mut buffer = MetricBuffer::from(vec![idle_time(FieldValue::I64(128))]);

        transform.transform_buffer(&mut buffer);

        assert_eq!(buffer, MetricBuffer::from(vec![idle_time(FieldValue::I64(1280))]));
    }

    #[test]
    fn effective_cpu_as_percentage() {
        let table = FactorTable::default().with_factor("cpu", "value", 10.0);
        let mut transform = VCenterMultiplier::from_factor_table(table, true);
        let mut buffer = MetricBuffer::from(vec![
            metric("cpu", &[("name", "tag1")], &[(UTILIZATION_FIELD, FieldValue::I64(100))]),
            metric("cpu", &[("name", "tag2")], &[(CAPACITY_FIELD, FieldValue::I64(200))]),
        ]);

        transform.transform_buffer(&mut buffer);

        let expected = MetricBuffer::from(vec![
            metric("cpu", &[("name", "tag1")], &[(UTILIZATION_FIELD, FieldValue::I64(50))]),
            metric("cpu", &[("name", "tag2")], &[(CAPACITY_FIELD, FieldValue::I64(200))]),
        ]);
        assert_eq!(buffer, expected);
        assert_eq!(transform.running_averages().capacity(), 200.0);
    }

    #[test]
    fn only_configured_fields_change() {
        let table = FactorTable::default()
            .with_factor("mem", "used_percent", 100.0)
            .with_factor("mem", "available_percent", 100.0);
        let mut transform = VCenterMultiplier::from_factor_table(table, false);
        let mut buffer = MetricBuffer::from(vec![
            metric(
                "mem",
                &[("host", "esx-01")],
                &[
                    ("used_percent", FieldValue::F64(0.25)),
                    ("available_percent", FieldValue::F32(0.75)),
                    ("total", FieldValue::U64(1 << 30)),
                    ("state", FieldValue::String("ok".to_string())),
                ],
            ),
            metric("swap", &[("host", "esx-01")], &[("used_percent", FieldValue::F64(0.5))]),
        ]);

        transform.transform_buffer(&mut buffer);

        let expected = MetricBuffer::from(vec![
            metric(
                "mem",
                &[("host", "esx-01")],
                &[
                    ("used_percent", FieldValue::F64(25.0)),
                    ("available_percent", FieldValue::F32(75.0)),
                    ("total", FieldValue::U64(1 << 30)),
                    ("state", FieldValue::String("ok".to_string())),
                ],
            ),
            metric("swap", &[("host", "esx-01")], &[("used_percent", FieldValue::F64(0.5))]),
        ]);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn tags_do_not_affect_matching() {
        let table = FactorTable::default().with_factor("cpu", "value", 2.0);
        let mut transform = VCenterMultiplier::from_factor_table(table, false);
        let mut buffer = MetricBuffer::from(vec![
            metric("cpu", &[("name", "a")], &[("value", FieldValue::I32(1))]),
            metric("cpu", &[("name", "b")], &[("value", FieldValue::I32(2))]),
        ]);

        transform.transform_buffer(&mut buffer);

        let expected = MetricBuffer::from(vec![
            metric("cpu", &[("name", "a")], &[("value", FieldValue::I32(2))]),
            metric("cpu", &[("name", "b")], &[("value", FieldValue::I32(4))]),
        ]);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn failed_rebuild_keeps_original() {
        // An f32 field scaled past f32::MAX becomes infinite, which is not a valid field value.
        let table = FactorTable::default().with_factor("cpu", "value", 1e300);
        let mut transform = VCenterMultiplier::from_factor_table(table, false);
        let original = MetricBuffer::from(vec![idle_time(FieldValue::F32(2.0))]);
        let mut buffer = original.clone();

        transform.transform_buffer(&mut buffer);

        assert_eq!(buffer, original);
    }

    #[test]
    fn verbose_mode_logs_each_rewrite() {
        let table = FactorTable::default()
            .with_factor("cpu", "value", 10.0)
            .with_factor("cpu", "ready", 0.5);
        let mut transform = VCenterMultiplier::from_factor_table(table, true);
        let mut buffer = MetricBuffer::from(vec![metric(
            "cpu",
            &[("name", "idle_time")],
            &[("value", FieldValue::I64(128)), ("ready", FieldValue::F64(3.0))],
        )]);

        let logs = capture_logs(|| transform.transform_buffer(&mut buffer));

        assert!(logs.contains("cpu.value: 128 * 10 => 1280"), "unexpected logs: {}", logs);
        assert!(logs.contains("cpu.ready: 3 * 0.5 => 1.5"), "unexpected logs: {}", logs);
    }

    #[test]
    fn quiet_mode_logs_nothing_per_field() {
        let table = FactorTable::default().with_factor("cpu", "value", 10.0);
        let mut transform = VCenterMultiplier::from_factor_table(table, false);
        let mut buffer = MetricBuffer::from(vec![idle_time(FieldValue::I64(128))]);

        let logs = capture_logs(|| transform.transform_buffer(&mut buffer));

        assert!(logs.is_empty(), "unexpected logs: {}", logs);
        assert_eq!(buffer, MetricBuffer::from(vec![idle_time(FieldValue::I64(1280))]));
    }

    #[test]
    fn scaled_count_covers_only_applied_numeric_rewrites() {
        let table = FactorTable::default()
            .with_factor("cpu", "value", 10.0)
            .with_factor("cpu", "state", 10.0)
            .with_factor("cpu", "ratio", 1e300);
        let transform = VCenterMultiplier::from_factor_table(table, false);
        let FactorState::Ready(table) = &transform.factors else {
            panic!("factor table should be ready");
        };

        let mut numeric = metric(
            "cpu",
            &[],
            &[
                ("value", FieldValue::I64(1)),
                ("state", FieldValue::String("ok".to_string())),
                ("other", FieldValue::I64(1)),
            ],
        );
        assert_eq!(transform.multiply_metric(table, &mut numeric), 1);

        let mut non_numeric = metric("cpu", &[], &[("state", FieldValue::Bool(true))]);
        assert_eq!(transform.multiply_metric(table, &mut non_numeric), 0);

        let mut rejected = metric("cpu", &[], &[("value", FieldValue::I64(1)), ("ratio", FieldValue::F32(2.0))]);
        assert_eq!(transform.multiply_metric(table, &mut rejected), 0);
        assert_eq!(rejected.field("value"), Some(&FieldValue::I64(1)));

        let mut unmatched = metric("mem", &[], &[("value", FieldValue::I64(1))]);
        assert_eq!(transform.multiply_metric(table, &mut unmatched), 0);
    }

    #[test]
    fn indented_factor_line_still_applies() {
        let mut transform = VCenterMultiplier::new(vec!["  cpu x=2".to_string()], false);
        let mut buffer = MetricBuffer::from(vec![metric("cpu", &[], &[("x", FieldValue::I64(4))])]);

        transform.transform_buffer(&mut buffer);

        assert_eq!(buffer, MetricBuffer::from(vec![metric("cpu", &[], &[("x", FieldValue::I64(8))])]));
    }

    #[test]
    fn factor_table_is_built_lazily_from_lines() {
        let mut transform = VCenterMultiplier::new(vec!["cpu value=10".to_string(), "bogus".to_string()], false);
        assert!(matches!(transform.factors, FactorState::Uninitialized { .. }));

        let mut buffer = MetricBuffer::from(vec![idle_time(FieldValue::I64(128))]);
        transform.transform_buffer(&mut buffer);

        assert!(matches!(&transform.factors, FactorState::Ready(table) if table.len() == 1));
        assert_eq!(buffer, MetricBuffer::from(vec![idle_time(FieldValue::I64(1280))]));
    }

    #[test]
    fn each_batch_is_multiplied_again() {
        let table = FactorTable::default().with_factor("cpu", "value", 10.0);
        let mut transform = VCenterMultiplier::from_factor_table(table, false);
        let mut buffer = MetricBuffer::from(vec![idle_time(FieldValue::I64(1))]);

        transform.transform_buffer(&mut buffer);
        transform.transform_buffer(&mut buffer);

        assert_eq!(buffer, MetricBuffer::from(vec![idle_time(FieldValue::I64(100))]));
    }

    #[test]
    fn configuration_from_generic() {
        let config = ConfigurationLoader::default()
            .with_overrides(VCenterMultiplierConfigurationValues {
                multiplier_factors: vec!["cpu value=10".to_string()],
                multiplier_verbose_mode: true,
            })
            .into_generic();

        let configuration = VCenterMultiplierConfiguration::from_configuration(&config).unwrap();
        assert_eq!(configuration.factor_lines(), ["cpu value=10".to_string()]);
        assert!(configuration.verbose_mode());

        let mut transform = configuration.build().unwrap();
        let mut buffer = MetricBuffer::from(vec![idle_time(FieldValue::U32(3))]);
        transform.transform_buffer(&mut buffer);
        assert_eq!(buffer, MetricBuffer::from(vec![idle_time(FieldValue::U32(30))]));
    }

    #[test]
    fn configuration_defaults() {
        let config = ConfigurationLoader::default().into_generic();
        let configuration = VCenterMultiplierConfiguration::from_configuration(&config).unwrap();

        assert!(configuration.factor_lines().is_empty());
        assert!(!configuration.verbose_mode());
    }

    #[derive(serde::Serialize)]
    struct VCenterMultiplierConfigurationValues {
        multiplier_factors: Vec<String>,
        multiplier_verbose_mode: bool,
    }
}
