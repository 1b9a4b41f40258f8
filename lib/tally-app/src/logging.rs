//! Logging.

use tally_error::{generic_error, GenericError};
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{
    layer::SubscriberExt as _, registry::LookupSpan, util::SubscriberInitExt as _, EnvFilter, Layer,
};

/// Environment variable holding the log filtering directives.
pub const LOG_LEVEL_ENV_VAR: &str = "TALLY_LOG_LEVEL";

/// Environment variable selecting JSON log output.
pub const LOG_FORMAT_JSON_ENV_VAR: &str = "TALLY_LOG_FORMAT_JSON";

/// Initializes the logging subsystem for `tracing`.
///
/// This function reads the `TALLY_LOG_LEVEL` environment variable to determine the log level to use. If the environment
/// variable is not set, `default_level` is used, or `INFO` if no default level is given. Additionally, it reads the
/// `TALLY_LOG_FORMAT_JSON` environment variable: when set to `true` or `1`, logs are formatted as JSON. Otherwise, logs
/// use a compact, human-readable format.
///
/// Logs are always written to standard error, leaving standard output free for metrics.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error will be returned.
pub fn initialize_logging(default_level: Option<LevelFilter>) -> Result<(), GenericError> {
    let is_json = std::env::var(LOG_FORMAT_JSON_ENV_VAR)
        .map(|s| is_truthy(&s))
        .unwrap_or(false);

    let level_filter = EnvFilter::builder()
        .with_default_directive(default_level.unwrap_or(LevelFilter::INFO).into())
        .with_env_var(LOG_LEVEL_ENV_VAR)
        .from_env_lossy();

    let result = if is_json {
        tracing_subscriber::registry()
            .with(initialize_tracing_json().with_filter(level_filter))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(initialize_tracing_compact().with_filter(level_filter))
            .try_init()
    };

    result.map_err(|e| generic_error!("Failed to initialize logging: {}", e))
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "true" || value == "1"
}

fn initialize_tracing_json<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new()
        .json()
        .flatten_event(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
}

fn initialize_tracing_compact<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_target(true)
        .with_writer(std::io::stderr)
}
