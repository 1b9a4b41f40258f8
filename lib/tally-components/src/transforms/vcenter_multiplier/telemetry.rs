use metrics::{counter, Counter};

#[derive(Clone)]
pub struct Telemetry {
    fields_scaled: Counter,
    percent_rewrites: Counter,
    rewrite_failures: Counter,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            fields_scaled: counter!("multiplier_fields_scaled_total"),
            percent_rewrites: counter!("multiplier_percent_rewrites_total"),
            rewrite_failures: counter!("multiplier_rewrite_failures_total"),
        }
    }

    #[cfg(test)]
    pub fn noop() -> Self {
        Self {
            fields_scaled: Counter::noop(),
            percent_rewrites: Counter::noop(),
            rewrite_failures: Counter::noop(),
        }
    }

    pub fn fields_scaled(&self) -> &Counter {
        &self.fields_scaled
    }

    pub fn percent_rewrites(&self) -> &Counter {
        &self.percent_rewrites
    }

    pub fn rewrite_failures(&self) -> &Counter {
        &self.rewrite_failures
    }
}
