use std::fmt::Write as _;

use tally_core::data_model::metric::{FieldValue, Metric};

use super::helpers::{push_escaped, push_string_literal, KEY_DELIMITERS, MEASUREMENT_DELIMITERS};

/// Appends the line protocol form of `metric` to `out`, without a trailing newline.
///
/// Integer kinds keep their signedness (`i` or `u` suffix) but not their width, so a 32-bit field reads back as its
/// 64-bit counterpart.
pub fn encode_metric(metric: &Metric, out: &mut String) {
    push_escaped(out, metric.name(), MEASUREMENT_DELIMITERS);

    for (key, value) in metric.tags() {
        out.push(',');
        push_escaped(out, key, KEY_DELIMITERS);
        out.push('=');
        push_escaped(out, value, KEY_DELIMITERS);
    }

    for (i, (key, value)) in metric.fields().iter().enumerate() {
        out.push(if i == 0 { ' ' } else { ',' });
        push_escaped(out, key, KEY_DELIMITERS);
        out.push('=');
        push_field_value(out, value);
    }

    // Writing into a `String` cannot fail.
    let _ = write!(out, " {}", metric.timestamp());
}

/// Returns the line protocol form of `metric`, without a trailing newline.
pub fn to_line(metric: &Metric) -> String {
    let mut out = String::new();
    encode_metric(metric, &mut out);
    out
}

fn push_field_value(out: &mut String, value: &FieldValue) {
    let _ = match value {
        FieldValue::I32(v) => write!(out, "{}i", v),
        FieldValue::I64(v) => write!(out, "{}i", v),
        FieldValue::U32(v) => write!(out, "{}u", v),
        FieldValue::U64(v) => write!(out, "{}u", v),
        FieldValue::F32(v) => write!(out, "{}", v),
        FieldValue::F64(v) => write!(out, "{}", v),
        FieldValue::Bool(v) => write!(out, "{}", v),
        FieldValue::String(v) => {
            push_string_literal(out, v);
            Ok(())
        }
    };
}
