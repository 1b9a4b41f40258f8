use tally_core::data_model::metric::FieldValue;
use tracing::warn;

/// Converts a field value to a float.
///
/// Never fails: non-numeric values are logged and read as `0.0`.
pub fn to_float(value: &FieldValue) -> f64 {
    match value {
        FieldValue::I32(v) => f64::from(*v),
        FieldValue::I64(v) => *v as f64,
        FieldValue::U32(v) => f64::from(*v),
        FieldValue::U64(v) => *v as f64,
        FieldValue::F32(v) => f64::from(*v),
        FieldValue::F64(v) => *v,
        FieldValue::Bool(_) | FieldValue::String(_) => {
            warn!(
                kind = value.kind(),
                value = %value,
                "Cannot convert non-numeric field value to a float. Using 0 instead."
            );
            0.0
        }
    }
}

/// Multiplies a field value by `factor`, keeping the value's concrete kind.
///
/// Integer kinds truncate toward zero and saturate at their bounds. Non-numeric values are logged and returned
/// unchanged.
pub fn scale(value: &FieldValue, factor: f64) -> FieldValue {
    match value {
        FieldValue::I32(v) => FieldValue::I32((f64::from(*v) * factor) as i32),
        FieldValue::I64(v) => FieldValue::I64((*v as f64 * factor) as i64),
        FieldValue::U32(v) => FieldValue::U32((f64::from(*v) * factor) as u32),
        FieldValue::U64(v) => FieldValue::U64((*v as f64 * factor) as u64),
        FieldValue::F32(v) => FieldValue::F32((f64::from(*v) * factor) as f32),
        FieldValue::F64(v) => FieldValue::F64(*v * factor),
        FieldValue::Bool(_) | FieldValue::String(_) => {
            warn!(
                kind = value.kind(),
                value = %value,
                factor,
                "Cannot multiply non-numeric field value. Leaving it unchanged."
            );
            value.clone()
        }
    }
}
