//! Data model.

pub mod metric;
