//! Codecs.

pub mod line_protocol;
