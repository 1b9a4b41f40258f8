//! Core primitives for building metric transform stages.
#![deny(missing_docs)]

pub mod components;
pub mod data_model;
pub mod topology;
