//! Components for metric transform pipelines.
#![deny(missing_docs)]

pub mod transforms;
