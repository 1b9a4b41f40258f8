//! Helpers for building tally applications.
#![deny(missing_docs)]

pub mod logging;
