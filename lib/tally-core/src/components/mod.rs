//! Component basics.

pub mod transforms;
