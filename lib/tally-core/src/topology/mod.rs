//! Plumbing between a host pipeline and the components it drives.

pub mod interconnect;
