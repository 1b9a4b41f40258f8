//! I/O primitives: reading and writing metrics in their text formats.
#![deny(missing_docs)]

pub mod codec;
