//! Helpers for the I/O that mappers and reducer output sinks do.

pub mod lines;
