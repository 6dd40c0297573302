//! Report module - run summaries and metrics tables

pub mod summary;

pub use summary::*;
