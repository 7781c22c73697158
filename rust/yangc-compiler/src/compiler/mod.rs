//! The inference pipeline: IR ingestion, phased resolution, effective model
//! assembly.

pub mod context;
pub mod copy_history;
pub mod effective;
pub mod error_codes;
pub mod ir;
pub mod namespace;
pub mod phase;
pub mod reactor;
pub mod support;
pub mod supports;
pub mod testing_helpers;
