//! Whole-simulation tests.
//!
//! - `determinism.rs`: same seed and inputs give the same state, including
//!   across rollback
//! - `integration.rs`: end-to-end combat scenarios through the tick loop
//! - `helpers.rs`: scenario setup shared by both

mod helpers;

pub use helpers::*;
