//! Integration testing module
//!
//! End-to-end tests for the remux pipeline:
//! - Capture synthesis (fixtures)
//! - Sample accounting through decode, resample and encode
//! - Truncated, lossy and empty captures
//! - Setup failures

pub mod e2e;
pub mod fixtures;
