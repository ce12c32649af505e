//! Shared data model for the CloudGuard monitoring engine.
//!
//! Everything that crosses a crate boundary lives here: metric samples,
//! alerts and their lifecycle events, action tags, anomaly reports, plus the
//! id generator and clock used to stamp them.

pub mod clock;
pub mod id;
pub mod types;
