//! Temporal validation for data that has no static physical bounds.
//! Runtime-data corruption canaries live on the data classes themselves
//! (`decode::InverterRuntimeData::is_corrupt`, etc.) since they're
//! stateless range checks; this module holds the stateful, per-device
//! validators that need history to judge a sample.

pub mod energy;

pub use energy::{EnergyValidator, Verdict};
