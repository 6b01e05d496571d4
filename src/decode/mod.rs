//! Data-class decoders: each type here turns a `RegisterSnapshot` or a
//! cloud JSON document into a uniformly-scaled, model-family-aware view,
//! and carries its own corruption canary so callers never have to
//! reason about raw registers directly.

pub mod battery;
pub mod gridboss;
pub mod inverter_energy;
pub mod inverter_runtime;

pub use battery::{BatteryBankData, BatteryBankStatus, BatteryData};
pub use gridboss::MidboxRuntimeData;
pub use inverter_energy::{InverterEnergyData, MONOTONE_LIFETIME_FIELDS};
pub use inverter_runtime::InverterRuntimeData;
