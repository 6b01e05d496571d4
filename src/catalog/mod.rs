//! Canonical, model-scoped register definitions. Every table here is a
//! compile-time constant; the catalog is never mutated at runtime.

pub mod battery_block;
pub mod gridboss_holding;
pub mod inverter_holding;
pub mod inverter_input;
pub mod register;

pub use register::{Category, ModelFamily, RegisterDef, RegisterGroup, Scale, WordOrder};
