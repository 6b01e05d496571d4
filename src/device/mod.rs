//! Device façade: per-device TTL caches, parameter read/write, and the
//! composition hierarchy (`Station` → `ParallelGroup` → `Device`) used in
//! place of mixin inheritance.

pub mod cache;
pub mod hierarchy;
pub mod parameters;

pub use hierarchy::{Device, DeviceKind, ParallelGroup, Station, Timezone};
pub use parameters::{read_parameters, write_parameters, ParameterMap, ParameterValue};
