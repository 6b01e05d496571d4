//! Client library for EG4/Luxpower solar hybrid inverters and their
//! GridBOSS/MID companion devices.
//!
//! Three pluggable wire transports (Modbus TCP, Modbus RTU-over-serial, and
//! the proprietary WiFi-dongle TCP protocol) feed a register-catalog-driven
//! decoder that produces uniformly scaled, corruption-checked data
//! structures. A fourth transport speaks the vendor's cloud HTTP API for
//! the handful of operations no local wire protocol exposes. See
//! [`device::Device`] for the façade most callers want; the lower-level
//! [`transport`], [`codec`], and [`decode`] modules are exposed for callers
//! building their own orchestration on top.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod decode;
pub mod device;
pub mod error;
pub mod orchestrator;
pub mod prelude;
pub mod probe;
pub mod reader;
pub mod serial;
pub mod snapshot;
pub mod transport;
pub mod unixtime;
pub mod validate;

pub use error::{Error, Result};
