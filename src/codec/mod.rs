//! Wire-level framing: standard Modbus function-code constants shared by
//! every transport, plus the proprietary WiFi-dongle envelope that wraps a
//! Modbus-shaped data frame in an 18-byte custom header with its own
//! CRC-16/Modbus trailer.

pub mod dongle;
pub mod modbus_frame;

pub use modbus_frame::ModbusFunction;
