use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Standard Modbus function codes this crate issues.
#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ModbusFunction {
    ReadHolding = 0x03,
    ReadInput = 0x04,
    WriteSingle = 0x06,
    WriteMultiple = 0x10,
}

/// Maximum registers addressable in one Modbus PDU.
pub const MAX_REGISTERS_PER_READ: u16 = 125;

/// Modbus marks an exception response by setting the top bit of the
/// function-code byte; the following byte is the exception code.
pub fn is_exception(function_byte: u8) -> bool {
    function_byte & 0x80 != 0
}

pub fn exception_function(function_byte: u8) -> u8 {
    function_byte & !0x80
}
