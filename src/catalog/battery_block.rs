/// Base address of the battery rotation window: firmware exposes up to
/// `SLOT_COUNT` physical battery modules in a 30-register-per-slot block,
/// rotating which module occupies which slot on a 10-60s period.
pub const BASE_ADDRESS: u16 = 5002;

/// Registers per slot.
pub const SLOT_WIDTH: u16 = 30;

/// Hardware maximum number of slots the firmware ever exposes in one
/// atomic read, regardless of what `bat_count` (input register 96)
/// reports — see the crate's resolution of the corresponding open
/// question.
pub const SLOT_COUNT: u16 = 4;

/// Total registers in one atomic probe read: the largest block that fits
/// within the 125-register Modbus PDU limit.
pub const TOTAL_REGISTERS: u16 = SLOT_WIDTH * SLOT_COUNT;

/// Offsets within a single 30-register slot.
pub mod offset {
    pub const STATUS: u16 = 0;
    /// Raw ÷ 100.
    pub const VOLTAGE: u16 = 1;
    /// Low byte = SoC, high byte = SoH.
    pub const SOC_SOH_PACKED: u16 = 8;
    /// High byte is the rotation "page key" used to distinguish which
    /// physical position the firmware currently maps this slot to.
    pub const POSITION: u16 = 24;
    /// 8 registers of ASCII serial, 2 chars/register, low byte first.
    pub const SERIAL_START: u16 = 17;
    pub const SERIAL_REGISTER_COUNT: u16 = 8;
}
