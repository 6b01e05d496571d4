use super::register::{Category, ModelFamily, RegisterDef, RegisterGroup, Scale, WordOrder};

const HWF: WordOrder = WordOrder::HighWordFirst;
const ALL: &[ModelFamily] = &[];

/// Device-type register: holding register 19, value 50 identifies a
/// GridBOSS/MID device rather than an inverter.
pub const DEVICE_TYPE_REGISTER: u16 = 19;
pub const DEVICE_TYPE_GRIDBOSS: u16 = 50;

pub const GRIDBOSS_GROUPS: &[RegisterGroup] = &[
    RegisterGroup::new(0, 40),
    RegisterGroup::new(40, 28),
    RegisterGroup::new(68, 40),
    RegisterGroup::new(108, 12),
    RegisterGroup::new(128, 4),
];

/// Smart-port mode register: two bits per port, four ports packed into one
/// holding register over Modbus (cloud JSON reports them as four separate
/// integers instead).
pub const SMART_PORT_MODE_REGISTER: u16 = 20;

pub const GRIDBOSS_REGISTERS: &[RegisterDef] = &[
    RegisterDef::new("grid_l1_voltage", 0, 16, HWF, false, Scale::Div10, ALL, Category::GridBoss),
    RegisterDef::new("grid_l2_voltage", 1, 16, HWF, false, Scale::Div10, ALL, Category::GridBoss),
    RegisterDef::new("grid_frequency", 2, 16, HWF, false, Scale::Div100, ALL, Category::GridBoss),
    RegisterDef::new("load_l1_power", 3, 16, HWF, true, Scale::None, ALL, Category::GridBoss),
    RegisterDef::new("load_l2_power", 4, 16, HWF, true, Scale::None, ALL, Category::GridBoss),
    RegisterDef::new("gen_l1_voltage", 40, 16, HWF, false, Scale::Div10, ALL, Category::GridBoss),
    RegisterDef::new("gen_l2_voltage", 41, 16, HWF, false, Scale::Div10, ALL, Category::GridBoss),
    RegisterDef::new("gen_frequency", 42, 16, HWF, false, Scale::Div100, ALL, Category::GridBoss),
    RegisterDef::new("ups_l1_power", 68, 16, HWF, true, Scale::None, ALL, Category::GridBoss),
    RegisterDef::new("ups_l2_power", 69, 16, HWF, true, Scale::None, ALL, Category::GridBoss),
    RegisterDef::new(
        "smart_port_1_power_l1",
        108,
        16,
        HWF,
        true,
        Scale::None,
        ALL,
        Category::GridBoss,
    ),
    RegisterDef::new(
        "smart_port_1_power_l2",
        109,
        16,
        HWF,
        true,
        Scale::None,
        ALL,
        Category::GridBoss,
    ),
    RegisterDef::new(
        "load_energy_today",
        128,
        32,
        HWF,
        false,
        Scale::Div10,
        ALL,
        Category::Energy,
    ),
];

/// Smart port operating mode as packed two-bits-per-port over Modbus.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SmartPortMode {
    Off,
    SmartLoad,
    AcCouple,
}

impl SmartPortMode {
    pub fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            1 => SmartPortMode::SmartLoad,
            2 => SmartPortMode::AcCouple,
            _ => SmartPortMode::Off,
        }
    }

    /// Unpacks all four ports from the single packed holding register.
    pub fn unpack_all(register: u16) -> [SmartPortMode; 4] {
        [
            Self::from_bits(register),
            Self::from_bits(register >> 2),
            Self::from_bits(register >> 4),
            Self::from_bits(register >> 6),
        ]
    }
}
