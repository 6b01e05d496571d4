use super::register::{Category, ModelFamily, RegisterDef, RegisterGroup, Scale, WordOrder};

const HWF: WordOrder = WordOrder::HighWordFirst;
const ALL: &[ModelFamily] = &[];

/// The three concurrent ranges the parameter reader splits a full holding
/// dump into, each at or under the 127-register safe limit.
pub const HOLDING_READ_RANGES: &[RegisterGroup] = &[
    RegisterGroup::new(0, 127),
    RegisterGroup::new(127, 127),
    RegisterGroup::new(240, 127),
];

/// Holding (parameter, read+write) register definitions, grounded on the
/// source client's register map: addresses, scales and bounds as decoded
/// there for the EG4-hybrid family.
pub const HOLDING_REGISTERS: &[RegisterDef] = &[
    RegisterDef::new("language", 16, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new(
        "charge_power_percent",
        64,
        16,
        HWF,
        false,
        Scale::None,
        ALL,
        Category::Runtime,
    ),
    RegisterDef::new(
        "ac_charge_soc_limit",
        67,
        16,
        HWF,
        false,
        Scale::None,
        ALL,
        Category::Runtime,
    ),
    RegisterDef::new(
        "charge_voltage_ref",
        99,
        16,
        HWF,
        false,
        Scale::Div10,
        ALL,
        Category::Runtime,
    ),
    RegisterDef::new(
        "discharge_cutoff_voltage",
        100,
        16,
        HWF,
        false,
        Scale::Div10,
        ALL,
        Category::Runtime,
    ),
    RegisterDef::new("system_type", 112, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("eod_soc", 105, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("battery_capacity", 147, 16, HWF, false, Scale::None, ALL, Category::Battery),
    RegisterDef::new(
        "ac_charge_start_soc",
        160,
        16,
        HWF,
        false,
        Scale::None,
        ALL,
        Category::Runtime,
    ),
    RegisterDef::new(
        "ac_charge_end_soc",
        161,
        16,
        HWF,
        false,
        Scale::None,
        ALL,
        Category::Runtime,
    ),
    RegisterDef::new(
        "max_grid_input_power",
        176,
        16,
        HWF,
        false,
        Scale::None,
        ALL,
        Category::Runtime,
    ),
    RegisterDef::new("gen_rated_power", 177, 16, HWF, false, Scale::None, ALL, Category::Runtime),
];

/// Valid [min, max] bounds for the subset of parameters this crate
/// validates on write, keyed by canonical name.
pub fn valid_range(name: &str) -> Option<(f64, f64)> {
    match name {
        "charge_power_percent" => Some((0.0, 100.0)),
        "ac_charge_soc_limit" => Some((0.0, 100.0)),
        "charge_voltage_ref" => Some((50.0, 59.0)),
        "discharge_cutoff_voltage" => Some((40.0, 50.0)),
        "battery_capacity" => Some((0.0, 10000.0)),
        "eod_soc" => Some((10.0, 90.0)),
        "ac_charge_start_soc" => Some((0.0, 90.0)),
        "ac_charge_end_soc" => Some((20.0, 100.0)),
        _ => None,
    }
}

/// Time-schedule registers must be written one register at a time via
/// function 0x06 — the device rejects a function-0x10 batch write across
/// them.
pub fn is_schedule_register(address: u16) -> bool {
    matches!(address, 68..=87 | 172..=175)
}

pub fn register(name: &str) -> Option<&'static RegisterDef> {
    HOLDING_REGISTERS.iter().find(|r| r.name == name)
}
