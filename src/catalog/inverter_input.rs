use super::register::{Category, ModelFamily, RegisterDef, RegisterGroup, Scale, WordOrder};

const HWF: WordOrder = WordOrder::HighWordFirst;
const LWF: WordOrder = WordOrder::LowWordFirst;
const ALL: &[ModelFamily] = &[];
const HYBRID_OFFGRID: &[ModelFamily] = &[ModelFamily::Eg4Hybrid, ModelFamily::Eg4OffGrid];
const LXP_EU: &[ModelFamily] = &[ModelFamily::LxpEu];

/// Contiguous read windows for the inverter input (runtime) registers,
/// each sized to fit the 40-register safe portable limit.
pub const INPUT_GROUPS: &[RegisterGroup] = &[
    RegisterGroup::new(0, 32),
    RegisterGroup::new(32, 32),
    RegisterGroup::new(64, 16),
    RegisterGroup::supplementary(80, 33),
    RegisterGroup::new(113, 18),
    RegisterGroup::new(140, 3),
    RegisterGroup::new(170, 6),
    RegisterGroup::new(193, 4),
];

/// Runtime (input) register definitions. Not exhaustive of the device's
/// full register set, but covers every field category `InverterRuntimeData`
/// exposes.
pub const INPUT_REGISTERS: &[RegisterDef] = &[
    RegisterDef::new("status", 0, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("v_pv_1", 1, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("v_pv_2", 2, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("v_pv_3", 3, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("v_bat", 4, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("soc_soh_packed", 5, 16, HWF, false, Scale::None, ALL, Category::Packed),
    RegisterDef::new("internal_fault", 6, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("p_pv_1", 7, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("p_pv_2", 8, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("p_pv_3", 9, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("p_charge", 10, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("p_discharge", 11, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("v_ac_r", 12, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("v_ac_s", 13, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("v_ac_t", 14, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("f_ac", 15, 16, HWF, false, Scale::Div100, ALL, Category::Runtime),
    RegisterDef::new("p_inv", 16, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("p_rec", 17, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("p_to_user", 18, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("p_to_grid", 19, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    // LXP_EU reads this as a 16-bit value at a 4-register offset instead of
    // the hybrid/off-grid family's 32-bit register.
    RegisterDef::new("inverter_power", 20, 32, HWF, false, Scale::None, HYBRID_OFFGRID, Category::Runtime),
    RegisterDef::new("inverter_power", 120, 16, HWF, false, Scale::None, LXP_EU, Category::Runtime),
    RegisterDef::new("t_inner", 22, 16, HWF, true, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("t_radiator_1", 23, 16, HWF, true, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("t_radiator_2", 24, 16, HWF, true, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("t_bat", 25, 16, HWF, true, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("runtime", 26, 32, LWF, false, Scale::None, ALL, Category::Runtime),

    // Daily energy counters (Epv1_day..Etouser_day), 16-bit, 0.1 kWh units.
    RegisterDef::new("pv1_energy_today", 28, 16, HWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("pv2_energy_today", 29, 16, HWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("pv3_energy_today", 30, 16, HWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("inverter_energy_today", 31, 16, HWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new(
        "ac_charge_rectified_energy_today",
        32,
        16,
        HWF,
        false,
        Scale::Div10,
        ALL,
        Category::Energy,
    ),
    RegisterDef::new("charge_energy_today", 33, 16, HWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("discharge_energy_today", 34, 16, HWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("eps_energy_today", 35, 16, HWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("grid_export_energy_today", 36, 16, HWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("grid_import_energy_today", 37, 16, HWF, false, Scale::Div10, ALL, Category::Energy),

    // Lifetime energy counters (Epv1_all..Etouser_all), 32-bit low-word-first pairs, 0.1 kWh units.
    RegisterDef::new("pv1_energy_total", 40, 32, LWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("pv2_energy_total", 42, 32, LWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("pv3_energy_total", 44, 32, LWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("inverter_energy_total", 46, 32, LWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new(
        "ac_charge_rectified_energy_total",
        48,
        32,
        LWF,
        false,
        Scale::Div10,
        ALL,
        Category::Energy,
    ),
    RegisterDef::new("charge_energy_total", 50, 32, LWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("discharge_energy_total", 52, 32, LWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("eps_energy_total", 54, 32, LWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("grid_export_energy_total", 56, 32, LWF, false, Scale::Div10, ALL, Category::Energy),
    RegisterDef::new("grid_import_energy_total", 58, 32, LWF, false, Scale::Div10, ALL, Category::Energy),

    RegisterDef::new("p_gen", 64, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("v_gen", 65, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("f_gen", 66, 16, HWF, false, Scale::Div100, ALL, Category::Runtime),
    RegisterDef::new("v_eps_r", 67, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("v_eps_s", 68, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("v_eps_t", 69, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("f_eps", 70, 16, HWF, false, Scale::Div100, ALL, Category::Runtime),
    RegisterDef::new("p_eps", 71, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("s_eps", 72, 16, HWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("bat_count", 96, 16, HWF, false, Scale::None, ALL, Category::Battery),
    RegisterDef::new("fault_code", 60, 32, LWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("warning_code", 62, 32, LWF, false, Scale::None, ALL, Category::Runtime),
    RegisterDef::new("bms_fault_code", 99, 16, HWF, false, Scale::None, ALL, Category::Battery),
    RegisterDef::new("bms_warning_code", 100, 16, HWF, false, Scale::None, ALL, Category::Battery),
    RegisterDef::new("max_cell_voltage", 101, 16, HWF, false, Scale::Div1000, ALL, Category::Battery),
    RegisterDef::new("min_cell_voltage", 102, 16, HWF, false, Scale::Div1000, ALL, Category::Battery),
    RegisterDef::new("max_cell_temp", 103, 16, HWF, true, Scale::Div10, ALL, Category::Battery),
    RegisterDef::new("min_cell_temp", 104, 16, HWF, true, Scale::Div10, ALL, Category::Battery),
    RegisterDef::new("bms_cycle_count", 106, 16, HWF, false, Scale::None, ALL, Category::Battery),
    RegisterDef::new("parallel_config", 113, 16, HWF, false, Scale::None, ALL, Category::Packed),
    RegisterDef::new("v_bus_1", 117, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("v_bus_2", 118, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("grid_l1_voltage", 140, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("grid_l2_voltage", 141, 16, HWF, false, Scale::Div10, ALL, Category::Runtime),
    RegisterDef::new("pv1_power", 170, 32, HWF, false, Scale::None, HYBRID_OFFGRID, Category::Runtime),
    RegisterDef::new("pv1_power", 174, 16, HWF, false, Scale::None, LXP_EU, Category::Runtime),
    RegisterDef::new(
        "grid_import_today",
        193,
        16,
        HWF,
        false,
        Scale::Div10,
        ALL,
        Category::Energy,
    ),
];

/// Looks up a register by canonical name only. Ambiguous for the handful
/// of names with more than one model-family variant (`inverter_power`,
/// `pv1_power`); decoders that need family-correct dispatch should use
/// `register_for_family` instead.
pub fn register(name: &str) -> Option<&'static RegisterDef> {
    INPUT_REGISTERS.iter().find(|r| r.name == name)
}

/// Looks up a register by name, restricted to the variant that applies to
/// `family`. Families with no dedicated variant fall through to the
/// empty-family-set (`ALL`) default, same as `RegisterDef::applies_to`.
pub fn register_for_family(name: &str, family: ModelFamily) -> Option<&'static RegisterDef> {
    INPUT_REGISTERS.iter().find(|r| r.name == name && r.applies_to(family))
}
