use serde_json::Value;

use crate::catalog::inverter_input as cat;
use crate::catalog::register::ModelFamily;
use crate::reader::{clamp_percentage, read_scaled, unpack_parallel_config};
use crate::snapshot::RegisterSnapshot;
use crate::unixtime::UnixTime;

/// Decoded, uniformly scaled runtime telemetry for an inverter. Every
/// field is `None` when the originating register wasn't read or isn't
/// present for the device's model family; a reading of zero is always a
/// real zero, never a stand-in for "unavailable".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InverterRuntimeData {
    pub v_pv_1: Option<f64>,
    pub v_pv_2: Option<f64>,
    pub v_pv_3: Option<f64>,
    pub p_pv_1: Option<f64>,
    pub p_pv_2: Option<f64>,
    pub p_pv_3: Option<f64>,
    pub pv_total_power: Option<f64>,

    pub v_bat: Option<f64>,
    pub soc: Option<u8>,
    pub soh: Option<u8>,
    pub p_charge: Option<f64>,
    pub p_discharge: Option<f64>,
    pub t_bat: Option<f64>,

    pub grid_l1_voltage: Option<f64>,
    pub grid_l2_voltage: Option<f64>,
    pub v_ac_r: Option<f64>,
    pub v_ac_s: Option<f64>,
    pub v_ac_t: Option<f64>,
    pub grid_frequency: Option<f64>,

    pub inverter_power: Option<f64>,
    pub load_power: Option<f64>,
    pub power_from_grid: Option<f64>,

    pub eps_voltage_r: Option<f64>,
    pub eps_voltage_s: Option<f64>,
    pub eps_voltage_t: Option<f64>,
    pub eps_frequency: Option<f64>,
    pub eps_power: Option<f64>,

    pub v_bus_1: Option<f64>,
    pub v_bus_2: Option<f64>,
    pub t_inner: Option<f64>,
    pub t_radiator_1: Option<f64>,
    pub t_radiator_2: Option<f64>,

    pub fault_code: Option<u16>,
    pub warning_code: Option<u16>,
    pub bms_fault_code: Option<u16>,
    pub bms_warning_code: Option<u16>,
    pub max_cell_voltage: Option<f64>,
    pub min_cell_voltage: Option<f64>,
    pub max_cell_temp: Option<f64>,
    pub min_cell_temp: Option<f64>,
    pub bms_cycle_count: Option<u32>,

    pub parallel_master_slave: Option<u8>,
    pub parallel_phase: Option<u8>,
    pub parallel_unit_id: Option<u8>,

    pub gen_power: Option<f64>,
    pub gen_voltage: Option<f64>,
    pub gen_frequency: Option<f64>,

    /// Cloud-only: derived from the device-data sub-document, used to
    /// distinguish an intentional off-grid 0 Hz reading from corruption.
    pub off_grid: Option<bool>,

    pub timestamp: Option<UnixTime>,

    /// Pre-clamp SoC/SoH, retained for corruption checks even after the
    /// public `soc`/`soh` fields have been clamped into [0, 100].
    pub raw_soc: u32,
    pub raw_soh: u32,
}

impl InverterRuntimeData {
    pub fn from_modbus_registers(snapshot: &RegisterSnapshot, family: ModelFamily) -> Self {
        let reg = |name: &str| cat::register_for_family(name, family);
        let scaled = |name: &str| reg(name).and_then(|r| read_scaled(snapshot, r));

        let raw_soc_soh = snapshot.get(cat::register("soc_soh_packed").unwrap().address);
        let (raw_soc, raw_soh) = match raw_soc_soh {
            Some(packed) => ((packed & 0xFF) as u32, (packed >> 8) as u32),
            None => (0, 0),
        };

        let parallel = snapshot
            .get(cat::register("parallel_config").unwrap().address)
            .map(unpack_parallel_config);

        let pv_total_power = crate::reader::sum_optional(&[scaled("p_pv_1"), scaled("p_pv_2"), scaled("p_pv_3")]);

        Self {
            v_pv_1: scaled("v_pv_1"),
            v_pv_2: scaled("v_pv_2"),
            v_pv_3: scaled("v_pv_3"),
            p_pv_1: scaled("p_pv_1"),
            p_pv_2: scaled("p_pv_2"),
            p_pv_3: scaled("p_pv_3"),
            pv_total_power,

            v_bat: scaled("v_bat"),
            soc: Some(clamp_percentage(raw_soc as f64, "soc") as u8),
            soh: Some(clamp_percentage(raw_soh as f64, "soh") as u8),
            p_charge: scaled("p_charge"),
            p_discharge: scaled("p_discharge"),
            t_bat: scaled("t_bat"),

            grid_l1_voltage: scaled("grid_l1_voltage"),
            grid_l2_voltage: scaled("grid_l2_voltage"),
            v_ac_r: scaled("v_ac_r"),
            v_ac_s: scaled("v_ac_s"),
            v_ac_t: scaled("v_ac_t"),
            grid_frequency: scaled("f_ac"),

            inverter_power: scaled("inverter_power"),
            // power_to_user register serves both load_power and
            // power_from_grid, per the source client's field mapping.
            load_power: scaled("p_to_user"),
            power_from_grid: scaled("p_to_user"),

            eps_voltage_r: scaled("v_eps_r"),
            eps_voltage_s: scaled("v_eps_s"),
            eps_voltage_t: scaled("v_eps_t"),
            eps_frequency: scaled("f_eps"),
            eps_power: scaled("p_eps"),

            v_bus_1: scaled("v_bus_1"),
            v_bus_2: scaled("v_bus_2"),
            t_inner: scaled("t_inner"),
            t_radiator_1: scaled("t_radiator_1"),
            t_radiator_2: scaled("t_radiator_2"),

            fault_code: scaled("fault_code").map(|v| v as u16),
            warning_code: scaled("warning_code").map(|v| v as u16),
            bms_fault_code: scaled("bms_fault_code").map(|v| v as u16),
            bms_warning_code: scaled("bms_warning_code").map(|v| v as u16),
            max_cell_voltage: scaled("max_cell_voltage"),
            min_cell_voltage: scaled("min_cell_voltage"),
            max_cell_temp: scaled("max_cell_temp"),
            min_cell_temp: scaled("min_cell_temp"),
            bms_cycle_count: scaled("bms_cycle_count").map(|v| v as u32),

            parallel_master_slave: parallel.map(|p| p.master_slave),
            parallel_phase: parallel.map(|p| p.phase),
            parallel_unit_id: parallel.map(|p| p.unit_id),

            gen_power: scaled("p_gen"),
            gen_voltage: scaled("v_gen"),
            gen_frequency: scaled("f_gen"),

            off_grid: None,
            timestamp: snapshot.taken_at,
            raw_soc,
            raw_soh,
        }
    }

    /// Cloud JSON fields are pre-scaled by the vendor API except voltages
    /// (÷10) and AC frequency (÷100); powers are already in watts.
    pub fn from_http_response(json: &Value) -> Self {
        let f = |key: &str| json.get(key).and_then(Value::as_f64);
        let div10 = |key: &str| f(key).map(|v| v / 10.0);
        let div100 = |key: &str| f(key).map(|v| v / 100.0);

        let raw_soc = json.get("soc").and_then(Value::as_u64).unwrap_or(0) as u32;
        let raw_soh = json.get("soh").and_then(Value::as_u64).unwrap_or(100) as u32;

        Self {
            v_pv_1: div10("vpv1"),
            v_pv_2: div10("vpv2"),
            v_pv_3: div10("vpv3"),
            p_pv_1: f("ppv1"),
            p_pv_2: f("ppv2"),
            p_pv_3: f("ppv3"),
            pv_total_power: f("ppv"),

            v_bat: div10("vBat"),
            soc: Some(clamp_percentage(raw_soc as f64, "soc") as u8),
            soh: Some(clamp_percentage(raw_soh as f64, "soh") as u8),
            p_charge: f("pCharge"),
            p_discharge: f("pDisCharge"),
            t_bat: f("tBat"),

            grid_l1_voltage: None,
            grid_l2_voltage: None,
            v_ac_r: div10("vacr"),
            v_ac_s: div10("vacs"),
            v_ac_t: div10("vact"),
            grid_frequency: div100("fac"),

            inverter_power: f("pinv"),
            load_power: f("pToUser"),
            power_from_grid: f("pToUser"),

            eps_voltage_r: div10("vepsr"),
            eps_voltage_s: div10("vepss"),
            eps_voltage_t: div10("vepst"),
            eps_frequency: div100("feps"),
            eps_power: f("peps"),

            v_bus_1: div10("vBus1"),
            v_bus_2: div10("vBus2"),
            t_inner: f("tinner"),
            t_radiator_1: f("tradiator1"),
            t_radiator_2: f("tradiator2"),

            fault_code: None,
            warning_code: None,
            bms_fault_code: None,
            bms_warning_code: None,
            max_cell_voltage: None,
            min_cell_voltage: None,
            max_cell_temp: None,
            min_cell_temp: None,
            bms_cycle_count: None,

            parallel_master_slave: None,
            parallel_phase: None,
            parallel_unit_id: None,

            gen_power: None,
            gen_voltage: None,
            gen_frequency: None,

            off_grid: json
                .get("deviceData")
                .and_then(|d| d.get("offGrid"))
                .and_then(Value::as_bool),
            timestamp: Some(UnixTime::now()),
            raw_soc,
            raw_soh,
        }
    }

    /// Corruption canary. `max_power_watts` is `rated_power_kw * 2000`; a
    /// value of `0` disables every power-exceeds check (unknown rated
    /// power at startup).
    pub fn is_corrupt(&self, max_power_watts: f64) -> bool {
        if self.raw_soc > 100 || self.raw_soh > 100 {
            return true;
        }
        if let Some(freq) = self.grid_frequency {
            if freq != 0.0 && !(30.0..=90.0).contains(&freq) {
                return true;
            }
        }
        if max_power_watts > 0.0 {
            let powers = [
                self.pv_total_power,
                self.p_charge,
                self.p_discharge,
                self.inverter_power,
                self.eps_power,
            ];
            if powers.iter().flatten().any(|p| p.abs() > max_power_watts) {
                return true;
            }
        }
        for leg in [self.grid_l1_voltage, self.grid_l2_voltage, self.v_ac_r] {
            if let Some(v) = leg {
                if v > 0.0 && !(50.0..=300.0).contains(&v) {
                    return true;
                }
            }
        }
        false
    }

    pub fn fault_messages(&self) -> Vec<&'static str> {
        decode_bitfield(self.fault_code.unwrap_or(0), FAULT_BITS)
    }

    pub fn warning_messages(&self) -> Vec<&'static str> {
        decode_bitfield(self.warning_code.unwrap_or(0), WARNING_BITS)
    }
}

/// Human-readable fault/warning text for a handful of well-known bits,
/// supplementing the raw codes with the convenience the source client's
/// runtime-properties mixin exposes.
const FAULT_BITS: &[(u16, &'static str)] = &[
    (1 << 0, "Grid overvoltage"),
    (1 << 1, "Grid undervoltage"),
    (1 << 2, "Grid overfrequency"),
    (1 << 3, "Grid underfrequency"),
    (1 << 4, "Over temperature"),
    (1 << 5, "Battery overvoltage"),
    (1 << 6, "Battery undervoltage"),
];

const WARNING_BITS: &[(u16, &'static str)] = &[
    (1 << 0, "Fan failure"),
    (1 << 1, "Grid unbalanced"),
    (1 << 2, "Battery communication loss"),
    (1 << 3, "EEPROM failure"),
];

fn decode_bitfield(code: u16, table: &[(u16, &'static str)]) -> Vec<&'static str> {
    table
        .iter()
        .filter(|(bit, _)| code & bit != 0)
        .map(|(_, msg)| *msg)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::register::ModelFamily;

    #[test]
    fn canary_triggers_on_raw_soc_over_100() {
        let mut d = InverterRuntimeData::default();
        d.raw_soc = 101;
        assert!(d.is_corrupt(0.0));
    }

    #[test]
    fn canary_passes_off_grid_zero_frequency() {
        let mut d = InverterRuntimeData::default();
        d.grid_frequency = Some(0.0);
        assert!(!d.is_corrupt(32_000.0));
    }

    #[test]
    fn canary_triggers_on_power_exceeding_rated() {
        let mut d = InverterRuntimeData::default();
        d.inverter_power = Some(4_294_967_295.0);
        assert!(d.is_corrupt(32_000.0));
    }

    #[test]
    fn canary_disabled_power_check_when_max_power_zero() {
        let mut d = InverterRuntimeData::default();
        d.inverter_power = Some(999_999.0);
        assert!(!d.is_corrupt(0.0));
    }

    #[test]
    fn lxp_eu_reads_inverter_power_as_16bit_at_the_family_offset() {
        let mut hybrid = RegisterSnapshot::new();
        hybrid.insert(20, 0x0001);
        hybrid.insert(21, 0x2C00);
        let hybrid_data = InverterRuntimeData::from_modbus_registers(&hybrid, ModelFamily::Eg4Hybrid);
        assert_eq!(hybrid_data.inverter_power, Some(76288.0));

        let mut lxp = RegisterSnapshot::new();
        lxp.insert(120, 5000);
        let lxp_data = InverterRuntimeData::from_modbus_registers(&lxp, ModelFamily::LxpEu);
        assert_eq!(lxp_data.inverter_power, Some(5000.0));

        // The hybrid-family 32-bit register is absent from this snapshot, so
        // an LXP_EU read never picks it up even though the name matches.
        assert_eq!(
            InverterRuntimeData::from_modbus_registers(&lxp, ModelFamily::Eg4Hybrid).inverter_power,
            None
        );
    }

    #[test]
    fn from_modbus_registers_decodes_bms_cell_and_cycle_registers() {
        let mut s = RegisterSnapshot::new();
        s.insert(99, 7); // bms_fault_code
        s.insert(100, 3); // bms_warning_code
        s.insert(101, 3350); // max_cell_voltage = 3.350 V
        s.insert(102, 3290); // min_cell_voltage = 3.290 V
        s.insert(103, 250); // max_cell_temp = 25.0 C
        s.insert(104, 180); // min_cell_temp = 18.0 C
        s.insert(106, 42); // bms_cycle_count
        let data = InverterRuntimeData::from_modbus_registers(&s, ModelFamily::Eg4Hybrid);
        assert_eq!(data.bms_fault_code, Some(7));
        assert_eq!(data.bms_warning_code, Some(3));
        assert_eq!(data.max_cell_voltage, Some(3.35));
        assert_eq!(data.min_cell_voltage, Some(3.29));
        assert_eq!(data.max_cell_temp, Some(25.0));
        assert_eq!(data.min_cell_temp, Some(18.0));
        assert_eq!(data.bms_cycle_count, Some(42));
    }

    #[test]
    fn from_modbus_registers_decodes_split_phase_voltages() {
        let mut s = RegisterSnapshot::new();
        s.insert(140, 1205);
        s.insert(141, 1207);
        let data = InverterRuntimeData::from_modbus_registers(&s, ModelFamily::Eg4Hybrid);
        assert_eq!(data.grid_l1_voltage, Some(120.5));
        assert_eq!(data.grid_l2_voltage, Some(120.7));
    }
}
