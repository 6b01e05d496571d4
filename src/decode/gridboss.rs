use crate::catalog::gridboss_holding as cat;
use crate::catalog::gridboss_holding::SmartPortMode;
use crate::reader::read_scaled;
use crate::snapshot::RegisterSnapshot;
use crate::unixtime::UnixTime;

/// Decoded GridBOSS/MID runtime telemetry: three power rails (grid,
/// generator, UPS/load) plus four configurable smart ports, each either
/// a switched load or AC-coupled source depending on its operating mode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MidboxRuntimeData {
    pub grid_l1_voltage: Option<f64>,
    pub grid_l2_voltage: Option<f64>,
    pub grid_frequency: Option<f64>,
    pub load_l1_power: Option<f64>,
    pub load_l2_power: Option<f64>,

    pub gen_l1_voltage: Option<f64>,
    pub gen_l2_voltage: Option<f64>,
    pub gen_frequency: Option<f64>,

    pub ups_l1_power: Option<f64>,
    pub ups_l2_power: Option<f64>,

    pub smart_port_modes: [SmartPortMode; 4],
    pub smart_port_1_power_l1: Option<f64>,
    pub smart_port_1_power_l2: Option<f64>,

    pub load_energy_today: Option<f64>,

    pub timestamp: Option<UnixTime>,
}

impl MidboxRuntimeData {
    pub fn from_modbus_registers(snapshot: &RegisterSnapshot) -> Self {
        let reg = |name: &str| cat::GRIDBOSS_REGISTERS.iter().find(|r| r.name == name);
        let scaled = |name: &str| reg(name).and_then(|r| read_scaled(snapshot, r));

        let smart_port_modes = snapshot
            .get(cat::SMART_PORT_MODE_REGISTER)
            .map(SmartPortMode::unpack_all)
            .unwrap_or([SmartPortMode::Off; 4]);

        Self {
            grid_l1_voltage: scaled("grid_l1_voltage"),
            grid_l2_voltage: scaled("grid_l2_voltage"),
            grid_frequency: scaled("grid_frequency"),
            load_l1_power: scaled("load_l1_power"),
            load_l2_power: scaled("load_l2_power"),

            gen_l1_voltage: scaled("gen_l1_voltage"),
            gen_l2_voltage: scaled("gen_l2_voltage"),
            gen_frequency: scaled("gen_frequency"),

            ups_l1_power: scaled("ups_l1_power"),
            ups_l2_power: scaled("ups_l2_power"),

            smart_port_modes,
            smart_port_1_power_l1: scaled("smart_port_1_power_l1"),
            smart_port_1_power_l2: scaled("smart_port_1_power_l2"),

            load_energy_today: scaled("load_energy_today"),

            timestamp: snapshot.taken_at,
        }
    }

    pub fn total_load_power(&self) -> Option<f64> {
        crate::reader::sum_optional(&[self.load_l1_power, self.load_l2_power])
    }

    pub fn total_ups_power(&self) -> Option<f64> {
        crate::reader::sum_optional(&[self.ups_l1_power, self.ups_l2_power])
    }

    /// Same leg-voltage and frequency bounds as the inverter canary, since
    /// GridBOSS shares the same AC front end.
    pub fn is_corrupt(&self) -> bool {
        if let Some(freq) = self.grid_frequency {
            if freq != 0.0 && !(30.0..=90.0).contains(&freq) {
                return true;
            }
        }
        for leg in [self.grid_l1_voltage, self.grid_l2_voltage] {
            if let Some(v) = leg {
                if v != 0.0 && !(50.0..=300.0).contains(&v) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_split_phase_grid_voltages() {
        let mut s = RegisterSnapshot::new();
        s.insert(0, 1205);
        s.insert(1, 1207);
        let data = MidboxRuntimeData::from_modbus_registers(&s);
        assert_eq!(data.grid_l1_voltage, Some(120.5));
        assert_eq!(data.grid_l2_voltage, Some(120.7));
    }

    #[test]
    fn unpacks_smart_port_modes_from_packed_register() {
        let mut s = RegisterSnapshot::new();
        // port0=SmartLoad(01), port1=AcCouple(10), rest off
        s.insert(cat::SMART_PORT_MODE_REGISTER, 0b0000_0000_0000_1001);
        let data = MidboxRuntimeData::from_modbus_registers(&s);
        assert_eq!(data.smart_port_modes[0], SmartPortMode::SmartLoad);
        assert_eq!(data.smart_port_modes[1], SmartPortMode::AcCouple);
        assert_eq!(data.smart_port_modes[2], SmartPortMode::Off);
    }

    #[test]
    fn canary_triggers_on_out_of_band_grid_voltage() {
        let mut s = RegisterSnapshot::new();
        s.insert(0, 65535);
        let data = MidboxRuntimeData::from_modbus_registers(&s);
        assert!(data.is_corrupt());
    }

    #[test]
    fn canary_passes_zero_when_off_grid() {
        let mut s = RegisterSnapshot::new();
        s.insert(0, 0);
        s.insert(1, 0);
        s.insert(2, 0);
        let data = MidboxRuntimeData::from_modbus_registers(&s);
        assert!(!data.is_corrupt());
    }
}
