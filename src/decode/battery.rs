/// Per-module battery telemetry, decoded either from the atomic rotation
/// probe (`probe::parse_slot`) or from the cloud JSON battery list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatteryData {
    pub index: u8,
    pub serial: Option<String>,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub soc: u8,
    pub soh: u8,
    pub temperature: Option<f64>,
    pub max_capacity_ah: Option<f64>,
    pub current_capacity_ah: Option<f64>,
    pub cycle_count: Option<u32>,
    pub min_cell_voltage: Option<f64>,
    pub max_cell_voltage: Option<f64>,
    pub min_cell_voltage_ordinal: Option<u8>,
    pub max_cell_voltage_ordinal: Option<u8>,
    pub min_cell_temperature: Option<f64>,
    pub max_cell_temperature: Option<f64>,
    pub charge_current_limit: Option<f64>,
    pub discharge_current_limit: Option<f64>,
    pub charge_voltage_ref: Option<f64>,
    pub discharge_cutoff_voltage: Option<f64>,
    pub status: Option<u16>,
    pub fault_code: Option<u16>,
    pub warning_code: Option<u16>,
    pub firmware_version: Option<(u8, u8)>,

    /// Pre-clamp values, retained for corruption detection.
    pub raw_soc: u32,
    pub raw_soh: u32,
}

impl BatteryData {
    pub fn power_watts(&self) -> Option<f64> {
        Some(self.voltage? * self.current?)
    }

    pub fn cell_voltage_delta(&self) -> Option<f64> {
        Some(self.max_cell_voltage? - self.min_cell_voltage?)
    }

    pub fn cell_temperature_delta(&self) -> Option<f64> {
        Some(self.max_cell_temperature? - self.min_cell_temperature?)
    }

    pub fn remaining_ah(&self) -> Option<f64> {
        self.current_capacity_ah
    }

    /// A present module (nonzero voltage or SoC) that nonetheless fails
    /// these bounds is treated as corrupt and the bank-level canary keeps
    /// the previous snapshot.
    pub fn is_corrupt(&self) -> bool {
        if self.raw_soc > 100 || self.raw_soh > 100 {
            return true;
        }
        if let Some(v) = self.voltage {
            if v > 100.0 {
                return true;
            }
        }
        for cell_v in [self.min_cell_voltage, self.max_cell_voltage] {
            if let Some(v) = cell_v {
                if v != 0.0 && !(1.0..=5.0).contains(&v) {
                    return true;
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_cell_voltage, self.max_cell_voltage) {
            if min != 0.0 && max != 0.0 && min > max {
                return true;
            }
        }
        false
    }

    pub fn is_present(&self) -> bool {
        self.voltage.map(|v| v > 0.0).unwrap_or(false) || self.soc > 0
    }
}

/// Aggregate bank view over every installed module.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatteryBankData {
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub soc: Option<u8>,
    pub soh: Option<u8>,
    pub temperature: Option<f64>,
    pub charge_power: Option<f64>,
    pub discharge_power: Option<f64>,
    pub max_capacity_ah: Option<f64>,
    pub current_capacity_ah: Option<f64>,
    pub status: BatteryBankStatus,
    pub fault_code: Option<u16>,
    pub warning_code: Option<u16>,
    pub battery_count: u8,
    pub batteries: Vec<BatteryData>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BatteryBankStatus {
    #[default]
    Idle,
    Charging,
    Discharging,
    StandBy,
}

impl std::fmt::Display for BatteryBankStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatteryBankStatus::Idle => "Idle",
            BatteryBankStatus::Charging => "Charging",
            BatteryBankStatus::Discharging => "Discharging",
            BatteryBankStatus::StandBy => "StandBy",
        };
        write!(f, "{}", s)
    }
}

impl BatteryBankData {
    /// Bank-level canary: current magnitude, battery-count sanity, and
    /// every *present* module's own corruption check.
    pub fn is_corrupt(&self) -> bool {
        if let Some(current) = self.current {
            if current.abs() > 500.0 {
                return true;
            }
        }
        if self.battery_count > 20 {
            return true;
        }
        self.batteries.iter().any(|b| b.is_present() && b.is_corrupt())
    }

    /// Falls back to the observed module count, or 4, when the
    /// battery-count register itself reads zero despite a present bank —
    /// a known CAN-bus BMS communication failure mode on some models.
    pub fn effective_battery_count(&self) -> u8 {
        if self.battery_count > 0 {
            self.battery_count
        } else if !self.batteries.is_empty() {
            self.batteries.len() as u8
        } else {
            4
        }
    }

    pub fn soc_delta(&self) -> Option<u8> {
        let socs: Vec<u8> = self.batteries.iter().map(|b| b.soc).collect();
        spread(&socs)
    }

    pub fn soh_delta(&self) -> Option<u8> {
        let sohs: Vec<u8> = self.batteries.iter().map(|b| b.soh).collect();
        spread(&sohs)
    }

    pub fn voltage_delta(&self) -> Option<f64> {
        let voltages: Vec<f64> = self.batteries.iter().filter_map(|b| b.voltage).collect();
        spread_f64(&voltages)
    }

    pub fn worst_cell_imbalance(&self) -> Option<f64> {
        self.batteries
            .iter()
            .filter_map(|b| b.cell_voltage_delta())
            .fold(None, |acc, d| Some(acc.map_or(d, |a: f64| a.max(d))))
    }

    pub fn temperature_spread(&self) -> Option<f64> {
        let temps: Vec<f64> = self.batteries.iter().filter_map(|b| b.temperature).collect();
        spread_f64(&temps)
    }
}

fn spread(values: &[u8]) -> Option<u8> {
    let max = *values.iter().max()?;
    let min = *values.iter().min()?;
    Some(max - min)
}

fn spread_f64(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    Some(max - min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_on_raw_soc_over_100() {
        let mut b = BatteryData::default();
        b.raw_soc = 101;
        assert!(b.is_corrupt());
    }

    #[test]
    fn corrupt_on_cell_voltage_inversion() {
        let mut b = BatteryData::default();
        b.min_cell_voltage = Some(3.6);
        b.max_cell_voltage = Some(3.2);
        assert!(b.is_corrupt());
    }

    #[test]
    fn zero_cell_voltage_is_treated_as_no_data() {
        let mut b = BatteryData::default();
        b.min_cell_voltage = Some(0.0);
        b.max_cell_voltage = Some(0.0);
        assert!(!b.is_corrupt());
    }

    #[test]
    fn bank_canary_checks_every_present_module() {
        let mut corrupt_module = BatteryData::default();
        corrupt_module.voltage = Some(50.0);
        corrupt_module.raw_soh = 150;
        let bank = BatteryBankData {
            batteries: vec![corrupt_module],
            ..Default::default()
        };
        assert!(bank.is_corrupt());
    }

    #[test]
    fn bank_canary_ignores_absent_modules() {
        let absent = BatteryData::default();
        let bank = BatteryBankData {
            batteries: vec![absent],
            ..Default::default()
        };
        assert!(!bank.is_corrupt());
    }

    #[test]
    fn effective_battery_count_falls_back_to_module_list() {
        let bank = BatteryBankData {
            battery_count: 0,
            batteries: vec![BatteryData::default(); 3],
            ..Default::default()
        };
        assert_eq!(bank.effective_battery_count(), 3);
    }
}
