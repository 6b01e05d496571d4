use serde_json::Value;

use crate::catalog::inverter_input as cat;
use crate::catalog::register::ModelFamily;
use crate::reader::{read_scaled, sum_optional};
use crate::snapshot::RegisterSnapshot;

/// Daily and lifetime kWh counters. Daily counters reset at local midnight
/// on the device; lifetime counters are validated for monotonicity by
/// `validate::energy`, not by this type (energy counters have no static
/// physical bounds, so `is_corrupt` is always `false` here).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InverterEnergyData {
    pub pv_energy_today: Option<f64>,
    pub pv_energy_total: Option<f64>,
    pub charge_energy_today: Option<f64>,
    pub charge_energy_total: Option<f64>,
    pub discharge_energy_today: Option<f64>,
    pub discharge_energy_total: Option<f64>,
    pub grid_import_today: Option<f64>,
    pub grid_import_total: Option<f64>,
    pub grid_export_today: Option<f64>,
    pub grid_export_total: Option<f64>,
    pub load_energy_today: Option<f64>,
    pub load_energy_total: Option<f64>,
    pub inverter_energy_today: Option<f64>,
    pub inverter_energy_total: Option<f64>,
    pub eps_energy_today: Option<f64>,
    pub eps_energy_total: Option<f64>,
    pub generator_energy_today: Option<f64>,
    pub generator_energy_total: Option<f64>,
}

/// The exact set of fields subject to lifetime monotonicity, named
/// identically to the struct fields above so `validate::energy` can look
/// them up generically.
pub const MONOTONE_LIFETIME_FIELDS: &[&str] = &[
    "pv_energy_total",
    "charge_energy_total",
    "discharge_energy_total",
    "grid_import_total",
    "grid_export_total",
    "load_energy_total",
    "inverter_energy_total",
    "eps_energy_total",
];

impl InverterEnergyData {
    pub fn lifetime_field(&self, name: &str) -> Option<f64> {
        match name {
            "pv_energy_total" => self.pv_energy_total,
            "charge_energy_total" => self.charge_energy_total,
            "discharge_energy_total" => self.discharge_energy_total,
            "grid_import_total" => self.grid_import_total,
            "grid_export_total" => self.grid_export_total,
            "load_energy_total" => self.load_energy_total,
            "inverter_energy_total" => self.inverter_energy_total,
            "eps_energy_total" => self.eps_energy_total,
            _ => None,
        }
    }

    /// Builds from a runtime-input register snapshot: per-string PV
    /// daily/lifetime counters are summed into `pv_energy_today`/
    /// `pv_energy_total`, mirroring `InverterRuntimeData`'s
    /// `pv_total_power` aggregation. `load_energy_*` and
    /// `generator_energy_*` have no register mapping and stay `None` here;
    /// only `from_http_response` can populate them.
    pub fn from_modbus_registers(snapshot: &RegisterSnapshot, family: ModelFamily) -> Self {
        let reg = |name: &str| cat::register_for_family(name, family);
        let scaled = |name: &str| reg(name).and_then(|r| read_scaled(snapshot, r));

        let pv_energy_today = sum_optional(&[
            scaled("pv1_energy_today"),
            scaled("pv2_energy_today"),
            scaled("pv3_energy_today"),
        ]);
        let pv_energy_total = sum_optional(&[
            scaled("pv1_energy_total"),
            scaled("pv2_energy_total"),
            scaled("pv3_energy_total"),
        ]);

        Self {
            pv_energy_today,
            pv_energy_total,
            charge_energy_today: scaled("charge_energy_today"),
            charge_energy_total: scaled("charge_energy_total"),
            discharge_energy_today: scaled("discharge_energy_today"),
            discharge_energy_total: scaled("discharge_energy_total"),
            grid_import_today: scaled("grid_import_energy_today"),
            grid_import_total: scaled("grid_import_energy_total"),
            grid_export_today: scaled("grid_export_energy_today"),
            grid_export_total: scaled("grid_export_energy_total"),
            load_energy_today: None,
            load_energy_total: None,
            inverter_energy_today: scaled("inverter_energy_today"),
            inverter_energy_total: scaled("inverter_energy_total"),
            eps_energy_today: scaled("eps_energy_today"),
            eps_energy_total: scaled("eps_energy_total"),
            generator_energy_today: None,
            generator_energy_total: None,
        }
    }

    /// Cloud JSON energy fields are all pre-scaled ÷10 (vendor reports 0.1
    /// kWh units).
    pub fn from_http_response(json: &Value) -> Self {
        let div10 = |key: &str| json.get(key).and_then(Value::as_f64).map(|v| v / 10.0);
        Self {
            pv_energy_today: div10("todayYielding"),
            pv_energy_total: div10("totalYielding"),
            charge_energy_today: div10("todayCharging"),
            charge_energy_total: div10("totalCharging"),
            discharge_energy_today: div10("todayDischarging"),
            discharge_energy_total: div10("totalDischarging"),
            grid_import_today: div10("todayImport"),
            grid_import_total: div10("totalImport"),
            grid_export_today: div10("todayExport"),
            grid_export_total: div10("totalExport"),
            load_energy_today: div10("todayUsage"),
            load_energy_total: div10("totalUsage"),
            inverter_energy_today: None,
            inverter_energy_total: None,
            eps_energy_today: None,
            eps_energy_total: None,
            generator_energy_today: None,
            generator_energy_total: None,
        }
    }

    /// Energy counters have no static physical bounds; they are validated
    /// temporally by `validate::energy` instead.
    pub fn is_corrupt(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_corrupt_is_always_false() {
        let d = InverterEnergyData::default();
        assert!(!d.is_corrupt());
    }

    #[test]
    fn monotone_fields_lookup_matches_struct_fields() {
        let mut d = InverterEnergyData::default();
        d.pv_energy_total = Some(12.3);
        for name in MONOTONE_LIFETIME_FIELDS {
            let _ = d.lifetime_field(name);
        }
        assert_eq!(d.lifetime_field("pv_energy_total"), Some(12.3));
    }

    #[test]
    fn from_modbus_registers_sums_pv_strings_and_reads_lifetime_counters() {
        let mut s = RegisterSnapshot::new();
        s.insert(28, 10); // pv1_energy_today = 1.0
        s.insert(29, 20); // pv2_energy_today = 2.0
        s.insert(30, 0);
        s.insert(40, 1000); // pv1_energy_total lo
        s.insert(41, 0); // pv1_energy_total hi
        s.insert(50, 55); // charge_energy_total lo = 5.5
        s.insert(51, 0);

        let d = InverterEnergyData::from_modbus_registers(&s, ModelFamily::Eg4Hybrid);
        assert_eq!(d.pv_energy_today, Some(3.0));
        assert_eq!(d.pv_energy_total, Some(100.0));
        assert_eq!(d.charge_energy_total, Some(5.5));
        assert_eq!(d.load_energy_today, None);
    }
}
