//! Temporal validation for lifetime energy counters, which have no static
//! physical bounds and so can't be canary-checked the way runtime data is.
//! Lifetime monotonicity is always active; daily bounds are always active.

use std::collections::HashMap;

use crate::decode::inverter_energy::{InverterEnergyData, MONOTONE_LIFETIME_FIELDS};

/// Consecutive-rejection escape threshold: after this many rejections in a
/// row for one device, the next snapshot is accepted unconditionally — the
/// device may have been serviced or reset and a permanently stuck cache is
/// worse than one bad sample.
pub const CONSECUTIVE_REJECTION_ESCAPE: u32 = 3;

/// Per-device state the caller keeps between validation calls: the last
/// accepted lifetime snapshot and the current rejection streak.
#[derive(Clone, Debug, Default)]
pub struct EnergyValidator {
    previous: Option<HashMap<&'static str, f64>>,
    consecutive_rejections: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

impl EnergyValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates lifetime monotonicity for every field in
    /// `MONOTONE_LIFETIME_FIELDS`, plus the daily absolute cap for every
    /// `*_today` field present. `rated_power_kw = 0.0` means unknown; the
    /// daily cap and max-delta checks are both scaled by it and so fall out
    /// to "always pass" rather than needing a special case.
    pub fn validate(
        &mut self,
        current: &InverterEnergyData,
        rated_power_kw: f64,
        elapsed_secs: Option<f64>,
    ) -> Verdict {
        if self.consecutive_rejections >= CONSECUTIVE_REJECTION_ESCAPE {
            self.accept(current, rated_power_kw);
            return Verdict::Accept;
        }

        if !self.daily_bounds_ok(current, rated_power_kw, elapsed_secs) {
            self.reject();
            return Verdict::Reject;
        }

        let max_delta = rated_power_kw * 1.5;
        if let Some(previous) = &self.previous {
            for name in MONOTONE_LIFETIME_FIELDS {
                let (prev, curr) = match (previous.get(name), current.lifetime_field(name)) {
                    (Some(p), Some(c)) => (*p, c),
                    _ => continue,
                };
                if curr < prev {
                    self.reject();
                    return Verdict::Reject;
                }
                if rated_power_kw > 0.0 && curr - prev > max_delta {
                    self.reject();
                    return Verdict::Reject;
                }
            }
        }

        self.accept(current, rated_power_kw);
        Verdict::Accept
    }

    fn daily_bounds_ok(&self, current: &InverterEnergyData, rated_power_kw: f64, elapsed_secs: Option<f64>) -> bool {
        if rated_power_kw <= 0.0 {
            return true;
        }
        let daily_cap = rated_power_kw * 24.0;
        let today_fields = [
            current.pv_energy_today,
            current.charge_energy_today,
            current.discharge_energy_today,
            current.grid_import_today,
            current.grid_export_today,
            current.load_energy_today,
            current.inverter_energy_today,
            current.eps_energy_today,
        ];
        if today_fields.iter().flatten().any(|v| *v > daily_cap) {
            return false;
        }
        if let (Some(previous), Some(elapsed)) = (&self.previous, elapsed_secs) {
            let max_delta = rated_power_kw * elapsed / 3600.0 * 1.5;
            for name in MONOTONE_LIFETIME_FIELDS {
                if let (Some(prev), Some(curr)) = (previous.get(name), current.lifetime_field(name)) {
                    if curr - prev > max_delta {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn accept(&mut self, current: &InverterEnergyData, _rated_power_kw: f64) {
        let mut snapshot = HashMap::new();
        for name in MONOTONE_LIFETIME_FIELDS {
            if let Some(v) = current.lifetime_field(name) {
                snapshot.insert(*name, v);
            }
        }
        self.previous = Some(snapshot);
        self.consecutive_rejections = 0;
    }

    fn reject(&mut self) {
        self.consecutive_rejections += 1;
    }

    pub fn consecutive_rejections(&self) -> u32 {
        self.consecutive_rejections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_total(value: f64) -> InverterEnergyData {
        let mut d = InverterEnergyData::default();
        d.pv_energy_total = Some(value);
        d
    }

    #[test]
    fn accepts_monotone_increase_within_delta() {
        let mut v = EnergyValidator::new();
        assert_eq!(v.validate(&with_total(10.0), 5.0, None), Verdict::Accept);
        assert_eq!(v.validate(&with_total(11.0), 5.0, None), Verdict::Accept);
    }

    #[test]
    fn rejects_any_decrease() {
        let mut v = EnergyValidator::new();
        assert_eq!(v.validate(&with_total(10.0), 5.0, None), Verdict::Accept);
        assert_eq!(v.validate(&with_total(9.0), 5.0, None), Verdict::Reject);
    }

    #[test]
    fn rejects_spike_above_max_delta() {
        let mut v = EnergyValidator::new();
        assert_eq!(v.validate(&with_total(10.0), 5.0, None), Verdict::Accept);
        // max_delta = 5.0 * 1.5 = 7.5
        assert_eq!(v.validate(&with_total(20.0), 5.0, None), Verdict::Reject);
    }

    #[test]
    fn three_consecutive_rejections_then_fourth_accepts_unconditionally() {
        let mut v = EnergyValidator::new();
        assert_eq!(v.validate(&with_total(10.0), 5.0, None), Verdict::Accept);
        assert_eq!(v.validate(&with_total(9.0), 5.0, None), Verdict::Reject);
        assert_eq!(v.validate(&with_total(9.0), 5.0, None), Verdict::Reject);
        assert_eq!(v.validate(&with_total(9.0), 5.0, None), Verdict::Reject);
        assert_eq!(v.consecutive_rejections(), 3);
        assert_eq!(v.validate(&with_total(1.0), 5.0, None), Verdict::Accept);
        assert_eq!(v.consecutive_rejections(), 0);
    }

    #[test]
    fn zero_rated_power_disables_delta_and_daily_checks() {
        let mut v = EnergyValidator::new();
        assert_eq!(v.validate(&with_total(10.0), 0.0, None), Verdict::Accept);
        assert_eq!(v.validate(&with_total(10_000.0), 0.0, None), Verdict::Accept);
    }

    #[test]
    fn daily_counter_above_absolute_cap_is_rejected() {
        let mut v = EnergyValidator::new();
        let mut d = InverterEnergyData::default();
        d.pv_energy_today = Some(1000.0);
        // rated_power_kw=5.0 -> daily_cap=120.0
        assert_eq!(v.validate(&d, 5.0, None), Verdict::Reject);
    }
}
