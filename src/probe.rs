//! Atomic multi-slot battery telemetry probe.
//!
//! The inverter firmware exposes up to four battery modules in a single
//! 30-register-per-slot window starting at register 5002, but internally
//! rotates which physical module occupies which slot on a 10-60s period.
//! Reading all four slots in one Modbus transaction is the only way to see
//! a consistent cross-slot snapshot; this module does that read and, for
//! the operational probe loop, analyzes the rotation pattern across
//! repeated reads.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;

use crate::catalog::battery_block::{offset, BASE_ADDRESS, SLOT_COUNT, SLOT_WIDTH, TOTAL_REGISTERS};
use crate::codec::modbus_frame::ModbusFunction;
use crate::error::Error;
use crate::reader::read_ascii_serial;
use crate::snapshot::RegisterSnapshot;
use crate::transport::Transport;
use crate::unixtime::UnixTime;

/// One parsed 30-register slot from the atomic probe read.
#[derive(Clone, Debug, PartialEq)]
pub struct BatterySlot {
    pub slot_index: u16,
    pub status: u16,
    pub voltage: f64,
    pub soc: u8,
    pub soh: u8,
    /// High byte of offset+24; identifies which physical position the
    /// firmware currently maps into this slot.
    pub position: u8,
    pub serial: Option<String>,
}

/// Always reads the full 120-register block in one transaction, regardless
/// of how many modules `bat_count` reports — this is the largest block
/// that fits the 125-register Modbus PDU limit and the only way to get an
/// internally-consistent cross-slot view.
pub async fn atomic_read(transport: &dyn Transport) -> Result<RegisterSnapshot, Error> {
    let values = transport
        .read_registers(ModbusFunction::ReadInput, BASE_ADDRESS, TOTAL_REGISTERS)
        .await?;
    let mut snapshot = RegisterSnapshot::new();
    snapshot.insert_block(BASE_ADDRESS, &values);
    Ok(snapshot)
}

/// Parses one slot out of a snapshot produced by `atomic_read`. Returns
/// `None` if the slot's status header reads zero (empty slot) or the
/// snapshot doesn't cover this slot's registers at all.
pub fn parse_slot(snapshot: &RegisterSnapshot, slot_index: u16) -> Option<BatterySlot> {
    let base = BASE_ADDRESS + slot_index * SLOT_WIDTH;
    let status = snapshot.get(base + offset::STATUS)?;
    if status == 0 {
        return None;
    }
    let voltage = snapshot.get(base + offset::VOLTAGE).unwrap_or(0) as f64 / 100.0;
    let soc_soh = snapshot.get(base + offset::SOC_SOH_PACKED).unwrap_or(0);
    let soc = (soc_soh & 0xFF) as u8;
    let soh = (soc_soh >> 8) as u8;
    let position = (snapshot.get(base + offset::POSITION).unwrap_or(0) >> 8) as u8;
    let serial = read_ascii_serial(snapshot, base + offset::SERIAL_START, offset::SERIAL_REGISTER_COUNT);

    Some(BatterySlot {
        slot_index,
        status,
        voltage,
        soc,
        soh,
        position,
        serial,
    })
}

/// Parses every slot in the atomic block, in slot order, dropping empty
/// slots.
pub fn parse_all_slots(snapshot: &RegisterSnapshot) -> Vec<BatterySlot> {
    (0..SLOT_COUNT).filter_map(|i| parse_slot(snapshot, i)).collect()
}

/// Sorted positions visible across all occupied slots at one instant; used
/// as the rotation "page key" since the firmware may present the same
/// physical set of modules in different slot orders between reads.
pub fn page_key(slots: &[BatterySlot]) -> Vec<u8> {
    let mut positions: Vec<u8> = slots.iter().map(|s| s.position).collect();
    positions.sort_unstable();
    positions
}

#[derive(Clone, Debug)]
pub struct ProbeSample {
    pub elapsed: Duration,
    pub page: Vec<u8>,
    pub slots: Vec<BatterySlot>,
    pub read_failed: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ProbeReport {
    pub page_histogram: HashMap<Vec<u8>, u32>,
    pub transitions: Vec<(Vec<u8>, Duration)>,
    pub mean_interval: Option<Duration>,
    pub min_interval: Option<Duration>,
    pub max_interval: Option<Duration>,
    pub estimated_cycle_time: Option<Duration>,
    pub hold_durations: Vec<(Vec<u8>, Duration)>,
    pub valid_reads: u32,
    pub empty_reads: u32,
    pub failed_reads: u32,
}

/// `ceil(battery_count / 4) * 3`, floored at 6 — enough iterations to
/// observe at least one full rotation cycle even for a single 4-slot bank.
pub fn default_iterations(battery_count: u8) -> u32 {
    let groups = (battery_count as u32).div_ceil(4).max(1);
    (groups * 3).max(6)
}

/// Repeatedly reads the atomic battery block and analyzes the rotation
/// pattern. `delay` is the sleep between reads (1.0s for Modbus TCP, 15.0s
/// for the WiFi dongle, by convention of the caller).
pub async fn run_probe(transport: &dyn Transport, iterations: u32, delay: Duration) -> Result<ProbeReport, Error> {
    let start = UnixTime::now();
    let mut samples = Vec::with_capacity(iterations as usize);

    for i in 0..iterations {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        let elapsed = Duration::from_secs(UnixTime::now().elapsed_secs_since(start));
        match atomic_read(transport).await {
            Ok(snapshot) => {
                let slots = parse_all_slots(&snapshot);
                let page = page_key(&slots);
                debug!("probe iteration {}: page={:?}, {} slots", i, page, slots.len());
                samples.push(ProbeSample {
                    elapsed,
                    page,
                    slots,
                    read_failed: false,
                });
            }
            Err(e) => {
                debug!("probe iteration {} failed: {}", i, e);
                samples.push(ProbeSample {
                    elapsed,
                    page: Vec::new(),
                    slots: Vec::new(),
                    read_failed: true,
                });
            }
        }
    }

    Ok(analyze(&samples))
}

fn analyze(samples: &[ProbeSample]) -> ProbeReport {
    let mut report = ProbeReport::default();

    for sample in samples {
        if sample.read_failed {
            report.failed_reads += 1;
        } else if sample.slots.is_empty() {
            report.empty_reads += 1;
        } else {
            report.valid_reads += 1;
            *report.page_histogram.entry(sample.page.clone()).or_insert(0) += 1;
        }
    }

    let valid_samples: Vec<&ProbeSample> = samples.iter().filter(|s| !s.read_failed).collect();

    let mut last_page: Option<&Vec<u8>> = None;
    let mut last_transition_at = Duration::ZERO;
    let mut hold_start = Duration::ZERO;

    for sample in &valid_samples {
        match last_page {
            Some(prev) if *prev != sample.page => {
                report.transitions.push((sample.page.clone(), sample.elapsed));
                report.hold_durations.push((prev.clone(), sample.elapsed - hold_start));
                last_transition_at = sample.elapsed;
                hold_start = sample.elapsed;
            }
            None => {
                hold_start = sample.elapsed;
            }
            _ => {}
        }
        last_page = Some(&sample.page);
        let _ = last_transition_at;
    }

    if report.transitions.len() >= 2 {
        let mut intervals = Vec::with_capacity(report.transitions.len() - 1);
        for pair in report.transitions.windows(2) {
            intervals.push(pair[1].1.saturating_sub(pair[0].1));
        }
        let total: Duration = intervals.iter().sum();
        let mean = total / intervals.len() as u32;
        report.mean_interval = Some(mean);
        report.min_interval = intervals.iter().min().copied();
        report.max_interval = intervals.iter().max().copied();

        let unique_pages = report.page_histogram.len().max(1) as u32;
        report.estimated_cycle_time = Some(mean * unique_pages);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(status: u16, position: u8) -> BatterySlot {
        BatterySlot {
            slot_index: 0,
            status,
            voltage: 50.0,
            soc: 80,
            soh: 100,
            position,
            serial: None,
        }
    }

    #[test]
    fn parse_slot_returns_none_for_empty_status() {
        let snapshot = RegisterSnapshot::new();
        assert!(parse_slot(&snapshot, 0).is_none());
    }

    #[test]
    fn parse_slot_extracts_fields_from_correct_offsets() {
        let mut s = RegisterSnapshot::new();
        let base = BASE_ADDRESS + 1 * SLOT_WIDTH;
        s.insert(base + offset::STATUS, 1);
        s.insert(base + offset::VOLTAGE, 5280);
        s.insert(base + offset::SOC_SOH_PACKED, (95u16 << 8) | 80u16);
        s.insert(base + offset::POSITION, 2u16 << 8);
        let parsed = parse_slot(&s, 1).unwrap();
        assert_eq!(parsed.voltage, 52.8);
        assert_eq!(parsed.soc, 80);
        assert_eq!(parsed.soh, 95);
        assert_eq!(parsed.position, 2);
    }

    #[test]
    fn page_key_sorts_positions() {
        let slots = vec![slot(1, 3), slot(1, 1), slot(1, 2)];
        assert_eq!(page_key(&slots), vec![1, 2, 3]);
    }

    #[test]
    fn default_iterations_floors_at_six() {
        assert_eq!(default_iterations(1), 6);
        assert_eq!(default_iterations(4), 6);
    }

    #[test]
    fn default_iterations_scales_with_battery_count() {
        assert_eq!(default_iterations(8), 6);
        assert_eq!(default_iterations(9), 9);
    }

    #[test]
    fn analyze_counts_reliability_buckets() {
        let samples = vec![
            ProbeSample {
                elapsed: Duration::from_secs(0),
                page: vec![1, 2],
                slots: vec![slot(1, 1), slot(1, 2)],
                read_failed: false,
            },
            ProbeSample {
                elapsed: Duration::from_secs(1),
                page: vec![],
                slots: vec![],
                read_failed: true,
            },
        ];
        let report = analyze(&samples);
        assert_eq!(report.valid_reads, 1);
        assert_eq!(report.failed_reads, 1);
    }

    #[test]
    fn analyze_detects_page_transition() {
        let samples = vec![
            ProbeSample {
                elapsed: Duration::from_secs(0),
                page: vec![1, 2],
                slots: vec![slot(1, 1), slot(1, 2)],
                read_failed: false,
            },
            ProbeSample {
                elapsed: Duration::from_secs(10),
                page: vec![3, 4],
                slots: vec![slot(1, 3), slot(1, 4)],
                read_failed: false,
            },
        ];
        let report = analyze(&samples);
        assert_eq!(report.transitions.len(), 1);
        assert_eq!(report.transitions[0].1, Duration::from_secs(10));
    }
}
