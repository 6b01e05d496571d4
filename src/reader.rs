//! Primitive read/scale/clamp/sum helpers over a register snapshot. These
//! are the leaves every data-class decoder builds on; they never log
//! anything beyond out-of-range warnings and never retry — retry is a
//! transport concern.

use log::warn;

use crate::catalog::register::{RegisterDef, Scale, WordOrder};
use crate::snapshot::RegisterSnapshot;

/// Returns the raw integer value for a register, respecting width and word
/// order. `None` if any required address is missing from the snapshot.
pub fn read_raw(snapshot: &RegisterSnapshot, def: &RegisterDef) -> Option<i64> {
    if def.width == 32 {
        let (lo_addr, hi_addr) = match def.word_order {
            WordOrder::LowWordFirst => (def.address, def.address + 1),
            WordOrder::HighWordFirst => (def.address + 1, def.address),
        };
        let lo = snapshot.get(lo_addr)? as u32;
        let hi = snapshot.get(hi_addr)? as u32;
        let raw = (hi << 16) | lo;
        Some(if def.signed {
            raw as i32 as i64
        } else {
            raw as i64
        })
    } else {
        let raw = snapshot.get(def.address)?;
        Some(if def.signed {
            raw as i16 as i64
        } else {
            raw as i64
        })
    }
}

/// Returns the scaled floating-point value: `raw * scale`, or `None` on a
/// missing address.
pub fn read_scaled(snapshot: &RegisterSnapshot, def: &RegisterDef) -> Option<f64> {
    let raw = read_raw(snapshot, def)?;
    Some(def.scale.apply(raw as f64))
}

/// Clamps a SoC/SoH percentage into [0, 100], logging when the raw reading
/// was out of range. Returns the clamped value; callers that need the
/// pre-clamp value for canary checks should keep the raw reading
/// separately.
pub fn clamp_percentage(raw: f64, field: &str) -> f64 {
    if !(0.0..=100.0).contains(&raw) {
        warn!("{} out of range for a percentage: {}", field, raw);
    }
    raw.clamp(0.0, 100.0)
}

/// Sums a tuple of optionals, treating missing entries as zero, but
/// returning `None` if every entry is missing (as opposed to all being
/// legitimately zero).
pub fn sum_optional(values: &[Option<f64>]) -> Option<f64> {
    if values.iter().all(|v| v.is_none()) {
        return None;
    }
    Some(values.iter().map(|v| v.unwrap_or(0.0)).sum())
}

/// Parallel-configuration packed register: master/slave (bits 0-1), phase
/// (bits 2-3), unit-id (bits 8-15).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParallelConfig {
    pub master_slave: u8,
    pub phase: u8,
    pub unit_id: u8,
}

pub fn unpack_parallel_config(raw: u16) -> ParallelConfig {
    ParallelConfig {
        master_slave: (raw & 0b11) as u8,
        phase: ((raw >> 2) & 0b11) as u8,
        unit_id: ((raw >> 8) & 0xFF) as u8,
    }
}

/// Packed `major.minor` firmware version from one register: high byte,
/// low byte.
pub fn read_battery_firmware(raw: u16) -> (u8, u8) {
    ((raw >> 8) as u8, (raw & 0xFF) as u8)
}

/// ASCII serial spread across consecutive registers, 2 chars/register, low
/// byte first, trimmed of trailing nulls.
pub fn read_ascii_serial(snapshot: &RegisterSnapshot, start: u16, register_count: u16) -> Option<String> {
    let mut bytes = Vec::with_capacity(register_count as usize * 2);
    for i in 0..register_count {
        let reg = snapshot.get(start + i)?;
        bytes.push((reg & 0xFF) as u8);
        bytes.push((reg >> 8) as u8);
    }
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::register::{Category, ModelFamily, RegisterDef};

    const ALL: &[ModelFamily] = &[];

    #[test]
    fn read_raw_16bit_unsigned() {
        let mut s = RegisterSnapshot::new();
        s.insert(10, 12345);
        let def = RegisterDef::new("x", 10, 16, WordOrder::HighWordFirst, false, Scale::None, ALL, Category::Runtime);
        assert_eq!(read_raw(&s, &def), Some(12345));
    }

    #[test]
    fn read_raw_32bit_high_word_first() {
        let mut s = RegisterSnapshot::new();
        s.insert(6, 0x0001);
        s.insert(7, 0x2C00);
        let def = RegisterDef::new(
            "pv1_power",
            6,
            32,
            WordOrder::HighWordFirst,
            false,
            Scale::None,
            ALL,
            Category::Runtime,
        );
        assert_eq!(read_raw(&s, &def), Some(76288));
    }

    #[test]
    fn read_scaled_32bit_low_word_first_div10() {
        let mut s = RegisterSnapshot::new();
        s.insert(46, 0x2710);
        s.insert(47, 0x0001);
        let def = RegisterDef::new(
            "lifetime",
            46,
            32,
            WordOrder::LowWordFirst,
            false,
            Scale::Div10,
            ALL,
            Category::Energy,
        );
        assert_eq!(read_scaled(&s, &def), Some(7628.8));
    }

    #[test]
    fn read_raw_missing_address_is_none() {
        let s = RegisterSnapshot::new();
        let def = RegisterDef::new("x", 10, 16, WordOrder::HighWordFirst, false, Scale::None, ALL, Category::Runtime);
        assert_eq!(read_raw(&s, &def), None);
    }

    #[test]
    fn sum_optional_treats_missing_as_zero_unless_all_missing() {
        assert_eq!(sum_optional(&[Some(1.0), None, Some(2.0)]), Some(3.0));
        assert_eq!(sum_optional(&[None, None]), None);
    }

    #[test]
    fn unpack_parallel_config_extracts_bit_fields() {
        // master_slave=1, phase=2 (0b10 << 2), unit_id=7
        let raw = 0b0000_0111_0000_1001u16;
        let cfg = unpack_parallel_config(raw);
        assert_eq!(cfg.master_slave, 1);
        assert_eq!(cfg.phase, 2);
        assert_eq!(cfg.unit_id, 7);
    }

    #[test]
    fn read_ascii_serial_trims_trailing_nulls() {
        let mut s = RegisterSnapshot::new();
        // "BA" then "12" then nulls
        s.insert(0, u16::from_le_bytes([b'B', b'A']));
        s.insert(1, u16::from_le_bytes([b'1', b'2']));
        s.insert(2, 0);
        assert_eq!(read_ascii_serial(&s, 0, 3).as_deref(), Some("BA12"));
    }
}
