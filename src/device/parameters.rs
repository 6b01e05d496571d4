//! Parameter read/write: the holding-register half of the device façade.
//! Reads merge three concurrent ranges into one flat map; writes batch
//! consecutive addresses except time-schedule registers, which the device
//! only accepts one at a time.

use std::collections::HashMap;

use crate::catalog::inverter_holding as cat;
use crate::catalog::inverter_holding::is_schedule_register;
use crate::codec::modbus_frame::ModbusFunction;
use crate::error::Error;
use crate::orchestrator::read_ranges_concurrent;
use crate::reader::read_scaled;
use crate::transport::Transport;

#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    Int(i64),
    Bool(bool),
    Float(f64),
    String(String),
}

pub type ParameterMap = HashMap<String, ParameterValue>;

/// Reads the three standard holding ranges concurrently and merges them
/// into a flat map keyed by canonical parameter name where the catalog
/// knows one, and by `reg_<addr>` for every other address that came back.
pub async fn read_parameters(transport: &dyn Transport) -> Result<ParameterMap, Error> {
    let snapshot = read_ranges_concurrent(transport, ModbusFunction::ReadHolding, cat::HOLDING_READ_RANGES).await?;

    let mut map = ParameterMap::new();
    for def in cat::HOLDING_REGISTERS {
        if let Some(value) = read_scaled(&snapshot, def) {
            map.insert(def.name.to_string(), ParameterValue::Float(value));
        }
    }

    for group in cat::HOLDING_READ_RANGES {
        for addr in group.start..group.start + group.count {
            if cat::HOLDING_REGISTERS.iter().any(|d| d.address == addr) {
                continue;
            }
            if let Some(raw) = snapshot.get(addr) {
                map.insert(format!("reg_{}", addr), ParameterValue::Int(raw as i64));
            }
        }
    }

    Ok(map)
}

/// Validates `value` against the catalog's declared bounds for `name`, if
/// any are declared; parameters with no declared bounds are accepted
/// unconditionally.
pub fn validate_parameter(name: &str, value: f64) -> Result<(), Error> {
    if let Some((min, max)) = cat::valid_range(name) {
        if !(min..=max).contains(&value) {
            return Err(Error::validation(format!(
                "{} = {} out of range [{}, {}]",
                name, value, min, max
            )));
        }
    }
    Ok(())
}

/// Writes `(address, value)` pairs, grouping consecutive non-schedule
/// addresses into function-0x10 batches and issuing schedule-register
/// writes one at a time via function 0x06.
pub async fn write_parameters(transport: &dyn Transport, writes: &[(u16, u16)]) -> Result<(), Error> {
    let mut sorted: Vec<(u16, u16)> = writes.to_vec();
    sorted.sort_by_key(|(addr, _)| *addr);

    let mut i = 0;
    while i < sorted.len() {
        let (addr, value) = sorted[i];
        if is_schedule_register(addr) {
            transport.write_single(addr, value).await?;
            i += 1;
            continue;
        }

        let mut batch = vec![value];
        let mut j = i + 1;
        while j < sorted.len() && sorted[j].0 == addr + batch.len() as u16 && !is_schedule_register(sorted[j].0) {
            batch.push(sorted[j].1);
            j += 1;
        }

        if batch.len() == 1 {
            transport.write_single(addr, batch[0]).await?;
        } else {
            transport.write_multiple(addr, &batch).await?;
        }
        i = j;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_parameter_rejects_out_of_range() {
        assert!(validate_parameter("eod_soc", 5.0).is_err());
        assert!(validate_parameter("eod_soc", 50.0).is_ok());
    }

    #[test]
    fn validate_parameter_accepts_unknown_names() {
        assert!(validate_parameter("reg_9999", 99999.0).is_ok());
    }
}
