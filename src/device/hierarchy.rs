//! Device façade: one `Device` owns exactly one transport and the
//! independent TTL caches for everything that transport can produce.
//! `Station`/`ParallelGroup` are thin composition wrappers over several
//! devices, replacing what the source ecosystem expresses as mixin
//! inheritance (runtime-properties, firmware-update, MID-runtime-properties
//! each extending a shared base) — each concern here is its own component
//! the façade delegates to, not a shared ancestor.

use std::sync::Arc;

use log::warn;
use tokio::sync::Mutex as AsyncMutex;

use crate::catalog::gridboss_holding::{DEVICE_TYPE_GRIDBOSS, DEVICE_TYPE_REGISTER};
use crate::catalog::inverter_input::INPUT_GROUPS;
use crate::catalog::register::ModelFamily;
use crate::codec::modbus_frame::ModbusFunction;
use crate::config::DeviceConfig;
use crate::decode::{BatteryBankData, InverterEnergyData, InverterRuntimeData, MidboxRuntimeData};
use crate::device::cache::TtlCache;
use crate::device::parameters::{read_parameters, ParameterMap};
use crate::error::Error;
use crate::orchestrator::read_groups;
use crate::probe::{atomic_read, parse_all_slots};
use crate::serial::Serial;
use crate::snapshot::RegisterSnapshot;
use crate::transport::Transport;
use crate::unixtime::UnixTime;
use crate::validate::energy::{EnergyValidator, Verdict};

/// Relative cloud endpoints for the two data classes that have a
/// `from_http_response` shape, following the `/WManage/web/...` naming the
/// vendor's control endpoints use elsewhere.
fn http_runtime_path(serial: &str) -> String {
    format!("WManage/web/monitor/maintain/getInverterRuntimeInfo?serialNum={}", serial)
}

fn http_energy_path(serial: &str) -> String {
    format!("WManage/web/monitor/maintain/getInverterEnergyInfo?serialNum={}", serial)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    Inverter,
    GridBoss,
}

/// One physical device, reached over exactly one transport for its
/// lifetime. Holds one independent TTL cache per data class: runtime,
/// battery, energy, parameters, each with its own lock so a stale energy
/// cache never blocks an in-flight runtime refresh.
pub struct Device {
    pub config: DeviceConfig,
    transport: Arc<dyn Transport>,
    kind: AsyncMutex<Option<DeviceKind>>,

    runtime_cache: TtlCache<InverterRuntimeData>,
    gridboss_cache: TtlCache<MidboxRuntimeData>,
    battery_cache: TtlCache<BatteryBankData>,
    energy_cache: TtlCache<InverterEnergyData>,
    parameters_cache: TtlCache<ParameterMap>,

    /// Lifetime-monotonicity state for the energy cache. Independent of
    /// the cache's own lock so a validation rejection never blocks an
    /// unrelated runtime refresh.
    energy_validator: AsyncMutex<EnergyValidator>,
}

impl Device {
    pub fn new(config: DeviceConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            runtime_cache: TtlCache::new(config.runtime_cache_ttl()),
            gridboss_cache: TtlCache::new(config.runtime_cache_ttl()),
            battery_cache: TtlCache::new(config.battery_cache_ttl()),
            energy_cache: TtlCache::new(config.energy_cache_ttl()),
            parameters_cache: TtlCache::new(config.parameters_cache_ttl()),
            energy_validator: AsyncMutex::new(EnergyValidator::new()),
            kind: AsyncMutex::new(None),
            config,
            transport,
        }
    }

    /// Reads holding register 19 once and caches the result for the life
    /// of this `Device`; code 50 is GridBOSS, anything else defaults to an
    /// inverter. The cloud HTTP transport has no equivalent of register 19
    /// and only ever backs inverter polling in this crate, so a
    /// cloud-only transport short-circuits straight to `Inverter` without
    /// touching the transport at all.
    pub async fn kind(&self) -> Result<DeviceKind, Error> {
        let mut guard = self.kind.lock().await;
        if let Some(kind) = *guard {
            return Ok(kind);
        }
        if self.transport.supports_cloud_only_operations() {
            *guard = Some(DeviceKind::Inverter);
            return Ok(DeviceKind::Inverter);
        }
        let values = self
            .transport
            .read_registers(ModbusFunction::ReadHolding, DEVICE_TYPE_REGISTER, 1)
            .await?;
        let kind = if values.first() == Some(&DEVICE_TYPE_GRIDBOSS) {
            DeviceKind::GridBoss
        } else {
            DeviceKind::Inverter
        };
        *guard = Some(kind);
        Ok(kind)
    }

    /// Computes which caches are stale and issues exactly those reads,
    /// concurrently. A per-fetch failure (including a canary rejection,
    /// which never surfaces as an `Err`) leaves the existing cache entry
    /// untouched rather than aborting the whole refresh.
    pub async fn refresh(&self, force: bool, include_parameters: bool) -> Result<(), Error> {
        if force {
            self.runtime_cache.invalidate().await;
            self.gridboss_cache.invalidate().await;
            self.energy_cache.invalidate().await;
            self.battery_cache.invalidate().await;
            if include_parameters {
                self.parameters_cache.invalidate().await;
            }
        }

        let kind = self.kind().await?;

        let refresh_runtime = match kind {
            DeviceKind::Inverter => self.runtime_cache.is_stale().await,
            DeviceKind::GridBoss => self.gridboss_cache.is_stale().await,
        };
        let refresh_battery = kind == DeviceKind::Inverter && self.battery_cache.is_stale().await;
        let refresh_energy = self.energy_cache.is_stale().await;
        let refresh_parameters = include_parameters && self.parameters_cache.is_stale().await;

        let (runtime_result, battery_result, energy_result, parameters_result) = tokio::join!(
            self.maybe_refresh_runtime(kind, refresh_runtime),
            self.maybe_refresh_battery(refresh_battery),
            self.maybe_refresh_energy(refresh_energy),
            self.maybe_refresh_parameters(refresh_parameters),
        );

        for result in [runtime_result, battery_result, energy_result, parameters_result] {
            if let Err(e) = result {
                warn!("device refresh: a fetch failed, keeping prior cache: {}", e);
            }
        }

        Ok(())
    }

    async fn maybe_refresh_runtime(&self, kind: DeviceKind, should: bool) -> Result<(), Error> {
        if !should {
            return Ok(());
        }
        if self.transport.supports_cloud_only_operations() {
            let serial = self.config.serial().map(|s| s.to_string()).unwrap_or_default();
            let json = self.transport.fetch_json(&http_runtime_path(&serial)).await?;
            let data = InverterRuntimeData::from_http_response(&json);
            if data.is_corrupt(self.config.max_power_watts()) {
                warn!("device refresh: runtime canary rejected the new snapshot, keeping cache");
                return Ok(());
            }
            self.runtime_cache.set(data).await;
            return Ok(());
        }
        match kind {
            DeviceKind::Inverter => {
                let snapshot = read_groups(&*self.transport, ModbusFunction::ReadInput, INPUT_GROUPS).await?;
                let data = InverterRuntimeData::from_modbus_registers(&snapshot, ModelFamily::Eg4Hybrid);
                if data.is_corrupt(self.config.max_power_watts()) {
                    warn!("device refresh: runtime canary rejected the new snapshot, keeping cache");
                    return Ok(());
                }
                self.runtime_cache.set(data).await;
            }
            DeviceKind::GridBoss => {
                let snapshot = read_groups(
                    &*self.transport,
                    ModbusFunction::ReadHolding,
                    crate::catalog::gridboss_holding::GRIDBOSS_GROUPS,
                )
                .await?;
                let data = MidboxRuntimeData::from_modbus_registers(&snapshot);
                if data.is_corrupt() {
                    warn!("device refresh: gridboss canary rejected the new snapshot, keeping cache");
                    return Ok(());
                }
                self.gridboss_cache.set(data).await;
            }
        }
        Ok(())
    }

    async fn maybe_refresh_battery(&self, should: bool) -> Result<(), Error> {
        if !should {
            return Ok(());
        }
        let snapshot = atomic_read(&*self.transport).await?;
        let bank = battery_bank_from_snapshot(&snapshot);
        if bank.is_corrupt() {
            warn!("device refresh: battery bank canary rejected the new snapshot, keeping cache");
            return Ok(());
        }
        self.battery_cache.set(bank).await;
        Ok(())
    }

    async fn maybe_refresh_energy(&self, should: bool) -> Result<(), Error> {
        if !should {
            return Ok(());
        }
        let data = if self.transport.supports_cloud_only_operations() {
            let serial = self.config.serial().map(|s| s.to_string()).unwrap_or_default();
            let json = self.transport.fetch_json(&http_energy_path(&serial)).await?;
            InverterEnergyData::from_http_response(&json)
        } else {
            let snapshot = read_groups(&*self.transport, ModbusFunction::ReadInput, INPUT_GROUPS).await?;
            InverterEnergyData::from_modbus_registers(&snapshot, ModelFamily::Eg4Hybrid)
        };
        self.accept_energy(data).await;
        Ok(())
    }

    /// Runs the new energy snapshot through the lifetime-monotonicity
    /// validator before admitting it to the cache; a rejected snapshot
    /// leaves the prior cache entry untouched, same as a canary rejection
    /// elsewhere in this file.
    async fn accept_energy(&self, data: InverterEnergyData) {
        let elapsed_secs = self
            .energy_cache
            .get_with_age()
            .await
            .map(|(_, age)| age.as_secs_f64());
        let verdict = {
            let mut validator = self.energy_validator.lock().await;
            validator.validate(&data, self.config.rated_power_kw, elapsed_secs)
        };
        match verdict {
            Verdict::Accept => self.energy_cache.set(data).await,
            Verdict::Reject => {
                warn!("device refresh: energy validator rejected the new snapshot, keeping cache");
            }
        }
    }

    async fn maybe_refresh_parameters(&self, should: bool) -> Result<(), Error> {
        if !should {
            return Ok(());
        }
        let map = read_parameters(&*self.transport).await?;
        self.parameters_cache.set(map).await;
        Ok(())
    }

    pub async fn runtime(&self) -> Result<InverterRuntimeData, Error> {
        self.runtime_cache
            .get()
            .await
            .ok_or_else(|| Error::device("no runtime data cached yet; call refresh() first"))
    }

    pub async fn gridboss_runtime(&self) -> Result<MidboxRuntimeData, Error> {
        self.gridboss_cache
            .get()
            .await
            .ok_or_else(|| Error::device("no GridBOSS runtime data cached yet; call refresh() first"))
    }

    pub async fn battery(&self) -> Result<BatteryBankData, Error> {
        self.battery_cache
            .get()
            .await
            .ok_or_else(|| Error::device("no battery data cached yet; call refresh() first"))
    }

    pub async fn energy(&self) -> Result<InverterEnergyData, Error> {
        self.energy_cache
            .get()
            .await
            .ok_or_else(|| Error::device("no energy data cached yet; call refresh() first"))
    }

    pub async fn parameters(&self) -> Result<ParameterMap, Error> {
        self.parameters_cache
            .get()
            .await
            .ok_or_else(|| Error::device("no parameter data cached yet; call refresh(include_parameters=true) first"))
    }
}

fn battery_bank_from_snapshot(snapshot: &RegisterSnapshot) -> BatteryBankData {
    use crate::decode::battery::{BatteryBankStatus, BatteryData};

    let slots = parse_all_slots(snapshot);
    let batteries: Vec<BatteryData> = slots
        .into_iter()
        .map(|s| BatteryData {
            index: s.slot_index as u8,
            serial: s.serial,
            voltage: Some(s.voltage),
            soc: s.soc,
            soh: s.soh,
            raw_soc: s.soc as u32,
            raw_soh: s.soh as u32,
            ..Default::default()
        })
        .collect();

    let voltage = crate::reader::sum_optional(&batteries.iter().map(|b| b.voltage).collect::<Vec<_>>())
        .map(|sum| sum / batteries.len().max(1) as f64);

    BatteryBankData {
        voltage,
        battery_count: batteries.len() as u8,
        status: BatteryBankStatus::Idle,
        batteries,
        ..Default::default()
    }
}

/// A device's local timezone, reported as three independent fields rather
/// than derived from one another: the display name, a fixed UTC offset in
/// `HHMM` form (e.g. `-0800`), and whether DST is presently in effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timezone {
    pub name: String,
    pub utc_offset_hhmm: i16,
    pub dst: bool,
}

/// Several inverters wired onto a common AC bus, optionally under a
/// GridBOSS. Aggregation here is plain composition: no member has special
/// inheritance status.
pub struct ParallelGroup {
    pub name: String,
    /// Serial of the first inverter added to the group; the source
    /// ecosystem keys a parallel group by this serial rather than a
    /// separately allocated id.
    pub first_device_serial: Option<Serial>,
    pub members: Vec<Arc<Device>>,
    pub gridboss: Option<Arc<Device>>,
}

impl ParallelGroup {
    pub fn new(name: impl Into<String>, members: Vec<Arc<Device>>, gridboss: Option<Arc<Device>>) -> Self {
        let first_device_serial = members.first().and_then(|d| d.config.serial());
        Self {
            name: name.into(),
            first_device_serial,
            members,
            gridboss,
        }
    }

    pub async fn total_inverter_power(&self) -> Option<f64> {
        let mut powers = Vec::with_capacity(self.members.len());
        for member in &self.members {
            powers.push(member.runtime().await.ok().and_then(|r| r.inverter_power));
        }
        crate::reader::sum_optional(&powers)
    }
}

/// Top-level composition root: every parallel group, every standalone
/// inverter not in a group, at one physical site.
pub struct Station {
    pub id: String,
    pub name: String,
    pub timezone: Timezone,
    pub created_at: UnixTime,
    pub location: String,
    pub groups: Vec<ParallelGroup>,
    pub standalone_inverters: Vec<Arc<Device>>,
}

impl Station {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        timezone: Timezone,
        created_at: UnixTime,
        location: impl Into<String>,
        groups: Vec<ParallelGroup>,
        standalone_inverters: Vec<Arc<Device>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            timezone,
            created_at,
            location: location.into(),
            groups,
            standalone_inverters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_bank_from_empty_snapshot_has_no_batteries() {
        let snapshot = RegisterSnapshot::new();
        let bank = battery_bank_from_snapshot(&snapshot);
        assert_eq!(bank.battery_count, 0);
        assert!(bank.batteries.is_empty());
    }

    #[test]
    fn parallel_group_with_no_members_has_no_first_device_serial() {
        let group = ParallelGroup::new("west-bus", Vec::new(), None);
        assert_eq!(group.first_device_serial, None);
        assert_eq!(group.name, "west-bus");
    }

    #[test]
    fn station_new_carries_all_fields() {
        let tz = Timezone {
            name: "America/Los_Angeles".to_string(),
            utc_offset_hhmm: -800,
            dst: true,
        };
        let station = Station::new(
            "station-1",
            "Home",
            tz.clone(),
            UnixTime::from_secs(1_700_000_000),
            "Garage",
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(station.id, "station-1");
        assert_eq!(station.timezone, tz);
        assert!(station.groups.is_empty());
        assert!(station.standalone_inverters.is_empty());
    }
}
