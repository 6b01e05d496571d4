use serde::Deserialize;
use serde_with::serde_as;

use crate::serial::Serial;

/// Which wire protocol a device is reached through.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    ModbusTcp,
    ModbusRtu,
    DongleTcp,
    Http,
}

// TransportConfig {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct TransportConfig {
    pub kind: TransportKind,

    /// Modbus TCP / dongle TCP / HTTP.
    pub host: Option<String>,
    pub port: Option<u16>,

    /// Modbus RTU.
    pub device_path: Option<String>,
    pub baud_rate: Option<u32>,

    pub unit_id: Option<u8>,

    #[serde(deserialize_with = "de_serial", default)]
    pub dongle_serial: Option<Serial>,
    #[serde(deserialize_with = "de_serial", default)]
    pub inverter_serial: Option<Serial>,

    pub username: Option<String>,
    pub password: Option<String>,

    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub inter_group_delay_ms: Option<u64>,
    pub max_consecutive_errors: Option<u32>,
}

impl TransportConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(match self.kind {
            TransportKind::ModbusTcp => 502,
            TransportKind::DongleTcp => 8000,
            TransportKind::ModbusRtu | TransportKind::Http => 0,
        })
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate.unwrap_or(19200)
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id.unwrap_or(1)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(10))
    }

    pub fn retries(&self) -> u32 {
        self.retries.unwrap_or(3)
    }

    pub fn retry_base_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_base_delay_ms.unwrap_or(250))
    }

    pub fn inter_group_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.inter_group_delay_ms.unwrap_or(200))
    }

    pub fn max_consecutive_errors(&self) -> u32 {
        self.max_consecutive_errors.unwrap_or(5)
    }
} // }}}

// DeviceConfig {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "DeviceConfig::default_enabled")]
    pub enabled: bool,

    #[serde(deserialize_with = "de_serial", default)]
    pub serial: Option<Serial>,
    #[serde(deserialize_with = "de_serial", default)]
    pub datalog: Option<Serial>,

    pub transport: TransportConfig,

    /// Used by the corruption canary (`max_power_watts = rated_power_kw *
    /// 2000`) and by lifetime-energy monotonicity bounds. `0.0` (the
    /// default) disables both checks until the caller learns the real
    /// figure, per the crate's resolution of the corresponding open
    /// question.
    #[serde(default)]
    pub rated_power_kw: f64,

    pub runtime_cache_ttl_secs: Option<u64>,
    pub battery_cache_ttl_secs: Option<u64>,
    pub energy_cache_ttl_secs: Option<u64>,
    pub parameters_cache_ttl_secs: Option<u64>,
    pub firmware_cache_ttl_secs: Option<u64>,
}

impl DeviceConfig {
    fn default_enabled() -> bool {
        true
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn serial(&self) -> Option<Serial> {
        self.serial
    }

    pub fn datalog(&self) -> Option<Serial> {
        self.datalog
    }

    pub fn max_power_watts(&self) -> f64 {
        self.rated_power_kw * 2000.0
    }

    pub fn runtime_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.runtime_cache_ttl_secs.unwrap_or(30))
    }

    pub fn battery_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.battery_cache_ttl_secs.unwrap_or(30))
    }

    pub fn energy_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.energy_cache_ttl_secs.unwrap_or(300))
    }

    pub fn parameters_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.parameters_cache_ttl_secs.unwrap_or(3600))
    }

    pub fn firmware_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.firmware_cache_ttl_secs.unwrap_or(86400))
    }
} // }}}

fn de_serial<'de, D>(deserializer: D) -> Result<Option<Serial>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if !s.is_empty() => Ok(Some(Serial::from(s.as_str()))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_config_defaults_port_by_kind() {
        let cfg: TransportConfig = serde_yaml::from_str("kind: modbus_tcp\n").unwrap();
        assert_eq!(cfg.port(), 502);
        let cfg: TransportConfig = serde_yaml::from_str("kind: dongle_tcp\n").unwrap();
        assert_eq!(cfg.port(), 8000);
    }

    #[test]
    fn device_config_zero_rated_power_disables_canary_bound() {
        let cfg: DeviceConfig = serde_yaml::from_str(
            "transport:\n  kind: modbus_tcp\n  host: 10.0.0.5\n",
        )
        .unwrap();
        assert_eq!(cfg.max_power_watts(), 0.0);
    }

    #[test]
    fn device_config_parses_serial_from_string() {
        let cfg: DeviceConfig = serde_yaml::from_str(
            "serial: \"BA12345678\"\ntransport:\n  kind: modbus_tcp\n  host: 10.0.0.5\n",
        )
        .unwrap();
        assert_eq!(cfg.serial().unwrap().to_string(), "BA12345678");
    }
}
