mod common;

use std::sync::Arc;

use eg4_link::config::{DeviceConfig, TransportConfig, TransportKind};
use eg4_link::device::Device;
use eg4_link::snapshot::RegisterSnapshot;

use common::FixtureTransport;

fn test_config() -> DeviceConfig {
    serde_yaml::from_str(
        "transport:\n  kind: modbus_tcp\n  host: 10.0.0.5\nrated_power_kw: 16.0\n",
    )
    .unwrap()
}

#[tokio::test]
async fn refresh_populates_runtime_cache_and_getters_surface_it() {
    let mut seed = RegisterSnapshot::new();
    seed.insert(140, 1205);
    seed.insert(141, 1207);
    // holding register 19 (device type) left at 0 -> defaults to inverter.
    let transport: Arc<dyn eg4_link::transport::Transport> = Arc::new(FixtureTransport::new(seed));

    let device = Device::new(test_config(), transport);
    device.refresh(false, false).await.unwrap();

    let runtime = device.runtime().await.unwrap();
    assert_eq!(runtime.grid_l1_voltage, Some(120.5));
}

#[tokio::test]
async fn energy_getter_errors_before_any_refresh_populates_it() {
    let transport: Arc<dyn eg4_link::transport::Transport> = Arc::new(FixtureTransport::new(RegisterSnapshot::new()));
    let device = Device::new(test_config(), transport);
    assert!(device.energy().await.is_err());
}

#[test]
fn transport_kind_round_trips_through_yaml() {
    let cfg: TransportConfig = serde_yaml::from_str("kind: dongle_tcp\nhost: 1.2.3.4\n").unwrap();
    assert_eq!(cfg.kind, TransportKind::DongleTcp);
    assert_eq!(cfg.port(), 8000);
}
