mod common;

use eg4_link::catalog::inverter_input::INPUT_GROUPS;
use eg4_link::catalog::register::ModelFamily;
use eg4_link::codec::ModbusFunction;
use eg4_link::decode::InverterRuntimeData;
use eg4_link::orchestrator::read_groups;
use eg4_link::snapshot::RegisterSnapshot;

use common::FixtureTransport;

/// Reads every declared input-register group through the orchestrator in
/// one pass and decodes the merged snapshot into runtime data, exercising
/// the "single read synthesizes every output" contract without duplicate
/// transactions.
#[tokio::test]
async fn multi_group_read_decodes_into_runtime_data() {
    let mut seed = RegisterSnapshot::new();
    seed.insert(140, 1205); // grid_l1_voltage
    seed.insert(141, 1207); // grid_l2_voltage
    let transport = FixtureTransport::new(seed);

    let snapshot = read_groups(&transport, ModbusFunction::ReadInput, INPUT_GROUPS)
        .await
        .unwrap();

    let data = InverterRuntimeData::from_modbus_registers(&snapshot, ModelFamily::Eg4Hybrid);
    assert_eq!(data.grid_l1_voltage, Some(120.5));
    assert_eq!(data.grid_l2_voltage, Some(120.7));
}

/// A canary-rejected reading must never overwrite an already-cached value;
/// this exercises the decode-then-reject path a `Device` relies on.
#[tokio::test]
async fn corrupt_snapshot_is_flagged_for_the_caller_to_keep_its_cache() {
    let mut seed = RegisterSnapshot::new();
    seed.insert(20, 0xFFFF); // inverter_power low word
    seed.insert(21, 0xFFFF); // inverter_power high word
    let transport = FixtureTransport::new(seed);

    let snapshot = read_groups(&transport, ModbusFunction::ReadInput, INPUT_GROUPS)
        .await
        .unwrap();
    let data = InverterRuntimeData::from_modbus_registers(&snapshot, ModelFamily::Eg4Hybrid);

    assert!(data.is_corrupt(32_000.0));
}
