mod common;

use eg4_link::probe::{atomic_read, parse_slot};
use eg4_link::snapshot::RegisterSnapshot;

use common::FixtureTransport;

/// Atomic 120-register read at base 5002, then per-slot parse: status,
/// voltage, packed SoC/SoH, and the 8-register ASCII serial.
#[tokio::test]
async fn atomic_read_then_parse_recovers_slot_fields() {
    let mut seed = RegisterSnapshot::new();
    let base = 5002u16;
    seed.insert(base, 3); // status (present)
    seed.insert(base + 1, 5280); // voltage raw -> 52.80V
    seed.insert(base + 8, (10u16 << 8) | 15u16); // soh=10, soc=15
    seed.insert(base + 17, u16::from_le_bytes([b'B', b'A']));
    seed.insert(base + 18, u16::from_le_bytes([b'1', b'2']));
    for i in 19..25 {
        seed.insert(base + i, 0);
    }

    let transport = FixtureTransport::new(seed);
    let snapshot = atomic_read(&transport).await.unwrap();

    let slot = parse_slot(&snapshot, 0).expect("slot 0 should be present");
    assert_eq!(slot.soc, 15);
    assert_eq!(slot.soh, 10);
    assert_eq!(slot.voltage, 52.8);
    assert!(slot.serial.unwrap().starts_with("BA12"));
}

#[tokio::test]
async fn empty_slot_parses_to_none() {
    let seed = RegisterSnapshot::new();
    let transport = FixtureTransport::new(seed);
    let snapshot = atomic_read(&transport).await.unwrap();
    assert!(parse_slot(&snapshot, 1).is_none());
}
