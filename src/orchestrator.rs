//! Splits large register reads into the catalog's declared groups, merges
//! responses into a single snapshot, and implements the general
//! inter-group pacing and reconnect-on-threshold rules of the transport
//! lifecycle (spec section on transport core behavior).

use log::{debug, warn};

use crate::catalog::register::RegisterGroup;
use crate::codec::modbus_frame::ModbusFunction;
use crate::error::Error;
use crate::snapshot::RegisterSnapshot;
use crate::transport::Transport;

/// Reads every group in `plan` against `transport`, merging the results
/// into one snapshot. Supplementary groups that fail are logged and
/// omitted rather than aborting the whole read; any other group's failure
/// propagates.
pub async fn read_groups(
    transport: &dyn Transport,
    function: ModbusFunction,
    plan: &[RegisterGroup],
) -> Result<RegisterSnapshot, Error> {
    if transport.needs_reconnect() {
        debug!("orchestrator: consecutive-error threshold reached, reconnecting before read");
        transport.disconnect().await?;
        transport.connect().await?;
    }

    let mut snapshot = RegisterSnapshot::new();

    for (i, group) in plan.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(transport.inter_group_delay()).await;
        }

        match transport.read_registers(function, group.start, group.count).await {
            Ok(values) => snapshot.insert_block(group.start, &values),
            Err(e) if group.supplementary => {
                warn!(
                    "orchestrator: supplementary group ({}, {}) failed, continuing without it: {}",
                    group.start, group.count, e
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(snapshot)
}

/// Reads every configured range concurrently, used for the parameter
/// reader's three-range holding dump — concurrency here is safe only
/// because each range targets disjoint addresses and the transport's own
/// mutex still serializes the underlying wire operations.
pub async fn read_ranges_concurrent(
    transport: &dyn Transport,
    function: ModbusFunction,
    ranges: &[RegisterGroup],
) -> Result<RegisterSnapshot, Error> {
    let reads = ranges
        .iter()
        .map(|r| transport.read_registers(function, r.start, r.count));
    let results = futures::future::join_all(reads).await;

    let mut snapshot = RegisterSnapshot::new();
    for (range, result) in ranges.iter().zip(results) {
        match result {
            Ok(values) => snapshot.insert_block(range.start, &values),
            Err(e) if range.supplementary => {
                warn!("orchestrator: supplementary range failed: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::state::RetryConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FakeTransport {
        fail_on: Vec<u16>,
        calls: Mutex<Vec<u16>>,
        reconnects: AtomicU32,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn connect(&self) -> Result<(), Error> {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), Error> {
            Ok(())
        }

        async fn read_registers(&self, _f: ModbusFunction, start: u16, count: u16) -> Result<Vec<u16>, Error> {
            self.calls.lock().unwrap().push(start);
            if self.fail_on.contains(&start) {
                return Err(Error::read("simulated failure"));
            }
            Ok(vec![0u16; count as usize])
        }

        async fn write_single(&self, _start: u16, _value: u16) -> Result<(), Error> {
            Ok(())
        }

        async fn write_multiple(&self, _start: u16, _values: &[u16]) -> Result<(), Error> {
            Ok(())
        }

        fn inter_group_delay(&self) -> std::time::Duration {
            std::time::Duration::from_millis(0)
        }
    }

    #[tokio::test]
    async fn supplementary_group_failure_is_swallowed() {
        let transport = FakeTransport {
            fail_on: vec![80],
            calls: Mutex::new(Vec::new()),
            reconnects: AtomicU32::new(0),
        };
        let plan = vec![RegisterGroup::new(0, 32), RegisterGroup::supplementary(80, 33)];
        let snapshot = read_groups(&transport, ModbusFunction::ReadInput, &plan).await.unwrap();
        assert_eq!(snapshot.len(), 32);
        assert!(!snapshot.contains(80));
        let _ = RetryConfig::default();
    }

    #[tokio::test]
    async fn non_supplementary_failure_propagates() {
        let transport = FakeTransport {
            fail_on: vec![32],
            calls: Mutex::new(Vec::new()),
            reconnects: AtomicU32::new(0),
        };
        let plan = vec![RegisterGroup::new(0, 32), RegisterGroup::new(32, 32)];
        let result = read_groups(&transport, ModbusFunction::ReadInput, &plan).await;
        assert!(result.is_err());
    }
}
