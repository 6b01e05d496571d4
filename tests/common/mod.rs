use std::sync::Mutex;

use async_trait::async_trait;
use eg4_link::codec::ModbusFunction;
use eg4_link::error::Error;
use eg4_link::snapshot::RegisterSnapshot;
use eg4_link::transport::Transport;

/// An in-memory transport fixture backed by a single register snapshot,
/// for integration tests that exercise the orchestrator and device façade
/// without a real wire connection.
pub struct FixtureTransport {
    snapshot: Mutex<RegisterSnapshot>,
}

impl FixtureTransport {
    pub fn new(snapshot: RegisterSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn connect(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn read_registers(&self, _function: ModbusFunction, start: u16, count: u16) -> Result<Vec<u16>, Error> {
        let snapshot = self.snapshot.lock().unwrap();
        let mut values = Vec::with_capacity(count as usize);
        for addr in start..start + count {
            values.push(snapshot.get(addr).unwrap_or(0));
        }
        Ok(values)
    }

    async fn write_single(&self, start: u16, value: u16) -> Result<(), Error> {
        self.snapshot.lock().unwrap().insert(start, value);
        Ok(())
    }

    async fn write_multiple(&self, start: u16, values: &[u16]) -> Result<(), Error> {
        self.snapshot.lock().unwrap().insert_block(start, values);
        Ok(())
    }
}
