//! Connection lifecycle, per-transport locking, and the pluggable
//! transports themselves: standard Modbus TCP/RTU via a conventional
//! library, the proprietary dongle TCP protocol, and the cloud HTTP
//! adapter.

pub mod dongle_tcp;
pub mod http;
pub mod modbus_rtu;
pub mod modbus_tcp;
pub mod state;

use async_trait::async_trait;
use serde_json::Value;

use crate::codec::modbus_frame::ModbusFunction;
use crate::error::Error;

/// Elected once at construction; every operation on a device is routed
/// through exactly one transport for its lifetime.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn connect(&self) -> Result<(), Error>;
    async fn disconnect(&self) -> Result<(), Error>;

    async fn read_registers(
        &self,
        function: ModbusFunction,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, Error>;

    async fn write_single(&self, start: u16, value: u16) -> Result<(), Error>;

    async fn write_multiple(&self, start: u16, values: &[u16]) -> Result<(), Error>;

    /// Whether this transport can serve the cloud-only operations (e.g.
    /// firmware-update history). Modbus-family transports return false;
    /// callers get `Error::UnsupportedOperation`.
    fn supports_cloud_only_operations(&self) -> bool {
        false
    }

    /// Fetches a cloud JSON document by relative path, for transports that
    /// back data classes via `from_http_response` rather than register
    /// reads. Modbus-family transports have no notion of this and return
    /// `Error::UnsupportedOperation`.
    async fn fetch_json(&self, _path: &str) -> Result<Value, Error> {
        Err(Error::unsupported("fetch_json", self.name()))
    }

    /// The pacing delay the orchestrator should sleep between groups in a
    /// multi-group read, doubling (per transport policy) after a group
    /// that required a retry. HTTP has no notion of register groups and
    /// uses a zero delay.
    fn inter_group_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(0)
    }

    /// True once the consecutive-error counter has reached this
    /// transport's threshold; the orchestrator reconnects before issuing
    /// the next multi-group read.
    fn needs_reconnect(&self) -> bool {
        false
    }

    /// True if the most recently completed read/write needed at least one
    /// retry, used by the orchestrator to grow the inter-group delay.
    fn last_read_retried(&self) -> bool {
        false
    }
}
