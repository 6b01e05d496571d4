use async_trait::async_trait;
use log::{debug, info};
use tokio_modbus::client::{rtu, Context, Reader, Writer};
use tokio_serial::SerialPortBuilderExt;

use crate::codec::modbus_frame::ModbusFunction;
use crate::error::Error;
use crate::transport::state::{with_retry, ConnectionState, RetryConfig, TransportState};
use crate::transport::Transport;

/// Modbus RTU over a serial port. Default 19200 baud, 8N1, unit id 1, as
/// used by the RS485 adapters this library targets.
pub struct ModbusRtuTransport {
    device_path: String,
    baud_rate: u32,
    unit_id: u8,
    state: TransportState,
    ctx: tokio::sync::Mutex<Option<Context>>,
}

impl ModbusRtuTransport {
    pub fn new(device_path: impl Into<String>, baud_rate: u32, unit_id: u8, config: RetryConfig) -> Self {
        Self {
            device_path: device_path.into(),
            baud_rate,
            unit_id,
            state: TransportState::new(config),
            ctx: tokio::sync::Mutex::new(None),
        }
    }

    async fn reconnect(&self, ctx: &mut Option<Context>) -> Result<(), Error> {
        self.state.set_connection_state(ConnectionState::Reconnecting);
        let mut delay = std::time::Duration::from_secs(1);
        let mut last_err = None;
        for attempt in 0..self.state.config.connection_retries {
            debug!(
                "modbus_rtu: connect attempt {} to {} @ {} baud",
                attempt + 1,
                self.device_path,
                self.baud_rate
            );
            let port = tokio_serial::new(&self.device_path, self.baud_rate).open_native_async();
            match port {
                Ok(serial) => {
                    let new_ctx = rtu::attach_slave(serial, self.unit_id.into());
                    *ctx = Some(new_ctx);
                    self.state.set_connection_state(ConnectionState::Connected);
                    self.state.record_success();
                    info!("modbus_rtu: opened {}", self.device_path);
                    return Ok(());
                }
                Err(e) => last_err = Some(Error::from(e)),
            }
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
        self.state.set_connection_state(ConnectionState::Disconnected);
        Err(last_err.unwrap_or_else(|| Error::connection("exhausted connection retries")))
    }

    async fn ensure_connected(&self, ctx: &mut Option<Context>) -> Result<(), Error> {
        if ctx.is_some() && !self.state.needs_reconnect() {
            return Ok(());
        }
        self.reconnect(ctx).await
    }
}

#[async_trait]
impl Transport for ModbusRtuTransport {
    fn name(&self) -> &'static str {
        "modbus_rtu"
    }

    async fn connect(&self) -> Result<(), Error> {
        let mut ctx = self.ctx.lock().await;
        self.reconnect(&mut ctx).await
    }

    async fn disconnect(&self) -> Result<(), Error> {
        let mut ctx = self.ctx.lock().await;
        self.state.set_connection_state(ConnectionState::Disconnecting);
        *ctx = None;
        self.state.set_connection_state(ConnectionState::Disconnected);
        Ok(())
    }

    async fn read_registers(
        &self,
        function: ModbusFunction,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, Error> {
        let mut ctx_guard = self.ctx.lock().await;
        self.ensure_connected(&mut ctx_guard).await?;

        with_retry(&self.state, "modbus_rtu read", || async {
            let ctx = ctx_guard
                .as_mut()
                .ok_or_else(|| Error::connection("not connected"))?;
            let result = match function {
                ModbusFunction::ReadInput => ctx.read_input_registers(start, count).await,
                ModbusFunction::ReadHolding => ctx.read_holding_registers(start, count).await,
                _ => return Err(Error::read("unsupported function for a register read")),
            };
            result
                .map_err(Error::from)?
                .map_err(|e| Error::read(format!("modbus exception: {:?}", e)))
        })
        .await
    }

    async fn write_single(&self, start: u16, value: u16) -> Result<(), Error> {
        let mut ctx_guard = self.ctx.lock().await;
        self.ensure_connected(&mut ctx_guard).await?;

        with_retry(&self.state, "modbus_rtu write_single", || async {
            let ctx = ctx_guard
                .as_mut()
                .ok_or_else(|| Error::connection("not connected"))?;
            ctx.write_single_register(start, value)
                .await
                .map_err(Error::from)?
                .map_err(|e| Error::write(format!("modbus exception: {:?}", e)))
        })
        .await
    }

    async fn write_multiple(&self, start: u16, values: &[u16]) -> Result<(), Error> {
        let mut ctx_guard = self.ctx.lock().await;
        self.ensure_connected(&mut ctx_guard).await?;

        with_retry(&self.state, "modbus_rtu write_multiple", || async {
            let ctx = ctx_guard
                .as_mut()
                .ok_or_else(|| Error::connection("not connected"))?;
            ctx.write_multiple_registers(start, values)
                .await
                .map_err(Error::from)?
                .map_err(|e| Error::write(format!("modbus exception: {:?}", e)))
        })
        .await
    }

    fn inter_group_delay(&self) -> std::time::Duration {
        self.state.config.inter_group_delay
    }

    fn needs_reconnect(&self) -> bool {
        self.state.needs_reconnect()
    }

    fn last_read_retried(&self) -> bool {
        self.state.last_read_retried()
    }
}
