use std::collections::HashSet;
use std::sync::{Mutex as StdMutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::codec::dongle::{self, RequestFrame, RequestPayload, TcpFunction};
use crate::codec::modbus_frame::ModbusFunction;
use crate::error::Error;
use crate::serial::Serial;
use crate::transport::state::{with_retry, ConnectionState, RetryConfig, TransportState};
use crate::transport::Transport;

const POST_CONNECT_DISCARD_MAX: usize = 512;
const POST_CONNECT_DISCARD_TIMEOUT: Duration = Duration::from_secs(1);
const MIN_INTER_READ_DELAY: Duration = Duration::from_millis(200);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_INTER_GROUP_DELAY: Duration = Duration::from_secs(1);

fn connected_hosts() -> &'static StdMutex<HashSet<String>> {
    static HOSTS: OnceLock<StdMutex<HashSet<String>>> = OnceLock::new();
    HOSTS.get_or_init(|| StdMutex::new(HashSet::new()))
}

/// The proprietary WiFi-dongle TCP protocol. The dongle accepts exactly one
/// concurrent client; a process-wide registry of "currently connected"
/// host:port pairs enforces that even across independently constructed
/// transport instances pointed at the same dongle.
pub struct DongleTcpTransport {
    host: String,
    port: u16,
    dongle_serial: Serial,
    inverter_serial: Serial,
    state: TransportState,
    stream: tokio::sync::Mutex<Option<TcpStream>>,
    last_function: std::sync::Mutex<Option<ModbusFunction>>,
    current_inter_group_delay: std::sync::Mutex<Duration>,
}

impl DongleTcpTransport {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        dongle_serial: Serial,
        inverter_serial: Serial,
        config: RetryConfig,
    ) -> Self {
        let base_delay = config.inter_group_delay;
        Self {
            host: host.into(),
            port,
            dongle_serial,
            inverter_serial,
            state: TransportState::new(config),
            stream: tokio::sync::Mutex::new(None),
            last_function: std::sync::Mutex::new(None),
            current_inter_group_delay: std::sync::Mutex::new(base_delay),
        }
    }

    fn host_key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resets the adaptive inter-group delay to its configured base; call
    /// at the start of a multi-group read.
    pub fn reset_inter_group_delay(&self) {
        *self.current_inter_group_delay.lock().unwrap() = self.state.config.inter_group_delay;
    }

    fn current_inter_group_delay(&self) -> Duration {
        *self.current_inter_group_delay.lock().unwrap()
    }

    /// Doubles the adaptive inter-group delay (capped) when the previous
    /// group's read had to retry.
    fn maybe_grow_inter_group_delay(&self) {
        if self.state.last_read_retried() {
            let mut d = self.current_inter_group_delay.lock().unwrap();
            *d = std::cmp::min(*d * 2, MAX_INTER_GROUP_DELAY);
        }
    }

    async fn pace(&self, function: ModbusFunction) {
        let changed = {
            let mut last = self.last_function.lock().unwrap();
            let changed = *last != Some(function);
            *last = Some(function);
            changed
        };
        let delay = if changed {
            self.current_inter_group_delay()
        } else {
            MIN_INTER_READ_DELAY
        };
        tokio::time::sleep(delay).await;
        self.maybe_grow_inter_group_delay();
    }

    async fn discard_unsolicited(stream: &mut TcpStream) {
        let mut buf = [0u8; POST_CONNECT_DISCARD_MAX];
        match tokio::time::timeout(POST_CONNECT_DISCARD_TIMEOUT, stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => debug!("dongle_tcp: discarded {} unsolicited bytes post-connect", n),
            _ => {}
        }
    }

    async fn do_connect(&self) -> Result<TcpStream, Error> {
        let key = self.host_key();
        {
            let mut hosts = connected_hosts().lock().unwrap();
            if hosts.contains(&key) {
                return Err(Error::connection(format!(
                    "dongle at {} already has a connection open",
                    key
                )));
            }
            hosts.insert(key.clone());
        }

        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let mut stream = match tokio::time::timeout(self.state.config.timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                connected_hosts().lock().unwrap().remove(&key);
                return Err(Error::from(e));
            }
            Err(_) => {
                connected_hosts().lock().unwrap().remove(&key);
                return Err(Error::timeout("connect", self.state.config.timeout));
            }
        };

        Self::discard_unsolicited(&mut stream).await;
        Ok(stream)
    }

    async fn request_response(&self, request: RequestFrame) -> Result<dongle::ResponseFrame, Error> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.do_connect().await?);
            self.state.set_connection_state(ConnectionState::Connected);
        }

        with_retry(&self.state, "dongle_tcp request", || async {
            let stream = guard.as_mut().ok_or_else(|| Error::connection("not connected"))?;
            let encoded = request.encode();
            stream.write_all(&encoded).await?;

            let mut header = [0u8; dongle::HEADER_LEN];
            stream.read_exact(&mut header).await?;
            let frame_length = u16::from_le_bytes([header[4], header[5]]) as usize;
            let remaining = frame_length + 6 - dongle::HEADER_LEN;
            let mut rest = vec![0u8; remaining];
            stream.read_exact(&mut rest).await?;

            let mut full = Vec::with_capacity(dongle::HEADER_LEN + remaining);
            full.extend_from_slice(&header);
            full.extend_from_slice(&rest);
            dongle::decode(&full)
        })
        .await
    }
}

#[async_trait]
impl Transport for DongleTcpTransport {
    fn name(&self) -> &'static str {
        "dongle_tcp"
    }

    async fn connect(&self) -> Result<(), Error> {
        let mut guard = self.stream.lock().await;
        *guard = Some(self.do_connect().await?);
        self.state.set_connection_state(ConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        let mut guard = self.stream.lock().await;
        self.state.set_connection_state(ConnectionState::Disconnecting);
        if let Some(mut stream) = guard.take() {
            match tokio::time::timeout(DISCONNECT_TIMEOUT, stream.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("dongle_tcp: error during disconnect: {}", e),
                Err(_) => warn!("dongle_tcp: disconnect timed out after {:?}", DISCONNECT_TIMEOUT),
            }
        }
        connected_hosts().lock().unwrap().remove(&self.host_key());
        self.state.set_connection_state(ConnectionState::Disconnected);
        Ok(())
    }

    async fn read_registers(
        &self,
        function: ModbusFunction,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, Error> {
        self.pace(function).await;
        let request = RequestFrame {
            tcp_function: TcpFunction::TranslatedData,
            dongle_serial: self.dongle_serial,
            inverter_serial: self.inverter_serial,
            modbus_function: function,
            start_register: start,
            payload: RequestPayload::Read { count },
        };
        let response = self.request_response(request).await?;
        Ok(response.registers)
    }

    async fn write_single(&self, start: u16, value: u16) -> Result<(), Error> {
        self.pace(ModbusFunction::WriteSingle).await;
        let request = RequestFrame {
            tcp_function: TcpFunction::TranslatedData,
            dongle_serial: self.dongle_serial,
            inverter_serial: self.inverter_serial,
            modbus_function: ModbusFunction::WriteSingle,
            start_register: start,
            payload: RequestPayload::WriteSingle { value },
        };
        self.request_response(request).await?;
        Ok(())
    }

    async fn write_multiple(&self, start: u16, values: &[u16]) -> Result<(), Error> {
        self.pace(ModbusFunction::WriteMultiple).await;
        let request = RequestFrame {
            tcp_function: TcpFunction::TranslatedData,
            dongle_serial: self.dongle_serial,
            inverter_serial: self.inverter_serial,
            modbus_function: ModbusFunction::WriteMultiple,
            start_register: start,
            payload: RequestPayload::WriteMultiple {
                values: values.to_vec(),
            },
        };
        self.request_response(request).await?;
        Ok(())
    }

    fn inter_group_delay(&self) -> Duration {
        self.current_inter_group_delay()
    }

    fn needs_reconnect(&self) -> bool {
        self.state.needs_reconnect()
    }

    fn last_read_retried(&self) -> bool {
        self.state.last_read_retried()
    }
}

impl Drop for DongleTcpTransport {
    fn drop(&mut self) {
        connected_hosts().lock().unwrap().remove(&self.host_key());
    }
}
