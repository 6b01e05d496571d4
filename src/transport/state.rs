use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use log::warn;
use tokio::sync::Mutex;

use crate::error::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Reconnecting,
}

#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_base_delay: Duration,
    pub inter_group_delay: Duration,
    pub max_consecutive_errors: u32,
    pub connection_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 3,
            retry_base_delay: Duration::from_millis(250),
            inter_group_delay: Duration::from_millis(200),
            max_consecutive_errors: 5,
            connection_retries: 3,
        }
    }
}

/// Per-transport shared state: the async mutex serializing every wire
/// operation, the consecutive-error counter that drives automatic
/// reconnection, and the adaptive inter-group pacing flag.
pub struct TransportState {
    pub lock: Mutex<()>,
    state: std::sync::Mutex<ConnectionState>,
    consecutive_errors: AtomicU32,
    last_read_retried: AtomicBool,
    pub config: RetryConfig,
}

impl TransportState {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            lock: Mutex::new(()),
            state: std::sync::Mutex::new(ConnectionState::Disconnected),
            consecutive_errors: AtomicU32::new(0),
            last_read_retried: AtomicBool::new(false),
            config,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    pub fn set_connection_state(&self, s: ConnectionState) {
        *self.state.lock().unwrap() = s;
    }

    pub fn record_success(&self) {
        self.consecutive_errors.store(0, Ordering::SeqCst);
    }

    /// Returns true once the consecutive-error threshold is reached,
    /// meaning the caller should reconnect before the next group read.
    pub fn record_failure(&self) -> bool {
        let n = self.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1;
        n >= self.config.max_consecutive_errors
    }

    pub fn needs_reconnect(&self) -> bool {
        self.consecutive_errors.load(Ordering::SeqCst) >= self.config.max_consecutive_errors
    }

    pub fn set_last_read_retried(&self, retried: bool) {
        self.last_read_retried.store(retried, Ordering::SeqCst);
    }

    pub fn last_read_retried(&self) -> bool {
        self.last_read_retried.load(Ordering::SeqCst)
    }
}

/// Runs `op` with exponential backoff: `retry_base_delay * 2^attempt`
/// between attempts, up to `retries` retries. Sets `last_read_retried` on
/// `state` if any retry occurred. Records success/failure on `state`.
pub async fn with_retry<F, Fut, T>(
    state: &TransportState,
    operation_name: &'static str,
    mut op: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0u32;
    let mut retried = false;
    loop {
        match tokio::time::timeout(state.config.timeout, op()).await {
            Ok(Ok(value)) => {
                state.record_success();
                state.set_last_read_retried(retried);
                return Ok(value);
            }
            Ok(Err(e)) => {
                let exhausted = state.record_failure();
                if attempt >= state.config.retries {
                    return Err(e);
                }
                if exhausted {
                    warn!("{}: consecutive-error threshold reached", operation_name);
                }
                retried = true;
                let delay = state.config.retry_base_delay * 2u32.pow(attempt);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(_) => {
                state.record_failure();
                if attempt >= state.config.retries {
                    return Err(Error::timeout(operation_name, state.config.timeout));
                }
                retried = true;
                let delay = state.config.retry_base_delay * 2u32.pow(attempt);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32 as Counter;
    use std::sync::Arc;

    #[tokio::test]
    async fn retries_then_succeeds_and_flags_retried() {
        let state = TransportState::new(RetryConfig {
            retry_base_delay: Duration::from_millis(1),
            ..Default::default()
        });
        let attempts = Arc::new(Counter::new(0));
        let a = attempts.clone();
        let result: Result<u32, Error> = with_retry(&state, "test", || {
            let a = a.clone();
            async move {
                let n = a.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::read("transient"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert!(state.last_read_retried());
    }

    #[tokio::test]
    async fn exhausts_retries_and_surfaces_error() {
        let state = TransportState::new(RetryConfig {
            retries: 1,
            retry_base_delay: Duration::from_millis(1),
            ..Default::default()
        });
        let result: Result<u32, Error> = with_retry(&state, "test", || async { Err(Error::read("always fails")) }).await;
        assert!(result.is_err());
    }
}
