use std::time::Duration;
use thiserror::Error;

/// Error kinds surfaced to callers of this crate.
///
/// Transient per-read failures are retried locally by the transport per its
/// own policy (see `transport::state`) and only reach a caller once that
/// budget is exhausted. Canary and monotonicity rejections are never
/// surfaced as errors — the caller sees a stale-but-valid cache instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("operation {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("read error: {message}")]
    Read { message: String },

    #[error("write error: {message}")]
    Write { message: String },

    #[error("operation '{operation}' is not supported by the {transport} transport")]
    UnsupportedOperation {
        operation: &'static str,
        transport: &'static str,
    },

    #[error("device error: {message}")]
    Device { message: String },

    #[error("validation error: {message}")]
    Validation { message: String },
}

impl Error {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn connection_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    pub fn unsupported(operation: &'static str, transport: &'static str) -> Self {
        Self::UnsupportedOperation {
            operation,
            transport,
        }
    }

    pub fn device(message: impl Into<String>) -> Self {
        Self::Device {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Connection {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Creates a `Error::Read` tagged with the current file and line, the same
/// shape as the crate's other `file!()`-stamped error helpers.
#[macro_export]
macro_rules! read_error {
    ($($arg:tt)*) => {
        $crate::error::Error::read(format!(
            "[{}:{}] {}",
            std::path::Path::new(file!()).file_name().unwrap().to_string_lossy(),
            line!(),
            format!($($arg)*)
        ))
    };
}
