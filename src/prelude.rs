//! Common imports for internal modules.

pub use crate::error::{Error, Result};
pub use crate::serial::Serial;
pub use crate::snapshot::RegisterSnapshot;
pub use crate::unixtime::UnixTime;

pub use log::{debug, error, info, trace, warn};
