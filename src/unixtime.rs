use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic-enough wall clock timestamp used to stamp cache entries and
/// decoded snapshots. Not a monotonic clock in the strict sense (it reads
/// the system clock), but every cache comparison in this crate only ever
/// compares timestamps taken from the same process, which is sufficient for
/// "is this cache entry stale" decisions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct UnixTime(u64);

impl UnixTime {
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn elapsed_secs_since(&self, earlier: UnixTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn is_older_than(&self, now: UnixTime, max_age_secs: u64) -> bool {
        now.elapsed_secs_since(*self) > max_age_secs
    }
}
