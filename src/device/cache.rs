//! Generic TTL cache: one independent lock per cache instance, so refreshing
//! runtime data never blocks a concurrent energy refresh on the same
//! device. Concurrent refreshes of the *same* cache serialize on the lock
//! so only one wire read happens per stale window.

use tokio::sync::Mutex;

use crate::unixtime::UnixTime;

struct Entry<T> {
    value: T,
    taken_at: UnixTime,
}

pub struct TtlCache<T> {
    ttl: std::time::Duration,
    entry: Mutex<Option<Entry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> std::time::Duration {
        self.ttl
    }

    /// `true` if there's no cached value yet, or the cached value is older
    /// than `ttl`.
    pub async fn is_stale(&self) -> bool {
        let guard = self.entry.lock().await;
        match &*guard {
            None => true,
            Some(entry) => UnixTime::now().elapsed_secs_since(entry.taken_at) > self.ttl.as_secs(),
        }
    }

    pub async fn get(&self) -> Option<T> {
        self.entry.lock().await.as_ref().map(|e| e.value.clone())
    }

    /// Returns the cached value together with its age, if present.
    pub async fn get_with_age(&self) -> Option<(T, std::time::Duration)> {
        let guard = self.entry.lock().await;
        guard.as_ref().map(|e| {
            let age = UnixTime::now().elapsed_secs_since(e.taken_at);
            (e.value.clone(), std::time::Duration::from_secs(age))
        })
    }

    /// Replaces the cached value and resets its timestamp. A canary
    /// rejection upstream should call neither this nor anything else —
    /// the stale entry and its timestamp are simply left untouched, which
    /// is what "keep the previous cached snapshot" means in practice.
    pub async fn set(&self, value: T) {
        let mut guard = self.entry.lock().await;
        *guard = Some(Entry {
            value,
            taken_at: UnixTime::now(),
        });
    }

    /// Forces the cache to be considered stale on the next `is_stale` call
    /// without discarding the value, for `refresh(force=true)`.
    pub async fn invalidate(&self) {
        let mut guard = self.entry.lock().await;
        if let Some(entry) = guard.as_mut() {
            entry.taken_at = UnixTime::from_secs(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_cache_is_stale() {
        let cache: TtlCache<u32> = TtlCache::new(std::time::Duration::from_secs(30));
        assert!(cache.is_stale().await);
    }

    #[tokio::test]
    async fn freshly_set_value_is_not_stale() {
        let cache: TtlCache<u32> = TtlCache::new(std::time::Duration::from_secs(30));
        cache.set(42).await;
        assert!(!cache.is_stale().await);
        assert_eq!(cache.get().await, Some(42));
    }

    #[tokio::test]
    async fn invalidate_forces_staleness_without_dropping_value() {
        let cache: TtlCache<u32> = TtlCache::new(std::time::Duration::from_secs(30));
        cache.set(42).await;
        cache.invalidate().await;
        assert!(cache.is_stale().await);
        assert_eq!(cache.get().await, Some(42));
    }
}
