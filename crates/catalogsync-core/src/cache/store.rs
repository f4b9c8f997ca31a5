use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_TTL_DAYS;

use super::backend::{MemoryStorage, StorageBackend};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Upper bound for any TTL handed to the store.
pub const MAX_TTL_DAYS: u32 = 3650;

fn clamp_ttl(ttl_days: u32) -> u32 {
    if ttl_days > MAX_TTL_DAYS {
        warn!(ttl_days = ttl_days, max = MAX_TTL_DAYS, "Clamping cache TTL");
        MAX_TTL_DAYS
    } else {
        ttl_days
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub payload: T,
    pub written_at: DateTime<Utc>,
    pub ttl_days: u32,
}

impl<T> CachedData<T> {
    pub fn new(payload: T, written_at: DateTime<Utc>, ttl_days: u32) -> Self {
        Self {
            payload,
            written_at,
            ttl_days,
        }
    }

    /// `None` when the expiry falls outside the representable date range,
    /// which only a corrupt or hand-edited entry can produce.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.written_at
            .checked_add_signed(Duration::days(i64::from(self.ttl_days)))
    }

    /// Fractional days until expiry; zero or negative once expired.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<f64> {
        self.expires_at()
            .map(|expires_at| (expires_at - now).num_seconds() as f64 / SECONDS_PER_DAY)
    }

    /// Coarse age label. Hours and days round to the nearest unit; a write
    /// stamped in the future reads as "just now".
    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = (now - self.written_at).num_minutes().max(0);
        match minutes {
            0 => "just now".to_string(),
            1..=59 => format!("{}m ago", minutes),
            60..=1439 => format!("{}h ago", (minutes + 30) / 60),
            _ => format!("{}d ago", (minutes + 720) / 1440),
        }
    }
}

/// Diagnostics view of a persistent entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistentInfo {
    pub days_remaining: f64,
    pub written_at: DateTime<Utc>,
    /// Human-readable age, e.g. `"3h ago"`.
    pub age: String,
}

pub struct TtlStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    default_ttl_days: u32,
}

impl TtlStore {
    pub fn new(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            default_ttl_days: DEFAULT_TTL_DAYS,
        }
    }

    /// Process-local store on the wall clock.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(SystemClock))
    }

    /// TTLs above `MAX_TTL_DAYS` are clamped.
    pub fn with_default_ttl(mut self, ttl_days: u32) -> Self {
        self.default_ttl_days = clamp_ttl(ttl_days);
        self
    }

    pub fn default_ttl_days(&self) -> u32 {
        self.default_ttl_days
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_entry(key).map(|entry| entry.payload)
    }

    /// Like `get`, keeping the metadata. Expired or unreadable entries are
    /// removed and reported as a miss.
    pub fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let contents = self.read(key)?;

        let entry: CachedData<T> = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = key, error = %e, "Discarding unreadable persistent entry");
                self.remove(key);
                return None;
            }
        };

        let Some(expires_at) = entry.expires_at() else {
            warn!(key = key, ttl_days = entry.ttl_days, "Discarding persistent entry with out-of-range expiry");
            self.remove(key);
            return None;
        };

        if self.now() > expires_at {
            debug!(
                key = key,
                written_at = %entry.written_at,
                ttl_days = entry.ttl_days,
                "Persistent entry expired"
            );
            self.remove(key);
            return None;
        }

        Some(entry)
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        self.set_with_ttl(key, value, self.default_ttl_days)
    }

    /// Overwrites unconditionally. Returns false when the write degraded to
    /// a no-op.
    pub fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_days: u32) -> bool {
        let entry = CachedData::new(value, self.now(), clamp_ttl(ttl_days));
        let contents = match serde_json::to_string(&entry) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to serialize persistent entry");
                return false;
            }
        };

        match self.backend.write(key, &contents) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to write persistent entry");
                false
            }
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.delete(key) {
            warn!(key = key, error = %e, "Failed to remove persistent entry");
        }
    }

    /// Expiry metadata without eviction: an expired entry reports
    /// `days_remaining <= 0` and stays in place.
    pub fn get_info(&self, key: &str) -> Option<PersistentInfo> {
        let entry = self.peek(key)?;
        let now = self.now();
        let Some(days_remaining) = entry.days_remaining(now) else {
            warn!(key = key, ttl_days = entry.ttl_days, "Persistent entry has an out-of-range expiry");
            return None;
        };
        Some(PersistentInfo {
            days_remaining,
            written_at: entry.written_at,
            age: entry.age_display(now),
        })
    }

    fn peek(&self, key: &str) -> Option<CachedData<IgnoredAny>> {
        let contents = self.read(key)?;
        match serde_json::from_str(&contents) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(key = key, error = %e, "Failed to parse persistent entry metadata");
                None
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.read(key) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read persistent entry");
                None
            }
        }
    }
}
