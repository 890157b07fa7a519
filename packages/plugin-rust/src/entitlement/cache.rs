//! Time-bounded cache of license verdicts.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::traits::{ClockSource, LicenseVerdict};

/// Wire value stored for a positive verdict.
pub const RESULT_OK: &str = "ok";
/// Wire value stored for a negative verdict.
pub const RESULT_NG: &str = "ng";

/// Default clock source that reads the real system time.
#[derive(Debug, Clone)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// A stored verdict and when it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedLicense {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    /// Milliseconds since Unix epoch.
    pub timestamp: u64,
}

/// Verdicts keyed by product and domain.
///
/// Both outcomes are recorded, but only an unexpired `ok` entry lets a
/// caller skip the remote lookup.
pub struct LicenseCache {
    entries: DashMap<String, CachedLicense>,
    ttl: Duration,
    clock: Arc<dyn ClockSource>,
}

impl LicenseCache {
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn ClockSource>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// Cache key for a product on a domain.
    #[must_use]
    pub fn key(product_id: &str, domain: &str) -> String {
        format!("license_{product_id}_{domain}")
    }

    /// Returns the license type of an unexpired positive entry.
    ///
    /// The outer `Option` is `None` when the entry is missing, expired, or
    /// negative.
    #[must_use]
    pub fn cached_grant(&self, key: &str) -> Option<Option<String>> {
        let entry = self.entries.get(key)?;
        if entry.result != RESULT_OK || !self.is_fresh(entry.timestamp) {
            return None;
        }
        Some(entry.license_type.clone())
    }

    /// Records a remote verdict stamped with the current time.
    pub fn record(&self, key: &str, verdict: &LicenseVerdict) {
        let (result, license_type) = match verdict {
            LicenseVerdict::Valid { license_type } => (RESULT_OK, license_type.clone()),
            LicenseVerdict::Invalid => (RESULT_NG, None),
        };
        self.entries.insert(
            key.to_string(),
            CachedLicense {
                result: result.to_string(),
                license_type,
                timestamp: self.clock.now(),
            },
        );
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<CachedLicense> {
        self.entries.get(key).map(|e| e.clone())
    }

    fn is_fresh(&self, timestamp: u64) -> bool {
        if timestamp == 0 {
            return false;
        }
        let ttl_ms = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        self.clock.now().saturating_sub(timestamp) < ttl_ms
    }
}

impl std::fmt::Debug for LicenseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
