//! Per-session entitlement gate.
//!
//! The license checker is loaded independently of the plugin and registers
//! itself in a [`CheckerSlot`] at some point after startup. The gate polls
//! the slot until the checker shows up or the availability timeout expires,
//! then asks it (through the [`LicenseCache`]) whether the product is
//! licensed for the domain. The outcome is computed once per session.

pub mod cache;
pub mod http;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::{info, warn};

pub use cache::{CachedLicense, LicenseCache, SystemClock};
pub use http::HttpLicenseChecker;

use crate::config::PluginConfig;
use crate::traits::{LicenseChecker, LicenseVerdict, NoticeLevel, Notifier};

/// Session-level licensing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entitlement {
    /// Licensed; features are enabled.
    Granted { license_type: Option<String> },
    /// The license service said the product is not registered for the domain.
    Denied,
    /// The license checker never became available.
    Unavailable,
    /// The license service could not be reached or answered garbage.
    CheckFailed,
}

impl Entitlement {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

impl fmt::Display for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted { .. } => f.write_str("license granted"),
            Self::Denied => f.write_str("license not registered"),
            Self::Unavailable => f.write_str("license checker unavailable"),
            Self::CheckFailed => f.write_str("license check failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// CheckerSlot
// ---------------------------------------------------------------------------

/// Late-bound registration point for the license checker.
#[derive(Default)]
pub struct CheckerSlot {
    checker: RwLock<Option<Arc<dyn LicenseChecker>>>,
}

impl CheckerSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that already holds a checker.
    #[must_use]
    pub fn loaded(checker: Arc<dyn LicenseChecker>) -> Self {
        let slot = Self::new();
        slot.install(checker);
        slot
    }

    pub fn install(&self, checker: Arc<dyn LicenseChecker>) {
        *self.checker.write() = Some(checker);
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<dyn LicenseChecker>> {
        self.checker.read().clone()
    }
}

impl fmt::Debug for CheckerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckerSlot")
            .field("loaded", &self.checker.read().is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EntitlementGate
// ---------------------------------------------------------------------------

/// Decides once per session whether licensed features are enabled.
///
/// Never returns an error: every failure path resolves to a disabled
/// [`Entitlement`], with at most one user notification.
pub struct EntitlementGate {
    product_id: String,
    product_name: String,
    domain: String,
    availability_timeout: Duration,
    poll_interval: Duration,
    check_timeout: Duration,
    slot: Arc<CheckerSlot>,
    cache: Arc<LicenseCache>,
    notifier: Arc<dyn Notifier>,
    outcome: OnceCell<Entitlement>,
}

impl EntitlementGate {
    #[must_use]
    pub fn new(
        config: &PluginConfig,
        slot: Arc<CheckerSlot>,
        cache: Arc<LicenseCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            product_id: config.product_id.clone(),
            product_name: config.product_name.clone(),
            domain: config.domain.clone(),
            availability_timeout: config.entitlement_timeout,
            poll_interval: config.entitlement_poll_interval,
            check_timeout: config.license_check_timeout,
            slot,
            cache,
            notifier,
            outcome: OnceCell::new(),
        }
    }

    /// Resolves the session's entitlement, computing it on the first call.
    ///
    /// Concurrent callers share a single in-flight resolution.
    pub async fn check_once(&self) -> Entitlement {
        self.outcome.get_or_init(|| self.resolve()).await.clone()
    }

    /// The memoized outcome, if resolution has finished.
    #[must_use]
    pub fn resolved(&self) -> Option<&Entitlement> {
        self.outcome.get()
    }

    async fn resolve(&self) -> Entitlement {
        let Some(checker) = self.wait_for_checker().await else {
            warn!(
                timeout_ms = self.availability_timeout.as_millis(),
                "license checker not loaded, features disabled"
            );
            return Entitlement::Unavailable;
        };

        let key = LicenseCache::key(&self.product_id, &self.domain);
        if let Some(license_type) = self.cache.cached_grant(&key) {
            info!(product = %self.product_name, "license ok (cached)");
            return Entitlement::Granted { license_type };
        }

        let verdict =
            tokio::time::timeout(self.check_timeout, checker.check(&self.product_id, &self.domain))
                .await
                .map_err(|_| anyhow::anyhow!("license check timed out"))
                .and_then(|result| result);

        match verdict {
            Ok(verdict) => {
                self.cache.record(&key, &verdict);
                match verdict {
                    LicenseVerdict::Valid { license_type } => {
                        info!(product = %self.product_name, ?license_type, "license ok");
                        Entitlement::Granted { license_type }
                    }
                    LicenseVerdict::Invalid => {
                        warn!(product = %self.product_name, "license not registered");
                        self.notifier.notify(
                            NoticeLevel::Danger,
                            &format!("{}: license not registered.", self.product_name),
                        );
                        Entitlement::Denied
                    }
                }
            }
            Err(err) => {
                warn!(product = %self.product_name, error = %err, "license check failed");
                self.notifier.notify(
                    NoticeLevel::Danger,
                    &format!(
                        "{}: license check failed. Check your network connection.",
                        self.product_name
                    ),
                );
                Entitlement::CheckFailed
            }
        }
    }

    /// Polls the slot until a checker is installed or the timeout expires.
    async fn wait_for_checker(&self) -> Option<Arc<dyn LicenseChecker>> {
        let deadline = tokio::time::Instant::now() + self.availability_timeout;

        loop {
            if let Some(checker) = self.slot.current() {
                return Some(checker);
            }

            if tokio::time::Instant::now() >= deadline {
                return None;
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl fmt::Debug for EntitlementGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitlementGate")
            .field("product_id", &self.product_id)
            .field("domain", &self.domain)
            .field("outcome", &self.outcome.get())
            .finish_non_exhaustive()
    }
}
