use async_trait::async_trait;
use fieldlens_core::{FormFields, Layout, RawConfig, UsageBundle};

/// Read access to an application's schema and configuration surfaces.
/// Implementations: host REST API, in-memory fixtures (tests, CLI).
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Current field definitions of an application.
    async fn form_fields(&self, app: &str) -> anyhow::Result<FormFields>;

    /// Current form layout of an application.
    async fn form_layout(&self, app: &str) -> anyhow::Result<Layout>;

    /// Views, notifications, workflow, customization, reports, and actions.
    async fn usage_bundle(&self, app: &str) -> anyhow::Result<UsageBundle>;
}

/// Key/value persistence of plugin configuration, keyed by plugin identifier.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the whole configuration document. A never-saved plugin yields an empty map.
    async fn load(&self, plugin_id: &str) -> anyhow::Result<RawConfig>;

    /// Replace the whole configuration document in one write.
    async fn save(&self, plugin_id: &str, config: RawConfig) -> anyhow::Result<()>;
}

/// Outcome of a remote license lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseVerdict {
    /// The product is licensed for the domain.
    Valid {
        /// License tier reported by the license service, if any.
        license_type: Option<String>,
    },
    /// The license service answered, and the product is not licensed.
    Invalid,
}

/// Remote entitlement lookup for a product on a host domain.
#[async_trait]
pub trait LicenseChecker: Send + Sync {
    async fn check(&self, product_id: &str, domain: &str) -> anyhow::Result<LicenseVerdict>;
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Danger,
}

/// The single channel for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, text: &str);
}

/// Abstraction over the system clock, so cache expiry can be tested deterministically.
pub trait ClockSource: Send + Sync {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now(&self) -> u64;
}
