//! Runtime configuration for the plugin.

use std::time::Duration;

/// Plugin-level settings that are not part of the administrator-edited
/// configuration document.
///
/// Controls entitlement timing, license caching, and where collaborators live.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Identifier the host stores this plugin's configuration under.
    pub plugin_id: String,
    /// Product identifier sent to the license service.
    pub product_id: String,
    /// Display name used in notifications.
    pub product_name: String,
    /// Host domain the license is checked for (e.g. `example.cybozu.com`).
    pub domain: String,
    /// Base URL of the host REST API (e.g. `https://example.cybozu.com`).
    pub api_base_url: String,
    /// License service endpoint queried with `productId` and `kintoneDomain`.
    pub license_endpoint: String,
    /// Upper bound on waiting for the license checker to become available.
    pub entitlement_timeout: Duration,
    /// Delay between availability polls while waiting for the license checker.
    pub entitlement_poll_interval: Duration,
    /// Upper bound on a single remote license lookup.
    pub license_check_timeout: Duration,
    /// How long a positive license verdict stays cached.
    pub license_cache_ttl: Duration,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            plugin_id: String::new(),
            product_id: String::new(),
            product_name: "fieldlens".to_string(),
            domain: String::new(),
            api_base_url: String::new(),
            license_endpoint: String::new(),
            entitlement_timeout: Duration::from_millis(5_000),
            entitlement_poll_interval: Duration::from_millis(50),
            license_check_timeout: Duration::from_secs(10),
            license_cache_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_config_defaults() {
        let config = PluginConfig::default();
        assert_eq!(config.entitlement_timeout, Duration::from_secs(5));
        assert_eq!(config.entitlement_poll_interval, Duration::from_millis(50));
        assert_eq!(config.license_check_timeout, Duration::from_secs(10));
        assert_eq!(config.license_cache_ttl, Duration::from_secs(168 * 3600));
        assert!(config.plugin_id.is_empty());
        assert!(config.api_base_url.is_empty());
        assert_eq!(config.product_name, "fieldlens");
    }
}
