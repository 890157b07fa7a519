//! Session wiring: one entitlement decision shared by every surface.
//!
//! A session owns the collaborators (schema provider, config store,
//! notifier) and the [`EntitlementGate`]. Each page activation gets its own
//! [`PageActivation`] and is dropped on navigation; the session outlives them.

use std::sync::Arc;

use tracing::info;

use crate::config::PluginConfig;
use crate::config_page::ConfigPage;
use crate::entitlement::{CheckerSlot, Entitlement, EntitlementGate, LicenseCache, SystemClock};
use crate::error::PluginError;
use crate::report_page::{FieldCodeAnnotator, UsageReportPage};
use crate::search::{PageActivation, SearchSurface};
use crate::traits::{ConfigStore, Notifier, SchemaProvider};

/// Collaborators and per-session state of the plugin.
pub struct PluginSession {
    config: PluginConfig,
    provider: Arc<dyn SchemaProvider>,
    store: Arc<dyn ConfigStore>,
    checker_slot: Arc<CheckerSlot>,
    gate: EntitlementGate,
}

impl PluginSession {
    /// Creates a session with a fresh license cache on the system clock.
    ///
    /// The license checker is installed later through [`checker_slot`](Self::checker_slot).
    #[must_use]
    pub fn new(
        config: PluginConfig,
        provider: Arc<dyn SchemaProvider>,
        store: Arc<dyn ConfigStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let cache = Arc::new(LicenseCache::new(
            config.license_cache_ttl,
            Arc::new(SystemClock),
        ));
        Self::with_cache(config, provider, store, notifier, cache)
    }

    /// Creates a session sharing an existing license cache.
    #[must_use]
    pub fn with_cache(
        config: PluginConfig,
        provider: Arc<dyn SchemaProvider>,
        store: Arc<dyn ConfigStore>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<LicenseCache>,
    ) -> Self {
        let checker_slot = Arc::new(CheckerSlot::new());
        let gate = EntitlementGate::new(&config, Arc::clone(&checker_slot), cache, notifier);
        Self {
            config,
            provider,
            store,
            checker_slot,
            gate,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Where the license checker registers once loaded.
    #[must_use]
    pub fn checker_slot(&self) -> Arc<CheckerSlot> {
        Arc::clone(&self.checker_slot)
    }

    #[must_use]
    pub fn gate(&self) -> &EntitlementGate {
        &self.gate
    }

    /// The session's entitlement, resolved on first use.
    pub async fn entitlement(&self) -> Entitlement {
        self.gate.check_once().await
    }

    /// Starts a new page activation for an application.
    #[must_use]
    pub fn activate_page(&self, app_id: impl Into<String>) -> PageActivation {
        let activation = PageActivation::new(app_id);
        info!(app = %activation.app_id(), "page activated");
        activation
    }

    /// Builds the search bar for an activation.
    ///
    /// Returns `None` when the session is not licensed or the activation was
    /// torn down before the surface was ready.
    pub async fn search_surface(&self, activation: &PageActivation) -> Option<SearchSurface> {
        if !self.entitlement().await.is_enabled() {
            return None;
        }
        SearchSurface::activate(
            activation,
            self.provider.as_ref(),
            self.store.as_ref(),
            &self.config.plugin_id,
        )
        .await
    }

    /// Field code annotations for the record detail view of an activation.
    pub async fn field_code_annotator(
        &self,
        activation: &PageActivation,
    ) -> Option<FieldCodeAnnotator> {
        FieldCodeAnnotator::prepare(
            activation,
            &self.gate,
            self.provider.as_ref(),
            self.store.as_ref(),
            &self.config.plugin_id,
        )
        .await
    }

    /// Opens the search configuration page.
    ///
    /// # Errors
    ///
    /// See [`ConfigPage::open`].
    pub async fn config_page(&self, app_id: &str) -> Result<ConfigPage, PluginError> {
        ConfigPage::open(
            &self.gate,
            self.provider.as_ref(),
            self.store.as_ref(),
            &self.config.plugin_id,
            app_id,
        )
        .await
    }

    /// Opens the usage report page.
    ///
    /// # Errors
    ///
    /// See [`UsageReportPage::open`].
    pub async fn usage_report(&self, app_id: &str) -> Result<UsageReportPage, PluginError> {
        UsageReportPage::open(
            &self.gate,
            self.provider.as_ref(),
            self.store.as_ref(),
            &self.config.plugin_id,
            app_id,
        )
        .await
    }

    #[must_use]
    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn provider(&self) -> &dyn SchemaProvider {
        self.provider.as_ref()
    }
}

impl std::fmt::Debug for PluginSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSession")
            .field("plugin_id", &self.config.plugin_id)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::entitlement::tests::{granted, ScriptedChecker};
    use crate::notify::RecordingNotifier;
    use crate::provider::StaticSchemaProvider;
    use crate::store::MemoryConfigStore;

    fn session() -> PluginSession {
        let config = PluginConfig {
            plugin_id: "plugin".to_string(),
            entitlement_timeout: Duration::from_millis(200),
            ..PluginConfig::default()
        };
        PluginSession::new(
            config,
            Arc::new(StaticSchemaProvider::new()),
            Arc::new(MemoryConfigStore::new()),
            Arc::new(RecordingNotifier::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_are_disabled_without_checker() {
        let session = session();
        let activation = session.activate_page("1");

        assert!(session.search_surface(&activation).await.is_none());
        assert!(matches!(
            session.config_page("1").await,
            Err(PluginError::NotEntitled(Entitlement::Unavailable))
        ));
    }

    #[tokio::test]
    async fn installed_checker_enables_search() {
        let session = session();
        session
            .checker_slot()
            .install(Arc::new(ScriptedChecker::answering(granted())));

        let activation = session.activate_page("1");
        let surface = session.search_surface(&activation).await.unwrap();
        assert!(!surface.is_configured());
        assert!(session.entitlement().await.is_enabled());
    }
}
