//! Smart-search surface: per-activation field metadata, reconciliation of the
//! saved search configuration, and query synthesis for the search bar.

use fieldlens_core::{
    reconcile, ChoiceIndex, DriftReason, FieldCatalog, FormFields, LiveSchema, QueryPlan,
    RawConfig, ReconciliationResult, SearchConfig, SearchSettings, Target,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::lifecycle::SurfaceLifecycle;
use crate::traits::{ConfigStore, SchemaProvider};

// ---------------------------------------------------------------------------
// PageActivation
// ---------------------------------------------------------------------------

/// Field definitions of the current application, fetched for one activation.
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    pub form: FormFields,
    pub catalog: FieldCatalog,
}

impl From<FormFields> for FieldMetadata {
    fn from(form: FormFields) -> Self {
        let catalog = FieldCatalog::from(&form);
        Self { form, catalog }
    }
}

/// State scoped to one activation of a page.
///
/// Field metadata is fetched at most once per activation and handed to every
/// consumer explicitly. Navigating away tears the activation down; the next
/// page gets a fresh `PageActivation` and fetches again.
#[derive(Debug)]
pub struct PageActivation {
    app_id: String,
    lifecycle: SurfaceLifecycle,
    metadata: OnceCell<FieldMetadata>,
}

impl PageActivation {
    #[must_use]
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            lifecycle: SurfaceLifecycle::new(),
            metadata: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn lifecycle(&self) -> &SurfaceLifecycle {
        &self.lifecycle
    }

    /// Field metadata for this activation, fetching it on first use.
    ///
    /// A failed fetch is not cached; the next caller tries again.
    ///
    /// # Errors
    ///
    /// Returns the provider's error when the fetch fails.
    pub async fn metadata(&self, provider: &dyn SchemaProvider) -> anyhow::Result<&FieldMetadata> {
        self.metadata
            .get_or_try_init(|| async {
                let form = provider.form_fields(&self.app_id).await?;
                debug!(app = %self.app_id, fields = form.properties.len(), "field metadata loaded");
                Ok::<_, anyhow::Error>(FieldMetadata::from(form))
            })
            .await
    }

    /// Metadata already fetched by this activation, if any.
    #[must_use]
    pub fn cached_metadata(&self) -> Option<&FieldMetadata> {
        self.metadata.get()
    }

    /// Ends the activation. Outstanding fetches are discarded.
    pub fn navigate_away(&self) {
        self.lifecycle.tear_down();
    }
}

// ---------------------------------------------------------------------------
// SearchSurface
// ---------------------------------------------------------------------------

/// Text of the passive warning shown when the configuration has drifted.
pub const DRIFT_WARNING: &str =
    "Some search fields have changed since the search settings were saved. \
     Ask an administrator to review the plugin settings.";

/// A configured field excluded from search, with the label it had when saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftedField {
    pub code: String,
    pub label: Option<String>,
    pub reason: DriftReason,
}

/// Data for the passive warning next to the search bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftWarning {
    pub message: &'static str,
    pub fields: Vec<DriftedField>,
    /// Every target drifted and the unvalidated list is in use.
    pub fell_back: bool,
}

/// The search bar of one activation.
///
/// Built once per activation by [`activate`](Self::activate); afterwards
/// [`query_for`](Self::query_for) is synchronous and can run on every
/// keystroke.
#[derive(Debug, Clone)]
pub struct SearchSurface {
    config: SearchConfig,
    reconciliation: ReconciliationResult,
    choices: ChoiceIndex,
}

impl SearchSurface {
    /// Loads the saved configuration, reconciles it against the live schema,
    /// and marks the activation ready.
    ///
    /// Never fails: an unreadable configuration means no search fields, and a
    /// failed schema fetch means the saved targets are used unvalidated.
    /// Returns `None` only when the activation was torn down first.
    pub async fn activate(
        activation: &PageActivation,
        provider: &dyn SchemaProvider,
        store: &dyn ConfigStore,
        plugin_id: &str,
    ) -> Option<Self> {
        let surface = activation
            .lifecycle()
            .run_until_teardown(Self::prepare(activation, provider, store, plugin_id))
            .await?;

        if !activation.lifecycle().set_ready() {
            return None;
        }
        Some(surface)
    }

    async fn prepare(
        activation: &PageActivation,
        provider: &dyn SchemaProvider,
        store: &dyn ConfigStore,
        plugin_id: &str,
    ) -> Self {
        let raw = match store.load(plugin_id).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(plugin_id, error = %err, "config unreadable, search disabled");
                RawConfig::default()
            }
        };
        let config = SearchConfig::from_raw(&raw);

        if !config.is_configured() {
            info!(app = %activation.app_id(), "search not configured");
            return Self::from_parts(config, ReconciliationResult::default());
        }

        let reconciliation = match activation.metadata(provider).await {
            Ok(metadata) => {
                let live = LiveSchema::from_catalog(&metadata.catalog);
                reconcile(&config.snapshot, &config.targets, &live)
            }
            Err(err) => {
                warn!(
                    app = %activation.app_id(),
                    error = %err,
                    "live schema unavailable, using saved search fields unvalidated"
                );
                ReconciliationResult::assume_ok(&config.targets)
            }
        };

        if reconciliation.mismatch_detected {
            warn!(
                app = %activation.app_id(),
                dropped = ?reconciliation.dropped_codes().collect::<Vec<_>>(),
                fell_back = reconciliation.fell_back,
                "search settings out of date"
            );
        }

        Self::from_parts(config, reconciliation)
    }

    /// Builds a surface from an already reconciled configuration.
    #[must_use]
    pub fn from_parts(config: SearchConfig, reconciliation: ReconciliationResult) -> Self {
        let choices = config.choice_index();
        Self {
            config,
            reconciliation,
            choices,
        }
    }

    /// Query string for the search text. Empty means no filter.
    #[must_use]
    pub fn query_for(&self, text: &str) -> String {
        self.plan_for(text).to_string()
    }

    /// Structured query for the search text, including dropped tokens.
    #[must_use]
    pub fn plan_for(&self, text: &str) -> QueryPlan {
        QueryPlan::build(
            text,
            self.config.settings,
            &self.reconciliation.usable_targets,
            &self.choices,
        )
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    #[must_use]
    pub fn mismatch_detected(&self) -> bool {
        self.reconciliation.mismatch_detected
    }

    #[must_use]
    pub fn usable_targets(&self) -> &[Target] {
        &self.reconciliation.usable_targets
    }

    #[must_use]
    pub fn settings(&self) -> SearchSettings {
        self.config.settings
    }

    #[must_use]
    pub fn reconciliation(&self) -> &ReconciliationResult {
        &self.reconciliation
    }

    /// The passive warning to show, if the configuration has drifted.
    #[must_use]
    pub fn drift_warning(&self) -> Option<DriftWarning> {
        if !self.reconciliation.mismatch_detected {
            return None;
        }
        let fields = self
            .reconciliation
            .drifts
            .iter()
            .map(|drift| DriftedField {
                code: drift.code.clone(),
                label: self
                    .config
                    .snapshot
                    .iter()
                    .find(|e| e.code() == drift.code)
                    .map(|e| e.label().to_string()),
                reason: drift.reason.clone(),
            })
            .collect();
        Some(DriftWarning {
            message: DRIFT_WARNING,
            fields,
            fell_back: self.reconciliation.fell_back,
        })
    }
}
