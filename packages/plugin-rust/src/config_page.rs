//! Administrator-facing search configuration page.

use fieldlens_core::catalog::ParentRef;
use fieldlens_core::{
    resolve_group, DisplayGroup, FieldCatalog, FieldSnapshotEntry, FieldType, Operator, RawConfig,
    SearchConfig, SearchConfigDraft,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::entitlement::EntitlementGate;
use crate::error::PluginError;
use crate::traits::{ConfigStore, SchemaProvider};

/// A field offered for selection as a search target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCandidate {
    pub code: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub group: DisplayGroup,
    pub operator: Operator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    /// Currently saved as a search target.
    pub selected: bool,
}

/// State of the search configuration page for one application.
#[derive(Debug)]
pub struct ConfigPage {
    plugin_id: String,
    catalog: FieldCatalog,
    existing: RawConfig,
    current: SearchConfig,
}

impl ConfigPage {
    /// Opens the page: checks entitlement, loads the saved configuration, and
    /// fetches the field catalog.
    ///
    /// # Errors
    ///
    /// - [`PluginError::NotEntitled`] when the session is not licensed
    /// - [`PluginError::Schema`] when the field catalog cannot be fetched
    pub async fn open(
        gate: &EntitlementGate,
        provider: &dyn SchemaProvider,
        store: &dyn ConfigStore,
        plugin_id: &str,
        app_id: &str,
    ) -> Result<Self, PluginError> {
        let entitlement = gate.check_once().await;
        if !entitlement.is_enabled() {
            return Err(PluginError::NotEntitled(entitlement));
        }

        let existing = match store.load(plugin_id).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(plugin_id, error = %err, "config unreadable, starting from defaults");
                RawConfig::default()
            }
        };
        let form = provider
            .form_fields(app_id)
            .await
            .map_err(PluginError::Schema)?;

        Ok(Self::from_parts(
            plugin_id,
            FieldCatalog::from(&form),
            existing,
        ))
    }

    /// Builds the page from an already fetched catalog and stored document.
    #[must_use]
    pub fn from_parts(plugin_id: &str, catalog: FieldCatalog, existing: RawConfig) -> Self {
        let current = SearchConfig::from_raw(&existing);
        Self {
            plugin_id: plugin_id.to_string(),
            catalog,
            existing,
            current,
        }
    }

    /// Fields that can be searched, in code order.
    ///
    /// Choice fields without any declared choice are left out.
    #[must_use]
    pub fn candidates(&self) -> Vec<FieldCandidate> {
        self.catalog
            .iter()
            .filter_map(|entry| {
                let snapshot = FieldSnapshotEntry::capture(entry)?;
                Some(FieldCandidate {
                    code: entry.code.clone(),
                    label: entry.label.clone(),
                    field_type: entry.field_type.clone(),
                    group: resolve_group(&entry.field_type),
                    operator: snapshot.operator(),
                    parent: entry.parent.clone(),
                    selected: self.current.targets.iter().any(|t| t.code == entry.code),
                })
            })
            .collect()
    }

    /// The configuration currently saved.
    #[must_use]
    pub fn current(&self) -> &SearchConfig {
        &self.current
    }

    #[must_use]
    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// A draft pre-filled with the saved selection and settings.
    #[must_use]
    pub fn draft(&self) -> SearchConfigDraft {
        SearchConfigDraft {
            selected: self.current.targets.iter().map(|t| t.code.clone()).collect(),
            max_tokens: i64::from(u8::from(self.current.settings.max_tokens)),
            join_mode: self.current.settings.join_mode,
        }
    }

    /// Validates the draft and, if valid, persists snapshot, targets, and
    /// settings in one write alongside the document's other keys.
    ///
    /// # Errors
    ///
    /// - [`PluginError::Validation`] when the draft is rejected; nothing is written
    /// - [`PluginError::Store`] when the write fails; the page keeps the old state
    pub async fn save(
        &mut self,
        store: &dyn ConfigStore,
        draft: &SearchConfigDraft,
    ) -> Result<&SearchConfig, PluginError> {
        let config = draft.validate(&self.catalog)?;

        let mut document = self.existing.clone();
        document.extend(config.to_raw());
        store
            .save(&self.plugin_id, document.clone())
            .await
            .map_err(PluginError::Store)?;

        info!(
            plugin_id = %self.plugin_id,
            targets = config.targets.len(),
            max_tokens = config.settings.max_tokens.get(),
            join_mode = %config.settings.join_mode,
            "search settings saved"
        );
        self.existing = document;
        self.current = config;
        Ok(&self.current)
    }
}
