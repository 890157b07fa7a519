//! Field usage report page and the record-detail field code annotator.

use std::collections::{BTreeMap, HashMap};

use fieldlens_core::catalog::{layout_field_codes, property_index};
use fieldlens_core::report::{field_code_annotations, label_suffix, FieldAnnotation};
use fieldlens_core::{
    build_field_report, extract_usage, FieldProperty, FieldReportRow, RawConfig, ReportConfig,
    ReportSources,
};
use tracing::{info, warn};

use crate::entitlement::EntitlementGate;
use crate::error::PluginError;
use crate::search::PageActivation;
use crate::traits::{ConfigStore, SchemaProvider};

// ---------------------------------------------------------------------------
// UsageReportPage
// ---------------------------------------------------------------------------

/// The usage report of one application, with editable notes.
#[derive(Debug)]
pub struct UsageReportPage {
    plugin_id: String,
    rows: Vec<FieldReportRow>,
    existing: RawConfig,
    config: ReportConfig,
}

impl UsageReportPage {
    /// Opens the page: checks entitlement, then fetches fields, layout, and
    /// every usage surface, plus the fields of apps referenced by
    /// reference tables.
    ///
    /// A related app that cannot be read only degrades its rows to
    /// unknown-field placeholders.
    ///
    /// # Errors
    ///
    /// - [`PluginError::NotEntitled`] when the session is not licensed
    /// - [`PluginError::Schema`] when fields, layout, or the usage bundle cannot be fetched
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
                warn!(plugin_id, error = %err, "config unreadable, notes start empty");
                RawConfig::default()
            }
        };
        let config = ReportConfig::from_raw(&existing);

        let rows = collect_report(provider, app_id, &config.notes).await?;

        Ok(Self {
            plugin_id: plugin_id.to_string(),
            rows,
            existing,
            config,
        })
    }

    #[must_use]
    pub fn rows(&self) -> &[FieldReportRow] {
        &self.rows
    }

    #[must_use]
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Persists edited notes and the annotation toggle in one write.
    ///
    /// Blank notes are dropped. Search settings in the same document are kept.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Store`] when the write fails.
    pub async fn save_notes<'a>(
        &mut self,
        store: &dyn ConfigStore,
        notes: impl IntoIterator<Item = (&'a str, &'a str)>,
        show_field_code: bool,
    ) -> Result<(), PluginError> {
        let config = ReportConfig::from_edits(notes, show_field_code);

        let mut document = self.existing.clone();
        document.extend(config.to_raw());
        store
            .save(&self.plugin_id, document.clone())
            .await
            .map_err(PluginError::Store)?;

        for row in &mut self.rows {
            row.note = config.notes.get(&row.code).cloned().unwrap_or_default();
        }
        info!(
            plugin_id = %self.plugin_id,
            notes = config.notes.len(),
            show_field_code,
            "report settings saved"
        );
        self.existing = document;
        self.config = config;
        Ok(())
    }
}

/// Fetches everything the usage report needs and builds its rows.
///
/// # Errors
///
/// Returns [`PluginError::Schema`] when fields, layout, or the usage bundle
/// cannot be fetched. Unreadable related apps only degrade their rows.
pub async fn collect_report(
    provider: &dyn SchemaProvider,
    app_id: &str,
    notes: &BTreeMap<String, String>,
) -> Result<Vec<FieldReportRow>, PluginError> {
    let form = provider
        .form_fields(app_id)
        .await
        .map_err(PluginError::Schema)?;
    let layout = provider
        .form_layout(app_id)
        .await
        .map_err(PluginError::Schema)?;
    let bundle = provider
        .usage_bundle(app_id)
        .await
        .map_err(PluginError::Schema)?;

    let related = fetch_related(provider, &form.properties).await;

    let known_codes: Vec<String> = property_index(&form.properties)
        .into_keys()
        .map(str::to_string)
        .collect();
    let usage = extract_usage(&bundle, &known_codes);
    let layout_codes = layout_field_codes(&layout);

    let rows = build_field_report(ReportSources {
        layout_codes: &layout_codes,
        properties: &form.properties,
        usage: &usage,
        notes,
        related: &related,
    });
    info!(app = app_id, rows = rows.len(), used = usage.len(), "usage report built");
    Ok(rows)
}

/// Field definitions of every app referenced by a reference table.
async fn fetch_related(
    provider: &dyn SchemaProvider,
    properties: &BTreeMap<String, FieldProperty>,
) -> HashMap<String, BTreeMap<String, FieldProperty>> {
    let mut related = HashMap::new();
    for property in properties.values() {
        let Some(reference) = &property.reference_table else {
            continue;
        };
        let app = &reference.related_app.app;
        if app.is_empty() || related.contains_key(app) {
            continue;
        }
        match provider.form_fields(app).await {
            Ok(form) => {
                related.insert(app.clone(), form.properties);
            }
            Err(err) => {
                warn!(
                    related_app = %app,
                    field = %property.code,
                    error = %err,
                    "related app unreadable"
                );
            }
        }
    }
    related
}

// ---------------------------------------------------------------------------
// FieldCodeAnnotator
// ---------------------------------------------------------------------------

/// Appends field codes to labels on the record detail view.
#[derive(Debug, Clone, Default)]
pub struct FieldCodeAnnotator {
    annotations: Vec<FieldAnnotation>,
}

impl FieldCodeAnnotator {
    /// Prepares annotations for one activation.
    ///
    /// Returns `None` when annotations are switched off, the session is not
    /// licensed, or the field definitions cannot be read.
    pub async fn prepare(
        activation: &PageActivation,
        gate: &EntitlementGate,
        provider: &dyn SchemaProvider,
        store: &dyn ConfigStore,
        plugin_id: &str,
    ) -> Option<Self> {
        let raw = store.load(plugin_id).await.ok()?;
        if !ReportConfig::from_raw(&raw).show_field_code {
            return None;
        }
        if !gate.check_once().await.is_enabled() {
            return None;
        }

        let metadata = activation
            .lifecycle()
            .run_until_teardown(activation.metadata(provider))
            .await?;
        match metadata {
            Ok(metadata) => Some(Self::from_annotations(field_code_annotations(
                &metadata.form.properties,
            ))),
            Err(err) => {
                warn!(app = %activation.app_id(), error = %err, "field codes unavailable");
                None
            }
        }
    }

    #[must_use]
    pub fn from_annotations(annotations: Vec<FieldAnnotation>) -> Self {
        Self { annotations }
    }

    #[must_use]
    pub fn annotations(&self) -> &[FieldAnnotation] {
        &self.annotations
    }

    /// Suffix such as `" [title]"` for a rendered label, if it names a field.
    #[must_use]
    pub fn suffix_for(&self, rendered_label: &str) -> Option<String> {
        label_suffix(rendered_label, &self.annotations)
    }
}
