//! In-memory schema provider for tests and offline tooling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::bail;
use async_trait::async_trait;
use fieldlens_core::{FormFields, Layout, UsageBundle};
use parking_lot::RwLock;

use crate::traits::SchemaProvider;

/// Everything the provider serves for one application.
#[derive(Debug, Clone, Default)]
pub struct AppSchema {
    pub fields: FormFields,
    pub layout: Layout,
    pub usage: UsageBundle,
}

/// Serves fixed schemas from memory.
///
/// Schemas can be replaced while the provider is shared, which is how tests
/// simulate an administrator editing the form after configuration was saved.
/// [`fail_requests`](Self::fail_requests) makes every call return an error.
#[derive(Debug, Default)]
pub struct StaticSchemaProvider {
    apps: RwLock<HashMap<String, AppSchema>>,
    failing: AtomicBool,
    field_fetches: AtomicUsize,
}

impl StaticSchemaProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration of an application.
    #[must_use]
    pub fn with_app(self, app: &str, schema: AppSchema) -> Self {
        self.apps.write().insert(app.to_string(), schema);
        self
    }

    /// Replaces the field definitions of an application.
    pub fn set_fields(&self, app: &str, fields: FormFields) {
        self.apps.write().entry(app.to_string()).or_default().fields = fields;
    }

    /// Toggles failure injection.
    pub fn fail_requests(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// How many times `form_fields` has been called.
    #[must_use]
    pub fn field_fetches(&self) -> usize {
        self.field_fetches.load(Ordering::Relaxed)
    }

    fn lookup<T>(&self, app: &str, pick: impl FnOnce(&AppSchema) -> T) -> anyhow::Result<T> {
        if self.failing.load(Ordering::Relaxed) {
            bail!("schema request for app {app} failed");
        }
        match self.apps.read().get(app) {
            Some(schema) => Ok(pick(schema)),
            None => bail!("app {app} not found"),
        }
    }
}

#[async_trait]
impl SchemaProvider for StaticSchemaProvider {
    async fn form_fields(&self, app: &str) -> anyhow::Result<FormFields> {
        self.field_fetches.fetch_add(1, Ordering::Relaxed);
        self.lookup(app, |s| s.fields.clone())
    }

    async fn form_layout(&self, app: &str) -> anyhow::Result<Layout> {
        self.lookup(app, |s| s.layout.clone())
    }

    async fn usage_bundle(&self, app: &str) -> anyhow::Result<UsageBundle> {
        self.lookup(app, |s| s.usage.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(code: &str) -> FormFields {
        serde_json::from_value(serde_json::json!({
            "properties": {
                code: {"type": "SINGLE_LINE_TEXT", "code": code, "label": code}
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn serves_registered_app() {
        let provider = StaticSchemaProvider::new().with_app(
            "1",
            AppSchema {
                fields: form("title"),
                ..AppSchema::default()
            },
        );

        let fields = provider.form_fields("1").await.unwrap();
        assert!(fields.properties.contains_key("title"));
        assert_eq!(provider.field_fetches(), 1);
        assert!(provider.form_layout("1").await.unwrap().layout.is_empty());
    }

    #[tokio::test]
    async fn unknown_app_is_an_error() {
        let provider = StaticSchemaProvider::new();
        let err = provider.form_fields("42").await.unwrap_err();
        assert!(err.to_string().contains("42"));
    }

    #[tokio::test]
    async fn failure_injection_and_replacement() {
        let provider = StaticSchemaProvider::new();
        provider.set_fields("1", form("title"));

        provider.fail_requests(true);
        assert!(provider.form_fields("1").await.is_err());
        assert!(provider.usage_bundle("1").await.is_err());

        provider.fail_requests(false);
        provider.set_fields("1", form("subject"));
        let fields = provider.form_fields("1").await.unwrap();
        assert!(fields.properties.contains_key("subject"));
        assert!(!fields.properties.contains_key("title"));
    }
}
