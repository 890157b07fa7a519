//! Host REST API schema provider.

use anyhow::Context as _;
use async_trait::async_trait;
use fieldlens_core::usage::{AppActions, Customize, Notifications, ProcessStatus, Reports, Views};
use fieldlens_core::{FormFields, Layout, UsageBundle};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::PluginConfig;
use crate::traits::SchemaProvider;

/// Header carrying an app-scoped API token.
pub const API_TOKEN_HEADER: &str = "X-Cybozu-API-Token";

const FIELDS_PATH: &str = "/k/v1/app/form/fields.json";
const LAYOUT_PATH: &str = "/k/v1/app/form/layout.json";
const VIEWS_PATH: &str = "/k/v1/app/views.json";
const PER_RECORD_NOTIFICATIONS_PATH: &str = "/k/v1/app/notifications/perRecord.json";
const REMINDER_NOTIFICATIONS_PATH: &str = "/k/v1/app/notifications/reminder.json";
const STATUS_PATH: &str = "/k/v1/app/status.json";
const CUSTOMIZE_PATH: &str = "/k/v1/app/customize.json";
const REPORTS_PATH: &str = "/k/v1/app/reports.json";
const ACTIONS_PATH: &str = "/k/v1/app/actions.json";

/// Reads schemas from the host's REST API.
///
/// Every call is a single request with no retry; failures surface to the
/// caller, which decides how to degrade.
#[derive(Debug, Clone)]
pub struct RestSchemaProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl RestSchemaProvider {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        }
    }

    #[must_use]
    pub fn from_config(config: &PluginConfig, api_token: Option<String>) -> Self {
        Self::new(config.api_base_url.clone(), api_token)
    }

    /// Full URL for an API path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, app: &str) -> anyhow::Result<T> {
        let url = self.endpoint(path);
        debug!(%url, app, "fetching");

        let mut request = self.client.get(&url).query(&[("app", app)]);
        if let Some(token) = &self.api_token {
            request = request.header(API_TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{url} returned {status}: {body}");
        }

        response
            .json()
            .await
            .with_context(|| format!("malformed response from {url}"))
    }
}

#[async_trait]
impl SchemaProvider for RestSchemaProvider {
    async fn form_fields(&self, app: &str) -> anyhow::Result<FormFields> {
        self.get_json(FIELDS_PATH, app).await
    }

    async fn form_layout(&self, app: &str) -> anyhow::Result<Layout> {
        self.get_json(LAYOUT_PATH, app).await
    }

    async fn usage_bundle(&self, app: &str) -> anyhow::Result<UsageBundle> {
        let views: Views = self.get_json(VIEWS_PATH, app).await?;
        let per_record_notifications: Notifications =
            self.get_json(PER_RECORD_NOTIFICATIONS_PATH, app).await?;
        let reminder_notifications: Notifications =
            self.get_json(REMINDER_NOTIFICATIONS_PATH, app).await?;
        let status: ProcessStatus = self.get_json(STATUS_PATH, app).await?;
        let customize: Customize = self.get_json(CUSTOMIZE_PATH, app).await?;
        let reports: Reports = self.get_json(REPORTS_PATH, app).await?;
        let actions: AppActions = self.get_json(ACTIONS_PATH, app).await?;

        Ok(UsageBundle {
            views,
            per_record_notifications,
            reminder_notifications,
            status,
            customize,
            reports,
            actions,
        })
    }
}
