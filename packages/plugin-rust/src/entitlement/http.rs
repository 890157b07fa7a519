//! License service client.

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::cache::RESULT_OK;
use crate::config::PluginConfig;
use crate::traits::{LicenseChecker, LicenseVerdict};

/// Body returned by the license service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseResponse {
    pub result: String,
    #[serde(default)]
    pub license_type: Option<String>,
}

impl From<LicenseResponse> for LicenseVerdict {
    fn from(response: LicenseResponse) -> Self {
        if response.result == RESULT_OK {
            Self::Valid {
                license_type: response.license_type,
            }
        } else {
            Self::Invalid
        }
    }
}

/// Queries `GET {endpoint}?productId=..&kintoneDomain=..`.
#[derive(Debug, Clone)]
pub struct HttpLicenseChecker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLicenseChecker {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &PluginConfig) -> Self {
        Self::new(config.license_endpoint.clone())
    }
}

#[async_trait]
impl LicenseChecker for HttpLicenseChecker {
    async fn check(&self, product_id: &str, domain: &str) -> anyhow::Result<LicenseVerdict> {
        debug!(endpoint = %self.endpoint, product_id, domain, "checking license");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("productId", product_id), ("kintoneDomain", domain)])
            .send()
            .await
            .context("license service unreachable")?;

        let body: LicenseResponse = response
            .json()
            .await
            .context("malformed license service response")?;
        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_result_is_valid() {
        let response: LicenseResponse =
            serde_json::from_str(r#"{"result":"ok","licenseType":"standard"}"#).unwrap();
        assert_eq!(
            LicenseVerdict::from(response),
            LicenseVerdict::Valid {
                license_type: Some("standard".to_string())
            }
        );
    }

    #[test]
    fn any_other_result_is_invalid() {
        let response: LicenseResponse = serde_json::from_str(r#"{"result":"ng"}"#).unwrap();
        assert_eq!(LicenseVerdict::from(response), LicenseVerdict::Invalid);

        let response: LicenseResponse = serde_json::from_str(r#"{"result":"OK"}"#).unwrap();
        assert_eq!(LicenseVerdict::from(response), LicenseVerdict::Invalid);
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        let checker = HttpLicenseChecker::new("http://127.0.0.1:9/checkLicense");
        assert!(checker.check("p", "d").await.is_err());
    }
}
