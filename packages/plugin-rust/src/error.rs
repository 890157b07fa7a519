use fieldlens_core::ValidationError;

use crate::entitlement::Entitlement;

/// Errors surfaced by the configuration and report pages.
///
/// The search surface never returns these; it degrades instead.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("feature disabled for this session: {0}")]
    NotEntitled(Entitlement),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("schema fetch failed: {0}")]
    Schema(#[source] anyhow::Error),
    #[error("config store failed: {0}")]
    Store(#[source] anyhow::Error),
}
