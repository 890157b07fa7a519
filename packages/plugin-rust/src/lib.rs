//! fieldlens plugin runtime: entitlement gate, schema and configuration
//! collaborators, and the search, configuration, and usage-report surfaces.

pub mod config;
pub mod config_page;
pub mod entitlement;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod provider;
pub mod report_page;
pub mod search;
pub mod session;
pub mod store;
pub mod traits;

pub use config::PluginConfig;
pub use config_page::{ConfigPage, FieldCandidate};
pub use entitlement::{CheckerSlot, Entitlement, EntitlementGate};
pub use error::PluginError;
pub use report_page::{FieldCodeAnnotator, UsageReportPage};
pub use search::{PageActivation, SearchSurface};
pub use session::PluginSession;
pub use traits::{ConfigStore, LicenseChecker, Notifier, SchemaProvider};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
