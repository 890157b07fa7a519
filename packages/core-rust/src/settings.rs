//! Persisted plugin configuration documents.
//!
//! The host stores plugin configuration as a flat string-to-string map. The
//! search configuration occupies four keys (`targets`, `snapshot`,
//! `maxTokens`, `joinMode`) and the usage report two (`notes`,
//! `showFieldCode`). Structured values are JSON-encoded strings.
//!
//! Reading never fails: absent or malformed values fall back to empty lists
//! and default settings. Validation happens only on the save path, through
//! [`SearchConfigDraft::validate`].

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::catalog::FieldCatalog;
use crate::query::{ChoiceIndex, JoinMode, SearchSettings, TokenLimit};
use crate::snapshot::{
    build_snapshot, is_field_code, targets_from_snapshot, FieldSnapshotEntry, Target,
};

/// Flat configuration map as stored by the host.
pub type RawConfig = HashMap<String, String>;

pub mod keys {
    pub const TARGETS: &str = "targets";
    pub const SNAPSHOT: &str = "snapshot";
    pub const MAX_TOKENS: &str = "maxTokens";
    pub const JOIN_MODE: &str = "joinMode";
    pub const NOTES: &str = "notes";
    pub const SHOW_FIELD_CODE: &str = "showFieldCode";
}

/// Configuration-time validation failures. Saving is refused while any apply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("select at least one field to search")]
    NoFieldsSelected,
    #[error("token limit {value} is outside 1..=10")]
    TokenLimitOutOfRange { value: i64 },
    #[error("none of the selected fields can be searched")]
    NoSearchableFields,
}

// ---------------------------------------------------------------------------
// SearchConfig
// ---------------------------------------------------------------------------

/// Saved search configuration: snapshot, targets, and search-bar settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchConfig {
    pub snapshot: Vec<FieldSnapshotEntry>,
    pub targets: Vec<Target>,
    pub settings: SearchSettings,
}

impl SearchConfig {
    /// Reads the search configuration, substituting defaults for anything
    /// absent or malformed. Entries whose field code could not appear in a
    /// query are discarded.
    #[must_use]
    pub fn from_raw(raw: &RawConfig) -> Self {
        let max_tokens = match raw.get(keys::MAX_TOKENS) {
            Some(value) => value.trim().parse::<i64>().map_or_else(
                |_| TokenLimit::default(),
                TokenLimit::clamped,
            ),
            None => TokenLimit::default(),
        };
        let join_mode = raw
            .get(keys::JOIN_MODE)
            .and_then(|v| JoinMode::parse(v))
            .unwrap_or_default();

        let mut snapshot: Vec<FieldSnapshotEntry> = parse_list(raw, keys::SNAPSHOT);
        snapshot.retain(|entry| is_field_code(entry.code()));
        let mut targets: Vec<Target> = parse_list(raw, keys::TARGETS);
        targets.retain(|target| {
            let valid = is_field_code(&target.code);
            if !valid {
                warn!(code = %target.code, "ignoring search target with malformed field code");
            }
            valid
        });

        Self {
            snapshot,
            targets,
            settings: SearchSettings {
                max_tokens,
                join_mode,
            },
        }
    }

    /// Serializes every search key. All four are written together.
    #[must_use]
    pub fn to_raw(&self) -> RawConfig {
        HashMap::from([
            (keys::TARGETS.to_string(), to_json(&self.targets)),
            (keys::SNAPSHOT.to_string(), to_json(&self.snapshot)),
            (
                keys::MAX_TOKENS.to_string(),
                self.settings.max_tokens.get().to_string(),
            ),
            (
                keys::JOIN_MODE.to_string(),
                self.settings.join_mode.keyword().to_string(),
            ),
        ])
    }

    /// Approved choice values for the query synthesizer.
    #[must_use]
    pub fn choice_index(&self) -> ChoiceIndex {
        ChoiceIndex::from_snapshot(&self.snapshot)
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.targets.is_empty()
    }
}

/// What the administrator submitted on the configuration page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchConfigDraft {
    pub selected: Vec<String>,
    /// Raw token limit as entered; validated on save.
    pub max_tokens: i64,
    pub join_mode: JoinMode,
}

impl SearchConfigDraft {
    /// Validates the draft and builds the configuration to persist.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NoFieldsSelected`] when nothing is selected
    /// - [`ValidationError::TokenLimitOutOfRange`] when the limit is outside `1..=10`
    /// - [`ValidationError::NoSearchableFields`] when no selected field survives snapshotting
    pub fn validate(&self, catalog: &FieldCatalog) -> Result<SearchConfig, ValidationError> {
        if self.selected.is_empty() {
            return Err(ValidationError::NoFieldsSelected);
        }
        let max_tokens = u8::try_from(self.max_tokens)
            .ok()
            .and_then(TokenLimit::new)
            .ok_or(ValidationError::TokenLimitOutOfRange {
                value: self.max_tokens,
            })?;

        let snapshot = build_snapshot(self.selected.iter().map(String::as_str), catalog);
        if snapshot.is_empty() {
            return Err(ValidationError::NoSearchableFields);
        }
        let targets = targets_from_snapshot(&snapshot);

        Ok(SearchConfig {
            snapshot,
            targets,
            settings: SearchSettings {
                max_tokens,
                join_mode: self.join_mode,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// ReportConfig
// ---------------------------------------------------------------------------

/// Usage-report settings: per-field notes and the label annotation toggle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportConfig {
    pub notes: BTreeMap<String, String>,
    pub show_field_code: bool,
}

impl ReportConfig {
    #[must_use]
    pub fn from_raw(raw: &RawConfig) -> Self {
        let notes = raw
            .get(keys::NOTES)
            .and_then(|json| match serde_json::from_str(json) {
                Ok(notes) => Some(notes),
                Err(err) => {
                    warn!(key = keys::NOTES, error = %err, "ignoring malformed config value");
                    None
                }
            })
            .unwrap_or_default();
        Self {
            notes,
            show_field_code: raw.get(keys::SHOW_FIELD_CODE).is_some_and(|v| v == "true"),
        }
    }

    /// Builds the config from edited notes; blank notes are dropped and the rest trimmed.
    #[must_use]
    pub fn from_edits<'a>(
        notes: impl IntoIterator<Item = (&'a str, &'a str)>,
        show_field_code: bool,
    ) -> Self {
        let notes = notes
            .into_iter()
            .filter_map(|(code, memo)| {
                let memo = memo.trim();
                (!code.is_empty() && !memo.is_empty()).then(|| (code.to_string(), memo.to_string()))
            })
            .collect();
        Self {
            notes,
            show_field_code,
        }
    }

    #[must_use]
    pub fn to_raw(&self) -> RawConfig {
        HashMap::from([
            (keys::NOTES.to_string(), to_json(&self.notes)),
            (
                keys::SHOW_FIELD_CODE.to_string(),
                self.show_field_code.to_string(),
            ),
        ])
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_list<T: DeserializeOwned>(raw: &RawConfig, key: &str) -> Vec<T> {
    let Some(json) = raw.get(key) else {
        return Vec::new();
    };
    match serde_json::from_str(json) {
        Ok(list) => list,
        Err(err) => {
            warn!(key, error = %err, "ignoring malformed config value");
            Vec::new()
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    // Plain data with string keys; serialization cannot fail.
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_form;
    use crate::field_type::Operator;

    fn catalog() -> FieldCatalog {
        FieldCatalog::from(&sample_form())
    }

    fn draft(selected: &[&str], max_tokens: i64) -> SearchConfigDraft {
        SearchConfigDraft {
            selected: selected.iter().map(ToString::to_string).collect(),
            max_tokens,
            join_mode: JoinMode::Or,
        }
    }

    #[test]
    fn empty_raw_config_gives_defaults() {
        let config = SearchConfig::from_raw(&RawConfig::new());
        assert!(config.snapshot.is_empty());
        assert!(config.targets.is_empty());
        assert_eq!(config.settings, SearchSettings::default());
        assert!(!config.is_configured());
    }

    #[test]
    fn malformed_field_codes_are_discarded() {
        let raw = RawConfig::from([(
            keys::TARGETS.to_string(),
            r#"[{"code":"x\") or (y","operator":"LIKE"},{"code":"title","operator":"LIKE"}]"#
                .to_string(),
        )]);
        let config = SearchConfig::from_raw(&raw);
        assert_eq!(config.targets, vec![Target::new("title", Operator::Like)]);
    }

    #[test]
    fn malformed_values_fall_back() {
        let raw = RawConfig::from([
            (keys::TARGETS.to_string(), "{not json".to_string()),
            (keys::SNAPSHOT.to_string(), "42".to_string()),
            (keys::MAX_TOKENS.to_string(), "99".to_string()),
            (keys::JOIN_MODE.to_string(), "xor".to_string()),
        ]);
        let config = SearchConfig::from_raw(&raw);
        assert!(config.targets.is_empty());
        assert!(config.snapshot.is_empty());
        assert_eq!(config.settings.max_tokens.get(), 5);
        assert_eq!(config.settings.join_mode, JoinMode::And);
    }

    #[test]
    fn unparsable_limit_uses_default() {
        let raw = RawConfig::from([(keys::MAX_TOKENS.to_string(), "many".to_string())]);
        assert_eq!(SearchConfig::from_raw(&raw).settings.max_tokens.get(), 5);
    }

    #[test]
    fn validated_config_roundtrips_through_raw() {
        let config = draft(&["status", "title"], 3).validate(&catalog()).unwrap();
        let restored = SearchConfig::from_raw(&config.to_raw());
        assert_eq!(restored, config);
        assert_eq!(restored.settings.max_tokens.get(), 3);
        assert_eq!(restored.settings.join_mode, JoinMode::Or);
        assert_eq!(
            restored.targets,
            vec![Target::new("status", Operator::In), Target::new("title", Operator::Like)]
        );
    }

    #[test]
    fn validation_errors() {
        let catalog = catalog();
        assert_eq!(
            draft(&[], 5).validate(&catalog),
            Err(ValidationError::NoFieldsSelected)
        );
        assert_eq!(
            draft(&["title"], 0).validate(&catalog),
            Err(ValidationError::TokenLimitOutOfRange { value: 0 })
        );
        assert_eq!(
            draft(&["title"], 11).validate(&catalog),
            Err(ValidationError::TokenLimitOutOfRange { value: 11 })
        );
        assert_eq!(
            draft(&["amount", "missing"], 5).validate(&catalog),
            Err(ValidationError::NoSearchableFields)
        );
    }

    #[test]
    fn choice_index_comes_from_snapshot() {
        let config = draft(&["status"], 5).validate(&catalog()).unwrap();
        assert!(config.choice_index().allows("status", "Open"));
    }

    #[test]
    fn report_config_roundtrip_and_blank_notes() {
        let config = ReportConfig::from_edits(
            [("title", "  main title "), ("status", "   "), ("", "orphan")],
            true,
        );
        assert_eq!(config.notes.len(), 1);
        assert_eq!(config.notes["title"], "main title");
        let restored = ReportConfig::from_raw(&config.to_raw());
        assert_eq!(restored, config);
    }

    #[test]
    fn report_config_tolerates_garbage() {
        let raw = RawConfig::from([
            (keys::NOTES.to_string(), "[1,2".to_string()),
            (keys::SHOW_FIELD_CODE.to_string(), "yes".to_string()),
        ]);
        let config = ReportConfig::from_raw(&raw);
        assert!(config.notes.is_empty());
        assert!(!config.show_field_code);
    }
}
