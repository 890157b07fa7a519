//! Configuration-time snapshot of the fields chosen for search.
//!
//! When the administrator saves the search configuration, every selected
//! field is captured as a [`FieldSnapshotEntry`]: its label, type, derived
//! operator, subtable ancestry, and (for choice fields) the approved choice
//! values. The snapshot is persisted next to a compact [`Target`] list and is
//! the reference the search surface later reconciles against the live schema.
//!
//! [`build_snapshot`] is pure: the same selection and catalog always produce
//! byte-identical serialized output.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, FieldCatalog};
use crate::field_type::{resolve_operator, FieldType, Operator};

// ---------------------------------------------------------------------------
// FieldSnapshotEntry
// ---------------------------------------------------------------------------

/// Immutable record of one configured field at the time the configuration was saved.
///
/// Fields are private; construction goes through [`build_snapshot`] (or
/// deserialization of a previously persisted snapshot), which guarantees
/// `operator == resolve_operator(field_type)` and a non-empty choice list for
/// `IN` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSnapshotEntry {
    code: String,
    label: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    operator: Operator,
    is_subtable_member: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_label: Option<String>,
    #[serde(default)]
    choice_values: Vec<String>,
}

impl FieldSnapshotEntry {
    /// Captures a catalog entry, or returns `None` if the field is not searchable.
    ///
    /// Choice fields with no declared options are rejected as well.
    #[must_use]
    pub fn capture(entry: &CatalogEntry) -> Option<Self> {
        let operator = resolve_operator(&entry.field_type)?;
        let choice_values = match operator {
            Operator::In => {
                let values = normalize_choices(&entry.choice_labels);
                if values.is_empty() {
                    return None;
                }
                values
            }
            Operator::Like => Vec::new(),
        };
        Some(Self {
            code: entry.code.clone(),
            label: entry.label.clone(),
            field_type: entry.field_type.clone(),
            operator,
            is_subtable_member: entry.parent.is_some(),
            parent_code: entry.parent.as_ref().map(|p| p.code.clone()),
            parent_label: entry.parent.as_ref().map(|p| p.label.clone()),
            choice_values,
        })
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Label at snapshot time. May be stale relative to the live schema.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    #[must_use]
    pub fn is_subtable_member(&self) -> bool {
        self.is_subtable_member
    }

    #[must_use]
    pub fn parent_code(&self) -> Option<&str> {
        self.parent_code.as_deref()
    }

    #[must_use]
    pub fn parent_label(&self) -> Option<&str> {
        self.parent_label.as_deref()
    }

    /// Approved choice values, sorted and de-duplicated. Empty for `LIKE` entries.
    #[must_use]
    pub fn choice_values(&self) -> &[String] {
        &self.choice_values
    }

    /// The compact search target derived from this entry.
    #[must_use]
    pub fn target(&self) -> Target {
        Target {
            code: self.code.clone(),
            operator: self.operator,
        }
    }

    /// Whether a deserialized entry still satisfies the construction invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.code.is_empty()
            && resolve_operator(&self.field_type) == Some(self.operator)
            && match self.operator {
                Operator::In => !self.choice_values.is_empty(),
                Operator::Like => self.choice_values.is_empty(),
            }
            && self.is_subtable_member == self.parent_code.is_some()
    }
}

/// Minimal unit the query synthesizer needs: which field, and how to compare it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub code: String,
    pub operator: Operator,
}

impl Target {
    #[must_use]
    pub fn new(code: impl Into<String>, operator: Operator) -> Self {
        Self {
            code: code.into(),
            operator,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds the snapshot for a selection of field codes.
///
/// Codes missing from the catalog, non-searchable fields, and choice fields
/// without options are dropped silently. Duplicate selections collapse.
/// The result is ordered by field code.
///
/// # Examples
///
/// ```
/// use fieldlens_core::catalog::{CatalogEntry, FieldCatalog};
/// use fieldlens_core::field_type::FieldType;
/// use fieldlens_core::snapshot::build_snapshot;
///
/// let catalog = FieldCatalog::from_entries([CatalogEntry {
///     code: "title".into(),
///     label: "Title".into(),
///     field_type: FieldType::SingleLineText,
///     choice_labels: vec![],
///     parent: None,
/// }]);
/// let snapshot = build_snapshot(["title", "gone"], &catalog);
/// assert_eq!(snapshot.len(), 1);
/// assert_eq!(snapshot[0].code(), "title");
/// ```
pub fn build_snapshot<'a>(
    selected: impl IntoIterator<Item = &'a str>,
    catalog: &FieldCatalog,
) -> Vec<FieldSnapshotEntry> {
    let codes: BTreeSet<&str> = selected.into_iter().collect();
    let mut entries: Vec<FieldSnapshotEntry> = codes
        .into_iter()
        .filter_map(|code| catalog.get(code))
        .filter_map(FieldSnapshotEntry::capture)
        .collect();
    entries.sort_by(|a, b| a.code.cmp(&b.code));
    entries
}

/// Derives the target list from a snapshot, preserving snapshot order.
#[must_use]
pub fn targets_from_snapshot(snapshot: &[FieldSnapshotEntry]) -> Vec<Target> {
    snapshot.iter().map(FieldSnapshotEntry::target).collect()
}

/// Whether `code` can be a host field code.
///
/// Codes are embedded unquoted in query clauses, so whitespace, control
/// characters, and ASCII punctuation other than `_` are rejected. Non-ASCII
/// letters and symbols are allowed.
#[must_use]
pub fn is_field_code(code: &str) -> bool {
    !code.is_empty()
        && code.chars().all(|c| {
            c == '_' || !(c.is_whitespace() || c.is_control() || c.is_ascii_punctuation())
        })
}

/// Sorted, de-duplicated copy of a choice list.
fn normalize_choices(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::catalog::tests::sample_form;
    use crate::catalog::ParentRef;

    fn catalog() -> FieldCatalog {
        FieldCatalog::from(&sample_form())
    }

    #[test]
    fn field_code_shape() {
        assert!(is_field_code("title"));
        assert!(is_field_code("item_kind2"));
        assert!(is_field_code("文字列__1行_"));
        assert!(!is_field_code(""));
        assert!(!is_field_code("a b"));
        assert!(!is_field_code("x\") or (y"));
        assert!(!is_field_code("tab\tbed"));
    }

    #[test]
    fn unknown_and_unsearchable_codes_are_dropped() {
        let snapshot = build_snapshot(["title", "amount", "missing", "items"], &catalog());
        let codes: Vec<&str> = snapshot.iter().map(FieldSnapshotEntry::code).collect();
        assert_eq!(codes, vec!["title"]);
    }

    #[test]
    fn output_sorted_by_code() {
        let snapshot = build_snapshot(["title", "status", "item_name"], &catalog());
        let codes: Vec<&str> = snapshot.iter().map(FieldSnapshotEntry::code).collect();
        assert_eq!(codes, vec!["item_name", "status", "title"]);
    }

    #[test]
    fn choice_values_are_sorted_labels() {
        let snapshot = build_snapshot(["status"], &catalog());
        assert_eq!(snapshot[0].operator(), Operator::In);
        assert_eq!(snapshot[0].choice_values(), ["Closed", "Open"]);
    }

    #[test]
    fn like_entries_have_no_choices() {
        let snapshot = build_snapshot(["title"], &catalog());
        assert_eq!(snapshot[0].operator(), Operator::Like);
        assert!(snapshot[0].choice_values().is_empty());
        assert!(snapshot[0].is_consistent());
    }

    #[test]
    fn subtable_member_records_parent() {
        let snapshot = build_snapshot(["item_kind"], &catalog());
        let entry = &snapshot[0];
        assert!(entry.is_subtable_member());
        assert_eq!(entry.parent_code(), Some("items"));
        assert_eq!(entry.parent_label(), Some("Items"));
        assert!(entry.is_consistent());
    }

    #[test]
    fn choice_field_without_options_is_excluded() {
        let catalog = FieldCatalog::from_entries([CatalogEntry {
            code: "empty_choice".to_string(),
            label: "Empty".to_string(),
            field_type: FieldType::DropDown,
            choice_labels: vec![],
            parent: None,
        }]);
        assert!(build_snapshot(["empty_choice"], &catalog).is_empty());
    }

    #[test]
    fn duplicate_choice_labels_collapse() {
        let entry = CatalogEntry {
            code: "c".to_string(),
            label: "C".to_string(),
            field_type: FieldType::DropDown,
            choice_labels: vec!["b".to_string(), "a".to_string(), "b".to_string()],
            parent: Some(ParentRef {
                code: "t".to_string(),
                label: "T".to_string(),
            }),
        };
        let captured = FieldSnapshotEntry::capture(&entry).unwrap();
        assert_eq!(captured.choice_values(), ["a", "b"]);
    }

    #[test]
    fn targets_follow_snapshot() {
        let snapshot = build_snapshot(["title", "status"], &catalog());
        let targets = targets_from_snapshot(&snapshot);
        assert_eq!(
            targets,
            vec![
                Target::new("status", Operator::In),
                Target::new("title", Operator::Like),
            ]
        );
    }

    #[test]
    fn serialized_form_uses_camel_case() {
        let snapshot = build_snapshot(["item_kind"], &catalog());
        let json = serde_json::to_value(&snapshot[0]).unwrap();
        assert_eq!(json["type"], "RADIO_BUTTON");
        assert_eq!(json["operator"], "IN");
        assert_eq!(json["isSubtableMember"], true);
        assert_eq!(json["parentCode"], "items");
        assert_eq!(json["choiceValues"], serde_json::json!(["A", "B"]));
    }

    #[test]
    fn inconsistent_persisted_entry_is_detected() {
        let entry: FieldSnapshotEntry = serde_json::from_value(serde_json::json!({
            "code": "x", "label": "X", "type": "NUMBER", "operator": "LIKE",
            "isSubtableMember": false
        }))
        .unwrap();
        assert!(!entry.is_consistent());
    }

    proptest! {
        #[test]
        fn build_is_deterministic_and_order_independent(
            mut picks in prop::collection::vec(
                prop::sample::select(vec!["title", "status", "amount", "item_name", "item_kind", "tags", "nope"]),
                0..10,
            )
        ) {
            let catalog = catalog();
            let first = serde_json::to_string(&build_snapshot(picks.iter().copied(), &catalog)).unwrap();
            let second = serde_json::to_string(&build_snapshot(picks.iter().copied(), &catalog)).unwrap();
            prop_assert_eq!(&first, &second);

            picks.reverse();
            let reversed = serde_json::to_string(&build_snapshot(picks.iter().copied(), &catalog)).unwrap();
            prop_assert_eq!(first, reversed);
        }
    }
}
