//! Field catalog and form layout as returned by the host schema endpoints.
//!
//! The host describes fields as a map of code to [`FieldProperty`], with
//! subtable member fields nested under their table. [`FieldCatalog`]
//! flattens that shape into one [`CatalogEntry`] per searchable-or-not field,
//! each member carrying a [`ParentRef`] to its table.
//!
//! The layout document ([`Layout`]) is only used to recover the on-screen
//! field order for the usage report.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::field_type::FieldType;

// ---------------------------------------------------------------------------
// Host field definitions
// ---------------------------------------------------------------------------

/// Position of a choice option. The host sends it as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionIndex {
    Number(u64),
    Text(String),
}

impl OptionIndex {
    /// Numeric position; unparsable indexes sort last.
    #[must_use]
    pub fn position(&self) -> u64 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().unwrap_or(u64::MAX),
        }
    }
}

impl Default for OptionIndex {
    fn default() -> Self {
        Self::Number(u64::MAX)
    }
}

/// One declared option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    #[serde(default)]
    pub index: OptionIndex,
}

/// Related-app link of a reference-table field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceTable {
    #[serde(default)]
    pub related_app: RelatedApp,
    #[serde(default)]
    pub display_fields: Vec<String>,
}

/// Application referenced by a reference table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelatedApp {
    #[serde(default)]
    pub app: String,
}

/// A single field definition from the host form schema.
///
/// Unknown keys are ignored so newer host payloads still parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProperty {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub code: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    /// String for scalar fields, list of strings for multi-valued ones.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub default_value: serde_json::Value,
    /// Choice options keyed by label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, ChoiceOption>,
    /// Member fields of a subtable, keyed by code.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_table: Option<ReferenceTable>,
}

impl FieldProperty {
    /// Declared choice labels in option-index order (label order breaks ties).
    #[must_use]
    pub fn choice_labels(&self) -> Vec<String> {
        let mut options: Vec<&ChoiceOption> = self.options.values().collect();
        options.sort_by(|a, b| {
            a.index
                .position()
                .cmp(&b.index.position())
                .then_with(|| a.label.cmp(&b.label))
        });
        options.into_iter().map(|o| o.label.clone()).collect()
    }

    /// Default value rendered for display: lists are joined with `", "`.
    #[must_use]
    pub fn default_value_text(&self) -> String {
        match &self.default_value {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        }
    }
}

/// Response body of the host's form-fields endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormFields {
    #[serde(default)]
    pub properties: BTreeMap<String, FieldProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

// ---------------------------------------------------------------------------
// Flattened catalog
// ---------------------------------------------------------------------------

/// Subtable a member field belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub code: String,
    pub label: String,
}

/// A field in the flattened catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub code: String,
    pub label: String,
    pub field_type: FieldType,
    /// Declared choice labels in option order. Empty for non-choice fields.
    pub choice_labels: Vec<String>,
    /// Set when the field is a member of a subtable.
    pub parent: Option<ParentRef>,
}

/// Flattened view of an application's fields, keyed by field code.
///
/// Subtables appear as their own entry and each member field appears as a
/// separate entry linked back through [`CatalogEntry::parent`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl FieldCatalog {
    /// Flattens host field definitions into a catalog.
    #[must_use]
    pub fn from_properties(properties: &BTreeMap<String, FieldProperty>) -> Self {
        let mut entries = BTreeMap::new();
        for property in properties.values() {
            entries.insert(property.code.clone(), entry_for(property, None));
            if property.field_type == FieldType::Subtable {
                let parent = ParentRef {
                    code: property.code.clone(),
                    label: property.label.clone(),
                };
                for member in property.fields.values() {
                    entries.insert(member.code.clone(), entry_for(member, Some(parent.clone())));
                }
            }
        }
        Self { entries }
    }

    /// Builds a catalog directly from entries. Later duplicates replace earlier ones.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.code.clone(), e)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&CatalogEntry> {
        self.entries.get(code)
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Entries in code order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// All field codes in code order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&FormFields> for FieldCatalog {
    fn from(form: &FormFields) -> Self {
        Self::from_properties(&form.properties)
    }
}

fn entry_for(property: &FieldProperty, parent: Option<ParentRef>) -> CatalogEntry {
    CatalogEntry {
        code: property.code.clone(),
        label: property.label.clone(),
        field_type: property.field_type.clone(),
        choice_labels: property.choice_labels(),
        parent,
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Response body of the host's form-layout endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub layout: Vec<LayoutRow>,
}

/// A field placed inside a layout row. Decorative elements carry no code.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// One top-level element of the form layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum LayoutRow {
    Row {
        #[serde(default)]
        fields: Vec<LayoutField>,
    },
    Subtable {
        code: String,
        #[serde(default)]
        fields: Vec<LayoutField>,
    },
    Group {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        layout: Vec<LayoutRow>,
    },
    /// Separators and any element type this crate does not model.
    #[serde(other)]
    Other,
}

/// Field codes in on-screen order.
///
/// Groups are walked recursively without emitting the group code; a subtable
/// emits its own code followed by its members.
#[must_use]
pub fn layout_field_codes(layout: &Layout) -> Vec<String> {
    let mut codes = Vec::new();
    walk_rows(&layout.layout, &mut codes);
    codes
}

fn walk_rows(rows: &[LayoutRow], codes: &mut Vec<String>) {
    for row in rows {
        match row {
            LayoutRow::Row { fields } => {
                codes.extend(fields.iter().filter_map(|f| f.code.clone()));
            }
            LayoutRow::Subtable { code, fields } => {
                codes.push(code.clone());
                codes.extend(fields.iter().filter_map(|f| f.code.clone()));
            }
            LayoutRow::Group { layout, .. } => walk_rows(layout, codes),
            LayoutRow::Other => {}
        }
    }
}

/// Index from field code to its property, including subtable members.
#[must_use]
pub fn property_index(properties: &BTreeMap<String, FieldProperty>) -> HashMap<&str, &FieldProperty> {
    let mut index = HashMap::new();
    for property in properties.values() {
        index.insert(property.code.as_str(), property);
        for member in property.fields.values() {
            index.insert(member.code.as_str(), member);
        }
    }
    index
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_form() -> FormFields {
        serde_json::from_value(serde_json::json!({
            "properties": {
                "title": {"type": "SINGLE_LINE_TEXT", "code": "title", "label": "Title",
                          "required": true, "unique": true, "defaultValue": ""},
                "status": {"type": "DROP_DOWN", "code": "status", "label": "Status",
                           "defaultValue": "Open",
                           "options": {
                               "Open": {"label": "Open", "index": "0"},
                               "Closed": {"label": "Closed", "index": "1"}
                           }},
                "amount": {"type": "NUMBER", "code": "amount", "label": "Amount"},
                "items": {"type": "SUBTABLE", "code": "items", "label": "Items",
                          "fields": {
                              "item_name": {"type": "SINGLE_LINE_TEXT", "code": "item_name", "label": "Item"},
                              "item_kind": {"type": "RADIO_BUTTON", "code": "item_kind", "label": "Kind",
                                            "options": {
                                                "B": {"label": "B", "index": "1"},
                                                "A": {"label": "A", "index": "0"}
                                            }}
                          }},
                "tags": {"type": "CHECK_BOX", "code": "tags", "label": "Tags",
                         "defaultValue": ["x", "y"],
                         "options": {"x": {"label": "x", "index": "0"}, "y": {"label": "y", "index": "1"}}}
            },
            "revision": "4"
        }))
        .unwrap()
    }

    #[test]
    fn flattens_subtable_members_with_parent() {
        let catalog = FieldCatalog::from(&sample_form());
        assert_eq!(catalog.len(), 7);

        let member = catalog.get("item_name").unwrap();
        assert_eq!(
            member.parent,
            Some(ParentRef {
                code: "items".to_string(),
                label: "Items".to_string()
            })
        );
        assert!(catalog.get("title").unwrap().parent.is_none());
        assert!(catalog.get("items").unwrap().parent.is_none());
    }

    #[test]
    fn choice_labels_follow_option_index() {
        let catalog = FieldCatalog::from(&sample_form());
        assert_eq!(catalog.get("item_kind").unwrap().choice_labels, vec!["A", "B"]);
        assert_eq!(catalog.get("status").unwrap().choice_labels, vec!["Open", "Closed"]);
        assert!(catalog.get("title").unwrap().choice_labels.is_empty());
    }

    #[test]
    fn numeric_and_bad_indexes() {
        assert_eq!(OptionIndex::Number(3).position(), 3);
        assert_eq!(OptionIndex::Text(" 2 ".to_string()).position(), 2);
        assert_eq!(OptionIndex::Text("x".to_string()).position(), u64::MAX);
    }

    #[test]
    fn default_value_text_joins_lists() {
        let form = sample_form();
        assert_eq!(form.properties["tags"].default_value_text(), "x, y");
        assert_eq!(form.properties["status"].default_value_text(), "Open");
        assert_eq!(form.properties["amount"].default_value_text(), "");
    }

    #[test]
    fn unknown_field_type_is_preserved() {
        let form: FormFields = serde_json::from_value(serde_json::json!({
            "properties": {"x": {"type": "FANCY", "code": "x", "label": "X", "extra": 1}}
        }))
        .unwrap();
        assert_eq!(
            form.properties["x"].field_type,
            FieldType::Other("FANCY".to_string())
        );
    }

    #[test]
    fn layout_walk_orders_codes() {
        let layout: Layout = serde_json::from_value(serde_json::json!({
            "layout": [
                {"type": "ROW", "fields": [
                    {"type": "SINGLE_LINE_TEXT", "code": "title"},
                    {"type": "LABEL", "label": "hint"}
                ]},
                {"type": "SUBTABLE", "code": "items", "fields": [
                    {"type": "SINGLE_LINE_TEXT", "code": "item_name"}
                ]},
                {"type": "GROUP", "code": "grp", "layout": [
                    {"type": "ROW", "fields": [{"type": "DROP_DOWN", "code": "status"}]}
                ]},
                {"type": "SEPARATOR"}
            ]
        }))
        .unwrap();

        assert_eq!(
            layout_field_codes(&layout),
            vec!["title", "items", "item_name", "status"]
        );
    }

    #[test]
    fn property_index_includes_members() {
        let form = sample_form();
        let index = property_index(&form.properties);
        assert!(index.contains_key("item_kind"));
        assert!(index.contains_key("items"));
        assert_eq!(index.len(), 7);
    }
}
