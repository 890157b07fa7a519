//! Field usage report and field-code label annotations.
//!
//! The report lists every field in on-screen order with its type, the
//! surfaces that reference it, its constraints, and the administrator's note.
//! Subtable members and reference-table display fields follow their parent.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::catalog::FieldProperty;
use crate::field_type::FieldType;
use crate::usage::{usage_text, UsageMap};

/// Label prefix for rows nested under a subtable or reference table.
pub const CHILD_PREFIX: &str = "┗ ";

/// Label used when a reference table names a field the related app lacks.
pub const UNKNOWN_FIELD_LABEL: &str = "(unknown field)";

/// Type shown when a reference table names a field the related app lacks.
pub const UNKNOWN_FIELD_TYPE: &str = "(?)";

/// Structural role of a report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowKind {
    Plain,
    Subtable,
    SubtableChild,
    Reference,
    ReferenceChild,
}

/// One line of the usage report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReportRow {
    /// 1-based position in the report.
    pub index: usize,
    pub label: String,
    pub code: String,
    pub field_type: String,
    pub kind: RowKind,
    pub usage: String,
    pub required: bool,
    pub unique: bool,
    pub default_value: String,
    pub note: String,
}

/// Inputs for [`build_field_report`].
#[derive(Debug, Clone, Copy)]
pub struct ReportSources<'a> {
    /// Field codes in layout order.
    pub layout_codes: &'a [String],
    pub properties: &'a BTreeMap<String, FieldProperty>,
    pub usage: &'a UsageMap,
    pub notes: &'a BTreeMap<String, String>,
    /// Field definitions of related apps, keyed by app id.
    pub related: &'a HashMap<String, BTreeMap<String, FieldProperty>>,
}

struct RowSink<'a> {
    rows: Vec<FieldReportRow>,
    usage: &'a UsageMap,
    notes: &'a BTreeMap<String, String>,
}

impl RowSink<'_> {
    fn push_property(&mut self, property: &FieldProperty, kind: RowKind) {
        let label = match kind {
            RowKind::SubtableChild | RowKind::ReferenceChild => {
                format!("{CHILD_PREFIX}{}", property.label)
            }
            _ => property.label.clone(),
        };
        self.push(FieldReportRow {
            index: 0,
            label,
            code: property.code.clone(),
            field_type: property.field_type.to_string(),
            kind,
            usage: String::new(),
            required: property.required,
            unique: property.unique,
            default_value: property.default_value_text(),
            note: String::new(),
        });
    }

    fn push(&mut self, mut row: FieldReportRow) {
        row.index = self.rows.len() + 1;
        row.usage = usage_text(self.usage, &row.code);
        row.note = self.notes.get(&row.code).cloned().unwrap_or_default();
        self.rows.push(row);
    }
}

/// Builds the usage report.
///
/// Layout codes that are not top-level fields (subtable members, unknown
/// codes) are skipped at the top level; members are emitted under their table.
#[must_use]
pub fn build_field_report(sources: ReportSources<'_>) -> Vec<FieldReportRow> {
    let mut sink = RowSink {
        rows: Vec::new(),
        usage: sources.usage,
        notes: sources.notes,
    };

    for code in sources.layout_codes {
        let Some(field) = sources.properties.get(code) else {
            continue;
        };
        match field.field_type {
            FieldType::ReferenceTable => {
                sink.push_property(field, RowKind::Reference);
                push_reference_children(&mut sink, field, sources.related);
            }
            FieldType::Subtable => {
                sink.push_property(field, RowKind::Subtable);
                for member in subtable_members(field, sources.layout_codes) {
                    sink.push_property(member, RowKind::SubtableChild);
                }
            }
            _ => sink.push_property(field, RowKind::Plain),
        }
    }

    sink.rows
}

fn push_reference_children(
    sink: &mut RowSink<'_>,
    field: &FieldProperty,
    related: &HashMap<String, BTreeMap<String, FieldProperty>>,
) {
    let Some(reference) = &field.reference_table else {
        return;
    };
    let related_fields = related.get(&reference.related_app.app);
    for code in &reference.display_fields {
        match related_fields.and_then(|fields| fields.get(code)) {
            Some(property) => sink.push_property(property, RowKind::ReferenceChild),
            None => sink.push(FieldReportRow {
                index: 0,
                label: format!("{CHILD_PREFIX}{UNKNOWN_FIELD_LABEL}"),
                code: code.clone(),
                field_type: UNKNOWN_FIELD_TYPE.to_string(),
                kind: RowKind::ReferenceChild,
                usage: String::new(),
                required: false,
                unique: false,
                default_value: String::new(),
                note: String::new(),
            }),
        }
    }
}

/// Members of a subtable, in layout order first, then any remaining by code.
fn subtable_members<'a>(table: &'a FieldProperty, layout_codes: &[String]) -> Vec<&'a FieldProperty> {
    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(table.fields.len());
    for code in layout_codes {
        if let Some(member) = table.fields.get(code) {
            if seen.insert(code.as_str()) {
                members.push(member);
            }
        }
    }
    for (code, member) in &table.fields {
        if !seen.contains(code.as_str()) {
            members.push(member);
        }
    }
    members
}

// ---------------------------------------------------------------------------
// Label annotations
// ---------------------------------------------------------------------------

/// A field label and the code to show next to it on the record detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAnnotation {
    pub label: String,
    pub code: String,
}

/// Annotations for every top-level, non-subtable field, in code order.
#[must_use]
pub fn field_code_annotations(properties: &BTreeMap<String, FieldProperty>) -> Vec<FieldAnnotation> {
    properties
        .values()
        .filter(|p| p.field_type != FieldType::Subtable)
        .map(|p| FieldAnnotation {
            label: p.label.clone(),
            code: p.code.clone(),
        })
        .collect()
}

/// Suffix to append to a rendered label, e.g. `" [title]"`.
///
/// The rendered label may carry a trailing required-marker `*`, which is
/// ignored when matching.
#[must_use]
pub fn label_suffix(rendered_label: &str, annotations: &[FieldAnnotation]) -> Option<String> {
    let text = rendered_label.trim();
    let text = text.strip_suffix('*').unwrap_or(text).trim();
    annotations
        .iter()
        .find(|a| a.label == text)
        .map(|a| format!(" [{}]", a.code))
}
