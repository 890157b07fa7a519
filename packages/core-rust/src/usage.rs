//! Field usage extraction across the application's configuration surfaces.
//!
//! Views, notifications, workflow actions, customization scripts, reports,
//! and app actions reference fields either directly (a `code` property) or
//! inside free-form condition strings. Direct references are exact; string
//! references are matched heuristically by [`mentions`]. The heuristic stays
//! inside this module: nothing in snapshot, reconcile, or query depends on it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Script references of the form `record.<code>`.
static RECORD_FIELD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"record\.(\w+)").expect("record field pattern is valid"));

/// Report sort keys that name a grouping slot rather than a field.
const VIRTUAL_SORT_KEYS: &[&str] = &["TOTAL", "GROUP1", "GROUP2", "GROUP3"];

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

/// Where a field is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UsageSurface {
    View,
    RecordNotification,
    Reminder,
    ProcessManagement,
    JavaScript,
    Report,
    ActionMapping,
    ActionCondition,
}

impl UsageSurface {
    /// Human-readable label for report output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::View => "List view",
            Self::RecordNotification => "Record notification",
            Self::Reminder => "Reminder",
            Self::ProcessManagement => "Process management",
            Self::JavaScript => "JavaScript",
            Self::Report => "Report",
            Self::ActionMapping => "Action (mapping)",
            Self::ActionCondition => "Action (condition)",
        }
    }
}

impl fmt::Display for UsageSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field code → surfaces referencing it.
pub type UsageMap = BTreeMap<String, BTreeSet<UsageSurface>>;

// ---------------------------------------------------------------------------
// Host records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Views {
    #[serde(default)]
    pub views: HashMap<String, View>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Notifications {
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub filter_cond: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<ReminderTiming>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReminderTiming {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Workflow settings. Actions are kept as raw JSON and scanned as text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessStatus {
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Customize {
    #[serde(default)]
    pub desktop: CustomizeResources,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomizeResources {
    #[serde(default)]
    pub js: Vec<CustomizeResource>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomizeResource {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reports {
    #[serde(default)]
    pub reports: HashMap<String, Report>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub groups: Vec<CodeRef>,
    /// `COUNT` aggregations carry no code.
    #[serde(default)]
    pub aggregations: Vec<CodeRef>,
    #[serde(default)]
    pub filter_cond: String,
    #[serde(default)]
    pub sorts: Vec<ReportSort>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodeRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportSort {
    #[serde(default)]
    pub by: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppActions {
    #[serde(default)]
    pub actions: HashMap<String, AppAction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAction {
    #[serde(default)]
    pub mappings: Vec<ActionMapping>,
    #[serde(default)]
    pub filter_cond: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMapping {
    #[serde(default)]
    pub src_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_field: Option<String>,
}

/// Every configuration surface scanned for field references.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageBundle {
    #[serde(default)]
    pub views: Views,
    #[serde(default)]
    pub per_record_notifications: Notifications,
    #[serde(default)]
    pub reminder_notifications: Notifications,
    #[serde(default)]
    pub status: ProcessStatus,
    #[serde(default)]
    pub customize: Customize,
    #[serde(default)]
    pub reports: Reports,
    #[serde(default)]
    pub actions: AppActions,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Whether `haystack` mentions `code` as a whole identifier.
///
/// A match counts when the characters directly before and after it are not
/// identifier characters (alphanumerics or `_`).
#[must_use]
pub fn mentions(haystack: &str, code: &str) -> bool {
    if code.is_empty() {
        return false;
    }
    haystack.match_indices(code).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + code.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

struct Marker<'a> {
    usage: UsageMap,
    known: &'a [String],
}

impl Marker<'_> {
    fn mark(&mut self, code: &str, surface: UsageSurface) {
        if code.is_empty() {
            return;
        }
        self.usage.entry(code.to_string()).or_default().insert(surface);
    }

    fn mark_mentions(&mut self, text: &str, surface: UsageSurface) {
        if text.is_empty() {
            return;
        }
        for code in self.known {
            if mentions(text, code) {
                self.usage.entry(code.clone()).or_default().insert(surface);
            }
        }
    }
}

/// Builds the usage map for an application.
///
/// `known_codes` is the set of field codes searched for inside condition
/// strings and workflow definitions.
#[must_use]
pub fn extract_usage(bundle: &UsageBundle, known_codes: &[String]) -> UsageMap {
    let mut marker = Marker {
        usage: UsageMap::new(),
        known: known_codes,
    };

    for view in bundle.views.views.values() {
        for code in &view.fields {
            marker.mark(code, UsageSurface::View);
        }
    }

    for n in &bundle.per_record_notifications.notifications {
        marker.mark_mentions(&n.filter_cond, UsageSurface::RecordNotification);
    }

    for n in &bundle.reminder_notifications.notifications {
        if let Some(code) = n.timing.as_ref().and_then(|t| t.code.as_deref()) {
            marker.mark(code, UsageSurface::Reminder);
        }
        marker.mark_mentions(&n.filter_cond, UsageSurface::Reminder);
    }

    for action in &bundle.status.actions {
        marker.mark_mentions(&action.to_string(), UsageSurface::ProcessManagement);
    }

    let scripts: Vec<&str> = bundle
        .customize
        .desktop
        .js
        .iter()
        .filter_map(|js| js.url.as_deref())
        .collect();
    for script in scripts {
        for caps in RECORD_FIELD_PATTERN.captures_iter(script) {
            marker.mark(&caps[1], UsageSurface::JavaScript);
        }
    }

    for report in bundle.reports.reports.values() {
        for code in report
            .groups
            .iter()
            .chain(&report.aggregations)
            .filter_map(|r| r.code.as_deref())
        {
            marker.mark(code, UsageSurface::Report);
        }
        marker.mark_mentions(&report.filter_cond, UsageSurface::Report);
        for sort in &report.sorts {
            if !VIRTUAL_SORT_KEYS.contains(&sort.by.as_str()) {
                marker.mark(&sort.by, UsageSurface::Report);
            }
        }
    }

    for action in bundle.actions.actions.values() {
        for mapping in &action.mappings {
            if mapping.src_type == "FIELD" {
                if let Some(src) = mapping.src_field.as_deref() {
                    marker.mark(src, UsageSurface::ActionMapping);
                }
            }
        }
        marker.mark_mentions(&action.filter_cond, UsageSurface::ActionCondition);
    }

    marker.usage
}

/// Joins the surface labels of one field, or `―` when unused.
#[must_use]
pub fn usage_text(usage: &UsageMap, code: &str) -> String {
    match usage.get(code) {
        Some(surfaces) if !surfaces.is_empty() => surfaces
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join("・"),
        _ => "―".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<String> {
        ["title", "status", "due", "amount", "owner"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn bundle() -> UsageBundle {
        serde_json::from_value(serde_json::json!({
            "views": {"views": {"All": {"type": "LIST", "fields": ["title", "status"]}}},
            "perRecordNotifications": {"notifications": [
                {"filterCond": "status in (\"Open\")", "title": "n"}
            ]},
            "reminderNotifications": {"notifications": [
                {"timing": {"code": "due", "daysLater": 1}, "filterCond": "amount > 10"}
            ]},
            "status": {"enable": true, "actions": [
                {"name": "Approve", "from": "A", "to": "B", "filterCond": "owner in (LOGINUSER())"}
            ]},
            "customize": {"desktop": {"js": [
                {"type": "URL", "url": "https://cdn.example.com/app.js?x=record.title"},
                {"type": "FILE", "file": {"fileKey": "k"}}
            ]}},
            "reports": {"reports": {"Chart": {
                "groups": [{"code": "status"}],
                "aggregations": [{"type": "COUNT"}, {"type": "SUM", "code": "amount"}],
                "filterCond": "title like \"x\"",
                "sorts": [{"by": "GROUP1", "order": "ASC"}, {"by": "due", "order": "DESC"}]
            }}},
            "actions": {"actions": {"Copy": {
                "mappings": [
                    {"srcType": "FIELD", "srcField": "title", "destField": "t2"},
                    {"srcType": "RECORD_URL", "destField": "link"}
                ],
                "filterCond": "status = \"Closed\""
            }}}
        }))
        .unwrap()
    }

    fn surfaces(usage: &UsageMap, code: &str) -> Vec<UsageSurface> {
        usage.get(code).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    #[test]
    fn extracts_all_surfaces() {
        let usage = extract_usage(&bundle(), &known());

        assert_eq!(
            surfaces(&usage, "title"),
            vec![
                UsageSurface::View,
                UsageSurface::JavaScript,
                UsageSurface::Report,
                UsageSurface::ActionMapping
            ]
        );
        assert_eq!(
            surfaces(&usage, "status"),
            vec![
                UsageSurface::View,
                UsageSurface::RecordNotification,
                UsageSurface::Report,
                UsageSurface::ActionCondition
            ]
        );
        assert_eq!(surfaces(&usage, "due"), vec![UsageSurface::Reminder, UsageSurface::Report]);
        assert_eq!(surfaces(&usage, "amount"), vec![UsageSurface::Reminder, UsageSurface::Report]);
        assert_eq!(surfaces(&usage, "owner"), vec![UsageSurface::ProcessManagement]);
    }

    #[test]
    fn virtual_sort_keys_are_ignored() {
        let usage = extract_usage(&bundle(), &known());
        assert!(!usage.contains_key("GROUP1"));
    }

    #[test]
    fn empty_bundle_yields_empty_map() {
        assert!(extract_usage(&UsageBundle::default(), &known()).is_empty());
    }

    #[test]
    fn mentions_respects_identifier_boundaries() {
        assert!(mentions("status in (\"A\")", "status"));
        assert!(mentions("(status)", "status"));
        assert!(!mentions("status_old = 1", "status"));
        assert!(!mentions("substatus = 1", "status"));
        assert!(mentions("x = 1 and status_old = 2 or status = 3", "status"));
        assert!(!mentions("anything", ""));
    }

    #[test]
    fn mentions_handles_multibyte_neighbours() {
        assert!(mentions("「担当」 in (\"a\")", "担当"));
        assert!(!mentions("担当者 = 1", "担当"));
    }

    #[test]
    fn usage_text_joins_labels() {
        let usage = extract_usage(&bundle(), &known());
        assert_eq!(usage_text(&usage, "owner"), "Process management");
        assert_eq!(usage_text(&usage, "due"), "Reminder・Report");
        assert_eq!(usage_text(&usage, "nothing"), "―");
    }

    #[test]
    fn missing_sections_default() {
        let bundle: UsageBundle = serde_json::from_value(serde_json::json!({
            "views": {"views": {"v": {"fields": ["a"]}}}
        }))
        .unwrap();
        let usage = extract_usage(&bundle, &[]);
        assert_eq!(surfaces(&usage, "a"), vec![UsageSurface::View]);
    }
}
