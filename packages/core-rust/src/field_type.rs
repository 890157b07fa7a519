//! Host field types and the search classifier.
//!
//! [`FieldType`] is the tag the host schema attaches to every field. The
//! classifier maps each tag to the comparison [`Operator`] the query
//! synthesizer may use and to a [`DisplayGroup`] used for presentation.
//!
//! Both the configuration page and the search surface classify through
//! [`resolve_operator`], so they can never disagree about which fields are
//! searchable. Unknown tags deserialize into [`FieldType::Other`] and are
//! never searchable.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

/// Field type tag as declared by the host form schema.
///
/// Serializes to the host's upper-snake wire string (e.g. `"SINGLE_LINE_TEXT"`).
/// Tags this crate does not know about are preserved verbatim in
/// [`FieldType::Other`] so that a snapshot round-trips without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    SingleLineText,
    MultiLineText,
    RichText,
    Link,
    Email,
    Phone,
    Number,
    Calc,
    DropDown,
    RadioButton,
    CheckBox,
    MultiSelect,
    File,
    Date,
    Time,
    DateTime,
    UserSelect,
    OrganizationSelect,
    GroupSelect,
    Subtable,
    ReferenceTable,
    RecordNumber,
    Creator,
    CreatedTime,
    Modifier,
    UpdatedTime,
    Status,
    StatusAssignee,
    Category,
    Group,
    Label,
    Spacer,
    Hr,
    /// Any tag not listed above, kept as the raw wire string.
    Other(String),
}

impl FieldType {
    /// Returns the host wire string for this type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SingleLineText => "SINGLE_LINE_TEXT",
            Self::MultiLineText => "MULTI_LINE_TEXT",
            Self::RichText => "RICH_TEXT",
            Self::Link => "LINK",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Number => "NUMBER",
            Self::Calc => "CALC",
            Self::DropDown => "DROP_DOWN",
            Self::RadioButton => "RADIO_BUTTON",
            Self::CheckBox => "CHECK_BOX",
            Self::MultiSelect => "MULTI_SELECT",
            Self::File => "FILE",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::DateTime => "DATETIME",
            Self::UserSelect => "USER_SELECT",
            Self::OrganizationSelect => "ORGANIZATION_SELECT",
            Self::GroupSelect => "GROUP_SELECT",
            Self::Subtable => "SUBTABLE",
            Self::ReferenceTable => "REFERENCE_TABLE",
            Self::RecordNumber => "RECORD_NUMBER",
            Self::Creator => "CREATOR",
            Self::CreatedTime => "CREATED_TIME",
            Self::Modifier => "MODIFIER",
            Self::UpdatedTime => "UPDATED_TIME",
            Self::Status => "STATUS",
            Self::StatusAssignee => "STATUS_ASSIGNEE",
            Self::Category => "CATEGORY",
            Self::Group => "GROUP",
            Self::Label => "LABEL",
            Self::Spacer => "SPACER",
            Self::Hr => "HR",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the field's value is drawn from a fixed set of declared options.
    #[must_use]
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            Self::DropDown | Self::RadioButton | Self::CheckBox | Self::MultiSelect
        )
    }
}

impl From<String> for FieldType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "SINGLE_LINE_TEXT" => Self::SingleLineText,
            "MULTI_LINE_TEXT" => Self::MultiLineText,
            "RICH_TEXT" => Self::RichText,
            "LINK" => Self::Link,
            "EMAIL" => Self::Email,
            "PHONE" => Self::Phone,
            "NUMBER" => Self::Number,
            "CALC" => Self::Calc,
            "DROP_DOWN" => Self::DropDown,
            "RADIO_BUTTON" => Self::RadioButton,
            "CHECK_BOX" => Self::CheckBox,
            "MULTI_SELECT" => Self::MultiSelect,
            "FILE" => Self::File,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "DATETIME" => Self::DateTime,
            "USER_SELECT" => Self::UserSelect,
            "ORGANIZATION_SELECT" => Self::OrganizationSelect,
            "GROUP_SELECT" => Self::GroupSelect,
            "SUBTABLE" => Self::Subtable,
            "REFERENCE_TABLE" => Self::ReferenceTable,
            "RECORD_NUMBER" => Self::RecordNumber,
            "CREATOR" => Self::Creator,
            "CREATED_TIME" => Self::CreatedTime,
            "MODIFIER" => Self::Modifier,
            "UPDATED_TIME" => Self::UpdatedTime,
            "STATUS" => Self::Status,
            "STATUS_ASSIGNEE" => Self::StatusAssignee,
            "CATEGORY" => Self::Category,
            "GROUP" => Self::Group,
            "LABEL" => Self::Label,
            "SPACER" => Self::Spacer,
            "HR" => Self::Hr,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for FieldType {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Operator / DisplayGroup
// ---------------------------------------------------------------------------

/// Comparison operator used when a field is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// Substring match: `(code like "value")`.
    Like,
    /// Membership in a closed choice set: `(code in ("value"))`.
    In,
}

impl Operator {
    /// Keyword emitted in the structured query.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::In => "in",
        }
    }
}

/// Presentation bucket for a field type on the configuration page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DisplayGroup {
    Like,
    In,
    File,
    Other,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Returns the search operator for a field type, or `None` if the type is not searchable.
///
/// # Examples
///
/// ```
/// use fieldlens_core::field_type::{resolve_operator, FieldType, Operator};
///
/// assert_eq!(resolve_operator(&FieldType::SingleLineText), Some(Operator::Like));
/// assert_eq!(resolve_operator(&FieldType::DropDown), Some(Operator::In));
/// assert_eq!(resolve_operator(&FieldType::Number), None);
/// ```
#[must_use]
pub fn resolve_operator(field_type: &FieldType) -> Option<Operator> {
    match resolve_group(field_type) {
        DisplayGroup::Like | DisplayGroup::File => Some(Operator::Like),
        DisplayGroup::In => Some(Operator::In),
        DisplayGroup::Other => None,
    }
}

/// Returns the display group for a field type.
#[must_use]
pub fn resolve_group(field_type: &FieldType) -> DisplayGroup {
    match field_type {
        FieldType::File => DisplayGroup::File,
        FieldType::SingleLineText
        | FieldType::MultiLineText
        | FieldType::Link
        | FieldType::Email
        | FieldType::Phone => DisplayGroup::Like,
        FieldType::DropDown | FieldType::RadioButton => DisplayGroup::In,
        FieldType::RichText
        | FieldType::Number
        | FieldType::Calc
        | FieldType::CheckBox
        | FieldType::MultiSelect
        | FieldType::Date
        | FieldType::Time
        | FieldType::DateTime
        | FieldType::UserSelect
        | FieldType::OrganizationSelect
        | FieldType::GroupSelect
        | FieldType::Subtable
        | FieldType::ReferenceTable
        | FieldType::RecordNumber
        | FieldType::Creator
        | FieldType::CreatedTime
        | FieldType::Modifier
        | FieldType::UpdatedTime
        | FieldType::Status
        | FieldType::StatusAssignee
        | FieldType::Category
        | FieldType::Group
        | FieldType::Label
        | FieldType::Spacer
        | FieldType::Hr
        | FieldType::Other(_) => DisplayGroup::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KNOWN: &[&str] = &[
        "SINGLE_LINE_TEXT",
        "MULTI_LINE_TEXT",
        "RICH_TEXT",
        "LINK",
        "EMAIL",
        "PHONE",
        "NUMBER",
        "CALC",
        "DROP_DOWN",
        "RADIO_BUTTON",
        "CHECK_BOX",
        "MULTI_SELECT",
        "FILE",
        "DATE",
        "TIME",
        "DATETIME",
        "USER_SELECT",
        "ORGANIZATION_SELECT",
        "GROUP_SELECT",
        "SUBTABLE",
        "REFERENCE_TABLE",
        "RECORD_NUMBER",
        "CREATOR",
        "CREATED_TIME",
        "MODIFIER",
        "UPDATED_TIME",
        "STATUS",
        "STATUS_ASSIGNEE",
        "CATEGORY",
        "GROUP",
        "LABEL",
        "SPACER",
        "HR",
    ];

    #[test]
    fn text_like_types_use_like() {
        for t in [
            FieldType::SingleLineText,
            FieldType::MultiLineText,
            FieldType::Link,
            FieldType::Email,
            FieldType::Phone,
        ] {
            assert_eq!(resolve_operator(&t), Some(Operator::Like), "{t}");
            assert_eq!(resolve_group(&t), DisplayGroup::Like, "{t}");
        }
    }

    #[test]
    fn file_uses_like_in_file_group() {
        assert_eq!(resolve_operator(&FieldType::File), Some(Operator::Like));
        assert_eq!(resolve_group(&FieldType::File), DisplayGroup::File);
    }

    #[test]
    fn drop_down_uses_in() {
        assert_eq!(resolve_operator(&FieldType::DropDown), Some(Operator::In));
        assert_eq!(resolve_group(&FieldType::DropDown), DisplayGroup::In);
        assert_eq!(resolve_operator(&FieldType::RadioButton), Some(Operator::In));
    }

    #[test]
    fn unknown_type_fails_closed() {
        let t = FieldType::from("SOMETHING_NEW");
        assert_eq!(t, FieldType::Other("SOMETHING_NEW".to_string()));
        assert_eq!(resolve_operator(&t), None);
        assert_eq!(resolve_group(&t), DisplayGroup::Other);
    }

    #[test]
    fn classifier_is_total_and_consistent() {
        for raw in ALL_KNOWN {
            let t = FieldType::from(*raw);
            let op = resolve_operator(&t);
            match resolve_group(&t) {
                DisplayGroup::Like | DisplayGroup::File => assert_eq!(op, Some(Operator::Like)),
                DisplayGroup::In => assert_eq!(op, Some(Operator::In)),
                DisplayGroup::Other => assert_eq!(op, None),
            }
        }
    }

    #[test]
    fn wire_string_roundtrip() {
        for raw in ALL_KNOWN {
            let t = FieldType::from(*raw);
            assert!(!matches!(t, FieldType::Other(_)), "{raw} should be known");
            assert_eq!(t.as_str(), *raw);
            assert_eq!(String::from(t), *raw);
        }
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&FieldType::DropDown).unwrap();
        assert_eq!(json, "\"DROP_DOWN\"");
        let parsed: FieldType = serde_json::from_str("\"X_CUSTOM\"").unwrap();
        assert_eq!(parsed, FieldType::Other("X_CUSTOM".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"X_CUSTOM\"");
    }

    #[test]
    fn operator_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Operator::Like).unwrap(), "\"LIKE\"");
        assert_eq!(serde_json::to_string(&Operator::In).unwrap(), "\"IN\"");
        assert_eq!(Operator::In.keyword(), "in");
    }

    #[test]
    fn choice_types() {
        assert!(FieldType::DropDown.is_choice());
        assert!(FieldType::CheckBox.is_choice());
        assert!(!FieldType::SingleLineText.is_choice());
    }
}
