//! Free-text to structured query synthesis.
//!
//! The search bar splits user text into tokens and expands every token into
//! an OR-group of per-field clauses:
//!
//! ```text
//! "red blue" over [f1 LIKE, f2 LIKE], join = and
//!   => ((f1 like "red") or (f2 like "red")) and ((f1 like "blue") or (f2 like "blue"))
//! ```
//!
//! `IN` fields only receive a clause when the token exactly matches one of
//! the approved choice values, so a closed choice set is never queried with
//! a value the backend would reject. A token that yields no clause at all is
//! dropped rather than producing an empty group.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field_type::Operator;
use crate::snapshot::{FieldSnapshotEntry, Target};

/// Smallest accepted token limit.
pub const MIN_TOKENS: u8 = 1;

/// Largest accepted token limit.
pub const MAX_TOKENS: u8 = 10;

/// Token limit applied when none (or an invalid one) is configured.
pub const DEFAULT_TOKENS: u8 = 5;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Maximum number of tokens taken from the search text, always in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TokenLimit(u8);

impl TokenLimit {
    /// Validates a configured limit. Returns `None` outside `1..=10`.
    #[must_use]
    pub fn new(limit: u8) -> Option<Self> {
        (MIN_TOKENS..=MAX_TOKENS).contains(&limit).then_some(Self(limit))
    }

    /// Load-time policy: any value outside `1..=10` becomes the default.
    #[must_use]
    pub fn clamped(limit: i64) -> Self {
        u8::try_from(limit)
            .ok()
            .and_then(Self::new)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for TokenLimit {
    fn default() -> Self {
        Self(DEFAULT_TOKENS)
    }
}

impl TryFrom<u8> for TokenLimit {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
            .ok_or_else(|| format!("token limit {value} outside {MIN_TOKENS}..={MAX_TOKENS}"))
    }
}

impl From<TokenLimit> for u8 {
    fn from(limit: TokenLimit) -> Self {
        limit.0
    }
}

/// How token groups are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    /// Every token must match some field.
    #[default]
    And,
    /// Any token may match.
    Or,
}

impl JoinMode {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Parses `"and"` / `"or"` case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Search-bar settings persisted with the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchSettings {
    pub max_tokens: TokenLimit,
    pub join_mode: JoinMode,
}

// ---------------------------------------------------------------------------
// Choice index
// ---------------------------------------------------------------------------

/// Approved choice values per `IN` field, taken from the saved snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceIndex {
    choices: HashMap<String, HashSet<String>>,
}

impl ChoiceIndex {
    /// Indexes the choice values of every `IN` entry in the snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &[FieldSnapshotEntry]) -> Self {
        let choices = snapshot
            .iter()
            .filter(|e| e.operator() == Operator::In)
            .map(|e| {
                (
                    e.code().to_string(),
                    e.choice_values().iter().cloned().collect(),
                )
            })
            .collect();
        Self { choices }
    }

    /// Adds or replaces the allowed values for a field.
    pub fn insert(&mut self, code: impl Into<String>, values: impl IntoIterator<Item = String>) {
        self.choices.insert(code.into(), values.into_iter().collect());
    }

    /// Exact, case-sensitive membership test.
    #[must_use]
    pub fn allows(&self, code: &str, value: &str) -> bool {
        self.choices.get(code).is_some_and(|set| set.contains(value))
    }
}

// ---------------------------------------------------------------------------
// Tokenizer / escaping
// ---------------------------------------------------------------------------

/// Splits search text into at most `limit` tokens.
///
/// Any Unicode whitespace run (including the ideographic space U+3000) is a
/// separator. Extra tokens are discarded.
#[must_use]
pub fn tokenize(text: &str, limit: TokenLimit) -> Vec<String> {
    text.split_whitespace()
        .take(limit.get())
        .map(str::to_string)
        .collect()
}

/// Escapes a value for embedding inside a double-quoted query literal.
///
/// Backslashes and double quotes are backslash-escaped, each run of line
/// breaks becomes one space, and the result is trimmed.
#[must_use]
pub fn escape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_break = false;
    for ch in raw.chars() {
        if ch == '\n' || ch == '\r' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
            continue;
        }
        in_break = false;
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out.trim().to_string()
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A single field predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub code: String,
    pub operator: Operator,
    /// Escaped value, ready to embed between quotes.
    pub value: String,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Like => write!(f, "({} like \"{}\")", self.code, self.value),
            Operator::In => write!(f, "({} in (\"{}\"))", self.code, self.value),
        }
    }
}

/// All clauses generated for one token. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGroup {
    pub token: String,
    pub clauses: Vec<Clause>,
}

impl fmt::Display for TokenGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [single] = self.clauses.as_slice() {
            return write!(f, "{single}");
        }
        f.write_str("(")?;
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{clause}")?;
        }
        f.write_str(")")
    }
}

/// Structured form of a synthesized query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryPlan {
    pub groups: Vec<TokenGroup>,
    pub join_mode: JoinMode,
    /// Tokens that produced no clause and were left out.
    pub dropped_tokens: Vec<String>,
}

impl QueryPlan {
    /// Plans the query for `text` over the usable targets.
    #[must_use]
    pub fn build(
        text: &str,
        settings: SearchSettings,
        targets: &[Target],
        choices: &ChoiceIndex,
    ) -> Self {
        let mut groups = Vec::new();
        let mut dropped_tokens = Vec::new();

        for token in tokenize(text, settings.max_tokens) {
            let value = escape_value(&token);
            let clauses: Vec<Clause> = targets
                .iter()
                .filter(|t| match t.operator {
                    Operator::Like => true,
                    Operator::In => choices.allows(&t.code, &token),
                })
                .map(|t| Clause {
                    code: t.code.clone(),
                    operator: t.operator,
                    value: value.clone(),
                })
                .collect();

            if clauses.is_empty() {
                dropped_tokens.push(token);
            } else {
                groups.push(TokenGroup { token, clauses });
            }
        }

        Self {
            groups,
            join_mode: settings.join_mode,
            dropped_tokens,
        }
    }

    /// True when no filter should be applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.join_mode.keyword())?;
            }
            write!(f, "{group}")?;
        }
        Ok(())
    }
}

/// Synthesizes the structured query string for `text`.
///
/// Returns an empty string when no token survives; callers treat that as
/// "no filter applied".
///
/// # Examples
///
/// ```
/// use fieldlens_core::field_type::Operator;
/// use fieldlens_core::query::{synthesize, ChoiceIndex, JoinMode, SearchSettings, TokenLimit};
/// use fieldlens_core::snapshot::Target;
///
/// let settings = SearchSettings { max_tokens: TokenLimit::default(), join_mode: JoinMode::Or };
/// let targets = [Target::new("f1", Operator::Like)];
/// let query = synthesize("red blue", settings, &targets, &ChoiceIndex::default());
/// assert_eq!(query, r#"(f1 like "red") or (f1 like "blue")"#);
/// ```
#[must_use]
pub fn synthesize(
    text: &str,
    settings: SearchSettings,
    targets: &[Target],
    choices: &ChoiceIndex,
) -> String {
    QueryPlan::build(text, settings, targets, choices).to_string()
}
