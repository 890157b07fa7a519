//! Search-time reconciliation of the saved snapshot against the live schema.
//!
//! Fields may be deleted, retyped, or lose choice values after the search
//! configuration was saved. [`reconcile`] walks the saved [`Target`] list and
//! keeps only targets whose snapshot still describes the live field, so the
//! query synthesizer never emits a clause the backend would reject.
//!
//! Drift is data, not an error: dropped targets are reported through
//! [`ReconciliationResult::mismatch_detected`] and [`Drift`] records. When
//! every target drops, the original list is returned instead so the search
//! bar keeps working (the mismatch flag stays set).

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::FieldCatalog;
use crate::field_type::{FieldType, Operator};
use crate::snapshot::{FieldSnapshotEntry, Target};

// ---------------------------------------------------------------------------
// Live schema
// ---------------------------------------------------------------------------

/// Current definition of a field, fetched fresh at search time. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFieldInfo {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub choice_values: Vec<String>,
}

/// Live field definitions keyed by code, including subtable members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSchema {
    fields: HashMap<String, LiveFieldInfo>,
}

impl LiveSchema {
    #[must_use]
    pub fn new(fields: HashMap<String, LiveFieldInfo>) -> Self {
        Self { fields }
    }

    /// Builds the live view from a freshly fetched catalog.
    #[must_use]
    pub fn from_catalog(catalog: &FieldCatalog) -> Self {
        let fields = catalog
            .iter()
            .map(|entry| {
                (
                    entry.code.clone(),
                    LiveFieldInfo {
                        field_type: entry.field_type.clone(),
                        choice_values: entry.choice_labels.clone(),
                    },
                )
            })
            .collect();
        Self { fields }
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&LiveFieldInfo> {
        self.fields.get(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, LiveFieldInfo)> for LiveSchema {
    fn from_iter<I: IntoIterator<Item = (String, LiveFieldInfo)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Why a configured target was excluded from search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DriftReason {
    /// The field no longer exists in the live schema.
    FieldDeleted,
    /// The target has no matching snapshot entry.
    NotInSnapshot,
    /// The stored snapshot entry violates its own invariants.
    CorruptSnapshot,
    /// The target's operator disagrees with its snapshot entry.
    OperatorMismatch { saved: Operator, target: Operator },
    /// The field's type changed since the configuration was saved.
    Retyped { saved: FieldType, live: FieldType },
    /// Approved choice values that the live field no longer declares.
    ChoicesRemoved { missing: Vec<String> },
}

/// A configured field that failed reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drift {
    pub code: String,
    pub reason: DriftReason,
}

/// Outcome of reconciling the saved targets against the live schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconciliationResult {
    /// Targets safe to search, in configured order.
    pub usable_targets: Vec<Target>,
    /// True when at least one configured target failed validation.
    pub mismatch_detected: bool,
    /// One record per dropped target.
    pub drifts: Vec<Drift>,
    /// True when every target failed and the unvalidated list was substituted.
    pub fell_back: bool,
}

impl ReconciliationResult {
    /// Result used when the live schema could not be fetched: drift is unknown,
    /// so the configured targets are used as-is and no mismatch is reported.
    #[must_use]
    pub fn assume_ok(targets: &[Target]) -> Self {
        Self {
            usable_targets: targets.to_vec(),
            mismatch_detected: false,
            drifts: Vec::new(),
            fell_back: false,
        }
    }

    /// Codes of the targets that were dropped.
    pub fn dropped_codes(&self) -> impl Iterator<Item = &str> {
        self.drifts.iter().map(|d| d.code.as_str())
    }
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Reconciles saved targets against the live schema.
///
/// Rules, first failure wins:
/// 1. field absent from the live schema
/// 2. target absent from the snapshot, its snapshot entry is inconsistent,
///    or the target's operator differs from the entry's
/// 3. saved type differs from the live type
/// 4. for `IN` entries, any approved choice missing from the live choices
///    (live choices added since the save are fine)
///
/// If targets were configured but none survive, the original list is returned
/// with `mismatch_detected` still set.
#[must_use]
pub fn reconcile(
    snapshot: &[FieldSnapshotEntry],
    targets: &[Target],
    live: &LiveSchema,
) -> ReconciliationResult {
    let saved: BTreeMap<&str, &FieldSnapshotEntry> =
        snapshot.iter().map(|e| (e.code(), e)).collect();

    let mut usable_targets = Vec::with_capacity(targets.len());
    let mut drifts = Vec::new();

    for target in targets {
        match check_target(target, saved.get(target.code.as_str()).copied(), live) {
            None => usable_targets.push(target.clone()),
            Some(reason) => {
                debug!(code = %target.code, ?reason, "search target dropped");
                drifts.push(Drift {
                    code: target.code.clone(),
                    reason,
                });
            }
        }
    }

    let mismatch_detected = !drifts.is_empty();
    let fell_back = usable_targets.is_empty() && !targets.is_empty();
    if fell_back {
        debug!(
            targets = targets.len(),
            "every search target drifted, using unvalidated targets"
        );
        usable_targets = targets.to_vec();
    }

    ReconciliationResult {
        usable_targets,
        mismatch_detected,
        drifts,
        fell_back,
    }
}

fn check_target(
    target: &Target,
    saved: Option<&FieldSnapshotEntry>,
    live: &LiveSchema,
) -> Option<DriftReason> {
    let Some(live_field) = live.get(&target.code) else {
        return Some(DriftReason::FieldDeleted);
    };
    let Some(saved) = saved else {
        return Some(DriftReason::NotInSnapshot);
    };
    if !saved.is_consistent() {
        return Some(DriftReason::CorruptSnapshot);
    }
    if target.operator != saved.operator() {
        return Some(DriftReason::OperatorMismatch {
            saved: saved.operator(),
            target: target.operator,
        });
    }
    if saved.field_type() != &live_field.field_type {
        return Some(DriftReason::Retyped {
            saved: saved.field_type().clone(),
            live: live_field.field_type.clone(),
        });
    }
    if saved.operator() == Operator::In {
        let live_choices: HashSet<&str> =
            live_field.choice_values.iter().map(String::as_str).collect();
        let missing: Vec<String> = saved
            .choice_values()
            .iter()
            .filter(|v| !live_choices.contains(v.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Some(DriftReason::ChoicesRemoved { missing });
        }
    }
    None
}
