//! Offline duplicate cleanup.
//!
//! Datasets loaded before reconciliation existed can hold several records for
//! one identity key. [`plan`] picks a single survivor per key;
//! [`bulk_cleanup`] drives a caller-supplied removal over the plan. Running
//! the pass twice removes nothing the second time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{IdentityKey, PredictionRecord};

// ─── Plan ────────────────────────────────────────────────────────────────────

/// One identity key with more than one stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
  pub key:    IdentityKey,
  pub keep:   Uuid,
  pub remove: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct CleanupPlan {
  /// Distinct identity keys seen, duplicated or not.
  pub groups_examined: usize,
  /// Groups needing removals, ordered by identity key.
  pub duplicates:      Vec<DuplicateGroup>,
}

/// Choose the record to keep among records sharing an identity key.
///
/// Records carrying an interface-alignment score win over records without
/// one; within the eligible set the most recently ingested record wins,
/// then the greatest provenance path, then the greatest id. `None` only for
/// an empty group.
pub fn survivor<'a>(group: &[&'a PredictionRecord]) -> Option<&'a PredictionRecord> {
  let any_scored = group.iter().any(|r| r.has_alignment_score());
  group
    .iter()
    .copied()
    .filter(|r| !any_scored || r.has_alignment_score())
    .max_by(|a, b| a.recency().cmp(&b.recency()))
}

/// Group `records` by identity key and plan the removals.
pub fn plan<'a, I>(records: I) -> CleanupPlan
where
  I: IntoIterator<Item = &'a PredictionRecord>,
{
  let mut groups: BTreeMap<IdentityKey, Vec<&PredictionRecord>> = BTreeMap::new();
  for record in records {
    groups.entry(record.identity_key()).or_default().push(record);
  }

  let groups_examined = groups.len();
  let duplicates = groups
    .into_iter()
    .filter(|(_, members)| members.len() > 1)
    .filter_map(|(key, members)| {
      let keep = survivor(&members)?.record_id;
      let remove = members
        .iter()
        .map(|r| r.record_id)
        .filter(|id| *id != keep)
        .collect();
      Some(DuplicateGroup { key, keep, remove })
    })
    .collect();

  CleanupPlan { groups_examined, duplicates }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// A duplicate group whose removal failed. Its records are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFailure {
  pub key:   String,
  pub keep:  Uuid,
  pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
  pub groups_processed:   usize,
  pub duplicate_groups:   usize,
  pub duplicates_removed: usize,
  pub failures:           Vec<GroupFailure>,
}

impl CleanupReport {
  pub fn new(plan: &CleanupPlan) -> Self {
    Self {
      groups_processed: plan.groups_examined,
      duplicate_groups: plan.duplicates.len(),
      ..Self::default()
    }
  }

  pub fn record_removed(&mut self, removed: usize) { self.duplicates_removed += removed; }

  pub fn record_failure(&mut self, group: &DuplicateGroup, error: impl fmt::Display) {
    self.failures.push(GroupFailure {
      key:   group.key.to_string(),
      keep:  group.keep,
      error: error.to_string(),
    });
  }

  pub fn is_clean(&self) -> bool { self.failures.is_empty() }
}

/// Plan a cleanup over `records` and hand each duplicate group to
/// `remove_group`, which must delete `group.remove` atomically and return the
/// number of records it removed. A failing group is reported and the pass
/// moves on.
pub fn bulk_cleanup<'a, I, F, E>(records: I, mut remove_group: F) -> CleanupReport
where
  I: IntoIterator<Item = &'a PredictionRecord>,
  F: FnMut(&DuplicateGroup) -> Result<usize, E>,
  E: fmt::Display,
{
  let plan = plan(records);
  let mut report = CleanupReport::new(&plan);
  for group in &plan.duplicates {
    match remove_group(group) {
      Ok(removed) => report.record_removed(removed),
      Err(e) => report.record_failure(group, e),
    }
  }
  report
}
