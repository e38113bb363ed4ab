//! Reconciliation: deciding whether an incoming prediction is new or a
//! re-analysis of something already stored, and merging it if so.
//!
//! The caller supplies the stored records for the incoming subject; this
//! module never touches storage. Whatever the inputs, the result describes
//! exactly one row for the incoming identity key.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  cleanup::survivor,
  record::{NewPrediction, PredictionRecord},
};

/// What the caller must do to persist a [`Reconciliation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Insert,
  /// Overwrite the stored record `target`; its id is unchanged.
  Update { target: Uuid },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
  pub action: Action,
  /// The record to write, tiers already computed.
  pub record: PredictionRecord,
}

/// Reconcile `incoming` against `existing`, which should hold at least every
/// stored record sharing its subject. Records with other identity keys are
/// ignored. Fails with [`Error::MalformedRecord`] if `incoming` does not
/// pass [`NewPrediction::validate`].
pub fn reconcile(
  incoming: NewPrediction,
  existing: &[PredictionRecord],
  now: DateTime<Utc>,
) -> Result<Reconciliation> {
  incoming.validate()?;
  let key = incoming.identity_key();
  let matches: Vec<&PredictionRecord> = existing
    .iter()
    .filter(|r| r.identity_key() == key)
    .collect();

  let scored: Vec<Uuid> = matches
    .iter()
    .filter(|r| r.has_alignment_score())
    .map(|r| r.record_id)
    .collect();
  if scored.len() > 1 {
    return Err(Error::AmbiguousMerge { key: key.to_string(), candidates: scored });
  }

  let Some(target) = survivor(&matches) else {
    return Ok(Reconciliation {
      action: Action::Insert,
      record: PredictionRecord::from_new(incoming, Uuid::new_v4(), now),
    });
  };

  let mut record = target.clone();
  if supersedes(&incoming, target) {
    overwrite(&mut record, incoming);
  } else {
    fill_missing(&mut record, incoming);
  }
  record.refresh_tiers();
  record.updated_at = now;

  Ok(Reconciliation {
    action: Action::Update { target: record.record_id },
    record,
  })
}

/// True if `incoming` comes from a more authoritative analysis than
/// `stored`.
fn supersedes(incoming: &NewPrediction, stored: &PredictionRecord) -> bool {
  (incoming.has_alignment_score() && !stored.has_alignment_score())
    || incoming.scheme_version > stored.scheme_version
}

/// Take everything `incoming` carries; keep stored values only where
/// `incoming` has none.
fn overwrite(record: &mut PredictionRecord, incoming: NewPrediction) {
  if incoming.interface_alignment_score.is_some() {
    record.interface_alignment_score = incoming.interface_alignment_score;
  }
  if incoming.high_confidence_contacts.is_some() {
    record.high_confidence_contacts = incoming.high_confidence_contacts;
  }
  if incoming.medium_confidence_contacts.is_some() {
    record.medium_confidence_contacts = incoming.medium_confidence_contacts;
  }
  if incoming.interface_plddt.is_some() {
    record.interface_plddt = incoming.interface_plddt;
  }
  record.scheme_version = record.scheme_version.max(incoming.scheme_version);
  record.provenance_path = incoming.provenance_path;
}

/// Additive merge: stored non-null values always win.
fn fill_missing(record: &mut PredictionRecord, incoming: NewPrediction) {
  record.interface_alignment_score =
    record.interface_alignment_score.or(incoming.interface_alignment_score);
  record.high_confidence_contacts =
    record.high_confidence_contacts.or(incoming.high_confidence_contacts);
  record.medium_confidence_contacts =
    record.medium_confidence_contacts.or(incoming.medium_confidence_contacts);
  record.interface_plddt = record.interface_plddt.or(incoming.interface_plddt);
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;
  use crate::{
    record::{Scheme, Tier},
    subject::SubjectKey,
  };

  fn t0() -> DateTime<Utc> { Utc.timestamp_opt(1_700_000_000, 0).unwrap() }

  fn later() -> DateTime<Utc> { t0() + Duration::hours(1) }

  fn scheme_b_record() -> NewPrediction {
    let mut p = NewPrediction::new(
      SubjectKey::pair("X", "Y"),
      0.59,
      Scheme::InterfaceQuality,
      "runs/v3/X_Y.json",
    );
    p.high_confidence_contacts = Some(298);
    p.interface_plddt = Some(86.1);
    p
  }

  fn scheme_a_record() -> NewPrediction {
    let mut p = NewPrediction::new(
      SubjectKey::pair("X", "Y"),
      0.59,
      Scheme::InterfaceAlignment,
      "runs/v4/X_Y.json",
    );
    p.high_confidence_contacts = Some(298);
    p.interface_alignment_score = Some(0.751);
    p
  }

  fn stored(p: NewPrediction) -> PredictionRecord {
    PredictionRecord::from_new(p, Uuid::new_v4(), t0())
  }

  #[test]
  fn no_match_inserts() {
    let r = reconcile(scheme_b_record(), &[], t0()).unwrap();
    assert_eq!(r.action, Action::Insert);
    assert_eq!(r.record.confidence_tier, Tier::High);
  }

  #[test]
  fn other_identity_keys_are_ignored() {
    let mut other = scheme_b_record();
    other.pairwise_alignment_confidence = 0.6;
    let existing = [stored(other)];
    let r = reconcile(scheme_b_record(), &existing, t0()).unwrap();
    assert_eq!(r.action, Action::Insert);
  }

  #[test]
  fn identical_record_updates_in_place() {
    let existing = [stored(scheme_b_record())];
    let r = reconcile(scheme_b_record(), &existing, later()).unwrap();
    assert_eq!(r.action, Action::Update { target: existing[0].record_id });
    assert_eq!(r.record.record_id, existing[0].record_id);
    assert_eq!(r.record.ingested_at, t0());
    assert_eq!(r.record.updated_at, later());
  }

  #[test]
  fn null_contacts_match_zero_contacts() {
    let mut with_zero = scheme_b_record();
    with_zero.high_confidence_contacts = Some(0);
    let existing = [stored(with_zero)];

    let mut with_null = scheme_b_record();
    with_null.high_confidence_contacts = None;
    let r = reconcile(with_null, &existing, later()).unwrap();
    assert!(matches!(r.action, Action::Update { .. }));
    assert_eq!(r.record.high_confidence_contacts, Some(0));
  }

  #[test]
  fn alignment_reanalysis_merges_into_one_record() {
    let existing = [stored(scheme_b_record())];
    let r = reconcile(scheme_a_record(), &existing, later()).unwrap();

    assert_eq!(r.action, Action::Update { target: existing[0].record_id });
    assert_eq!(r.record.confidence_tier, Tier::High);
    assert_eq!(r.record.alignment_score_class, Some(Tier::High));
    assert_eq!(r.record.interface_alignment_score, Some(0.751));
    assert_eq!(r.record.scheme_version, Scheme::InterfaceAlignment);
    assert_eq!(r.record.provenance_path, "runs/v4/X_Y.json");
    // Not carried by the newer record, so the stored value survives.
    assert_eq!(r.record.interface_plddt, Some(86.1));
  }

  #[test]
  fn superseding_record_overwrites_quality_inputs() {
    let existing = [stored(scheme_b_record())];
    let mut incoming = scheme_a_record();
    incoming.interface_plddt = Some(70.0);
    incoming.medium_confidence_contacts = Some(350);

    let r = reconcile(incoming, &existing, later()).unwrap();
    assert_eq!(r.record.interface_plddt, Some(70.0));
    assert_eq!(r.record.medium_confidence_contacts, Some(350));
    // 0.59 ipTM with 298 contacts but pLDDT 70 drops out of High.
    assert_eq!(r.record.confidence_tier, Tier::Medium);
  }

  #[test]
  fn older_scheme_only_fills_gaps() {
    let mut stored_a = scheme_a_record();
    stored_a.interface_plddt = None;
    let existing = [stored(stored_a)];

    let mut incoming = scheme_b_record();
    incoming.interface_plddt = Some(86.1);
    incoming.medium_confidence_contacts = Some(400);
    incoming.high_confidence_contacts = Some(298);

    let r = reconcile(incoming, &existing, later()).unwrap();
    assert!(matches!(r.action, Action::Update { .. }));
    assert_eq!(r.record.interface_plddt, Some(86.1));
    assert_eq!(r.record.medium_confidence_contacts, Some(400));
    assert_eq!(r.record.interface_alignment_score, Some(0.751));
    assert_eq!(r.record.scheme_version, Scheme::InterfaceAlignment);
    assert_eq!(r.record.provenance_path, "runs/v4/X_Y.json");
  }

  #[test]
  fn additive_merge_never_overwrites() {
    let existing = [stored(scheme_b_record())];
    let mut incoming = scheme_b_record();
    incoming.interface_plddt = Some(10.0);
    incoming.provenance_path = "runs/v3-rerun/X_Y.json".into();

    let r = reconcile(incoming, &existing, later()).unwrap();
    assert_eq!(r.record.interface_plddt, Some(86.1));
    assert_eq!(r.record.provenance_path, "runs/v3/X_Y.json");
    assert_eq!(r.record.confidence_tier, Tier::High);
  }

  #[test]
  fn gap_fill_recomputes_tier() {
    let mut sparse = scheme_b_record();
    sparse.interface_plddt = None;
    let existing = [stored(sparse)];
    // 0.59 ipTM, 298 contacts, no pLDDT: Medium.
    assert_eq!(existing[0].confidence_tier, Tier::Medium);

    let r = reconcile(scheme_b_record(), &existing, later()).unwrap();
    assert_eq!(r.record.confidence_tier, Tier::High);
  }

  #[test]
  fn pre_existing_duplicates_resolve_to_the_scored_one() {
    let plain = stored(scheme_b_record());
    let scored = stored(scheme_a_record());
    let existing = [plain, scored.clone()];

    let r = reconcile(scheme_b_record(), &existing, later()).unwrap();
    assert_eq!(r.action, Action::Update { target: scored.record_id });
  }

  #[test]
  fn two_scored_matches_are_ambiguous() {
    let existing = [stored(scheme_a_record()), stored(scheme_a_record())];
    let err = reconcile(scheme_b_record(), &existing, later()).unwrap_err();
    match err {
      Error::AmbiguousMerge { candidates, .. } => {
        assert_eq!(candidates.len(), 2);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn invalid_input_is_rejected_before_matching() {
    let mut incoming = scheme_b_record();
    incoming.subject = SubjectKey::pair("X+Z", "Y");
    assert!(matches!(
      reconcile(incoming, &[], t0()),
      Err(Error::MalformedRecord { field: "bait", .. })
    ));

    let mut incoming = scheme_b_record();
    incoming.pairwise_alignment_confidence = 7.5;
    assert!(reconcile(incoming, &[], t0()).is_err());
  }

  #[test]
  fn repeated_reconcile_keeps_one_row() {
    let mut table: Vec<PredictionRecord> = Vec::new();
    for input in [scheme_b_record(), scheme_b_record(), scheme_a_record()] {
      let r = reconcile(input, &table, later()).unwrap();
      match r.action {
        Action::Insert => table.push(r.record),
        Action::Update { target } => {
          let slot = table.iter_mut().find(|row| row.record_id == target).unwrap();
          *slot = r.record;
        }
      }
    }
    assert_eq!(table.len(), 1);
    assert!(table[0].has_alignment_score());
  }
}
